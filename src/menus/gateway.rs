use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage, EditRole, Embed,
    GuildId, HttpError, MessageId, RoleId, UserId,
};
use serenity::http::Http;
use tokio::sync::RwLock;
use tracing::debug;

use super::{emoji::MenuEmoji, error::MenuError};

/// Where a menu lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Embed contents of a menu, independent of serenity's builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuEmbed {
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String, bool)>,
    pub footer: Option<String>,
    pub colour: u32,
}

impl MenuEmbed {
    pub fn to_create_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .colour(self.colour);
        for (name, value, inline) in &self.fields {
            embed = embed.field(name, value, *inline);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        embed
    }
}

impl From<&Embed> for MenuEmbed {
    fn from(embed: &Embed) -> Self {
        Self {
            title: embed.title.clone().unwrap_or_default(),
            description: embed.description.clone().unwrap_or_default(),
            fields: embed
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.value.clone(), field.inline))
                .collect(),
            footer: embed.footer.as_ref().map(|footer| footer.text.clone()),
            colour: embed.colour.map(|colour| colour.0).unwrap_or_default(),
        }
    }
}

/// What a menu gets back when it re-fetches its message.
#[derive(Debug, Clone)]
pub struct LiveMessage {
    pub handle: MessageHandle,
    pub embed: Option<MenuEmbed>,
}

/// Everything menus need from Discord.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    fn bot_id(&self) -> UserId;

    async fn send_message(&self, channel_id: ChannelId, embed: &MenuEmbed) -> Result<MessageHandle, MenuError>;

    /// Returns `None` if the message was deleted.
    async fn fetch_message(&self, handle: MessageHandle) -> Result<Option<LiveMessage>, MenuError>;

    async fn edit_message(&self, handle: MessageHandle, embed: &MenuEmbed) -> Result<(), MenuError>;

    /// Deleting a message that's already gone is not an error.
    async fn delete_message(&self, handle: MessageHandle) -> Result<(), MenuError>;

    async fn clear_reactions(&self, handle: MessageHandle) -> Result<(), MenuError>;

    async fn add_reaction(&self, handle: MessageHandle, emoji: &MenuEmoji) -> Result<(), MenuError>;

    async fn remove_reaction(
        &self,
        handle: MessageHandle,
        emoji: &MenuEmoji,
        user_id: UserId,
    ) -> Result<(), MenuError>;

    async fn register_reaction_listener(&self, message_id: MessageId);

    async fn unregister_reaction_listener(&self, message_id: MessageId);

    async fn is_listening(&self, message_id: MessageId) -> bool;

    /// Returns `None` if the role doesn't exist in the guild anymore.
    async fn resolve_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<Option<RoleId>, MenuError>;

    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleId>, MenuError>;

    async fn grant_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), MenuError>;

    async fn revoke_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), MenuError>;

    async fn set_role_mentionable(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
        mentionable: bool,
    ) -> Result<(), MenuError>;
}

const AUDIT_LOG_REASON: &str = "Reaction menu";

/// Talks to Discord over serenity's http client.
pub struct SerenityGateway {
    http: Arc<Http>,
    bot_id: UserId,
    listeners: RwLock<HashSet<MessageId>>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, bot_id: UserId) -> Self {
        Self {
            http,
            bot_id,
            listeners: RwLock::new(HashSet::new()),
        }
    }
}

fn is_not_found(err: &poise::serenity_prelude::Error) -> bool {
    match err {
        poise::serenity_prelude::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 404
        }
        _ => false,
    }
}

#[async_trait]
impl MessagingGateway for SerenityGateway {
    fn bot_id(&self) -> UserId {
        self.bot_id
    }

    async fn send_message(&self, channel_id: ChannelId, embed: &MenuEmbed) -> Result<MessageHandle, MenuError> {
        let message = channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed.to_create_embed()))
            .await?;

        Ok(MessageHandle {
            channel_id,
            message_id: message.id,
        })
    }

    async fn fetch_message(&self, handle: MessageHandle) -> Result<Option<LiveMessage>, MenuError> {
        match handle.channel_id.message(&self.http, handle.message_id).await {
            Ok(message) => Ok(Some(LiveMessage {
                handle,
                embed: message.embeds.first().map(MenuEmbed::from),
            })),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn edit_message(&self, handle: MessageHandle, embed: &MenuEmbed) -> Result<(), MenuError> {
        handle
            .channel_id
            .edit_message(
                &self.http,
                handle.message_id,
                EditMessage::new().embed(embed.to_create_embed()),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), MenuError> {
        match handle.channel_id.delete_message(&self.http, handle.message_id).await {
            Ok(()) => Ok(()),
            Err(err) if is_not_found(&err) => {
                debug!(message_id = %handle.message_id, "Menu message was already deleted.");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn clear_reactions(&self, handle: MessageHandle) -> Result<(), MenuError> {
        self.http
            .delete_message_reactions(handle.channel_id, handle.message_id)
            .await?;
        Ok(())
    }

    async fn add_reaction(&self, handle: MessageHandle, emoji: &MenuEmoji) -> Result<(), MenuError> {
        let reaction = emoji.to_reaction_type()?;
        self.http
            .create_reaction(handle.channel_id, handle.message_id, &reaction)
            .await?;
        Ok(())
    }

    async fn remove_reaction(
        &self,
        handle: MessageHandle,
        emoji: &MenuEmoji,
        user_id: UserId,
    ) -> Result<(), MenuError> {
        let reaction = emoji.to_reaction_type()?;
        self.http
            .delete_reaction(handle.channel_id, handle.message_id, user_id, &reaction)
            .await?;
        Ok(())
    }

    async fn register_reaction_listener(&self, message_id: MessageId) {
        self.listeners.write().await.insert(message_id);
    }

    async fn unregister_reaction_listener(&self, message_id: MessageId) {
        self.listeners.write().await.remove(&message_id);
    }

    async fn is_listening(&self, message_id: MessageId) -> bool {
        self.listeners.read().await.contains(&message_id)
    }

    async fn resolve_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<Option<RoleId>, MenuError> {
        let roles = guild_id.roles(&self.http).await?;
        Ok(roles.contains_key(&role_id).then_some(role_id))
    }

    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleId>, MenuError> {
        let member = guild_id.member(&self.http, user_id).await?;
        Ok(member.roles)
    }

    async fn grant_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), MenuError> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(AUDIT_LOG_REASON))
            .await?;
        Ok(())
    }

    async fn revoke_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), MenuError> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(AUDIT_LOG_REASON))
            .await?;
        Ok(())
    }

    async fn set_role_mentionable(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
        mentionable: bool,
    ) -> Result<(), MenuError> {
        guild_id
            .edit_role(&self.http, role_id, EditRole::new().mentionable(mentionable))
            .await?;
        Ok(())
    }
}
