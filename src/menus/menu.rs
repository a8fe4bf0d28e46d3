use poise::serenity_prelude::{ChannelId, GuildId, MessageId, Reaction, ReactionType, RoleId, UserId};
use tracing::{debug, warn};

use super::{
    confirm::ConfirmState,
    emoji::MenuEmoji,
    error::MenuError,
    gateway::{MenuEmbed, MessageHandle, MessagingGateway},
    options::{OptionBehavior, OptionTable},
    poll::PollState,
    role::{parse_role_descriptor, role_descriptor, EventState, PingState},
};

pub const DISABLED_SUFFIX: &str = " (Currently Disabled)";
pub const DEFAULT_COLOUR: u32 = 0x5865F2;

/// Kind specific state of a menu.
#[derive(Debug)]
pub enum MenuKind {
    Plain,
    Poll(PollState),
    Role,
    Confirmation(ConfirmState),
    PingableRole(PingState),
    Event(EventState),
}

impl MenuKind {
    pub fn name(&self) -> &'static str {
        match self {
            MenuKind::Plain => "menu",
            MenuKind::Poll(_) => "poll",
            MenuKind::Role => "role menu",
            MenuKind::Confirmation(_) => "confirmation",
            MenuKind::PingableRole(_) => "pingable role menu",
            MenuKind::Event(_) => "event menu",
        }
    }

    pub fn grants_roles(&self) -> bool {
        matches!(
            self,
            MenuKind::Role | MenuKind::PingableRole(_) | MenuKind::Event(_)
        )
    }

    /// Decides what an option with this descriptor does in a menu of this kind.
    pub fn behavior_for(&self, descriptor: &str) -> Result<OptionBehavior, MenuError> {
        match self {
            MenuKind::Plain => Ok(OptionBehavior::Dummy),
            MenuKind::Poll(_) => Ok(OptionBehavior::Vote),
            MenuKind::Role | MenuKind::PingableRole(_) | MenuKind::Event(_) => {
                let role_id = parse_role_descriptor(descriptor).ok_or_else(|| {
                    MenuError::InvalidRecord(format!("`{descriptor}` isn't a role."))
                })?;
                Ok(OptionBehavior::RoleGrant { role_id })
            }
            MenuKind::Confirmation(_) => Err(MenuError::FixedOption(descriptor.to_string())),
        }
    }
}

/// A reaction added to or removed from some message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    pub emoji: ReactionType,
}

impl ReactionEvent {
    /// Returns `None` when discord didn't tell us who reacted.
    pub fn from_reaction(reaction: &Reaction) -> Option<Self> {
        Some(Self {
            message_id: reaction.message_id,
            channel_id: reaction.channel_id,
            guild_id: reaction.guild_id,
            user_id: reaction.user_id?,
            emoji: reaction.emoji.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The menu didn't look at the event at all.
    Ignored,
    /// The emoji isn't one of the menu's options.
    Unhandled,
    /// The option ran. `true` if something changed.
    Handled(bool),
}

/// An interactive message driven by reactions.
#[derive(Debug)]
pub struct Menu {
    pub(super) id: Option<MessageId>,
    pub(super) guild_id: Option<GuildId>,
    pub(super) channel_id: Option<ChannelId>,
    pub title: String,
    pub description: String,
    pub(super) options: OptionTable,
    pub(super) enabled: bool,
    pub(super) deleted: bool,
    pub show_ids: bool,
    pub auto_enable: bool,
    pub colour: u32,
    pub kind: MenuKind,
}

impl Menu {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_kind(title, description, MenuKind::Plain)
    }

    pub fn role(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_kind(title, description, MenuKind::Role)
    }

    pub(super) fn with_kind(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: MenuKind,
    ) -> Self {
        Self {
            id: None,
            guild_id: None,
            channel_id: None,
            title: title.into(),
            description: description.into(),
            options: OptionTable::new(),
            enabled: false,
            deleted: false,
            show_ids: false,
            auto_enable: false,
            colour: DEFAULT_COLOUR,
            kind,
        }
    }

    pub fn with_show_ids(mut self, show_ids: bool) -> Self {
        self.show_ids = show_ids;
        self
    }

    pub fn with_auto_enable(mut self, auto_enable: bool) -> Self {
        self.auto_enable = auto_enable;
        self
    }

    pub fn id(&self) -> Option<MessageId> {
        self.id
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    /// Menus with callback options only live as long as the process does.
    pub fn is_saveable(&self) -> bool {
        !matches!(self.kind, MenuKind::Confirmation(_)) && self.options.is_saveable()
    }

    pub fn handle(&self) -> Result<MessageHandle, MenuError> {
        if self.deleted {
            return Err(MenuError::Deleted);
        }
        match (self.id, self.channel_id) {
            (Some(message_id), Some(channel_id)) => Ok(MessageHandle {
                channel_id,
                message_id,
            }),
            _ => Err(MenuError::NotSent),
        }
    }

    /// Adds an option, what it does depends on the kind of menu.
    ///
    /// `Ok(false)` if the emoji is already used.
    pub fn add_option(
        &mut self,
        emoji: MenuEmoji,
        descriptor: impl Into<String>,
    ) -> Result<bool, MenuError> {
        let descriptor = descriptor.into();
        let behavior = self.kind.behavior_for(&descriptor)?;
        let key = emoji.key().to_string();

        if !self.options.add(emoji, descriptor, behavior) {
            return Ok(false);
        }

        if let MenuKind::Poll(poll) = &mut self.kind {
            poll.votes.insert(key, 0);
        }
        Ok(true)
    }

    pub fn add_role_option(&mut self, emoji: MenuEmoji, role_id: RoleId) -> Result<bool, MenuError> {
        self.add_option(emoji, role_descriptor(role_id))
    }

    /// `Ok(false)` if the emoji isn't an option.
    pub fn remove_option(&mut self, emoji: &MenuEmoji) -> Result<bool, MenuError> {
        if let MenuKind::Confirmation(_) = self.kind {
            return Err(MenuError::FixedOption(emoji.to_string()));
        }

        if !self.options.remove(emoji) {
            return Ok(false);
        }

        if let MenuKind::Poll(poll) = &mut self.kind {
            if let Some(votes) = poll.votes.remove(emoji.key()) {
                poll.total_votes = poll.total_votes.saturating_sub(votes);
            }
        }
        Ok(true)
    }

    pub fn render(&self) -> MenuEmbed {
        let mut embed = MenuEmbed {
            title: self.title.clone(),
            description: self.description.clone(),
            colour: self.colour,
            ..Default::default()
        };

        for option in self.options.iter() {
            embed
                .fields
                .push((option.emoji.to_string(), option.descriptor.clone(), true));
        }

        let mut footer = vec![];

        let decorated = match &self.kind {
            MenuKind::Poll(poll) => {
                poll.decorate(&mut embed, &mut footer, self.enabled);
                false
            }
            MenuKind::Confirmation(confirm) => confirm.decorate(&mut embed),
            MenuKind::PingableRole(ping) => {
                ping.decorate(&mut embed);
                false
            }
            MenuKind::Event(event) => {
                event.decorate(&mut embed);
                false
            }
            MenuKind::Plain | MenuKind::Role => false,
        };

        if !self.enabled && !decorated {
            embed.title.push_str(DISABLED_SUFFIX);
        }

        if self.show_ids {
            if let Some(id) = self.id {
                footer.push(format!("Menu ID: {id}"));
            }
        }

        if !footer.is_empty() {
            embed.footer = Some(footer.join(" | "));
        }

        embed
    }

    /// Sends the menu and gives it its id.
    pub async fn send(
        &mut self,
        gateway: &dyn MessagingGateway,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<MessageHandle, MenuError> {
        if self.deleted {
            return Err(MenuError::Deleted);
        }
        if self.id.is_some() {
            return Err(MenuError::AlreadySent);
        }

        let handle = gateway.send_message(channel_id, &self.render()).await?;
        self.id = Some(handle.message_id);
        self.guild_id = Some(guild_id);
        self.channel_id = Some(channel_id);

        debug!(menu_id = %handle.message_id, kind = self.kind.name(), "Sent menu.");

        if self.auto_enable {
            self.enable(gateway).await?;
        } else if self.show_ids {
            // The id only exists now.
            gateway.edit_message(handle, &self.render()).await?;
        }

        Ok(handle)
    }

    /// Returns false if the menu was already enabled.
    pub async fn enable(&mut self, gateway: &dyn MessagingGateway) -> Result<bool, MenuError> {
        let handle = self.handle()?;
        if self.enabled {
            return Ok(false);
        }

        self.enabled = true;
        if let MenuKind::Poll(poll) = &mut self.kind {
            poll.start(chrono::Utc::now());
        }

        if let Err(err) = gateway.edit_message(handle, &self.render()).await {
            self.enabled = false;
            if let MenuKind::Poll(poll) = &mut self.kind {
                poll.end_time = None;
            }
            return Err(err);
        }

        self.add_reactions(gateway, handle).await;
        gateway.register_reaction_listener(handle.message_id).await;

        debug!(menu_id = %handle.message_id, "Enabled menu.");
        Ok(true)
    }

    /// Returns false if the menu was already disabled.
    pub async fn disable(&mut self, gateway: &dyn MessagingGateway) -> Result<bool, MenuError> {
        let handle = self.handle()?;
        if !self.enabled {
            return Ok(false);
        }

        gateway.clear_reactions(handle).await?;

        self.enabled = false;
        if let MenuKind::Poll(poll) = &mut self.kind {
            poll.reset();
        }
        gateway.unregister_reaction_listener(handle.message_id).await;

        gateway.edit_message(handle, &self.render()).await?;

        debug!(menu_id = %handle.message_id, "Disabled menu.");
        Ok(true)
    }

    /// Returns whether the menu is enabled afterwards.
    pub async fn toggle(&mut self, gateway: &dyn MessagingGateway) -> Result<bool, MenuError> {
        if self.enabled {
            self.disable(gateway).await?;
        } else {
            self.enable(gateway).await?;
        }
        Ok(self.enabled)
    }

    /// Deletes the message. Nothing can be done with the menu afterwards.
    pub async fn delete(&mut self, gateway: &dyn MessagingGateway) -> Result<(), MenuError> {
        if self.deleted {
            return Ok(());
        }

        if let Ok(handle) = self.handle() {
            gateway.delete_message(handle).await?;
            if self.enabled {
                gateway.unregister_reaction_listener(handle.message_id).await;
            }
        }

        self.enabled = false;
        self.deleted = true;
        Ok(())
    }

    /// Pushes the current state to the message, re-adding reactions if enabled.
    pub async fn refresh(&self, gateway: &dyn MessagingGateway) -> Result<(), MenuError> {
        let handle = self.handle()?;
        gateway.edit_message(handle, &self.render()).await?;
        if self.enabled {
            self.add_reactions(gateway, handle).await;
        }
        Ok(())
    }

    pub async fn dispatch_add(
        &mut self,
        gateway: &dyn MessagingGateway,
        event: &ReactionEvent,
    ) -> Result<DispatchOutcome, MenuError> {
        if !self.accepts(gateway, event) {
            return Ok(DispatchOutcome::Ignored);
        }

        let emoji = MenuEmoji::from_reaction(&event.emoji);
        let Some(option) = self.options.lookup(&emoji).cloned() else {
            self.strip_reaction(gateway, &emoji, event.user_id).await;
            return Ok(DispatchOutcome::Unhandled);
        };

        let changed = match option.behavior {
            OptionBehavior::Vote => self.add_vote(&option.emoji),
            OptionBehavior::RoleGrant { role_id } => {
                self.grant_role(gateway, &option.emoji, event.user_id, role_id)
                    .await?
            }
            OptionBehavior::Confirm => self.resolve(gateway, &option.emoji, event.user_id, true).await?,
            OptionBehavior::Cancel => self.resolve(gateway, &option.emoji, event.user_id, false).await?,
            OptionBehavior::Dummy => false,
        };

        if changed && matches!(self.kind, MenuKind::Poll(_)) {
            self.refresh_embed(gateway).await?;
        }

        Ok(DispatchOutcome::Handled(changed))
    }

    pub async fn dispatch_remove(
        &mut self,
        gateway: &dyn MessagingGateway,
        event: &ReactionEvent,
    ) -> Result<DispatchOutcome, MenuError> {
        if !self.accepts(gateway, event) {
            return Ok(DispatchOutcome::Ignored);
        }

        let Some(option) = self.options.lookup(&event.emoji).cloned() else {
            return Ok(DispatchOutcome::Unhandled);
        };

        let changed = match option.behavior {
            OptionBehavior::Vote => self.remove_vote(&option.emoji),
            OptionBehavior::RoleGrant { role_id } => {
                self.revoke_role(gateway, event.user_id, role_id).await?
            }
            OptionBehavior::Confirm | OptionBehavior::Cancel | OptionBehavior::Dummy => false,
        };

        if changed && matches!(self.kind, MenuKind::Poll(_)) {
            self.refresh_embed(gateway).await?;
        }

        Ok(DispatchOutcome::Handled(changed))
    }

    fn accepts(&self, gateway: &dyn MessagingGateway, event: &ReactionEvent) -> bool {
        event.user_id != gateway.bot_id()
            && self.id == Some(event.message_id)
            && self.enabled
            && !self.deleted
    }

    async fn refresh_embed(&self, gateway: &dyn MessagingGateway) -> Result<(), MenuError> {
        let handle = self.handle()?;
        gateway.edit_message(handle, &self.render()).await
    }

    async fn add_reactions(&self, gateway: &dyn MessagingGateway, handle: MessageHandle) {
        for option in self.options.iter() {
            if let Err(err) = gateway.add_reaction(handle, &option.emoji).await {
                warn!(menu_id = %handle.message_id, emoji = %option.emoji, "Couldn't add reaction to menu: {err}");
            }
        }
    }

    /// Removes a single reaction of a user. Failing to do so is only logged.
    pub(super) async fn strip_reaction(
        &self,
        gateway: &dyn MessagingGateway,
        emoji: &MenuEmoji,
        user_id: UserId,
    ) {
        let Ok(handle) = self.handle() else {
            return;
        };
        if let Err(err) = gateway.remove_reaction(handle, emoji, user_id).await {
            warn!(menu_id = %handle.message_id, emoji = %emoji, "Couldn't remove reaction: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menus::testing::{event, FakeGateway, CHANNEL, GUILD};

    fn emoji(string: &str) -> MenuEmoji {
        MenuEmoji::from_string(string).unwrap()
    }

    fn plain_menu() -> Menu {
        let mut menu = Menu::new("Rules", "React to agree");
        menu.add_option(emoji("✅"), "I agree").unwrap();
        menu
    }

    #[tokio::test]
    async fn send_assigns_identity() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu();
        assert!(matches!(menu.handle(), Err(MenuError::NotSent)));

        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        assert_eq!(menu.id(), Some(handle.message_id));
        assert_eq!(menu.guild_id(), Some(GUILD));
        assert_eq!(menu.channel_id(), Some(CHANNEL));
        assert!(!menu.is_enabled());
        assert!(!gateway.is_listening(handle.message_id).await);

        assert!(matches!(
            menu.send(&gateway, GUILD, CHANNEL).await,
            Err(MenuError::AlreadySent)
        ));
    }

    #[tokio::test]
    async fn auto_enable_enables_on_send() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu().with_auto_enable(true);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        assert!(menu.is_enabled());
        assert!(gateway.is_listening(handle.message_id).await);
        assert_eq!(gateway.reactions_on(handle.message_id), vec!["✅".to_string()]);
    }

    #[tokio::test]
    async fn enable_and_disable_are_idempotent() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu();
        menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        assert!(menu.enable(&gateway).await.unwrap());
        assert!(!menu.enable(&gateway).await.unwrap());
        assert_eq!(gateway.calls("register"), 1);

        assert!(menu.disable(&gateway).await.unwrap());
        assert!(!menu.disable(&gateway).await.unwrap());
        assert_eq!(gateway.calls("unregister"), 1);
        assert_eq!(gateway.calls("clear_reactions"), 1);
    }

    #[tokio::test]
    async fn enabling_an_unsent_menu_fails() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu();
        assert!(matches!(menu.enable(&gateway).await, Err(MenuError::NotSent)));
        assert!(!menu.is_enabled());
    }

    #[tokio::test]
    async fn toggle_flips_state() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu();
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        assert!(menu.toggle(&gateway).await.unwrap());
        assert!(gateway.is_listening(handle.message_id).await);
        assert!(!menu.toggle(&gateway).await.unwrap());
        assert!(!gateway.is_listening(handle.message_id).await);
    }

    #[tokio::test]
    async fn render_marks_disabled_menus() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu().with_show_ids(true);

        let unsent = menu.render();
        assert_eq!(unsent.title, "Rules (Currently Disabled)");
        assert_eq!(unsent.footer, None);
        assert_eq!(
            unsent.fields,
            vec![("✅".to_string(), "I agree".to_string(), true)]
        );

        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();
        menu.enable(&gateway).await.unwrap();

        let live = gateway.embed_of(handle.message_id).unwrap();
        assert_eq!(live.title, "Rules");
        assert_eq!(live.footer, Some(format!("Menu ID: {}", handle.message_id)));
    }

    #[tokio::test]
    async fn delete_is_terminal() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu().with_auto_enable(true);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        menu.delete(&gateway).await.unwrap();

        assert!(menu.is_deleted());
        assert!(!menu.is_enabled());
        assert!(gateway.embed_of(handle.message_id).is_none());
        assert!(!gateway.is_listening(handle.message_id).await);
        assert!(matches!(menu.enable(&gateway).await, Err(MenuError::Deleted)));

        // deleting a message that's already gone is fine
        menu.delete(&gateway).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_emoji_is_stripped_on_add() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu().with_auto_enable(true);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 7, "🍕"))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(gateway.removed_reactions(), vec![("🍕".to_string(), UserId::new(7))]);
        assert_eq!(menu.options().len(), 1);

        let outcome = menu
            .dispatch_remove(&gateway, &event(handle.message_id, 7, "🍕"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(gateway.removed_reactions().len(), 1);
    }

    #[tokio::test]
    async fn events_are_filtered() {
        let gateway = FakeGateway::new();
        let mut menu = plain_menu();
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        // disabled
        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 7, "✅"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);

        menu.enable(&gateway).await.unwrap();

        let from_bot = event(handle.message_id, gateway.bot_id().get(), "✅");
        assert_eq!(
            menu.dispatch_add(&gateway, &from_bot).await.unwrap(),
            DispatchOutcome::Ignored
        );

        let other_message = event(MessageId::new(handle.message_id.get() + 1), 7, "✅");
        assert_eq!(
            menu.dispatch_add(&gateway, &other_message).await.unwrap(),
            DispatchOutcome::Ignored
        );

        assert_eq!(
            menu.dispatch_add(&gateway, &event(handle.message_id, 7, "✅"))
                .await
                .unwrap(),
            DispatchOutcome::Handled(false)
        );
        assert!(gateway.removed_reactions().is_empty());
    }

    #[tokio::test]
    async fn failed_enable_rolls_back() {
        let gateway = FakeGateway::new();
        let mut poll = Menu::poll("Pizza?", "", 60);
        poll.add_option(emoji("👍"), "Yes").unwrap();
        let handle = poll.send(&gateway, GUILD, CHANNEL).await.unwrap();

        gateway.fail_edits(true);
        assert!(matches!(poll.enable(&gateway).await, Err(MenuError::Gateway(_))));

        assert!(!poll.is_enabled());
        assert_eq!(poll.poll_state().unwrap().end_time, None);
        assert!(!gateway.is_listening(handle.message_id).await);
        assert!(gateway.reactions_on(handle.message_id).is_empty());
    }

    #[test]
    fn role_menus_need_role_descriptors() {
        let mut menu = Menu::role("Roles", "Pick one");
        assert!(matches!(
            menu.add_option(emoji("🔴"), "red"),
            Err(MenuError::InvalidRecord(_))
        ));
        assert!(menu.add_role_option(emoji("🔴"), RoleId::new(5)).unwrap());
        assert_eq!(
            menu.options().lookup("🔴").unwrap().behavior,
            OptionBehavior::RoleGrant { role_id: RoleId::new(5) }
        );
    }
}
