use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude::{RoleId, UserId};
use tracing::debug;

use super::{
    emoji::MenuEmoji,
    error::MenuError,
    gateway::{MenuEmbed, MessagingGateway},
    menu::{Menu, MenuKind},
};

/// How a role is shown in a role menu option.
pub fn role_descriptor(role_id: RoleId) -> String {
    format!("<@&{role_id}>")
}

/// Accepts `<@&id>` or a plain id.
pub fn parse_role_descriptor(descriptor: &str) -> Option<RoleId> {
    let trimmed = descriptor.trim();
    let id = trimmed
        .strip_prefix("<@&")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(trimmed);

    match id.parse::<u64>() {
        Ok(id) if id != 0 => Some(RoleId::new(id)),
        _ => None,
    }
}

/// A role anyone can sign up for and ping, with a cooldown between pings.
#[derive(Debug, Clone)]
pub struct PingState {
    pub role_id: RoleId,
    pub cooldown_seconds: u64,
    pub last_ping: Option<DateTime<Utc>>,
}

impl PingState {
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        let Some(last_ping) = self.last_ping else {
            return true;
        };
        let cooldown = i64::try_from(self.cooldown_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        now.signed_duration_since(last_ping) >= cooldown
    }

    pub(super) fn decorate(&self, embed: &mut MenuEmbed) {
        embed.fields.push((
            "Ping cooldown".to_string(),
            format!("{} seconds", self.cooldown_seconds),
            false,
        ));
        if let Some(last_ping) = self.last_ping {
            embed.fields.push((
                "Last pinged".to_string(),
                format!("<t:{}:R>", last_ping.timestamp()),
                false,
            ));
        }
    }
}

/// Role menu for signing up to an event.
#[derive(Debug, Clone)]
pub struct EventState {
    pub event_name: String,
    pub starts_at: Option<DateTime<Utc>>,
}

impl EventState {
    pub(super) fn decorate(&self, embed: &mut MenuEmbed) {
        if let Some(starts_at) = self.starts_at {
            embed.fields.push((
                "Starts".to_string(),
                format!("<t:{}:F>", starts_at.timestamp()),
                false,
            ));
        }
    }
}

impl Menu {
    /// A single option menu giving a role that can be pinged every `cooldown_seconds`.
    pub fn pingable_role(
        title: impl Into<String>,
        description: impl Into<String>,
        emoji: MenuEmoji,
        role_id: RoleId,
        cooldown_seconds: u64,
    ) -> Result<Self, MenuError> {
        let state = PingState {
            role_id,
            cooldown_seconds,
            last_ping: None,
        };
        let mut menu = Self::with_kind(title, description, MenuKind::PingableRole(state));
        menu.add_role_option(emoji, role_id)?;
        Ok(menu)
    }

    /// A single option menu for signing up to an event.
    pub fn event(
        event_name: impl Into<String>,
        description: impl Into<String>,
        emoji: MenuEmoji,
        role_id: RoleId,
        starts_at: Option<DateTime<Utc>>,
    ) -> Result<Self, MenuError> {
        let event_name = event_name.into();
        let state = EventState {
            event_name: event_name.clone(),
            starts_at,
        };
        let mut menu = Self::with_kind(event_name, description, MenuKind::Event(state));
        menu.add_role_option(emoji, role_id)?;
        Ok(menu)
    }

    pub fn ping_state(&self) -> Option<&PingState> {
        match &self.kind {
            MenuKind::PingableRole(ping) => Some(ping),
            _ => None,
        }
    }

    pub(super) async fn grant_role(
        &self,
        gateway: &dyn MessagingGateway,
        emoji: &MenuEmoji,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<bool, MenuError> {
        let guild_id = self.guild_id.ok_or(MenuError::NotSent)?;

        let Some(role_id) = gateway.resolve_role(guild_id, role_id).await? else {
            debug!(%role_id, "Role of menu option no longer exists.");
            self.strip_reaction(gateway, emoji, user_id).await;
            return Ok(false);
        };

        if gateway.member_roles(guild_id, user_id).await?.contains(&role_id) {
            return Ok(false);
        }

        gateway.grant_role(guild_id, user_id, role_id).await?;
        Ok(true)
    }

    pub(super) async fn revoke_role(
        &self,
        gateway: &dyn MessagingGateway,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<bool, MenuError> {
        let guild_id = self.guild_id.ok_or(MenuError::NotSent)?;

        let Some(role_id) = gateway.resolve_role(guild_id, role_id).await? else {
            return Ok(false);
        };

        if !gateway.member_roles(guild_id, user_id).await?.contains(&role_id) {
            return Ok(false);
        }

        gateway.revoke_role(guild_id, user_id, role_id).await?;
        Ok(true)
    }

    /// Called when the role of a pingable role menu got pinged.
    /// Makes the role unmentionable until the cooldown is over.
    ///
    /// Returns false if this isn't a pingable role menu or there is no cooldown.
    pub async fn mark_pinged(
        &mut self,
        gateway: &dyn MessagingGateway,
        now: DateTime<Utc>,
    ) -> Result<bool, MenuError> {
        let guild_id = self.guild_id.ok_or(MenuError::NotSent)?;
        let MenuKind::PingableRole(ping) = &mut self.kind else {
            return Ok(false);
        };
        if ping.cooldown_seconds == 0 {
            return Ok(false);
        }

        let role_id = ping.role_id;
        gateway.set_role_mentionable(guild_id, role_id, false).await?;
        ping.last_ping = Some(now);
        Ok(true)
    }

    /// Makes the role mentionable again once the cooldown is over.
    pub async fn refresh_mentionable(
        &mut self,
        gateway: &dyn MessagingGateway,
        now: DateTime<Utc>,
    ) -> Result<bool, MenuError> {
        let guild_id = self.guild_id.ok_or(MenuError::NotSent)?;
        let MenuKind::PingableRole(ping) = &mut self.kind else {
            return Ok(false);
        };
        if ping.last_ping.is_none() || !ping.cooldown_elapsed(now) {
            return Ok(false);
        }

        let role_id = ping.role_id;
        gateway.set_role_mentionable(guild_id, role_id, true).await?;
        ping.last_ping = None;
        Ok(true)
    }
}
