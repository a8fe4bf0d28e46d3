use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId};
use serde::{Deserialize, Serialize};

use super::{
    error::MenuError,
    gateway::{MessageHandle, MessagingGateway},
    menu::{Menu, MenuKind, DISABLED_SUFFIX},
    options::{OptionRecord, OptionTable},
    poll::PollState,
    role::{EventState, PingState},
};

pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// How a menu is stored in the config store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: u64,
    pub title: String,
    pub guild_id: u64,
    pub channel_id: u64,
    pub options: BTreeMap<String, OptionRecord>,
    pub enabled: bool,
    pub show_ids: bool,
    #[serde(flatten)]
    pub kind: KindRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "menu_type", rename_all = "snake_case")]
pub enum KindRecord {
    Plain,
    Poll {
        end_time: Option<String>,
        length: u64,
    },
    Role,
    PingableRole {
        role_id: u64,
        cooldown_seconds: u64,
        last_ping: Option<String>,
    },
    Event {
        event_name: String,
        starts_at: Option<String>,
    },
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(time: &str) -> Result<DateTime<Utc>, MenuError> {
    NaiveDateTime::parse_from_str(time, TIMESTAMP_FORMAT)
        .map(|time| time.and_utc())
        .map_err(|err| MenuError::InvalidRecord(format!("bad timestamp `{time}`: {err}")))
}

fn parse_optional_timestamp(time: &Option<String>) -> Result<Option<DateTime<Utc>>, MenuError> {
    time.as_deref().map(parse_timestamp).transpose()
}

fn snowflake(value: u64, what: &str) -> Result<u64, MenuError> {
    if value == 0 {
        return Err(MenuError::InvalidRecord(format!("{what} can't be 0")));
    }
    Ok(value)
}

impl KindRecord {
    fn from_kind(kind: &MenuKind) -> Result<Self, MenuError> {
        let record = match kind {
            MenuKind::Plain => KindRecord::Plain,
            MenuKind::Poll(poll) => KindRecord::Poll {
                end_time: poll.end_time.as_ref().map(format_timestamp),
                length: poll.length,
            },
            MenuKind::Role => KindRecord::Role,
            MenuKind::PingableRole(ping) => KindRecord::PingableRole {
                role_id: ping.role_id.get(),
                cooldown_seconds: ping.cooldown_seconds,
                last_ping: ping.last_ping.as_ref().map(format_timestamp),
            },
            MenuKind::Event(event) => KindRecord::Event {
                event_name: event.event_name.clone(),
                starts_at: event.starts_at.as_ref().map(format_timestamp),
            },
            MenuKind::Confirmation(_) => return Err(MenuError::NotSaveable),
        };
        Ok(record)
    }

    fn to_kind(&self) -> Result<MenuKind, MenuError> {
        let kind = match self {
            KindRecord::Plain => MenuKind::Plain,
            KindRecord::Poll { end_time, length } => MenuKind::Poll(PollState {
                end_time: parse_optional_timestamp(end_time)?,
                ..PollState::new(*length)
            }),
            KindRecord::Role => MenuKind::Role,
            KindRecord::PingableRole {
                role_id,
                cooldown_seconds,
                last_ping,
            } => MenuKind::PingableRole(PingState {
                role_id: RoleId::new(snowflake(*role_id, "role_id")?),
                cooldown_seconds: *cooldown_seconds,
                last_ping: parse_optional_timestamp(last_ping)?,
            }),
            KindRecord::Event {
                event_name,
                starts_at,
            } => MenuKind::Event(EventState {
                event_name: event_name.clone(),
                starts_at: parse_optional_timestamp(starts_at)?,
            }),
        };
        Ok(kind)
    }
}

impl Menu {
    /// Stored form of the menu. Only sent, saveable menus have one.
    pub fn to_record(&self) -> Result<MenuRecord, MenuError> {
        if !self.is_saveable() {
            return Err(MenuError::NotSaveable);
        }
        let handle = self.handle()?;
        let guild_id = self.guild_id.ok_or(MenuError::NotSent)?;

        Ok(MenuRecord {
            id: handle.message_id.get(),
            title: self.title.clone(),
            guild_id: guild_id.get(),
            channel_id: handle.channel_id.get(),
            options: self.options.to_dict(),
            enabled: self.enabled,
            show_ids: self.show_ids,
            kind: KindRecord::from_kind(&self.kind)?,
        })
    }

    pub fn to_json(&self) -> Result<String, MenuError> {
        Ok(serde_json::to_string(&self.to_record()?)?)
    }

    /// Rebuilds a menu from its stored form.
    ///
    /// The message is fetched again since title and description live there.
    /// Enabled menus go through disable and enable again so discord events reach them.
    pub async fn from_record(gateway: &dyn MessagingGateway, record: &MenuRecord) -> Result<Self, MenuError> {
        let message_id = MessageId::new(snowflake(record.id, "id")?);
        let handle = MessageHandle {
            channel_id: ChannelId::new(snowflake(record.channel_id, "channel_id")?),
            message_id,
        };
        let guild_id = GuildId::new(snowflake(record.guild_id, "guild_id")?);

        let live = gateway
            .fetch_message(handle)
            .await?
            .ok_or(MenuError::MenuMessageGone(message_id))?;
        let embed = live.embed.ok_or(MenuError::MenuMessageGone(message_id))?;

        let kind = record.kind.to_kind()?;
        let options = OptionTable::from_dict(&record.options, |option| {
            kind.behavior_for(&option.descriptor)
        })?;

        let title = embed
            .title
            .strip_suffix(DISABLED_SUFFIX)
            .unwrap_or(&embed.title)
            .to_string();
        let title = if title.is_empty() {
            record.title.clone()
        } else {
            title
        };

        let mut menu = Menu::with_kind(title, embed.description, kind);
        if let MenuKind::Poll(poll) = &mut menu.kind {
            poll.votes = options.keys().map(|key| (key.to_string(), 0)).collect();
        }
        menu.options = options;
        menu.id = Some(message_id);
        menu.guild_id = Some(guild_id);
        menu.channel_id = Some(handle.channel_id);
        menu.show_ids = record.show_ids;
        menu.colour = embed.colour;

        if record.enabled {
            menu.enabled = true;
            menu.disable(gateway).await?;
            menu.enable(gateway).await?;
        }

        Ok(menu)
    }

    pub async fn from_json(gateway: &dyn MessagingGateway, json: &str) -> Result<Self, MenuError> {
        let record: MenuRecord = serde_json::from_str(json)?;
        Self::from_record(gateway, &record).await
    }
}
