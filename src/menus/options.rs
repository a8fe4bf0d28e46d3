use std::collections::BTreeMap;

use poise::serenity_prelude::{ReactionType, RoleId};
use serde::{Deserialize, Serialize};

use super::{emoji::MenuEmoji, error::MenuError};

/// What happens when someone reacts with an option's emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionBehavior {
    /// Gives the role on react and takes it away on unreact.
    RoleGrant { role_id: RoleId },
    /// Counts towards a poll.
    Vote,
    /// Only there to be looked at.
    Dummy,
    Confirm,
    Cancel,
}

impl OptionBehavior {
    /// Confirm and cancel options are bound to callbacks that only live in memory.
    pub fn is_saveable(&self) -> bool {
        !matches!(self, OptionBehavior::Confirm | OptionBehavior::Cancel)
    }
}

#[derive(Debug, Clone)]
pub struct MenuOption {
    pub emoji: MenuEmoji,
    pub descriptor: String,
    pub behavior: OptionBehavior,
}

/// Stored form of an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub emoji: MenuEmoji,
    pub descriptor: String,
}

/// Anything an option can be looked up by.
pub enum EmojiLookup<'a> {
    Emoji(&'a MenuEmoji),
    Reaction(&'a ReactionType),
    Raw(&'a str),
}

impl<'a> From<&'a MenuEmoji> for EmojiLookup<'a> {
    fn from(value: &'a MenuEmoji) -> Self {
        EmojiLookup::Emoji(value)
    }
}

impl<'a> From<&'a ReactionType> for EmojiLookup<'a> {
    fn from(value: &'a ReactionType) -> Self {
        EmojiLookup::Reaction(value)
    }
}

impl<'a> From<&'a str> for EmojiLookup<'a> {
    fn from(value: &'a str) -> Self {
        EmojiLookup::Raw(value)
    }
}

impl EmojiLookup<'_> {
    fn key(&self) -> Option<String> {
        match self {
            EmojiLookup::Emoji(emoji) => Some(emoji.key().to_string()),
            EmojiLookup::Reaction(reaction) => Some(MenuEmoji::from_reaction(reaction).key().to_string()),
            EmojiLookup::Raw(raw) => MenuEmoji::from_string(raw)
                .ok()
                .map(|emoji| emoji.key().to_string()),
        }
    }
}

/// Options of a menu. Keys are unique, order only matters for rendering.
#[derive(Debug, Clone, Default)]
pub struct OptionTable {
    options: Vec<MenuOption>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false without touching the table if the emoji is already used.
    pub fn add(&mut self, emoji: MenuEmoji, descriptor: impl Into<String>, behavior: OptionBehavior) -> bool {
        if self.contains(&emoji) {
            return false;
        }

        self.options.push(MenuOption {
            emoji,
            descriptor: descriptor.into(),
            behavior,
        });
        true
    }

    /// Adds everything it can. Returns the entries that were already in the table.
    pub fn add_many(
        &mut self,
        entries: impl IntoIterator<Item = (MenuEmoji, String, OptionBehavior)>,
    ) -> Vec<(MenuEmoji, String)> {
        let mut failed = vec![];

        for (emoji, descriptor, behavior) in entries {
            if self.contains(&emoji) {
                failed.push((emoji, descriptor));
                continue;
            }
            self.add(emoji, descriptor, behavior);
        }

        failed
    }

    pub fn remove(&mut self, emoji: &MenuEmoji) -> bool {
        let before = self.options.len();
        self.options.retain(|option| option.emoji != *emoji);
        before != self.options.len()
    }

    pub fn lookup<'a>(&self, emoji: impl Into<EmojiLookup<'a>>) -> Option<&MenuOption> {
        let key = emoji.into().key()?;
        self.options.iter().find(|option| option.emoji.key() == key)
    }

    pub fn contains(&self, emoji: &MenuEmoji) -> bool {
        self.options.iter().any(|option| option.emoji == *emoji)
    }

    pub fn set_descriptor(&mut self, emoji: &MenuEmoji, descriptor: impl Into<String>) -> bool {
        let Some(option) = self.options.iter_mut().find(|option| option.emoji == *emoji) else {
            return false;
        };
        option.descriptor = descriptor.into();
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &MenuOption> {
        self.options.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|option| option.emoji.key())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn is_saveable(&self) -> bool {
        self.options.iter().all(|option| option.behavior.is_saveable())
    }

    pub fn to_dict(&self) -> BTreeMap<String, OptionRecord> {
        self.options
            .iter()
            .map(|option| {
                (
                    option.emoji.key().to_string(),
                    OptionRecord {
                        emoji: option.emoji.clone(),
                        descriptor: option.descriptor.clone(),
                    },
                )
            })
            .collect()
    }

    /// Rebuilds a table from its stored form. `behavior` decides what each option does.
    pub fn from_dict(
        dict: &BTreeMap<String, OptionRecord>,
        behavior: impl Fn(&OptionRecord) -> Result<OptionBehavior, MenuError>,
    ) -> Result<Self, MenuError> {
        let mut table = Self::new();

        for (key, record) in dict {
            if record.emoji.key() != key {
                return Err(MenuError::InvalidRecord(format!(
                    "option stored under {key} has the emoji {}",
                    record.emoji.key()
                )));
            }

            let behavior = behavior(record)?;
            if !table.add(record.emoji.clone(), record.descriptor.clone(), behavior) {
                return Err(MenuError::DuplicateOption(key.clone()));
            }
        }

        Ok(table)
    }
}
