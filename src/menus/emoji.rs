use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    iter::Peekable,
};

use lazy_static::lazy_static;
use poise::serenity_prelude::{EmojiId, ReactionType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::MenuError;

lazy_static! {
    static ref CUSTOM_EMOJI: Regex = Regex::new(r"^<(a?):([A-Za-z0-9_~]{1,32}):(\d{1,20})>$").unwrap();
}

/// An emoji the way menus see it.
///
/// Custom emojis are keyed by their snowflake, unicode emojis by the emoji itself.
/// Two `MenuEmoji`s are equal when their keys are equal, names and animation flags are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEmoji {
    pub name: String,
    pub id: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl MenuEmoji {
    /// Builds an emoji from user input. Accepts unicode emojis and `<:name:id>` / `<a:name:id>`.
    pub fn from_string(string: &str) -> Result<Self, MenuError> {
        let trimmed = string.trim();

        if is_unicode_emoji(trimmed) {
            return Ok(Self {
                name: trimmed.to_string(),
                id: None,
                animated: false,
            });
        }

        let Some(captures) = CUSTOM_EMOJI.captures(trimmed) else {
            return Err(MenuError::InvalidEmojiFormat(string.to_string()));
        };

        let id = &captures[3];
        // discord snowflakes are never 0 and must fit a u64.
        match id.parse::<u64>() {
            Ok(parsed) if parsed != 0 => {}
            _ => return Err(MenuError::InvalidEmojiFormat(string.to_string())),
        }

        Ok(Self {
            name: captures[2].to_string(),
            id: Some(id.to_string()),
            animated: !captures[1].is_empty(),
        })
    }

    /// Skips validation, only use with known emojis.
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            animated: false,
        }
    }

    pub fn from_reaction(reaction: &ReactionType) -> Self {
        match reaction {
            ReactionType::Custom { animated, id, name } => Self {
                name: name.clone().unwrap_or_default(),
                id: Some(id.get().to_string()),
                animated: *animated,
            },
            ReactionType::Unicode(name) => Self {
                name: name.clone(),
                id: None,
                animated: false,
            },
            _ => Self {
                name: reaction.as_data(),
                id: None,
                animated: false,
            },
        }
    }

    pub fn from_dict(value: &Value) -> Result<Self, MenuError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_dict(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "id": self.id,
            "animated": self.animated,
        })
    }

    /// The key options are stored under.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    pub fn is_custom(&self) -> bool {
        self.id.is_some()
    }

    pub fn to_reaction_type(&self) -> Result<ReactionType, MenuError> {
        let Some(id) = &self.id else {
            return Ok(ReactionType::Unicode(self.name.clone()));
        };

        let parsed = id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| MenuError::InvalidEmojiFormat(id.clone()))?;

        Ok(ReactionType::Custom {
            animated: self.animated,
            id: EmojiId::new(parsed),
            name: Some(self.name.clone()),
        })
    }
}

impl PartialEq for MenuEmoji {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MenuEmoji {}

impl Hash for MenuEmoji {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl Display for MenuEmoji {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) if self.animated => write!(f, "<a:{}:{id}>", self.name),
            Some(id) => write!(f, "<:{}:{id}>", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl TryFrom<&str> for MenuEmoji {
    type Error = MenuError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_string(value)
    }
}

impl From<&ReactionType> for MenuEmoji {
    fn from(value: &ReactionType) -> Self {
        Self::from_reaction(value)
    }
}

const ZERO_WIDTH_JOINER: u32 = 0x200D;
const KEYCAP: u32 = 0x20E3;
const EMOJI_PRESENTATION: u32 = 0xFE0F;

/// Checks if a string is a single unicode emoji sequence.
///
/// Handles skin tones, zero width joiner sequences, flags, keycaps and tag sequences.
/// Two emojis next to each other are not one emoji.
pub fn is_unicode_emoji(string: &str) -> bool {
    let mut codes = string.chars().map(|c| c as u32).peekable();

    loop {
        if !take_emoji_element(&mut codes) {
            return false;
        }
        match codes.next() {
            None => return true,
            Some(ZERO_WIDTH_JOINER) => continue,
            Some(_) => return false,
        }
    }
}

/// Consumes one base emoji and whatever modifies it.
fn take_emoji_element(codes: &mut Peekable<impl Iterator<Item = u32>>) -> bool {
    let Some(base) = codes.next() else {
        return false;
    };

    if is_regional_indicator(base) {
        // flags are exactly two regional indicators
        if !codes.next().is_some_and(is_regional_indicator) {
            return false;
        }
    } else if is_keycap_base(base) {
        codes.next_if_eq(&EMOJI_PRESENTATION);
        return codes.next() == Some(KEYCAP);
    } else if !is_pictographic(base) || is_skin_tone(base) {
        return false;
    }

    while codes.next_if(|code| is_modifier(*code)).is_some() {}
    true
}

fn is_regional_indicator(code: u32) -> bool {
    matches!(code, 0x1F1E6..=0x1F1FF)
}

fn is_skin_tone(code: u32) -> bool {
    matches!(code, 0x1F3FB..=0x1F3FF)
}

fn is_keycap_base(code: u32) -> bool {
    matches!(char::from_u32(code), Some('0'..='9' | '#' | '*'))
}

fn is_pictographic(code: u32) -> bool {
    matches!(
        code,
        0x1F000..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2300..=0x23FF
            | 0x2B00..=0x2BFF
            | 0x2190..=0x21FF
            | 0x25A0..=0x25FF
            | 0x2934..=0x2935
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x00A9
            | 0x00AE
            | 0x203C
            | 0x2049
            | 0x2122
            | 0x2139
            | 0x24C2
    )
}

fn is_modifier(code: u32) -> bool {
    is_skin_tone(code) || matches!(code, 0xFE0E | EMOJI_PRESENTATION | 0xE0020..=0xE007F)
}
