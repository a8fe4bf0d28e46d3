use std::{fs, io::ErrorKind};

use serde::Deserialize;
use tracing::info;

use crate::Error;

pub const DISCORD_TOKEN_PATH: &str = "./token";
pub const SURREALDB_SIGNIN_INFO_PATH: &str = "./surrealdb_signin.json";
pub const MENU_CONFIG_PATH: &str = "./menu_config.json";

pub fn get_discord_token() -> Result<String, Error> {
    let token = fs::read_to_string(DISCORD_TOKEN_PATH)
        .map_err(|err| format!("Cannot read token file '{DISCORD_TOKEN_PATH}'. {err}"))?;
    Ok(token.trim().to_string())
}

#[derive(Debug, Deserialize)]
pub struct SurrealDbSignInInfo {
    pub address: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

pub fn get_surreal_signin_info() -> Result<SurrealDbSignInInfo, Error> {
    let json_data = fs::read_to_string(SURREALDB_SIGNIN_INFO_PATH)
        .map_err(|err| format!("Cannot find {SURREALDB_SIGNIN_INFO_PATH}. {err}"))?;
    let info = serde_json::from_str(&json_data)
        .map_err(|err| format!("Cannot deserialize {SURREALDB_SIGNIN_INFO_PATH}. {err}"))?;
    Ok(info)
}

fn default_poll_length() -> u64 {
    86400
}

fn default_true() -> bool {
    true
}

fn default_tick_seconds() -> u64 {
    1
}

fn default_confirmation_timeout() -> u64 {
    300
}

/// Settings for menus created through commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MenuConfig {
    /// Seconds a poll stays open when no length is given.
    #[serde(default = "default_poll_length")]
    pub default_poll_length: u64,
    #[serde(default = "default_true")]
    pub show_ids: bool,
    /// Disable confirmations once someone answered.
    #[serde(default = "default_true")]
    pub disable_confirmation_after_resolution: bool,
    #[serde(default)]
    pub delete_confirmation_after_resolution: bool,
    /// Seconds a confirmation waits for an answer before cancelling itself.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout: u64,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            default_poll_length: default_poll_length(),
            show_ids: true,
            disable_confirmation_after_resolution: true,
            delete_confirmation_after_resolution: false,
            confirmation_timeout: default_confirmation_timeout(),
            tick_seconds: default_tick_seconds(),
        }
    }
}

impl MenuConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Reads `./menu_config.json`, falling back to defaults if the file doesn't exist.
pub fn get_menu_config() -> Result<MenuConfig, Error> {
    match fs::read_to_string(MENU_CONFIG_PATH) {
        Ok(json) => MenuConfig::from_json(&json)
            .map_err(|err| format!("Cannot deserialize {MENU_CONFIG_PATH}. {err}").into()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("No {MENU_CONFIG_PATH} found. Using default menu settings.");
            Ok(MenuConfig::default())
        }
        Err(err) => Err(format!("Cannot read {MENU_CONFIG_PATH}. {err}").into()),
    }
}
