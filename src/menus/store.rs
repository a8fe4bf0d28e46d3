use async_trait::async_trait;
use poise::serenity_prelude::MessageId;
use serde::{Deserialize, Serialize};

use super::error::MenuError;

/// One stored menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuConfigRecord {
    pub menu_id: u64,
    pub serialized_menu_json: String,
}

impl MenuConfigRecord {
    pub fn new(menu_id: MessageId, serialized_menu_json: String) -> Self {
        Self {
            menu_id: menu_id.get(),
            serialized_menu_json,
        }
    }
}

/// Where menus are kept between restarts.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, menu_id: MessageId) -> Result<Option<MenuConfigRecord>, MenuError>;

    async fn list(&self) -> Result<Vec<MenuConfigRecord>, MenuError>;

    async fn create(&self, record: MenuConfigRecord) -> Result<(), MenuError>;

    async fn update(&self, record: MenuConfigRecord) -> Result<(), MenuError>;

    /// Deleting a record that doesn't exist is not an error.
    async fn delete(&self, menu_id: MessageId) -> Result<(), MenuError>;
}
