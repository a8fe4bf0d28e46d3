//! Reaction menus: messages whose reactions do things.

pub mod confirm;
pub mod emoji;
pub mod error;
pub mod gateway;
pub mod menu;
pub mod options;
pub mod poll;
pub mod record;
pub mod role;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use emoji::MenuEmoji;
pub use error::MenuError;
pub use gateway::{MessageHandle, MessagingGateway, SerenityGateway};
pub use menu::{DispatchOutcome, Menu, MenuKind, ReactionEvent};
pub use store::{ConfigStore, MenuConfigRecord};
