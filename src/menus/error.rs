use poise::serenity_prelude::MessageId;

/// Errors produced by the reaction menu engine.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("`{0}` isn't a valid emoji.")]
    InvalidEmojiFormat(String),

    #[error("This menu already has an option for {0}.")]
    DuplicateOption(String),

    #[error("The message of menu {0} no longer exists.")]
    MenuMessageGone(MessageId),

    #[error("A menu is already registered for message {0}.")]
    DuplicateMenuRegistration(MessageId),

    #[error("There's no menu with the id {0}.")]
    UnknownMenu(MessageId),

    #[error("This menu hasn't been sent yet.")]
    NotSent,

    #[error("This menu has already been sent.")]
    AlreadySent,

    #[error("This menu has been deleted.")]
    Deleted,

    #[error("This menu can't be saved.")]
    NotSaveable,

    #[error("The {0} option can't be removed from this menu.")]
    FixedOption(String),

    #[error("Stored menu is invalid: {0}")]
    InvalidRecord(String),

    #[error("Discord request failed: {0}")]
    Gateway(String),

    #[error("serenity error: {0}")]
    Serenity(#[from] poise::serenity_prelude::Error),

    #[error("Config store failed: {0}")]
    Store(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
