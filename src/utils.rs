use poise::{
    serenity_prelude::{CreateAllowedMentions, MessageId},
    CreateReply,
};

use crate::{
    managers::menu_manager::SharedMenu,
    menus::{MenuEmoji, MenuError},
    Context, Error,
};

/// Replies without pinging any of the roles mentioned in `text`.
pub async fn reply(ctx: Context<'_>, text: impl Into<String>, ephemeral: bool) -> Result<(), Error> {
    ctx.send(
        CreateReply::default()
            .content(text)
            .ephemeral(ephemeral)
            .allowed_mentions(CreateAllowedMentions::new()),
    )
    .await?;
    Ok(())
}

/// Message ids are too big for discord's integer options, so they come in as text.
pub fn parse_menu_id(menu_id: &str) -> Option<MessageId> {
    match menu_id.trim().parse::<u64>() {
        Ok(id) if id != 0 => Some(MessageId::new(id)),
        _ => None,
    }
}

/// Splits `"👍 Sounds good"` into the emoji and the label.
pub fn parse_option(option: &str) -> Result<(MenuEmoji, String), MenuError> {
    let option = option.trim();
    let (emoji, label) = option.split_once(char::is_whitespace).unwrap_or((option, ""));

    let emoji = MenuEmoji::from_string(emoji)?;
    let label = label.trim();
    let label = if label.is_empty() {
        emoji.to_string()
    } else {
        label.to_string()
    };

    Ok((emoji, label))
}

/// Finds a menu belonging to the guild the command was used in.
///
/// Replies and returns `None` if there isn't one.
pub async fn find_guild_menu(ctx: Context<'_>, menu_id: &str) -> Result<Option<SharedMenu>, Error> {
    let Some(id) = parse_menu_id(menu_id) else {
        reply(ctx, format!("`{menu_id}` isn't a valid menu id."), true).await?;
        return Ok(None);
    };

    let Some(menu) = ctx.data().menu_manager.get(id).await else {
        reply(ctx, format!("There's no menu with the id `{id}`."), true).await?;
        return Ok(None);
    };

    let guild_id = menu.lock().await.guild_id();
    if guild_id.is_none() || guild_id != ctx.guild_id() {
        reply(ctx, "That menu belongs to another server.", true).await?;
        return Ok(None);
    }

    Ok(Some(menu))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_ids() {
        assert_eq!(parse_menu_id(" 1234 "), Some(MessageId::new(1234)));
        assert_eq!(parse_menu_id("0"), None);
        assert_eq!(parse_menu_id("menu"), None);
    }

    #[test]
    fn options() {
        let (emoji, label) = parse_option("👍  Sounds good ").unwrap();
        assert_eq!(emoji.key(), "👍");
        assert_eq!(label, "Sounds good");

        let (emoji, label) = parse_option("<:cheese:42>").unwrap();
        assert_eq!(emoji.key(), "42");
        assert_eq!(label, "<:cheese:42>");

        assert!(matches!(
            parse_option("yes please"),
            Err(MenuError::InvalidEmojiFormat(_))
        ));
    }
}
