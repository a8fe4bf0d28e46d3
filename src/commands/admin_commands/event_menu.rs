use chrono::DateTime;
use poise::serenity_prelude::Role;

use crate::{
    menus::{Menu, MenuEmoji},
    utils::reply,
    Context, Error,
};

/// Sign up menus for events.
#[poise::command(
    slash_command,
    subcommands("create"),
    subcommand_required,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn eventmenu(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Send a menu that gives everyone signing up for an event a role.
#[poise::command(
    slash_command,
    required_bot_permissions = "MANAGE_ROLES | ADD_REACTIONS | SEND_MESSAGES"
)]
pub async fn create(
    ctx: Context<'_>,
    #[max_length = 256]
    #[description = "Name of the event."]
    name: String,
    #[description = "The role given to attendees."] role: Role,
    #[description = "The emoji to react with."] emoji: String,
    #[description = "Unix timestamp of when the event starts."] starts_at: Option<i64>,
    #[max_length = 2000]
    #[description = "Text shown under the title."]
    description: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let emoji = match MenuEmoji::from_string(&emoji) {
        Ok(emoji) => emoji,
        Err(err) => return reply(ctx, err.to_string(), true).await,
    };

    let starts_at = match starts_at {
        Some(timestamp) => match DateTime::from_timestamp(timestamp, 0) {
            Some(starts_at) => Some(starts_at),
            None => return reply(ctx, format!("`{timestamp}` isn't a valid timestamp."), true).await,
        },
        None => None,
    };

    let data = ctx.data();
    let menu = Menu::event(name, description.unwrap_or_default(), emoji, role.id, starts_at)?
        .with_show_ids(data.config.show_ids)
        .with_auto_enable(true);

    let handle = data
        .menu_manager
        .send(menu, guild_id, ctx.channel_id())
        .await?;

    reply(
        ctx,
        format!("Created an event menu with the id `{}`.", handle.message_id),
        true,
    )
    .await
}
