use poise::serenity_prelude::Role;

use crate::{
    menus::{Menu, MenuEmoji},
    utils::reply,
    Context, Error,
};

/// Roles members can sign up for and ping.
#[poise::command(
    slash_command,
    subcommands("create"),
    subcommand_required,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn pingrole(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Send a menu for signing up to a pingable role.
///
/// After each ping the role can't be mentioned until the cooldown is over.
#[poise::command(
    slash_command,
    required_bot_permissions = "MANAGE_ROLES | ADD_REACTIONS | SEND_MESSAGES"
)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The role to hand out and ping."] role: Role,
    #[description = "The emoji to react with."] emoji: String,
    #[description = "Seconds between pings. (Default: 3600)"] cooldown: Option<u64>,
    #[max_length = 256]
    #[description = "Title of the menu. (Default: the role's name)"]
    title: Option<String>,
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
    let data = ctx.data();

    let menu = Menu::pingable_role(
        title.unwrap_or_else(|| role.name.clone()),
        description.unwrap_or_default(),
        emoji,
        role.id,
        cooldown.unwrap_or(3600),
    )?
    .with_show_ids(data.config.show_ids)
    .with_auto_enable(true);

    let handle = data
        .menu_manager
        .send(menu, guild_id, ctx.channel_id())
        .await?;

    reply(
        ctx,
        format!("Created a pingable role menu for <@&{}> with the id `{}`.", role.id, handle.message_id),
        true,
    )
    .await
}
