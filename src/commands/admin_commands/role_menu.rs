use poise::serenity_prelude::Role;

use crate::{
    menus::{role::role_descriptor, Menu, MenuEmoji, MenuKind},
    utils::{find_guild_menu, reply},
    Context, Error,
};

/// Menus that give roles when reacting to them.
#[poise::command(
    slash_command,
    subcommands("create", "add", "remove"),
    subcommand_required,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn rolemenu(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Send an empty role menu to this channel.
#[poise::command(slash_command, required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS")]
pub async fn create(
    ctx: Context<'_>,
    #[max_length = 256]
    #[description = "Title of the menu."]
    title: String,
    #[max_length = 2000]
    #[description = "Text shown under the title."]
    description: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let menu = Menu::role(title, description.unwrap_or_default()).with_show_ids(data.config.show_ids);
    let handle = data
        .menu_manager
        .send(menu, guild_id, ctx.channel_id())
        .await?;

    reply(
        ctx,
        format!(
            "Created a role menu with the id `{}`.\nAdd roles with `/rolemenu add` and turn it on with `/menu enable`.",
            handle.message_id
        ),
        true,
    )
    .await
}

/// Add a role to a role menu.
#[poise::command(
    slash_command,
    required_bot_permissions = "MANAGE_ROLES | ADD_REACTIONS"
)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
    #[description = "The emoji to react with."] emoji: String,
    #[description = "Role to give."] role: Role,
) -> Result<(), Error> {
    let emoji = match MenuEmoji::from_string(&emoji) {
        Ok(emoji) => emoji,
        Err(err) => return reply(ctx, err.to_string(), true).await,
    };
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let manager = &ctx.data().menu_manager;

    let mut menu = menu.lock().await;
    if !matches!(menu.kind, MenuKind::Role) {
        reply(ctx, format!("That menu is a {}, not a role menu.", menu.kind.name()), true).await?;
        return Ok(());
    }

    if menu
        .options()
        .iter()
        .any(|option| option.descriptor == role_descriptor(role.id))
    {
        reply(ctx, format!("<@&{}> is already on this menu.", role.id), true).await?;
        return Ok(());
    }

    if !menu.add_role_option(emoji.clone(), role.id)? {
        reply(ctx, format!("This menu already has an option for {emoji}."), true).await?;
        return Ok(());
    }

    menu.refresh(manager.gateway()).await?;
    manager.save(&menu).await?;

    reply(ctx, format!("Reacting with {emoji} now gives <@&{}>.", role.id), true).await
}

/// Remove a role from a role menu.
#[poise::command(slash_command, required_bot_permissions = "MANAGE_MESSAGES")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
    #[description = "The emoji of the role to remove."] emoji: String,
) -> Result<(), Error> {
    let emoji = match MenuEmoji::from_string(&emoji) {
        Ok(emoji) => emoji,
        Err(err) => return reply(ctx, err.to_string(), true).await,
    };
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let manager = &ctx.data().menu_manager;

    let mut menu = menu.lock().await;
    if !matches!(menu.kind, MenuKind::Role) {
        reply(ctx, format!("That menu is a {}, not a role menu.", menu.kind.name()), true).await?;
        return Ok(());
    }

    if !menu.remove_option(&emoji)? {
        reply(ctx, format!("This menu doesn't have {emoji}."), true).await?;
        return Ok(());
    }

    // clears the reactions of the removed emoji
    if menu.is_enabled() {
        menu.disable(manager.gateway()).await?;
        menu.enable(manager.gateway()).await?;
    } else {
        menu.refresh(manager.gateway()).await?;
    }
    manager.save(&menu).await?;

    reply(ctx, format!("Removed {emoji} from **{}**.", menu.title), true).await
}
