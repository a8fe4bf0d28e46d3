use chrono::{DateTime, Duration, Utc};

use crate::{
    menus::{confirm::callback, Menu, MenuKind},
    utils::{find_guild_menu, reply},
    Context, Error,
};

/// Manage reaction menus.
#[poise::command(
    slash_command,
    subcommands("enable", "disable", "toggle", "delete", "info"),
    subcommand_required,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn menu(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start reacting to a menu.
#[poise::command(
    slash_command,
    required_bot_permissions = "MANAGE_MESSAGES | ADD_REACTIONS"
)]
pub async fn enable(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
) -> Result<(), Error> {
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let manager = &ctx.data().menu_manager;

    let mut menu = menu.lock().await;
    if !menu.enable(manager.gateway()).await? {
        reply(ctx, "This menu is already enabled.", true).await?;
        return Ok(());
    }
    manager.save(&menu).await?;

    reply(ctx, format!("Enabled **{}**.", menu.title), true).await
}

/// Stop reacting to a menu. Polls lose their votes.
#[poise::command(slash_command, required_bot_permissions = "MANAGE_MESSAGES")]
pub async fn disable(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
) -> Result<(), Error> {
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let manager = &ctx.data().menu_manager;

    let mut menu = menu.lock().await;
    if !menu.disable(manager.gateway()).await? {
        reply(ctx, "This menu is already disabled.", true).await?;
        return Ok(());
    }
    manager.save(&menu).await?;

    reply(ctx, format!("Disabled **{}**.", menu.title), true).await
}

/// Enable a disabled menu or disable an enabled one.
#[poise::command(
    slash_command,
    required_bot_permissions = "MANAGE_MESSAGES | ADD_REACTIONS"
)]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
) -> Result<(), Error> {
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let manager = &ctx.data().menu_manager;

    let mut menu = menu.lock().await;
    let enabled = menu.toggle(manager.gateway()).await?;
    manager.save(&menu).await?;

    let state = if enabled { "Enabled" } else { "Disabled" };
    reply(ctx, format!("{state} **{}**.", menu.title), true).await
}

/// Delete a menu and its message.
#[poise::command(
    slash_command,
    required_bot_permissions = "MANAGE_MESSAGES | ADD_REACTIONS"
)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
) -> Result<(), Error> {
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let (id, title) = {
        let menu = menu.lock().await;
        if matches!(menu.kind, MenuKind::Confirmation(_)) {
            reply(ctx, "Confirmations go away on their own.", true).await?;
            return Ok(());
        }
        (menu.handle()?.message_id, menu.title.clone())
    };

    let data = ctx.data();
    let config = &data.config;
    let manager = data.menu_manager.clone();

    let expires_at = i64::try_from(config.confirmation_timeout)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|timeout| Utc::now().checked_add_signed(timeout))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let confirm = callback(move || async move { manager.remove(id).await });
    let confirmation = Menu::confirmation(
        format!("Delete \"{title}\"?"),
        "React with ✅ to delete the menu or ❌ to keep it.",
        Some(confirm),
        None,
    )
    .with_target_user(ctx.author().id)
    .with_resolution(
        config.delete_confirmation_after_resolution,
        config.disable_confirmation_after_resolution,
    )
    .with_expiry(expires_at);

    data.menu_manager
        .send(confirmation, guild_id, ctx.channel_id())
        .await?;

    reply(ctx, "Answer the confirmation to delete the menu.", true).await
}

/// Show what a menu is.
#[poise::command(slash_command)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "ID of the menu."] menu_id: String,
) -> Result<(), Error> {
    let Some(menu) = find_guild_menu(ctx, &menu_id).await? else {
        return Ok(());
    };
    let menu = menu.lock().await;

    let mut lines = vec![
        format!("**{}** ({})", menu.title, menu.kind.name()),
        format!("Enabled: {}", menu.is_enabled()),
    ];
    if let Some(channel_id) = menu.channel_id() {
        lines.push(format!("Channel: <#{channel_id}>"));
    }
    if let Some(poll) = menu.poll_state() {
        lines.push(format!("Total votes: {}", poll.total_votes));
        if let Some(end_time) = poll.end_time {
            lines.push(format!("Ends: <t:{}:R>", end_time.timestamp()));
        }
    }
    if let Some(ping) = menu.ping_state() {
        lines.push(format!("Ping cooldown: {} seconds", ping.cooldown_seconds));
    }

    lines.push(format!("Options ({}):", menu.options().len()));
    for option in menu.options().iter() {
        lines.push(format!("{} {}", option.emoji, option.descriptor));
    }

    reply(ctx, lines.join("\n"), true).await
}
