use crate::{
    menus::{Menu, MenuKind},
    utils::{find_guild_menu, parse_option, reply},
    Context, Error,
};

/// Polls members vote on by reacting.
#[poise::command(
    slash_command,
    subcommands("create", "end"),
    subcommand_required,
    guild_only,
    default_member_permissions = "MANAGE_MESSAGES"
)]
pub async fn poll(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start a poll in this channel. Options look like `👍 Sounds good`.
#[poise::command(
    slash_command,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS | ADD_REACTIONS | MANAGE_MESSAGES"
)]
#[allow(clippy::too_many_arguments)]
pub async fn create(
    ctx: Context<'_>,
    #[max_length = 256]
    #[description = "What to vote on."]
    question: String,
    #[description = "First option."] option1: String,
    #[description = "Second option."] option2: String,
    #[description = "Third option."] option3: Option<String>,
    #[description = "Fourth option."] option4: Option<String>,
    #[description = "Fifth option."] option5: Option<String>,
    #[description = "Minutes until the poll ends."] minutes: Option<u64>,
    #[max_length = 2000]
    #[description = "Text shown under the question."]
    description: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let length = minutes
        .map(|minutes| minutes.saturating_mul(60))
        .unwrap_or(data.config.default_poll_length);

    let mut menu = Menu::poll(question, description.unwrap_or_default(), length)
        .with_show_ids(data.config.show_ids)
        .with_auto_enable(true);

    let options = [Some(option1), Some(option2), option3, option4, option5];
    for option in options.into_iter().flatten() {
        let (emoji, label) = match parse_option(&option) {
            Ok(parsed) => parsed,
            Err(err) => return reply(ctx, err.to_string(), true).await,
        };
        if !menu.add_option(emoji.clone(), label)? {
            return reply(ctx, format!("{emoji} is used by more than one option."), true).await;
        }
    }

    let handle = data
        .menu_manager
        .send(menu, guild_id, ctx.channel_id())
        .await?;

    reply(
        ctx,
        format!("Started a poll with the id `{}`.", handle.message_id),
        true,
    )
    .await
}

/// End a poll early and post its results.
#[poise::command(slash_command, required_bot_permissions = "SEND_MESSAGES | MANAGE_MESSAGES")]
pub async fn end(
    ctx: Context<'_>,
    #[description = "ID of the poll."] poll_id: String,
) -> Result<(), Error> {
    let Some(menu) = find_guild_menu(ctx, &poll_id).await? else {
        return Ok(());
    };
    let manager = &ctx.data().menu_manager;

    let mut menu = menu.lock().await;
    if !matches!(menu.kind, MenuKind::Poll(_)) {
        reply(ctx, format!("That menu is a {}, not a poll.", menu.kind.name()), true).await?;
        return Ok(());
    }

    if !menu.finish_poll(manager.gateway()).await? {
        reply(ctx, "That poll isn't running.", true).await?;
        return Ok(());
    }
    manager.save(&menu).await?;

    reply(ctx, format!("Ended **{}**.", menu.title), true).await
}
