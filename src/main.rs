mod commands;
mod managers;
mod menus;
mod tokens;
mod utils;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Utc;
use managers::menu_manager::{menu_manager_loop, MenuManager};
use menus::{ReactionEvent, SerenityGateway};
use poise::serenity_prelude::{self as serenity, FullEvent};
use tokens::MenuConfig;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub struct Data {
    started_loops: AtomicBool,
    menu_manager: Arc<MenuManager>,
    config: MenuConfig,
} // User data, which is stored and accessible in all command invocations
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

async fn reaction_event(data: &Data, reaction: &serenity::Reaction, added: bool) {
    let manager = &data.menu_manager;
    if !manager.gateway().is_listening(reaction.message_id).await {
        return;
    }

    let Some(event) = ReactionEvent::from_reaction(reaction) else {
        debug!(message_id = %reaction.message_id, "Couldn't get the UserId from a reaction.");
        return;
    };

    let result = if added {
        manager.reaction_add_event(&event).await
    } else {
        manager.reaction_remove_event(&event).await
    };

    if let Err(err) = result {
        warn!(menu_id = %reaction.message_id, "Couldn't handle reaction: {err}");
    }
}

async fn event_handler(
    _ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.tag());
        }
        FullEvent::CacheReady { .. } => {
            if !data.started_loops.swap(true, Ordering::Relaxed) {
                info!("Caches are ready! Loading menus.");
                if let Err(err) = data.menu_manager.load_all().await {
                    error!("Couldn't load menus: {err}");
                }
                menu_manager_loop(data.menu_manager.clone(), data.config.tick_seconds);
            }
        }
        FullEvent::Message { new_message } => {
            let Some(guild_id) = new_message.guild_id else {
                return Ok(());
            };
            if new_message.mention_roles.is_empty() {
                return Ok(());
            }
            data.menu_manager
                .role_pinged(guild_id, &new_message.mention_roles, Utc::now())
                .await;
        }
        FullEvent::ReactionAdd { add_reaction } => {
            reaction_event(data, add_reaction, true).await;
        }
        FullEvent::ReactionRemove { removed_reaction } => {
            reaction_event(data, removed_reaction, false).await;
        }
        _ => {}
    }
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            warn!(command = %ctx.command().qualified_name, "Command failed: {error}");
            if let Err(err) = utils::reply(ctx, error.to_string(), true).await {
                error!("Couldn't tell the user about an error: {err}");
            }
        }
        error => {
            if let Err(err) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {err}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting bot...");

    let token = tokens::get_discord_token()?;
    let config = tokens::get_menu_config()?;
    let db = Arc::new(managers::db::new_db()?);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::get_commands(),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Registering commands...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let gateway = Arc::new(SerenityGateway::new(ctx.http.clone(), ready.user.id));
                Ok(Data {
                    menu_manager: Arc::new(MenuManager::new(gateway, db)),
                    started_loops: AtomicBool::new(false),
                    config,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}
