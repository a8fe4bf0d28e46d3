use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::menus::{
    ConfigStore, DispatchOutcome, Menu, MenuConfigRecord, MenuError, MessageHandle,
    MessagingGateway, ReactionEvent,
};

pub type SharedMenu = Arc<Mutex<Menu>>;

/// Every live menu, keyed by the id of its message.
///
/// Saveable menus are mirrored to the config store so they survive restarts.
pub struct MenuManager {
    gateway: Arc<dyn MessagingGateway>,
    store: Arc<dyn ConfigStore>,
    menus: RwLock<HashMap<MessageId, SharedMenu>>,
}

impl MenuManager {
    pub fn new(gateway: Arc<dyn MessagingGateway>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            gateway,
            store,
            menus: RwLock::new(HashMap::new()),
        }
    }

    pub fn gateway(&self) -> &dyn MessagingGateway {
        self.gateway.as_ref()
    }

    /// Sends a menu and starts tracking it.
    pub async fn send(
        &self,
        mut menu: Menu,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<MessageHandle, MenuError> {
        if let Err(err) = menu.send(self.gateway(), guild_id, channel_id).await {
            if let Ok(handle) = menu.handle() {
                self.discard(handle).await;
            }
            return Err(err);
        }

        let handle = menu.handle()?;
        if let Err(err) = self.add(menu).await {
            self.discard(handle).await;
            return Err(err);
        }
        Ok(handle)
    }

    /// Takes down a menu message nothing will track.
    async fn discard(&self, handle: MessageHandle) {
        self.gateway
            .unregister_reaction_listener(handle.message_id)
            .await;
        if let Err(err) = self.gateway.delete_message(handle).await {
            warn!(menu_id = %handle.message_id, "Couldn't delete untracked menu message: {err}");
        }
    }

    /// Starts tracking an already sent menu.
    ///
    /// Errors if the menu hasn't been sent or if another menu already uses the same message.
    pub async fn add(&self, menu: Menu) -> Result<SharedMenu, MenuError> {
        let id = menu.handle()?.message_id;

        let mut menus = self.menus.write().await;
        if menus.contains_key(&id) {
            return Err(MenuError::DuplicateMenuRegistration(id));
        }

        if menu.is_saveable() {
            self.store
                .create(MenuConfigRecord::new(id, menu.to_json()?))
                .await?;
        }

        let menu = Arc::new(Mutex::new(menu));
        menus.insert(id, menu.clone());
        debug!(menu_id = %id, "Registered menu.");
        Ok(menu)
    }

    pub async fn get(&self, id: MessageId) -> Option<SharedMenu> {
        self.menus.read().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: MessageId) -> bool {
        self.menus.read().await.contains_key(&id)
    }

    pub async fn ids(&self) -> Vec<MessageId> {
        self.menus.read().await.keys().copied().collect()
    }

    async fn snapshot(&self) -> Vec<SharedMenu> {
        self.menus.read().await.values().cloned().collect()
    }

    /// Writes the current state of an already locked menu to the config store.
    /// Unsaveable menus are skipped.
    pub async fn save(&self, menu: &Menu) -> Result<(), MenuError> {
        if !menu.is_saveable() || menu.is_deleted() {
            return Ok(());
        }
        let id = menu.handle()?.message_id;
        self.store
            .update(MenuConfigRecord::new(id, menu.to_json()?))
            .await
    }

    pub async fn update(&self, id: MessageId) -> Result<(), MenuError> {
        let menu = self.get(id).await.ok_or(MenuError::UnknownMenu(id))?;
        let menu = menu.lock().await;
        self.save(&menu).await
    }

    /// Deletes the menu's message and forgets about it.
    ///
    /// The menu stays registered if its message couldn't be deleted.
    pub async fn remove(&self, id: MessageId) -> Result<(), MenuError> {
        let menu = self.get(id).await.ok_or(MenuError::UnknownMenu(id))?;

        menu.lock().await.delete(self.gateway()).await?;
        self.forget(id).await;
        self.store.delete(id).await?;

        info!(menu_id = %id, "Removed menu.");
        Ok(())
    }

    /// Forgets about a menu without touching its message.
    async fn forget(&self, id: MessageId) {
        self.menus.write().await.remove(&id);
    }

    /// Runs whenever a user reacts to a message.
    pub async fn reaction_add_event(&self, event: &ReactionEvent) -> Result<DispatchOutcome, MenuError> {
        self.dispatch(event, true).await
    }

    /// Runs whenever a user unreacts to a message.
    pub async fn reaction_remove_event(&self, event: &ReactionEvent) -> Result<DispatchOutcome, MenuError> {
        self.dispatch(event, false).await
    }

    async fn dispatch(&self, event: &ReactionEvent, added: bool) -> Result<DispatchOutcome, MenuError> {
        let Some(menu) = self.get(event.message_id).await else {
            return Ok(DispatchOutcome::Ignored);
        };

        let mut menu = menu.lock().await;
        let outcome = if added {
            menu.dispatch_add(self.gateway(), event).await?
        } else {
            menu.dispatch_remove(self.gateway(), event).await?
        };

        if outcome == DispatchOutcome::Handled(true) {
            if is_finished(&menu) {
                drop(menu);
                self.forget(event.message_id).await;
                debug!(menu_id = %event.message_id, "Dropped finished menu.");
                return Ok(outcome);
            }
            self.save(&menu).await?;
        }

        Ok(outcome)
    }

    /// Rebuilds every stored menu. Records of menus whose message is gone are deleted.
    ///
    /// Returns how many menus were loaded.
    pub async fn load_all(&self) -> Result<usize, MenuError> {
        let records = self.store.list().await?;
        let mut loaded = 0;

        for record in records {
            let menu_id = record.menu_id;
            if menu_id != 0 && self.contains(MessageId::new(menu_id)).await {
                continue;
            }

            let menu = match Menu::from_json(self.gateway(), &record.serialized_menu_json).await {
                Ok(menu) => menu,
                Err(MenuError::MenuMessageGone(id)) => {
                    warn!(menu_id = %id, "Menu message no longer exists. Deleting its record.");
                    if let Err(err) = self.store.delete(id).await {
                        warn!(menu_id = %id, "Couldn't delete record of menu: {err}");
                    }
                    continue;
                }
                Err(err) => {
                    warn!(menu_id, "Couldn't load menu: {err}");
                    continue;
                }
            };

            let Ok(handle) = menu.handle() else {
                continue;
            };
            self.menus
                .write()
                .await
                .insert(handle.message_id, Arc::new(Mutex::new(menu)));
            loaded += 1;
        }

        info!("Loaded {loaded} menus.");
        Ok(loaded)
    }

    /// Starts the cooldown of every pingable role menu whose role got mentioned.
    pub async fn role_pinged(&self, guild_id: GuildId, roles: &[RoleId], now: DateTime<Utc>) -> usize {
        let mut pinged = 0;

        for menu in self.snapshot().await {
            let mut menu = menu.lock().await;
            let matches = menu.guild_id() == Some(guild_id)
                && menu
                    .ping_state()
                    .is_some_and(|ping| roles.contains(&ping.role_id));
            if !matches {
                continue;
            }

            match menu.mark_pinged(self.gateway(), now).await {
                Ok(true) => {
                    pinged += 1;
                    if let Err(err) = self.save(&menu).await {
                        warn!(menu_id = ?menu.id(), "Couldn't save pinged menu: {err}");
                    }
                }
                Ok(false) => {}
                Err(err) => warn!(menu_id = ?menu.id(), "Couldn't start ping cooldown: {err}"),
            }
        }

        pinged
    }

    /// Finishes expired polls, cancels unanswered confirmations and makes cooled down roles
    /// mentionable again.
    ///
    /// Returns how many menus changed.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let mut changed = 0;

        for shared in self.snapshot().await {
            let mut menu = shared.lock().await;

            let result = if menu.is_expired(now) {
                menu.finish_poll(self.gateway()).await
            } else if menu.is_timed_out(now) {
                menu.time_out(self.gateway()).await
            } else {
                menu.refresh_mentionable(self.gateway(), now).await
            };

            match result {
                Ok(true) => {
                    changed += 1;
                    if is_finished(&menu) {
                        let id = menu.id();
                        if let Some(id) = id {
                            drop(menu);
                            self.forget(id).await;
                            debug!(menu_id = %id, "Dropped finished menu.");
                        }
                        continue;
                    }
                    if let Err(err) = self.save(&menu).await {
                        warn!(menu_id = ?menu.id(), "Couldn't save menu: {err}");
                    }
                }
                Ok(false) => {}
                Err(err) => warn!(menu_id = ?menu.id(), "Couldn't update menu: {err}"),
            }
        }

        changed
    }
}

/// Deleted menus and resolved confirmations are done for good.
fn is_finished(menu: &Menu) -> bool {
    menu.is_deleted() || (!menu.is_saveable() && !menu.is_enabled())
}

/// Loop that controls the menu manager.
///
/// Controls things such as: ending polls and pingable role cooldowns.
pub fn menu_manager_loop(menu_manager: Arc<MenuManager>, tick_seconds: u64) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(tick_seconds.max(1))).await;
            let changed = menu_manager.tick(Utc::now()).await;
            if changed > 0 {
                debug!("Menu tick changed {changed} menus.");
            }
        }
    });
}
