use std::{fmt::Debug, future::Future};

use chrono::{DateTime, Utc};
use poise::{serenity_prelude::UserId, BoxFuture};
use tracing::warn;

use super::{
    emoji::MenuEmoji,
    error::MenuError,
    gateway::{MenuEmbed, MessagingGateway},
    menu::{Menu, MenuKind},
    options::OptionBehavior,
};

pub const CONFIRM_EMOJI: &str = "✅";
pub const CANCEL_EMOJI: &str = "❌";
const CONFIRMED_COLOUR: u32 = 0x2ECC71;
const CANCELLED_COLOUR: u32 = 0xE74C3C;

/// Runs once when a confirmation resolves.
pub type MenuCallback = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), MenuError>> + Send + Sync>;

/// Boxes an async closure into a [`MenuCallback`].
pub fn callback<F, Fut>(f: F) -> MenuCallback
where
    F: FnOnce() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), MenuError>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

pub struct ConfirmState {
    confirm: Option<MenuCallback>,
    cancel: Option<MenuCallback>,
    pub was_confirmed: Option<bool>,
    pub resolved_by: Option<UserId>,
    /// Only this user can resolve the confirmation.
    pub target_user: Option<UserId>,
    pub delete_after_resolution: bool,
    pub disable_on_resolution: bool,
    /// Unanswered confirmations cancel themselves after this.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Debug for ConfirmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmState")
            .field("was_confirmed", &self.was_confirmed)
            .field("resolved_by", &self.resolved_by)
            .field("target_user", &self.target_user)
            .field("delete_after_resolution", &self.delete_after_resolution)
            .field("disable_on_resolution", &self.disable_on_resolution)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl ConfirmState {
    /// Returns true if it changed the title itself.
    pub(super) fn decorate(&self, embed: &mut MenuEmbed) -> bool {
        match self.was_confirmed {
            Some(true) => {
                embed.title.push_str(" - Confirmed");
                embed.colour = CONFIRMED_COLOUR;
                true
            }
            Some(false) => {
                embed.title.push_str(" - Cancelled");
                embed.colour = CANCELLED_COLOUR;
                true
            }
            None => false,
        }
    }
}

impl Menu {
    /// A ✅ / ❌ prompt. Confirmations are enabled as soon as they're sent.
    pub fn confirmation(
        title: impl Into<String>,
        description: impl Into<String>,
        confirm: Option<MenuCallback>,
        cancel: Option<MenuCallback>,
    ) -> Self {
        let state = ConfirmState {
            confirm,
            cancel,
            was_confirmed: None,
            resolved_by: None,
            target_user: None,
            delete_after_resolution: false,
            disable_on_resolution: true,
            expires_at: None,
        };

        let mut menu = Self::with_kind(title, description, MenuKind::Confirmation(state))
            .with_auto_enable(true);

        // Fixed options can't go through add_option.
        menu.options
            .add(MenuEmoji::unicode(CONFIRM_EMOJI), "Confirm", OptionBehavior::Confirm);
        menu.options
            .add(MenuEmoji::unicode(CANCEL_EMOJI), "Cancel", OptionBehavior::Cancel);
        menu
    }

    pub fn with_target_user(mut self, user_id: UserId) -> Self {
        if let MenuKind::Confirmation(state) = &mut self.kind {
            state.target_user = Some(user_id);
        }
        self
    }

    pub fn with_resolution(mut self, delete_after_resolution: bool, disable_on_resolution: bool) -> Self {
        if let MenuKind::Confirmation(state) = &mut self.kind {
            state.delete_after_resolution = delete_after_resolution;
            state.disable_on_resolution = disable_on_resolution;
        }
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        if let MenuKind::Confirmation(state) = &mut self.kind {
            state.expires_at = Some(expires_at);
        }
        self
    }

    pub fn confirm_state(&self) -> Option<&ConfirmState> {
        match &self.kind {
            MenuKind::Confirmation(state) => Some(state),
            _ => None,
        }
    }

    /// `None` while nobody answered.
    pub fn was_confirmed(&self) -> Option<bool> {
        self.confirm_state().and_then(|state| state.was_confirmed)
    }

    /// True for an enabled confirmation nobody answered before its expiry.
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.confirm_state().is_some_and(|state| {
                state.was_confirmed.is_none() && state.expires_at.is_some_and(|expires_at| expires_at <= now)
            })
    }

    /// Cancels a confirmation nobody answered.
    ///
    /// Returns false if it was already resolved.
    pub async fn time_out(&mut self, gateway: &dyn MessagingGateway) -> Result<bool, MenuError> {
        self.conclude(gateway, false, None).await
    }

    pub(super) async fn resolve(
        &mut self,
        gateway: &dyn MessagingGateway,
        emoji: &MenuEmoji,
        user_id: UserId,
        confirmed: bool,
    ) -> Result<bool, MenuError> {
        let target_user = match &self.kind {
            MenuKind::Confirmation(state) if state.was_confirmed.is_none() => state.target_user,
            _ => return Ok(false),
        };

        if target_user.is_some_and(|target| target != user_id) {
            self.strip_reaction(gateway, emoji, user_id).await;
            return Ok(false);
        }

        self.conclude(gateway, confirmed, Some(user_id)).await
    }

    async fn conclude(
        &mut self,
        gateway: &dyn MessagingGateway,
        confirmed: bool,
        resolved_by: Option<UserId>,
    ) -> Result<bool, MenuError> {
        let MenuKind::Confirmation(state) = &mut self.kind else {
            return Ok(false);
        };
        if state.was_confirmed.is_some() {
            return Ok(false);
        }

        let confirm = state.confirm.take();
        let cancel = state.cancel.take();
        state.was_confirmed = Some(confirmed);
        state.resolved_by = resolved_by;
        let delete = state.delete_after_resolution;
        let disable = state.disable_on_resolution;

        let (callback, verb) = if confirmed {
            (confirm, "Confirmed")
        } else {
            (cancel, "Cancelled")
        };
        self.description = match resolved_by {
            Some(user_id) => format!("{verb} by <@{user_id}>."),
            None => "Nobody answered in time.".to_string(),
        };

        if let Some(callback) = callback {
            if let Err(err) = callback().await {
                warn!(menu_id = ?self.id, "Confirmation callback failed: {err}");
            }
        }

        if delete {
            self.delete(gateway).await?;
        } else if disable {
            self.disable(gateway).await?;
        } else {
            gateway.edit_message(self.handle()?, &self.render()).await?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::menus::{
        menu::DispatchOutcome,
        testing::{event, FakeGateway, CHANNEL, GUILD},
    };

    fn counter() -> (Arc<AtomicUsize>, MenuCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let moved = count.clone();
        let callback = callback(move || async move {
            moved.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (count, callback)
    }

    #[tokio::test]
    async fn cancel_runs_once_and_closes() {
        let gateway = FakeGateway::new();
        let (confirms, confirm) = counter();
        let (cancels, cancel) = counter();
        let mut menu = Menu::confirmation("Delete menu?", "This can't be undone.", Some(confirm), Some(cancel));
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();
        assert!(menu.is_enabled());

        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 7, CANCEL_EMOJI))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Handled(true));
        assert_eq!(menu.was_confirmed(), Some(false));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(!menu.is_enabled());

        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 7, CONFIRM_EMOJI))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(confirms.load(Ordering::SeqCst), 0);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);

        let live = gateway.embed_of(handle.message_id).unwrap();
        assert_eq!(live.title, "Delete menu? - Cancelled");
        assert_eq!(live.description, "Cancelled by <@7>.");
        assert_eq!(live.colour, CANCELLED_COLOUR);
    }

    #[tokio::test]
    async fn confirm_without_disabling_stays_closed() {
        let gateway = FakeGateway::new();
        let (confirms, confirm) = counter();
        let mut menu = Menu::confirmation("Sure?", "", Some(confirm), None).with_resolution(false, false);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        menu.dispatch_add(&gateway, &event(handle.message_id, 7, CONFIRM_EMOJI))
            .await
            .unwrap();
        assert!(menu.is_enabled());
        assert_eq!(menu.was_confirmed(), Some(true));

        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 8, CONFIRM_EMOJI))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled(false));
        assert_eq!(confirms.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.embed_of(handle.message_id).unwrap().title, "Sure? - Confirmed");
    }

    #[tokio::test]
    async fn delete_after_resolution() {
        let gateway = FakeGateway::new();
        let mut menu = Menu::confirmation("Sure?", "", None, None).with_resolution(true, true);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        menu.dispatch_add(&gateway, &event(handle.message_id, 7, CONFIRM_EMOJI))
            .await
            .unwrap();

        assert!(menu.is_deleted());
        assert!(gateway.embed_of(handle.message_id).is_none());
        assert!(!gateway.is_listening(handle.message_id).await);
    }

    #[tokio::test]
    async fn only_target_user_can_answer() {
        let gateway = FakeGateway::new();
        let (confirms, confirm) = counter();
        let mut menu = Menu::confirmation("Sure?", "", Some(confirm), None).with_target_user(UserId::new(7));
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 8, CONFIRM_EMOJI))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled(false));
        assert_eq!(menu.was_confirmed(), None);
        assert_eq!(gateway.removed_reactions(), vec![(CONFIRM_EMOJI.to_string(), UserId::new(8))]);

        menu.dispatch_add(&gateway, &event(handle.message_id, 7, CONFIRM_EMOJI))
            .await
            .unwrap();
        assert_eq!(menu.was_confirmed(), Some(true));
        assert_eq!(confirms.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_callback_still_resolves() {
        let gateway = FakeGateway::new();
        let failing = callback(|| async { Err::<(), _>(MenuError::Store("offline".to_string())) });
        let mut menu = Menu::confirmation("Sure?", "", Some(failing), None);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        let outcome = menu
            .dispatch_add(&gateway, &event(handle.message_id, 7, CONFIRM_EMOJI))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled(true));
        assert_eq!(menu.was_confirmed(), Some(true));
    }

    #[tokio::test]
    async fn unanswered_confirmation_times_out() {
        let gateway = FakeGateway::new();
        let (confirms, confirm) = counter();
        let (cancels, cancel) = counter();
        let expires_at = Utc::now() + chrono::Duration::seconds(60);
        let mut menu = Menu::confirmation("Sure?", "", Some(confirm), Some(cancel)).with_expiry(expires_at);
        let handle = menu.send(&gateway, GUILD, CHANNEL).await.unwrap();

        assert!(!menu.is_timed_out(Utc::now()));
        assert!(menu.is_timed_out(expires_at));

        assert!(menu.time_out(&gateway).await.unwrap());
        assert_eq!(menu.was_confirmed(), Some(false));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert_eq!(confirms.load(Ordering::SeqCst), 0);
        assert!(!menu.is_enabled());
        assert!(!menu.is_timed_out(expires_at));
        assert!(!gateway.is_listening(handle.message_id).await);
        assert_eq!(
            gateway.embed_of(handle.message_id).unwrap().description,
            "Nobody answered in time."
        );

        assert!(!menu.time_out(&gateway).await.unwrap());
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fixed_options() {
        let mut menu = Menu::confirmation("Sure?", "", None, None);
        assert_eq!(menu.options().len(), 2);
        assert!(!menu.is_saveable());

        let confirm = MenuEmoji::from_string(CONFIRM_EMOJI).unwrap();
        assert!(matches!(menu.remove_option(&confirm), Err(MenuError::FixedOption(_))));
        assert!(matches!(
            menu.add_option(MenuEmoji::from_string("🍕").unwrap(), "Pizza"),
            Err(MenuError::FixedOption(_))
        ));
        assert_eq!(menu.options().len(), 2);
    }
}
