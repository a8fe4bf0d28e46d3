//! In-memory stand-ins for Discord and the database.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};

use super::{
    emoji::MenuEmoji,
    error::MenuError,
    gateway::{LiveMessage, MenuEmbed, MessageHandle, MessagingGateway},
    menu::ReactionEvent,
    store::{ConfigStore, MenuConfigRecord},
};

pub const GUILD: GuildId = GuildId::new(10);
pub const CHANNEL: ChannelId = ChannelId::new(20);
pub const BOT: UserId = UserId::new(999);

pub fn event(message_id: MessageId, user: u64, emoji: &str) -> ReactionEvent {
    ReactionEvent {
        message_id,
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        user_id: UserId::new(user),
        emoji: MenuEmoji::from_string(emoji).unwrap().to_reaction_type().unwrap(),
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    messages: HashMap<MessageId, MenuEmbed>,
    reactions: HashMap<MessageId, Vec<String>>,
    removed: Vec<(String, UserId)>,
    sent: Vec<MenuEmbed>,
    calls: HashMap<&'static str, usize>,
    listeners: HashSet<MessageId>,
    roles: HashSet<RoleId>,
    members: HashMap<UserId, Vec<RoleId>>,
    mentionable: HashMap<RoleId, bool>,
    fail_edits: bool,
    fail_clears: bool,
    fail_deletes: bool,
}

/// A pretend Discord that remembers everything menus do to it.
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    pub fn with_roles(self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.state.lock().unwrap().roles.extend(roles);
        self
    }

    fn record(&self, call: &'static str) {
        *self.state.lock().unwrap().calls.entry(call).or_default() += 1;
    }

    pub fn calls(&self, call: &str) -> usize {
        self.state.lock().unwrap().calls.get(call).copied().unwrap_or(0)
    }

    pub fn embed_of(&self, message_id: MessageId) -> Option<MenuEmbed> {
        self.state.lock().unwrap().messages.get(&message_id).cloned()
    }

    pub fn reactions_on(&self, message_id: MessageId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .reactions
            .get(&message_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn removed_reactions(&self) -> Vec<(String, UserId)> {
        self.state.lock().unwrap().removed.clone()
    }

    /// Every embed ever sent, in order.
    pub fn sent_embeds(&self) -> Vec<MenuEmbed> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn roles_of(&self, user: u64) -> Vec<RoleId> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&UserId::new(user))
            .cloned()
            .unwrap_or_default()
    }

    pub fn mentionable(&self, role_id: RoleId) -> Option<bool> {
        self.state.lock().unwrap().mentionable.get(&role_id).copied()
    }

    /// Someone deleted the message behind the bot's back.
    pub fn drop_embed(&self, message_id: MessageId) {
        let mut state = self.state.lock().unwrap();
        state.messages.remove(&message_id);
        state.reactions.remove(&message_id);
    }

    /// Someone edited the message behind the bot's back.
    pub fn edit_live_embed(&self, message_id: MessageId, edit: impl FnOnce(&mut MenuEmbed)) {
        if let Some(embed) = self.state.lock().unwrap().messages.get_mut(&message_id) {
            edit(embed);
        }
    }

    pub fn fail_edits(&self, fail: bool) {
        self.state.lock().unwrap().fail_edits = fail;
    }

    pub fn fail_clears(&self, fail: bool) {
        self.state.lock().unwrap().fail_clears = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().unwrap().fail_deletes = fail;
    }

    pub fn is_alive(&self, message_id: MessageId) -> bool {
        self.state.lock().unwrap().messages.contains_key(&message_id)
    }
}

fn unknown_message(message_id: MessageId) -> MenuError {
    MenuError::Gateway(format!("Unknown Message {message_id}"))
}

#[async_trait]
impl MessagingGateway for FakeGateway {
    fn bot_id(&self) -> UserId {
        BOT
    }

    async fn send_message(&self, channel_id: ChannelId, embed: &MenuEmbed) -> Result<MessageHandle, MenuError> {
        self.record("send_message");
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let message_id = MessageId::new(state.next_id);
        state.messages.insert(message_id, embed.clone());
        state.sent.push(embed.clone());
        Ok(MessageHandle {
            channel_id,
            message_id,
        })
    }

    async fn fetch_message(&self, handle: MessageHandle) -> Result<Option<LiveMessage>, MenuError> {
        self.record("fetch_message");
        Ok(self.embed_of(handle.message_id).map(|embed| LiveMessage {
            handle,
            embed: Some(embed),
        }))
    }

    async fn edit_message(&self, handle: MessageHandle, embed: &MenuEmbed) -> Result<(), MenuError> {
        self.record("edit_message");
        let mut state = self.state.lock().unwrap();
        if state.fail_edits {
            return Err(MenuError::Gateway("Missing Permissions".to_string()));
        }
        let live = state
            .messages
            .get_mut(&handle.message_id)
            .ok_or_else(|| unknown_message(handle.message_id))?;
        *live = embed.clone();
        Ok(())
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), MenuError> {
        self.record("delete_message");
        if self.state.lock().unwrap().fail_deletes {
            return Err(MenuError::Gateway("Missing Permissions".to_string()));
        }
        self.drop_embed(handle.message_id);
        Ok(())
    }

    async fn clear_reactions(&self, handle: MessageHandle) -> Result<(), MenuError> {
        self.record("clear_reactions");
        let mut state = self.state.lock().unwrap();
        if state.fail_clears {
            return Err(MenuError::Gateway("Missing Permissions".to_string()));
        }
        state.reactions.remove(&handle.message_id);
        Ok(())
    }

    async fn add_reaction(&self, handle: MessageHandle, emoji: &MenuEmoji) -> Result<(), MenuError> {
        self.record("add_reaction");
        let mut state = self.state.lock().unwrap();
        if !state.messages.contains_key(&handle.message_id) {
            return Err(unknown_message(handle.message_id));
        }
        let reactions = state.reactions.entry(handle.message_id).or_default();
        let emoji = emoji.to_string();
        if !reactions.contains(&emoji) {
            reactions.push(emoji);
        }
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _handle: MessageHandle,
        emoji: &MenuEmoji,
        user_id: UserId,
    ) -> Result<(), MenuError> {
        self.record("remove_reaction");
        self.state
            .lock()
            .unwrap()
            .removed
            .push((emoji.to_string(), user_id));
        Ok(())
    }

    async fn register_reaction_listener(&self, message_id: MessageId) {
        self.record("register");
        self.state.lock().unwrap().listeners.insert(message_id);
    }

    async fn unregister_reaction_listener(&self, message_id: MessageId) {
        self.record("unregister");
        self.state.lock().unwrap().listeners.remove(&message_id);
    }

    async fn is_listening(&self, message_id: MessageId) -> bool {
        self.state.lock().unwrap().listeners.contains(&message_id)
    }

    async fn resolve_role(&self, _guild_id: GuildId, role_id: RoleId) -> Result<Option<RoleId>, MenuError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .roles
            .contains(&role_id)
            .then_some(role_id))
    }

    async fn member_roles(&self, _guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleId>, MenuError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .members
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn grant_role(&self, _guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), MenuError> {
        self.record("grant_role");
        let mut state = self.state.lock().unwrap();
        let roles = state.members.entry(user_id).or_default();
        if !roles.contains(&role_id) {
            roles.push(role_id);
        }
        Ok(())
    }

    async fn revoke_role(&self, _guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), MenuError> {
        self.record("revoke_role");
        if let Some(roles) = self.state.lock().unwrap().members.get_mut(&user_id) {
            roles.retain(|role| *role != role_id);
        }
        Ok(())
    }

    async fn set_role_mentionable(
        &self,
        _guild_id: GuildId,
        role_id: RoleId,
        mentionable: bool,
    ) -> Result<(), MenuError> {
        self.record("set_role_mentionable");
        self.state
            .lock()
            .unwrap()
            .mentionable
            .insert(role_id, mentionable);
        Ok(())
    }
}

/// A config store that forgets everything when dropped.
#[derive(Default)]
pub struct MemoryConfigStore {
    records: Mutex<BTreeMap<u64, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json_of(&self, menu_id: MessageId) -> Option<String> {
        self.records.lock().unwrap().get(&menu_id.get()).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn insert_raw(&self, menu_id: u64, json: impl Into<String>) {
        self.records.lock().unwrap().insert(menu_id, json.into());
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, menu_id: MessageId) -> Result<Option<MenuConfigRecord>, MenuError> {
        Ok(self.json_of(menu_id).map(|json| MenuConfigRecord::new(menu_id, json)))
    }

    async fn list(&self) -> Result<Vec<MenuConfigRecord>, MenuError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|(menu_id, json)| MenuConfigRecord {
                menu_id: *menu_id,
                serialized_menu_json: json.clone(),
            })
            .collect())
    }

    async fn create(&self, record: MenuConfigRecord) -> Result<(), MenuError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.menu_id) {
            return Err(MenuError::Store(format!("record {} already exists", record.menu_id)));
        }
        records.insert(record.menu_id, record.serialized_menu_json);
        Ok(())
    }

    async fn update(&self, record: MenuConfigRecord) -> Result<(), MenuError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.menu_id, record.serialized_menu_json);
        Ok(())
    }

    async fn delete(&self, menu_id: MessageId) -> Result<(), MenuError> {
        self.records.lock().unwrap().remove(&menu_id.get());
        Ok(())
    }
}
