//! In-memory [`Messenger`] that records calls and replays scripted failures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::messenger::{
    ChannelPost, ChannelRef, ChatId, ChatKind, Dialog, JoinTarget, MessageId, Messenger,
    ResolvedChannel,
};
use super::TelegramError;

/// Id the mock account answers to.
pub const MOCK_SELF_ID: i64 = 1;

/// A side-effecting call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Text { chat: ChatId, text: String },
    Sticker { chat: ChatId, sticker: String },
    Typing(ChatId),
    Forward { to: ChatId, from: ChatId, message: MessageId },
    Join(JoinTarget),
    Leave(ChatId),
    React { chat: ChatId, message: MessageId, emoji: String },
}

/// A failure to replay. [`TelegramError`] is not `Clone`, so scripts hold
/// these and build the error on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Flood(u32),
    FloodUnknown,
    WriteForbidden,
    NotFound,
    Rpc,
    Connection,
}

impl Failure {
    pub fn error(self) -> TelegramError {
        match self {
            Self::Flood(seconds) => TelegramError::FloodWait {
                seconds: Some(seconds),
            },
            Self::FloodUnknown => TelegramError::FloodWait { seconds: None },
            Self::WriteForbidden => TelegramError::WriteForbidden("CHAT_WRITE_FORBIDDEN".into()),
            Self::NotFound => TelegramError::NotFound("PEER_ID_INVALID".into()),
            Self::Rpc => TelegramError::Rpc {
                code: 500,
                name: "INTERNAL".into(),
            },
            Self::Connection => TelegramError::Connection("connection reset".into()),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    dialogs: Vec<Dialog>,
    dialogs_fail: bool,
    membership_failures: HashMap<ChatId, Failure>,
    /// Failures for text, sticker and forward sends, consumed one per call.
    send_failures: HashMap<ChatId, VecDeque<Failure>>,
    typing_failures: HashMap<ChatId, Failure>,
    join_failures: HashMap<String, VecDeque<Failure>>,
    leave_failures: HashMap<ChatId, Failure>,
    react_failure: Option<Failure>,
    channels: HashMap<String, ResolvedChannel>,
    posts: HashMap<ChatId, Vec<ChannelPost>>,
    stickers: HashMap<(ChatId, MessageId), String>,
}

/// Scriptable messenger for handler and loop tests.
#[derive(Debug, Default)]
pub struct MockMessenger {
    state: Mutex<MockState>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut MockState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_dialog(mut self, chat: ChatId, kind: ChatKind, can_post: bool) -> Self {
        self.state_mut().dialogs.push(Dialog {
            chat,
            kind,
            title: format!("chat {chat}"),
            can_post,
        });
        self
    }

    /// Adds `count` postable basic groups with ids `1..=count`.
    pub fn with_groups(mut self, count: i64) -> Self {
        for id in 1..=count {
            self = self.with_dialog(ChatId::group(id), ChatKind::Group, true);
        }
        self
    }

    pub fn fail_dialogs(mut self) -> Self {
        self.state_mut().dialogs_fail = true;
        self
    }

    pub fn fail_membership(mut self, chat: ChatId, failure: Failure) -> Self {
        self.state_mut().membership_failures.insert(chat, failure);
        self
    }

    pub fn fail_sends(mut self, chat: ChatId, failures: &[Failure]) -> Self {
        self.state_mut()
            .send_failures
            .entry(chat)
            .or_default()
            .extend(failures);
        self
    }

    pub fn fail_typing(mut self, chat: ChatId, failure: Failure) -> Self {
        self.state_mut().typing_failures.insert(chat, failure);
        self
    }

    pub fn fail_join(mut self, target: &str, failures: &[Failure]) -> Self {
        self.state_mut()
            .join_failures
            .entry(target.to_owned())
            .or_default()
            .extend(failures);
        self
    }

    pub fn fail_leave(mut self, chat: ChatId, failure: Failure) -> Self {
        self.state_mut().leave_failures.insert(chat, failure);
        self
    }

    pub fn fail_reactions(mut self, failure: Failure) -> Self {
        self.state_mut().react_failure = Some(failure);
        self
    }

    /// Registers a channel reachable by `username` and by its id.
    pub fn with_channel(mut self, username: &str, chat: ChatId, public: bool) -> Self {
        self.state_mut().channels.insert(
            username.to_owned(),
            ResolvedChannel {
                chat,
                username: public.then(|| username.to_owned()),
            },
        );
        self
    }

    pub fn with_post(mut self, chat: ChatId, id: MessageId, text: &str) -> Self {
        self.state_mut().posts.entry(chat).or_default().push(ChannelPost {
            id,
            chat,
            text: text.to_owned(),
        });
        self
    }

    pub fn with_sticker(mut self, chat: ChatId, message: MessageId, token: &str) -> Self {
        self.state_mut()
            .stickers
            .insert((chat, message), token.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Texts sent to `chat`, in order.
    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Text { chat: c, text } if *c == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sticker_sends(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Sticker { .. }))
            .count()
    }

    pub fn left(&self) -> Vec<ChatId> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Leave(chat) => Some(*chat),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn next_send_failure(&self, chat: ChatId) -> Result<(), TelegramError> {
        let failure = self
            .state()
            .send_failures
            .get_mut(&chat)
            .and_then(VecDeque::pop_front);
        failure.map_or(Ok(()), |f| Err(f.error()))
    }

    fn find_channel(&self, chat: ChatId) -> Option<ResolvedChannel> {
        self.state()
            .channels
            .values()
            .find(|c| c.chat == chat)
            .cloned()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn me(&self) -> Result<i64, TelegramError> {
        Ok(MOCK_SELF_ID)
    }

    async fn dialogs(&self) -> Result<Vec<Dialog>, TelegramError> {
        let state = self.state();
        if state.dialogs_fail {
            return Err(Failure::Connection.error());
        }
        Ok(state.dialogs.clone())
    }

    async fn check_membership(&self, chat: ChatId) -> Result<(), TelegramError> {
        match self.state().membership_failures.get(&chat) {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        self.record(Call::Text {
            chat,
            text: text.to_owned(),
        });
        self.next_send_failure(chat)
    }

    async fn send_sticker(&self, chat: ChatId, sticker: &str) -> Result<(), TelegramError> {
        self.record(Call::Sticker {
            chat,
            sticker: sticker.to_owned(),
        });
        self.next_send_failure(chat)
    }

    async fn send_typing(&self, chat: ChatId) -> Result<(), TelegramError> {
        self.record(Call::Typing(chat));
        match self.state().typing_failures.get(&chat) {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> Result<(), TelegramError> {
        self.record(Call::Forward { to, from, message });
        self.next_send_failure(to)
    }

    async fn join(&self, target: &JoinTarget) -> Result<(), TelegramError> {
        self.record(Call::Join(target.clone()));
        let failure = self
            .state()
            .join_failures
            .get_mut(&target.to_string())
            .and_then(VecDeque::pop_front);
        failure.map_or(Ok(()), |f| Err(f.error()))
    }

    async fn leave(&self, chat: ChatId) -> Result<(), TelegramError> {
        self.record(Call::Leave(chat));
        match self.state().leave_failures.get(&chat) {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    async fn react(
        &self,
        chat: ChatId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), TelegramError> {
        self.record(Call::React {
            chat,
            message,
            emoji: emoji.to_owned(),
        });
        self.state().react_failure.map_or(Ok(()), |f| Err(f.error()))
    }

    async fn resolve_channel(
        &self,
        reference: &ChannelRef,
    ) -> Result<ResolvedChannel, TelegramError> {
        let found = match reference {
            ChannelRef::Username(name) => self.state().channels.get(name).cloned(),
            ChannelRef::Id(chat) => self.find_channel(*chat),
        };
        found.ok_or_else(|| TelegramError::NotFound(format!("channel {reference}")))
    }

    async fn latest_post(&self, channel: ChatId) -> Result<Option<ChannelPost>, TelegramError> {
        Ok(self
            .state()
            .posts
            .get(&channel)
            .and_then(|posts| posts.last().cloned()))
    }

    async fn post(
        &self,
        channel: ChatId,
        id: MessageId,
    ) -> Result<Option<ChannelPost>, TelegramError> {
        Ok(self
            .state()
            .posts
            .get(&channel)
            .and_then(|posts| posts.iter().find(|p| p.id == id).cloned()))
    }

    async fn sticker_of(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<Option<String>, TelegramError> {
        Ok(self.state().stickers.get(&(chat, message)).cloned())
    }
}
