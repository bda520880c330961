//! grammers-backed implementation of the [`Messenger`] port.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::{Client, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_session::updates::UpdatesLike;
use grammers_tl_types as tl;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::TelegramError;
use super::messenger::{
    ChannelPost, ChannelRef, ChatId, ChatKind, Dialog, IncomingMessage, JoinTarget, MessageId,
    Messenger, PeerKind, ResolvedChannel,
};
use super::sticker::StickerRef;
use crate::config::TelegramConfig;

/// Dialogs requested per page.
const DIALOG_PAGE_SIZE: i32 = 100;

/// Upper bound on dialog pages fetched in one enumeration.
const MAX_DIALOG_PAGES: usize = 50;

#[derive(Debug, Clone)]
struct CachedChannel {
    access_hash: i64,
    broadcast: bool,
    username: Option<String>,
}

/// Access hashes learned from every user and chat list the server sends.
#[derive(Debug, Default)]
struct PeerCache {
    users: HashMap<i64, i64>,
    channels: HashMap<i64, CachedChannel>,
}

impl PeerCache {
    fn cache_users(&mut self, users: &[tl::enums::User]) {
        for user in users {
            if let tl::enums::User::User(u) = user
                && let Some(hash) = u.access_hash
            {
                self.users.insert(u.id, hash);
            }
        }
    }

    fn cache_chats(&mut self, chats: &[tl::enums::Chat]) {
        for chat in chats {
            match chat {
                tl::enums::Chat::Channel(c) => {
                    if let Some(access_hash) = c.access_hash {
                        self.channels.insert(
                            c.id,
                            CachedChannel {
                                access_hash,
                                broadcast: c.broadcast,
                                username: c.username.clone(),
                            },
                        );
                    }
                }
                tl::enums::Chat::ChannelForbidden(c) => {
                    self.channels.insert(
                        c.id,
                        CachedChannel {
                            access_hash: c.access_hash,
                            broadcast: c.broadcast,
                            username: None,
                        },
                    );
                }
                _ => {}
            }
        }
    }

    fn input_peer(&self, chat: ChatId) -> Option<tl::enums::InputPeer> {
        match chat.kind() {
            PeerKind::User(user_id) => {
                let access_hash = self.users.get(&user_id).copied()?;
                Some(tl::enums::InputPeer::User(tl::types::InputPeerUser {
                    user_id,
                    access_hash,
                }))
            }
            PeerKind::Group(chat_id) => {
                Some(tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id }))
            }
            PeerKind::Channel(channel_id) => {
                let cached = self.channels.get(&channel_id)?;
                Some(tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
                    channel_id,
                    access_hash: cached.access_hash,
                }))
            }
        }
    }

    fn input_channel(&self, channel_id: i64) -> Option<tl::enums::InputChannel> {
        let cached = self.channels.get(&channel_id)?;
        Some(tl::enums::InputChannel::Channel(tl::types::InputChannel {
            channel_id,
            access_hash: cached.access_hash,
        }))
    }

    fn chat_kind(&self, peer: &tl::enums::Peer, post: bool) -> ChatKind {
        match peer {
            tl::enums::Peer::User(_) => ChatKind::Private,
            tl::enums::Peer::Chat(_) => ChatKind::Group,
            tl::enums::Peer::Channel(p) => {
                let broadcast = self
                    .channels
                    .get(&p.channel_id)
                    .map_or(post, |c| c.broadcast);
                if broadcast {
                    ChatKind::Channel
                } else {
                    ChatKind::Supergroup
                }
            }
        }
    }

    /// Converts one raw message into the bot's view of it.
    fn incoming(&self, message: &tl::enums::Message) -> Option<IncomingMessage> {
        match message {
            tl::enums::Message::Message(m) => {
                let chat = chat_of(&m.peer_id);
                let sender = match (&m.from_id, &m.peer_id) {
                    (Some(tl::enums::Peer::User(u)), _) => Some(u.user_id),
                    (None, tl::enums::Peer::User(u)) if !m.out => Some(u.user_id),
                    _ => None,
                };
                Some(IncomingMessage {
                    id: m.id,
                    chat,
                    chat_kind: self.chat_kind(&m.peer_id, m.post),
                    sender,
                    outgoing: m.out,
                    text: m.message.clone(),
                    reply_to: m.reply_to.as_ref().and_then(reply_target),
                    is_service: false,
                })
            }
            tl::enums::Message::Service(m) => Some(IncomingMessage {
                id: m.id,
                chat: chat_of(&m.peer_id),
                chat_kind: self.chat_kind(&m.peer_id, m.post),
                sender: None,
                outgoing: m.out,
                text: String::new(),
                reply_to: None,
                is_service: true,
            }),
            tl::enums::Message::Empty(_) => None,
        }
    }
}

fn chat_of(peer: &tl::enums::Peer) -> ChatId {
    match peer {
        tl::enums::Peer::User(p) => ChatId::user(p.user_id),
        tl::enums::Peer::Chat(p) => ChatId::group(p.chat_id),
        tl::enums::Peer::Channel(p) => ChatId::channel(p.channel_id),
    }
}

fn reply_target(header: &tl::enums::MessageReplyHeader) -> Option<MessageId> {
    match header {
        tl::enums::MessageReplyHeader::Header(h) => h.reply_to_msg_id,
        _ => None,
    }
}

fn random_id() -> i64 {
    rand::random()
}

/// Stream of inbound messages decoded from raw MTProto updates.
pub struct UpdateReceiver {
    rx: mpsc::UnboundedReceiver<UpdatesLike>,
    peers: Arc<Mutex<PeerCache>>,
    pending: VecDeque<IncomingMessage>,
}

impl UpdateReceiver {
    /// Waits for the next message; `None` once the connection is gone.
    pub async fn next(&mut self) -> Option<IncomingMessage> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(message);
            }

            match self.rx.recv().await? {
                UpdatesLike::Updates(updates) => self.decode(updates),
                _ => debug!("Ignoring non-message update"),
            }
        }
    }

    fn decode(&mut self, updates: tl::enums::Updates) {
        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);

        let batch = match updates {
            tl::enums::Updates::Updates(u) => {
                peers.cache_users(&u.users);
                peers.cache_chats(&u.chats);
                u.updates
            }
            tl::enums::Updates::Combined(u) => {
                peers.cache_users(&u.users);
                peers.cache_chats(&u.chats);
                u.updates
            }
            tl::enums::Updates::UpdateShort(u) => vec![u.update],
            tl::enums::Updates::UpdateShortMessage(m) => {
                self.pending.push_back(IncomingMessage {
                    id: m.id,
                    chat: ChatId::user(m.user_id),
                    chat_kind: ChatKind::Private,
                    sender: (!m.out).then_some(m.user_id),
                    outgoing: m.out,
                    text: m.message,
                    reply_to: m.reply_to.as_ref().and_then(reply_target),
                    is_service: false,
                });
                return;
            }
            tl::enums::Updates::UpdateShortChatMessage(m) => {
                self.pending.push_back(IncomingMessage {
                    id: m.id,
                    chat: ChatId::group(m.chat_id),
                    chat_kind: ChatKind::Group,
                    sender: Some(m.from_id),
                    outgoing: m.out,
                    text: m.message,
                    reply_to: m.reply_to.as_ref().and_then(reply_target),
                    is_service: false,
                });
                return;
            }
            _ => return,
        };

        for update in batch {
            let message = match update {
                tl::enums::Update::NewMessage(u) => u.message,
                tl::enums::Update::NewChannelMessage(u) => u.message,
                _ => continue,
            };
            if let Some(message) = peers.incoming(&message) {
                self.pending.push_back(message);
            }
        }
    }
}

impl std::fmt::Debug for UpdateReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateReceiver")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    peers: Arc<Mutex<PeerCache>>,

    /// Raw updates, until [`TelegramBot::take_updates`] hands them out.
    updates: Mutex<Option<mpsc::UnboundedReceiver<UpdatesLike>>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the connection fails.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            peers: Arc::new(Mutex::new(PeerCache::default())),
            updates: Mutex::new(Some(updates)),
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::PasswordRequired`] when 2FA is enabled.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                Ok(())
            }
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Hands out the inbound message stream. Only the first call gets it.
    pub fn take_updates(&self) -> Option<UpdateReceiver> {
        let rx = self
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        Some(UpdateReceiver {
            rx,
            peers: Arc::clone(&self.peers),
            pending: VecDeque::new(),
        })
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }

    fn peers(&self) -> MutexGuard<'_, PeerCache> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remember(&self, users: &[tl::enums::User], chats: &[tl::enums::Chat]) {
        let mut peers = self.peers();
        peers.cache_users(users);
        peers.cache_chats(chats);
    }

    /// Resolves a chat to an input peer, refreshing the cache from the
    /// dialog list once if the chat has not been seen yet.
    async fn input_peer(&self, chat: ChatId) -> Result<tl::enums::InputPeer, TelegramError> {
        if let Some(peer) = self.peers().input_peer(chat) {
            return Ok(peer);
        }

        debug!("Peer {} not cached, refreshing dialogs", chat);
        self.dialogs().await?;

        self.peers()
            .input_peer(chat)
            .ok_or_else(|| TelegramError::NotFound(format!("unknown chat {chat}")))
    }

    async fn input_channel(&self, channel_id: i64) -> Result<tl::enums::InputChannel, TelegramError> {
        self.input_peer(ChatId::channel(channel_id)).await?;
        self.peers()
            .input_channel(channel_id)
            .ok_or_else(|| TelegramError::NotFound(format!("unknown channel {channel_id}")))
    }

    /// Fetches messages by id from any kind of chat.
    async fn messages_by_id(
        &self,
        chat: ChatId,
        ids: Vec<MessageId>,
    ) -> Result<Vec<tl::enums::Message>, TelegramError> {
        let id = ids
            .into_iter()
            .map(|id| tl::enums::InputMessage::Id(tl::types::InputMessageId { id }))
            .collect();

        let result = match chat.kind() {
            PeerKind::Channel(channel_id) => {
                let channel = self.input_channel(channel_id).await?;
                self.client
                    .invoke(&tl::functions::channels::GetMessages { channel, id })
                    .await?
            }
            PeerKind::User(_) | PeerKind::Group(_) => {
                self.client
                    .invoke(&tl::functions::messages::GetMessages { id })
                    .await?
            }
        };

        Ok(self.unpack_messages(result))
    }

    fn unpack_messages(&self, result: tl::enums::messages::Messages) -> Vec<tl::enums::Message> {
        let (messages, users, chats) = match result {
            tl::enums::messages::Messages::Messages(m) => (m.messages, m.users, m.chats),
            tl::enums::messages::Messages::Slice(m) => (m.messages, m.users, m.chats),
            tl::enums::messages::Messages::ChannelMessages(m) => (m.messages, m.users, m.chats),
            tl::enums::messages::Messages::NotModified(_) => return Vec::new(),
        };
        self.remember(&users, &chats);
        messages
    }
}

fn channel_post(message: &tl::enums::Message) -> Option<ChannelPost> {
    match message {
        tl::enums::Message::Message(m) => Some(ChannelPost {
            id: m.id,
            chat: chat_of(&m.peer_id),
            text: m.message.clone(),
        }),
        _ => None,
    }
}

fn sticker_in(message: &tl::enums::Message) -> Option<StickerRef> {
    let tl::enums::Message::Message(m) = message else {
        return None;
    };
    let Some(tl::enums::MessageMedia::Document(media)) = &m.media else {
        return None;
    };
    let Some(tl::enums::Document::Document(doc)) = &media.document else {
        return None;
    };

    let is_sticker = doc
        .attributes
        .iter()
        .any(|a| matches!(a, tl::enums::DocumentAttribute::Sticker(_)));

    is_sticker.then(|| StickerRef {
        id: doc.id,
        access_hash: doc.access_hash,
        file_reference: doc.file_reference.clone(),
    })
}

/// Builds a dialog entry from the chat lists of a `GetDialogs` page.
fn dialog_entry(
    peer: &tl::enums::Peer,
    chats: &HashMap<i64, &tl::enums::Chat>,
    users: &HashMap<i64, &tl::enums::User>,
) -> Option<Dialog> {
    let chat = chat_of(peer);
    match peer {
        tl::enums::Peer::User(p) => {
            let title = match users.get(&p.user_id) {
                Some(tl::enums::User::User(u)) => u.first_name.clone().unwrap_or_default(),
                _ => String::new(),
            };
            Some(Dialog {
                chat,
                kind: ChatKind::Private,
                title,
                can_post: true,
            })
        }
        tl::enums::Peer::Chat(p) => match chats.get(&p.chat_id)? {
            tl::enums::Chat::Chat(c) => Some(Dialog {
                chat,
                kind: ChatKind::Group,
                title: c.title.clone(),
                can_post: !c.left && !c.deactivated && c.migrated_to.is_none(),
            }),
            tl::enums::Chat::Forbidden(c) => Some(Dialog {
                chat,
                kind: ChatKind::Group,
                title: c.title.clone(),
                can_post: false,
            }),
            _ => None,
        },
        tl::enums::Peer::Channel(p) => match chats.get(&p.channel_id)? {
            tl::enums::Chat::Channel(c) => Some(Dialog {
                chat,
                kind: if c.broadcast {
                    ChatKind::Channel
                } else {
                    ChatKind::Supergroup
                },
                title: c.title.clone(),
                can_post: !c.left && c.banned_rights.is_none(),
            }),
            tl::enums::Chat::ChannelForbidden(c) => Some(Dialog {
                chat,
                kind: if c.broadcast {
                    ChatKind::Channel
                } else {
                    ChatKind::Supergroup
                },
                title: c.title.clone(),
                can_post: false,
            }),
            _ => None,
        },
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn me(&self) -> Result<i64, TelegramError> {
        let users = self
            .client
            .invoke(&tl::functions::users::GetUsers {
                id: vec![tl::enums::InputUser::UserSelf],
            })
            .await?;

        match users.first() {
            Some(tl::enums::User::User(user)) => Ok(user.id),
            _ => Err(TelegramError::NotAuthorized),
        }
    }

    async fn dialogs(&self) -> Result<Vec<Dialog>, TelegramError> {
        let mut dialogs = Vec::new();
        let mut offset_date = 0;
        let mut offset_id = 0;
        let mut offset_peer = tl::enums::InputPeer::Empty;

        for _ in 0..MAX_DIALOG_PAGES {
            let page = self
                .client
                .invoke(&tl::functions::messages::GetDialogs {
                    exclude_pinned: false,
                    folder_id: None,
                    offset_date,
                    offset_id,
                    offset_peer: offset_peer.clone(),
                    limit: DIALOG_PAGE_SIZE,
                    hash: 0,
                })
                .await?;

            let (raw, last_page) = match page {
                tl::enums::messages::Dialogs::Dialogs(d) => {
                    ((d.dialogs, d.messages, d.chats, d.users), true)
                }
                tl::enums::messages::Dialogs::Slice(d) => {
                    ((d.dialogs, d.messages, d.chats, d.users), false)
                }
                tl::enums::messages::Dialogs::NotModified(_) => break,
            };
            let (page_dialogs, messages, chats, users) = raw;
            self.remember(&users, &chats);

            let chat_map: HashMap<i64, &tl::enums::Chat> = chats
                .iter()
                .filter_map(|c| {
                    let id = match c {
                        tl::enums::Chat::Chat(x) => x.id,
                        tl::enums::Chat::Forbidden(x) => x.id,
                        tl::enums::Chat::Channel(x) => x.id,
                        tl::enums::Chat::ChannelForbidden(x) => x.id,
                        tl::enums::Chat::Empty(_) => return None,
                    };
                    Some((id, c))
                })
                .collect();
            let user_map: HashMap<i64, &tl::enums::User> = users
                .iter()
                .filter_map(|u| match u {
                    tl::enums::User::User(x) => Some((x.id, u)),
                    tl::enums::User::Empty(_) => None,
                })
                .collect();

            let count = page_dialogs.len();
            let mut last = None;
            for dialog in &page_dialogs {
                if let tl::enums::Dialog::Dialog(d) = dialog {
                    if let Some(entry) = dialog_entry(&d.peer, &chat_map, &user_map) {
                        dialogs.push(entry);
                    }
                    last = Some((d.peer.clone(), d.top_message));
                }
            }

            if last_page || i32::try_from(count).is_ok_and(|c| c < DIALOG_PAGE_SIZE) {
                break;
            }
            let Some((peer, top_message)) = last else { break };

            offset_id = top_message;
            offset_date = messages
                .iter()
                .find_map(|m| match m {
                    tl::enums::Message::Message(x) if x.id == top_message => Some(x.date),
                    tl::enums::Message::Service(x) if x.id == top_message => Some(x.date),
                    _ => None,
                })
                .unwrap_or(0);
            offset_peer = match self.peers().input_peer(chat_of(&peer)) {
                Some(p) => p,
                None => break,
            };
        }

        debug!("Fetched {} dialogs", dialogs.len());
        Ok(dialogs)
    }

    async fn check_membership(&self, chat: ChatId) -> Result<(), TelegramError> {
        match chat.kind() {
            PeerKind::Channel(channel_id) => {
                let channel = self.input_channel(channel_id).await?;
                self.client
                    .invoke(&tl::functions::channels::GetParticipant {
                        channel,
                        participant: tl::enums::InputPeer::PeerSelf,
                    })
                    .await?;
            }
            PeerKind::Group(chat_id) => {
                self.client
                    .invoke(&tl::functions::messages::GetFullChat { chat_id })
                    .await?;
            }
            PeerKind::User(_) => {}
        }
        Ok(())
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TelegramError> {
        let peer = self.input_peer(chat).await?;
        self.client
            .invoke(&tl::functions::messages::SendMessage {
                no_webpage: false,
                silent: false,
                background: false,
                clear_draft: false,
                noforwards: false,
                update_stickersets_order: false,
                invert_media: false,
                allow_paid_floodskip: false,
                peer,
                reply_to: None,
                message: text.to_owned(),
                random_id: random_id(),
                reply_markup: None,
                entities: None,
                rich_message: None,
                schedule_date: None,
                schedule_repeat_period: None,
                send_as: None,
                quick_reply_shortcut: None,
                effect: None,
                allow_paid_stars: None,
                suggested_post: None,
            })
            .await?;
        Ok(())
    }

    async fn send_sticker(&self, chat: ChatId, sticker: &str) -> Result<(), TelegramError> {
        let sticker = StickerRef::decode(sticker)
            .map_err(|e| TelegramError::NotFound(format!("sticker: {e}")))?;
        let peer = self.input_peer(chat).await?;

        let media = tl::enums::InputMedia::Document(tl::types::InputMediaDocument {
            spoiler: false,
            id: tl::enums::InputDocument::Document(tl::types::InputDocument {
                id: sticker.id,
                access_hash: sticker.access_hash,
                file_reference: sticker.file_reference,
            }),
            video_cover: None,
            video_timestamp: None,
            ttl_seconds: None,
            query: None,
        });

        self.client
            .invoke(&tl::functions::messages::SendMedia {
                silent: false,
                background: false,
                clear_draft: false,
                noforwards: false,
                update_stickersets_order: false,
                invert_media: false,
                allow_paid_floodskip: false,
                peer,
                reply_to: None,
                media,
                message: String::new(),
                random_id: random_id(),
                reply_markup: None,
                entities: None,
                schedule_date: None,
                schedule_repeat_period: None,
                send_as: None,
                quick_reply_shortcut: None,
                effect: None,
                allow_paid_stars: None,
                suggested_post: None,
            })
            .await?;
        Ok(())
    }

    async fn send_typing(&self, chat: ChatId) -> Result<(), TelegramError> {
        let peer = self.input_peer(chat).await?;
        self.client
            .invoke(&tl::functions::messages::SetTyping {
                peer,
                top_msg_id: None,
                action: tl::enums::SendMessageAction::SendMessageTypingAction,
            })
            .await?;
        Ok(())
    }

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> Result<(), TelegramError> {
        let from_peer = self.input_peer(from).await?;
        let to_peer = self.input_peer(to).await?;

        self.client
            .invoke(&tl::functions::messages::ForwardMessages {
                silent: false,
                background: false,
                with_my_score: false,
                drop_author: false,
                drop_media_captions: false,
                noforwards: false,
                from_peer,
                id: vec![message],
                random_id: vec![random_id()],
                to_peer,
                top_msg_id: None,
                reply_to: None,
                schedule_date: None,
                schedule_repeat_period: None,
                send_as: None,
                quick_reply_shortcut: None,
                effect: None,
                video_timestamp: None,
                allow_paid_stars: None,
                allow_paid_floodskip: false,
                suggested_post: None,
            })
            .await?;
        Ok(())
    }

    async fn join(&self, target: &JoinTarget) -> Result<(), TelegramError> {
        match target {
            JoinTarget::Username(username) => {
                let resolved = self
                    .resolve_channel(&ChannelRef::Username(username.clone()))
                    .await?;
                let PeerKind::Channel(channel_id) = resolved.chat.kind() else {
                    return Err(TelegramError::NotFound(format!("@{username} is not a group")));
                };
                let channel = self.input_channel(channel_id).await?;
                self.client
                    .invoke(&tl::functions::channels::JoinChannel { channel })
                    .await?;
            }
            JoinTarget::InviteHash(hash) => {
                self.client
                    .invoke(&tl::functions::messages::ImportChatInvite { hash: hash.clone() })
                    .await?;
            }
        }
        Ok(())
    }

    async fn leave(&self, chat: ChatId) -> Result<(), TelegramError> {
        match chat.kind() {
            PeerKind::Channel(channel_id) => {
                let channel = self.input_channel(channel_id).await?;
                self.client
                    .invoke(&tl::functions::channels::LeaveChannel { channel })
                    .await?;
            }
            PeerKind::Group(chat_id) => {
                self.client
                    .invoke(&tl::functions::messages::DeleteChatUser {
                        revoke_history: false,
                        chat_id,
                        user_id: tl::enums::InputUser::UserSelf,
                    })
                    .await?;
            }
            PeerKind::User(_) => {
                warn!("Refusing to leave private chat {}", chat);
            }
        }
        Ok(())
    }

    async fn react(
        &self,
        chat: ChatId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), TelegramError> {
        let peer = self.input_peer(chat).await?;
        self.client
            .invoke(&tl::functions::messages::SendReaction {
                big: false,
                add_to_recent: false,
                peer,
                msg_id: message,
                reaction: Some(vec![tl::enums::Reaction::Emoji(tl::types::ReactionEmoji {
                    emoticon: emoji.to_owned(),
                })]),
            })
            .await?;
        Ok(())
    }

    async fn resolve_channel(
        &self,
        reference: &ChannelRef,
    ) -> Result<ResolvedChannel, TelegramError> {
        match reference {
            ChannelRef::Username(username) => {
                let tl::enums::contacts::ResolvedPeer::Peer(resolved) = self
                    .client
                    .invoke(&tl::functions::contacts::ResolveUsername {
                        username: username.clone(),
                        referer: None,
                    })
                    .await?;
                self.remember(&resolved.users, &resolved.chats);

                let chat = chat_of(&resolved.peer);
                Ok(ResolvedChannel {
                    chat,
                    username: Some(username.clone()),
                })
            }
            ChannelRef::Id(chat) => {
                self.input_peer(*chat).await?;
                let username = match chat.kind() {
                    PeerKind::Channel(id) => self
                        .peers()
                        .channels
                        .get(&id)
                        .and_then(|c| c.username.clone()),
                    PeerKind::User(_) | PeerKind::Group(_) => None,
                };
                Ok(ResolvedChannel {
                    chat: *chat,
                    username,
                })
            }
        }
    }

    async fn latest_post(&self, channel: ChatId) -> Result<Option<ChannelPost>, TelegramError> {
        let peer = self.input_peer(channel).await?;
        let history = self
            .client
            .invoke(&tl::functions::messages::GetHistory {
                peer,
                offset_id: 0,
                offset_date: 0,
                add_offset: 0,
                limit: 1,
                max_id: 0,
                min_id: 0,
                hash: 0,
            })
            .await?;

        Ok(self.unpack_messages(history).iter().find_map(channel_post))
    }

    async fn post(
        &self,
        channel: ChatId,
        id: MessageId,
    ) -> Result<Option<ChannelPost>, TelegramError> {
        let messages = self.messages_by_id(channel, vec![id]).await?;
        Ok(messages.iter().find_map(channel_post))
    }

    async fn sticker_of(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<Option<String>, TelegramError> {
        let messages = self.messages_by_id(chat, vec![message]).await?;
        Ok(messages
            .iter()
            .find_map(sticker_in)
            .map(|sticker| sticker.encode()))
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("peers", &self.peers())
            .finish_non_exhaustive()
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}
