//! The sticker loop.
//!
//! Each iteration:
//! 1. If automation is off → poll again shortly
//! 2. Reload the sticker store; empty → wait a minute
//! 3. List postable groups; none → wait a minute
//! 4. Send a random sticker to a random group
//! 5. Sleep a random delay from the configured window
//!
//! Failures change step 5: a flood wait replaces the random delay with the
//! requested wait, a connection failure with a fixed backoff. A group that
//! forbids writing is left.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Toggles;
use crate::config::BotSettings;
use crate::store::{StickerStore, tail};
use crate::telegram::{ChatId, Disposition, Messenger, TelegramError, list_postable_groups};

/// How often a disabled loop checks whether it was re-enabled.
pub const IDLE_POLL: Duration = Duration::from_secs(5);

/// Wait after finding no stickers or no groups.
pub const EMPTY_RETRY: Duration = Duration::from_secs(60);

/// Wait after a transport failure.
pub const TRANSPORT_BACKOFF: Duration = Duration::from_secs(10);

/// Background task that periodically posts stickers.
pub struct StickerLoop<M: Messenger + ?Sized> {
    messenger: Arc<M>,
    store: StickerStore,
    toggles: Arc<Toggles>,
    min_delay_secs: u64,
    max_delay_secs: u64,
    shutdown: CancellationToken,
}

impl<M: Messenger + ?Sized> StickerLoop<M> {
    /// Creates a new sticker loop.
    #[must_use]
    pub fn new(
        messenger: Arc<M>,
        settings: &BotSettings,
        toggles: Arc<Toggles>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            messenger,
            store: StickerStore::new(&settings.store_path),
            toggles,
            min_delay_secs: settings.min_delay_secs,
            max_delay_secs: settings.max_delay_secs.max(settings.min_delay_secs),
            shutdown,
        }
    }

    /// Runs until shutdown is requested.
    pub async fn run(&self) {
        info!("Sticker loop started");

        loop {
            let pause = self.step().await;
            if !self.sleep(pause).await {
                break;
            }
        }

        info!("Sticker loop stopped");
    }

    /// One iteration; returns how long to sleep before the next.
    async fn step(&self) -> Duration {
        if !self.toggles.automation() {
            return IDLE_POLL;
        }

        let stickers = self.store.load();
        if stickers.is_empty() {
            warn!("No stickers stored, add some with addpack");
            return EMPTY_RETRY;
        }

        let groups = list_postable_groups(self.messenger.as_ref()).await;
        if groups.is_empty() {
            warn!("No postable groups found");
            return EMPTY_RETRY;
        }

        let Some((sticker, group)) = pick(&stickers, &groups) else {
            return IDLE_POLL;
        };

        match self.messenger.send_sticker(group, &sticker).await {
            Ok(()) => {
                info!("Sent sticker ...{} to {}", tail(&sticker, 8), group);
                self.random_delay()
            }
            Err(e) => self.on_send_error(group, &e).await,
        }
    }

    async fn on_send_error(&self, group: ChatId, err: &TelegramError) -> Duration {
        match err.disposition() {
            Disposition::Retry { after } => {
                warn!("Flood wait of {}s while sending to {}", after.as_secs(), group);
                after
            }
            Disposition::LeaveGroup => {
                warn!("Cannot write to {} ({}), leaving", group, err);
                match self.messenger.leave(group).await {
                    Ok(()) => info!("Left group {}", group),
                    Err(e) => error!("Failed to leave {}: {}", group, e),
                }
                self.random_delay()
            }
            _ if err.is_transport() => {
                error!("Connection problem while sending to {}: {}", group, err);
                TRANSPORT_BACKOFF
            }
            _ => {
                error!("Failed to send sticker to {}: {}", group, err);
                self.random_delay()
            }
        }
    }

    fn random_delay(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.min_delay_secs..=self.max_delay_secs);
        debug!("Next sticker in {}s", secs);
        Duration::from_secs(secs)
    }

    /// Sleeps unless shutdown comes first. Returns false on shutdown.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

fn pick(stickers: &[String], groups: &[ChatId]) -> Option<(String, ChatId)> {
    let mut rng = rand::thread_rng();
    let sticker = stickers.choose(&mut rng)?.clone();
    let group = *groups.choose(&mut rng)?;
    Some((sticker, group))
}

impl<M: Messenger + ?Sized> std::fmt::Debug for StickerLoop<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StickerLoop")
            .field("store", &self.store)
            .field("min_delay_secs", &self.min_delay_secs)
            .field("max_delay_secs", &self.max_delay_secs)
            .finish_non_exhaustive()
    }
}
