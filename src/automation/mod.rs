//! Autonomous sticker posting.
//!
//! A background loop drops a random stored sticker into a random postable
//! group, governed by feature toggles that commands flip at runtime.

mod runner;
mod toggles;

pub use runner::{EMPTY_RETRY, IDLE_POLL, StickerLoop, TRANSPORT_BACKOFF};
pub use toggles::Toggles;
