//! Sticker identifier persistence.

mod stickers;

pub use stickers::{AddOutcome, StickerStore, StoreError, tail};

#[cfg(test)]
pub(crate) use stickers::tests::temp_path;
