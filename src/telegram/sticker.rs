//! Opaque sticker tokens.
//!
//! A token packs everything needed to send a sticker again without
//! re-uploading it: the document id, its access hash and the file reference.
//! The layout is `id (8 bytes LE) | access_hash (8 bytes LE) | file_reference`,
//! encoded as URL-safe base64 without padding so it survives being pasted
//! into a chat.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

/// Errors produced when decoding a sticker token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StickerTokenError {
    #[error("Sticker token is not valid base64")]
    Encoding,

    #[error("Sticker token is too short ({0} bytes)")]
    TooShort(usize),
}

/// A reference to a sticker document stored on Telegram's servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerRef {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: Vec<u8>,
}

impl StickerRef {
    /// Encodes the reference into a token.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(16 + self.file_reference.len());
        bytes.extend_from_slice(&self.id.to_le_bytes());
        bytes.extend_from_slice(&self.access_hash.to_le_bytes());
        bytes.extend_from_slice(&self.file_reference);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Decodes a token produced by [`StickerRef::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not base64 or too short to hold the
    /// two ids.
    pub fn decode(token: &str) -> Result<Self, StickerTokenError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| StickerTokenError::Encoding)?;

        let (Some(id), Some(hash)) = (bytes.get(0..8), bytes.get(8..16)) else {
            return Err(StickerTokenError::TooShort(bytes.len()));
        };
        let (Ok(id), Ok(hash)) = (<[u8; 8]>::try_from(id), <[u8; 8]>::try_from(hash)) else {
            return Err(StickerTokenError::TooShort(bytes.len()));
        };

        Ok(Self {
            id: i64::from_le_bytes(id),
            access_hash: i64::from_le_bytes(hash),
            file_reference: bytes[16..].to_vec(),
        })
    }
}
