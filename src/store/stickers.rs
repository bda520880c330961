//! File-backed list of sticker identifiers.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

/// Errors that can occur while reading or writing the sticker file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access sticker file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse sticker file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result of adding an identifier to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The identifier was appended and persisted.
    Added,
    /// The identifier was already stored; nothing changed.
    AlreadyPresent,
}

/// Ordered list of sticker identifiers persisted as a JSON array.
///
/// The store keeps no in-memory copy: every call goes back to the file, so
/// edits made while the bot is running are picked up on the next read.
#[derive(Debug, Clone)]
pub struct StickerStore {
    path: PathBuf,
}

impl StickerStore {
    /// Creates a store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all identifiers.
    ///
    /// A missing file is created with an empty list. Any failure is logged
    /// and yields an empty list.
    pub fn load(&self) -> Vec<String> {
        match self.try_load() {
            Ok(ids) => ids,
            Err(e) => {
                error!("Error loading sticker list from {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Loads all identifiers, reporting failures to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, created or parsed.
    pub fn try_load(&self) -> Result<Vec<String>, StoreError> {
        if !self.path.exists() {
            debug!("Sticker file {} not found, creating it", self.path.display());
            self.try_save(&[])?;
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let ids: Vec<String> = serde_json::from_str(&content)?;
        Ok(ids)
    }

    /// Overwrites the file with the given identifiers. Failures are logged.
    pub fn save(&self, ids: &[String]) {
        if let Err(e) = self.try_save(ids) {
            error!("Error saving sticker list to {}: {}", self.path.display(), e);
        }
    }

    /// Overwrites the file with the given identifiers.
    ///
    /// The content is written to a sibling temporary file first and then
    /// renamed over the target.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem step fails.
    pub fn try_save(&self, ids: &[String]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(ids)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Appends an identifier unless it is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the current list cannot be read or the updated
    /// one cannot be written. An unreadable file is left untouched.
    pub fn add(&self, id: &str) -> Result<AddOutcome, StoreError> {
        let mut ids = self.try_load()?;
        if ids.iter().any(|existing| existing == id) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        ids.push(id.to_owned());
        self.try_save(&ids)?;
        info!("Stored sticker ...{} ({} total)", tail(id, 10), ids.len());
        Ok(AddOutcome::Added)
    }

    /// Number of stored identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.load().len()
    }

    /// Whether the store holds no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the last `n` characters of `s`, used to keep long tokens out of
/// replies and logs.
#[must_use]
pub fn tail(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    s.char_indices().nth(skip).map_or(s, |(idx, _)| &s[idx..])
}
