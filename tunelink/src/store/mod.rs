//! Key-value store capability shared with the extension popup.
//!
//! The popup reads the same keys the dispatcher writes, so key names are
//! part of the external contract and must not change.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Key/value pairs read from or written to a store.
pub type StoreMap = serde_json::Map<String, Value>;

/// Keys shared with the popup.
pub mod keys {
    /// Epoch milliseconds of the last grant or refresh.
    pub const TIME_STAMP: &str = "timeStamp";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const ADDED_SONG_TITLE: &str = "addedSongTitle";
    pub const ADDED_SONG_ARTIST: &str = "addedSongArtist";
    /// Epoch milliseconds of the last successful like.
    pub const SONG_ADDED_TIME: &str = "songAddedTime";
    pub const ERROR: &str = "error";
    pub const ERROR_KIND: &str = "errorKind";
    pub const BADGE_COLOR: &str = "badgeColor";
    pub const BADGE_TEXT: &str = "badgeText";

    pub const CREDENTIAL_KEYS: &[&str] = &[TIME_STAMP, REFRESH_TOKEN, ACCESS_TOKEN];
    pub const SONG_KEYS: &[&str] = &[ADDED_SONG_TITLE, ADDED_SONG_ARTIST, SONG_ADDED_TIME];
    pub const ERROR_KEYS: &[&str] = &[ERROR, ERROR_KIND];
}

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file exists but does not hold a JSON object.
    #[error("Corrupt store at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Failed to persist store: {0}")]
    Persist(String),
}

/// Async key-value capability.
///
/// `set` applies all pairs as one atomic update, so a multi-key record
/// written in a single call is never observed half-written.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError>;

    /// Insert or overwrite all pairs atomically.
    async fn set(&self, items: StoreMap) -> Result<(), StoreError>;

    /// Remove the given keys. Removing a missing key is not an error.
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Fetch a single key.
    async fn get_one(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut map = self.get(&[key]).await?;
        Ok(map.remove(key))
    }
}

/// Build a [`StoreMap`] from `(key, value)` pairs.
pub fn store_map<I, K, V>(pairs: I) -> StoreMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Select `keys` from `data`, the shared read path of both stores.
pub(crate) fn select(data: &StoreMap, keys: &[&str]) -> StoreMap {
    keys.iter()
        .filter_map(|k| data.get(*k).map(|v| ((*k).to_string(), v.clone())))
        .collect()
}
