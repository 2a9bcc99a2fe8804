//! Dispatch outcomes and their handlers.
//!
//! An outcome is written to the shared store for the popup, overwriting the
//! previous one, and announced with a notification. Handlers are terminal:
//! they never retry or chain into another dispatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumString};
use tracing::{info, warn};

use crate::Result;
use crate::notification::{BadgeIndicator, NotificationEvent, NotificationService};
use crate::resolver::AddedTrack;
use crate::store::{KeyValueStore, StoreMap, keys, store_map};

/// Stored error text for a track the resolver could not match.
pub const SONG_NOT_FOUND: &str = "Song not found";

/// Badge shown after a successful like.
pub const ADDED_BADGE_COLOR: &str = "red";
pub const ADDED_BADGE_TEXT: &str = "1";

/// Why a dispatch did not add a track. Stored under `errorKind`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The resolver answered with `error`.
    NotFound,
    /// No usable credential is stored.
    NotAuthorized,
    /// The token endpoint rejected the refresh or could not be reached.
    RefreshFailed,
    /// The resolver could not be reached.
    Network,
    /// The shared store could not be read.
    Store,
}

impl FailureKind {
    /// Short text, stored under `error` and used as notification title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::NotFound => SONG_NOT_FOUND,
            Self::NotAuthorized => "Spotify account not connected",
            Self::RefreshFailed => "Could not renew Spotify session",
            Self::Network => "Song service unreachable",
            Self::Store => "Extension storage unavailable",
        }
    }

    /// Notification body.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => {
                "Unfortunately, the song could not be found so nothing was added to your \
                 liked songs list on Spotify."
            }
            Self::NotAuthorized => {
                "Connect your Spotify account from the extension popup, then try again."
            }
            Self::RefreshFailed => {
                "Your Spotify session could not be renewed, so nothing was added to your liked \
                 songs. Try again, or reconnect your account if this keeps happening."
            }
            Self::Network => {
                "The song service could not be reached, so nothing was added to your liked \
                 songs on Spotify. Please try again later."
            }
            Self::Store => {
                "The extension could not read its saved settings, so nothing was added to your \
                 liked songs on Spotify."
            }
        }
    }

    /// The user must authorize again before a retry can succeed.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::NotAuthorized)
    }
}

/// What the popup shows for the last dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeRecord {
    Added {
        title: String,
        artist: String,
        added_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        kind: FailureKind,
    },
}

impl OutcomeRecord {
    pub fn failed(kind: FailureKind) -> Self {
        Self::Failed {
            error: kind.title().to_string(),
            kind,
        }
    }

    /// Keys to write, and keys to clear so no stale fields survive.
    pub fn to_store_update(&self) -> (StoreMap, &'static [&'static str]) {
        match self {
            Self::Added {
                title,
                artist,
                added_at,
            } => (
                store_map([
                    (keys::ADDED_SONG_TITLE, json!(title)),
                    (keys::ADDED_SONG_ARTIST, json!(artist)),
                    (keys::SONG_ADDED_TIME, json!(added_at.timestamp_millis())),
                ]),
                keys::ERROR_KEYS,
            ),
            Self::Failed { error, kind } => (
                store_map([
                    (keys::ERROR, json!(error)),
                    (keys::ERROR_KIND, json!(kind.as_ref())),
                ]),
                keys::SONG_KEYS,
            ),
        }
    }

    /// Read the last outcome back. An `error` entry takes precedence, as in
    /// the popup.
    pub fn from_store_map(map: &StoreMap) -> Option<Self> {
        if let Some(error) = map.get(keys::ERROR).and_then(Value::as_str) {
            let kind = map
                .get(keys::ERROR_KIND)
                .and_then(Value::as_str)
                .and_then(|k| k.parse().ok())
                .unwrap_or(FailureKind::NotFound);
            return Some(Self::Failed {
                error: error.to_string(),
                kind,
            });
        }

        let title = map.get(keys::ADDED_SONG_TITLE).and_then(Value::as_str)?;
        let artist = map
            .get(keys::ADDED_SONG_ARTIST)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let added_at = map
            .get(keys::SONG_ADDED_TIME)
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default();

        Some(Self::Added {
            title: title.to_string(),
            artist: artist.to_string(),
            added_at,
        })
    }
}

/// All keys an outcome may occupy.
pub const OUTCOME_KEYS: &[&str] = &[
    keys::ADDED_SONG_TITLE,
    keys::ADDED_SONG_ARTIST,
    keys::SONG_ADDED_TIME,
    keys::ERROR,
    keys::ERROR_KIND,
];

/// Writes outcomes and notifies the user.
pub struct OutcomeHandlers {
    store: Arc<dyn KeyValueStore>,
    notifications: Arc<NotificationService>,
    badge: Arc<dyn BadgeIndicator>,
}

impl OutcomeHandlers {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        notifications: Arc<NotificationService>,
        badge: Arc<dyn BadgeIndicator>,
    ) -> Self {
        Self {
            store,
            notifications,
            badge,
        }
    }

    /// Track liked: record it, notify, and raise the badge.
    ///
    /// The track is already liked at this point, so the notification and
    /// badge go out even when the store write fails.
    pub async fn on_added(&self, track: &AddedTrack) -> Result<OutcomeRecord> {
        let record = OutcomeRecord::Added {
            title: track.title.clone(),
            artist: track.artist.clone(),
            added_at: Utc::now(),
        };
        let written = self.write(&record).await;

        info!(title = %track.title, artist = %track.artist, "Song added");

        self.notifications
            .notify(&NotificationEvent::SongAdded {
                title: track.title.clone(),
                artist: track.artist.clone(),
                timestamp: Utc::now(),
            })
            .await;

        if let Err(e) = self.badge.set_color(ADDED_BADGE_COLOR).await {
            warn!(error = %e, "Failed to set badge color");
        }
        if let Err(e) = self.badge.set_text(ADDED_BADGE_TEXT).await {
            warn!(error = %e, "Failed to set badge text");
        }

        written.map(|()| record)
    }

    /// Resolver had no match: clear the previous track and record the error.
    pub async fn on_not_found(&self, video_url: &str) -> Result<OutcomeRecord> {
        let record = OutcomeRecord::failed(FailureKind::NotFound);
        let written = self.write(&record).await;

        info!(%video_url, "Song not found");

        self.notifications
            .notify(&NotificationEvent::SongNotFound {
                video_url: video_url.to_string(),
                timestamp: Utc::now(),
            })
            .await;

        written.map(|()| record)
    }

    /// The dispatch aborted: record why and tell the user.
    pub async fn on_failure(&self, kind: FailureKind, detail: &str) -> Result<OutcomeRecord> {
        let record = OutcomeRecord::failed(kind);
        let written = self.write(&record).await;

        self.notifications
            .notify(&NotificationEvent::DispatchFailed {
                kind,
                detail: detail.to_string(),
                timestamp: Utc::now(),
            })
            .await;

        written.map(|()| record)
    }

    /// New keys are written before the stale ones are cleared, so a failed
    /// write leaves the previous record readable.
    async fn write(&self, record: &OutcomeRecord) -> Result<()> {
        let (set, clear) = record.to_store_update();
        self.store.set(set).await?;
        self.store.remove(clear).await?;
        Ok(())
    }
}
