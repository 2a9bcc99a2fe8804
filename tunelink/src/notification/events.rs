//! Notification events.
//!
//! Defines the events that can trigger notifications and how they render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::FailureKind;

/// Notification priority levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    #[default]
    Normal,
    High,
    Critical,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Template of a browser notification. Only `basic` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Basic,
}

/// Options accepted by `chrome.notifications.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub icon_url: String,
    pub title: String,
    pub message: String,
}

/// Events that produce a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// The track was liked.
    SongAdded {
        title: String,
        artist: String,
        timestamp: DateTime<Utc>,
    },
    /// The resolver could not match the page to a track.
    SongNotFound {
        video_url: String,
        timestamp: DateTime<Utc>,
    },
    /// The dispatch aborted before the resolver could answer.
    DispatchFailed {
        kind: FailureKind,
        detail: String,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SongAdded { .. } => "song_added",
            Self::SongNotFound { .. } => "song_not_found",
            Self::DispatchFailed { .. } => "dispatch_failed",
        }
    }

    /// Notification id. Reusing an id replaces the previous notification.
    pub fn notification_id(&self) -> &'static str {
        match self {
            Self::SongAdded { .. } => "Song added!",
            Self::SongNotFound { .. } => "Song not found",
            Self::DispatchFailed { .. } => "Dispatch failed",
        }
    }

    pub fn priority(&self) -> NotificationPriority {
        match self {
            Self::SongAdded { .. } | Self::SongNotFound { .. } => NotificationPriority::Normal,
            Self::DispatchFailed { kind, .. } if kind.requires_relogin() => {
                NotificationPriority::Critical
            }
            Self::DispatchFailed { .. } => NotificationPriority::High,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SongAdded { timestamp, .. }
            | Self::SongNotFound { timestamp, .. }
            | Self::DispatchFailed { timestamp, .. } => *timestamp,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::SongAdded { .. } => "Song added to Spotify!".to_string(),
            Self::SongNotFound { .. } => "Song not found".to_string(),
            Self::DispatchFailed { kind, .. } => kind.title().to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::SongAdded { title, artist, .. } => format!(
                "{title} by {artist} has been added to your liked songs on Spotify!"
            ),
            Self::SongNotFound { .. } => "Unfortunately, the song could not be found so nothing \
                 was added to your liked songs list on Spotify."
                .to_string(),
            Self::DispatchFailed { kind, .. } => kind.user_message().to_string(),
        }
    }

    /// Render into browser notification options.
    pub fn to_options(&self, icon_url: &str) -> NotificationOptions {
        NotificationOptions {
            kind: NotificationKind::Basic,
            icon_url: icon_url.to_string(),
            title: self.title(),
            message: self.message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_added_rendering() {
        let event = NotificationEvent::SongAdded {
            title: "X".to_string(),
            artist: "Y".to_string(),
            timestamp: Utc::now(),
        };

        assert_eq!(event.notification_id(), "Song added!");
        let options = event.to_options("../images/icon32.png");
        assert_eq!(options.title, "Song added to Spotify!");
        assert_eq!(
            options.message,
            "X by Y has been added to your liked songs on Spotify!"
        );
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            serde_json::json!({
                "type": "basic",
                "iconUrl": "../images/icon32.png",
                "title": "Song added to Spotify!",
                "message": "X by Y has been added to your liked songs on Spotify!"
            })
        );
    }

    #[test]
    fn test_song_not_found_rendering() {
        let event = NotificationEvent::SongNotFound {
            video_url: "https://example.com".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.notification_id(), "Song not found");
        assert_eq!(event.title(), "Song not found");
        assert!(event.message().starts_with("Unfortunately, the song could not be found"));
    }

    #[test]
    fn test_failure_priority() {
        let relogin = NotificationEvent::DispatchFailed {
            kind: FailureKind::NotAuthorized,
            detail: String::new(),
            timestamp: Utc::now(),
        };
        let network = NotificationEvent::DispatchFailed {
            kind: FailureKind::Network,
            detail: String::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(relogin.priority(), NotificationPriority::Critical);
        assert_eq!(network.priority(), NotificationPriority::High);
        assert!(network.priority() > NotificationPriority::Normal);
    }
}
