//! Messages exchanged with the extension.

use serde::{Deserialize, Serialize};

use crate::notification::NotificationOptions;

/// Trigger sent by the page's content script.
pub const GET_MUSIC: &str = "get music";

/// Incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerMessage {
    pub message: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl TriggerMessage {
    /// The URL to dispatch, when this is a "get music" trigger that has one.
    pub fn target_url(&self) -> Option<&str> {
        if self.message != GET_MUSIC {
            return None;
        }
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Outgoing message; the extension applies it with the matching browser API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Notification {
        id: String,
        options: NotificationOptions,
    },
    Badge {
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::notification::NotificationKind;

    #[test]
    fn test_trigger_target_url() {
        let trigger: TriggerMessage = serde_json::from_value(json!({
            "message": "get music",
            "url": "https://www.youtube.com/watch?v=abc"
        }))
        .unwrap();
        assert_eq!(
            trigger.target_url(),
            Some("https://www.youtube.com/watch?v=abc")
        );

        let other: TriggerMessage =
            serde_json::from_value(json!({"message": "ping", "url": "x"})).unwrap();
        assert_eq!(other.target_url(), None);

        let no_url: TriggerMessage = serde_json::from_value(json!({"message": "get music"})).unwrap();
        assert_eq!(no_url.target_url(), None);
    }

    #[test]
    fn test_host_message_shape() {
        let notification = HostMessage::Notification {
            id: "Song added!".to_string(),
            options: NotificationOptions {
                kind: NotificationKind::Basic,
                icon_url: "../images/icon32.png".to_string(),
                title: "Song added to Spotify!".to_string(),
                message: "X by Y".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "type": "notification",
                "id": "Song added!",
                "options": {
                    "type": "basic",
                    "iconUrl": "../images/icon32.png",
                    "title": "Song added to Spotify!",
                    "message": "X by Y"
                }
            })
        );

        let badge = HostMessage::Badge {
            color: Some("red".to_string()),
            text: None,
        };
        assert_eq!(
            serde_json::to_value(&badge).unwrap(),
            json!({"type": "badge", "color": "red"})
        );
    }
}
