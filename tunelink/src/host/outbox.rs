//! Outgoing side of the native messaging host.
//!
//! Notifications and badge updates are queued as [`HostMessage`]s and written
//! to stdout by the host's writer task, so concurrent dispatches never
//! interleave frames.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::messages::HostMessage;
use crate::notification::{BadgeIndicator, NotificationChannel, NotificationOptions};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct HostOutbox {
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl HostOutbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, message: HostMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| Error::protocol("host output is closed"))
    }
}

#[async_trait]
impl NotificationChannel for HostOutbox {
    fn channel_type(&self) -> &'static str {
        "native_messaging"
    }

    fn is_enabled(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<()> {
        self.send(HostMessage::Notification {
            id: id.to_string(),
            options: options.clone(),
        })
    }
}

#[async_trait]
impl BadgeIndicator for HostOutbox {
    async fn set_color(&self, color: &str) -> Result<()> {
        self.send(HostMessage::Badge {
            color: Some(color.to_string()),
            text: None,
        })
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        self.send(HostMessage::Badge {
            color: None,
            text: Some(text.to_string()),
        })
    }
}
