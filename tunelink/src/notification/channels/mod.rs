//! Notification channels.
//!
//! - Log: writes the notification to the tracing output
//! - Webhook: generic HTTP POST
//!
//! The native messaging outbox in [`crate::host`] is a channel too.

mod log;
mod webhook;

pub use log::LogChannel;
pub use webhook::{WebhookChannel, WebhookConfig};

use async_trait::async_trait;

use super::events::NotificationOptions;
use crate::Result;

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Check if the channel is enabled.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Show a notification. Reusing `id` replaces the earlier notification.
    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<()>;
}
