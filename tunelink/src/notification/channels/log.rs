//! Tracing-backed notification channel.

use async_trait::async_trait;
use tracing::info;

use super::NotificationChannel;
use crate::Result;
use crate::notification::events::NotificationOptions;

/// Writes notifications to the log. Always enabled; useful for the one-shot
/// CLI where no browser is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn channel_type(&self) -> &'static str {
        "log"
    }

    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<()> {
        info!(
            notification_id = %id,
            title = %options.title,
            message = %options.message,
            "Notification"
        );
        Ok(())
    }
}
