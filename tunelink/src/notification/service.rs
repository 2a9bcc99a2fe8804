//! Notification service.
//!
//! Renders events and fans them out to every enabled channel. A failing
//! channel is logged and skipped; it never fails the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use super::channels::NotificationChannel;
use super::events::{NotificationEvent, NotificationPriority};

/// Default icon, relative to the extension's background script.
pub const DEFAULT_ICON_URL: &str = "../images/icon32.png";

pub struct NotificationService {
    channels: Vec<Arc<dyn NotificationChannel>>,
    icon_url: String,
}

impl NotificationService {
    pub fn new(icon_url: impl Into<String>) -> Self {
        Self {
            channels: Vec::new(),
            icon_url: icon_url.into(),
        }
    }

    /// Register a channel.
    pub fn add_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels.push(channel);
    }

    /// Builder-style [`Self::add_channel`].
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.add_channel(channel);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver `event` to all enabled channels.
    ///
    /// Returns the number of channels that accepted it.
    pub async fn notify(&self, event: &NotificationEvent) -> usize {
        let id = event.notification_id();
        let options = event.to_options(&self.icon_url);
        let mut delivered = 0;

        for channel in self.channels.iter().filter(|c| c.is_enabled()) {
            match channel.create(id, &options).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    channel = channel.channel_type(),
                    event_type = event.event_type(),
                    error = %e,
                    "Failed to deliver notification"
                ),
            }
        }

        let priority = event.priority();
        if delivered == 0 && priority >= NotificationPriority::High {
            warn!(
                event_type = event.event_type(),
                %priority,
                "Notification reached no channel"
            );
        }

        debug!(
            event_type = event.event_type(),
            %priority,
            occurred_at = %event.timestamp(),
            delivered,
            "Notification dispatched"
        );
        delivered
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_URL)
    }
}
