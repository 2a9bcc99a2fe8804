//! User-visible feedback: notifications and the toolbar badge.
//!
//! Every dispatch outcome the user should see becomes a [`NotificationEvent`].
//! The [`NotificationService`] renders it into [`NotificationOptions`] and
//! fans it out to all enabled channels. Delivery is best-effort.

pub mod badge;
pub mod channels;
pub mod events;
pub mod service;

pub use badge::{BadgeGroup, BadgeIndicator, StoreBadge};
pub use channels::{LogChannel, NotificationChannel, WebhookChannel, WebhookConfig};
pub use events::{NotificationEvent, NotificationKind, NotificationOptions, NotificationPriority};
pub use service::NotificationService;
