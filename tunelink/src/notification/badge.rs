//! Toolbar badge indicator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::Result;
use crate::store::{KeyValueStore, keys, store_map};

/// Badge shown on the extension's toolbar icon.
#[async_trait]
pub trait BadgeIndicator: Send + Sync {
    async fn set_color(&self, color: &str) -> Result<()>;

    async fn set_text(&self, text: &str) -> Result<()>;
}

/// Mirrors the badge into the shared store so the popup can restore it.
pub struct StoreBadge {
    store: Arc<dyn KeyValueStore>,
}

impl StoreBadge {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BadgeIndicator for StoreBadge {
    async fn set_color(&self, color: &str) -> Result<()> {
        self.store
            .set(store_map([(keys::BADGE_COLOR, json!(color))]))
            .await?;
        Ok(())
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        self.store
            .set(store_map([(keys::BADGE_TEXT, json!(text))]))
            .await?;
        Ok(())
    }
}

/// Applies badge updates to several indicators; failures are logged per
/// indicator and the first one is returned.
#[derive(Default)]
pub struct BadgeGroup {
    indicators: Vec<Arc<dyn BadgeIndicator>>,
}

impl BadgeGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, indicator: Arc<dyn BadgeIndicator>) -> Self {
        self.indicators.push(indicator);
        self
    }
}

#[async_trait]
impl BadgeIndicator for BadgeGroup {
    async fn set_color(&self, color: &str) -> Result<()> {
        let mut first_err = None;
        for indicator in &self.indicators {
            if let Err(e) = indicator.set_color(color).await {
                warn!(error = %e, "Failed to set badge color");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        let mut first_err = None;
        for indicator in &self.indicators {
            if let Err(e) = indicator.set_text(text).await {
                warn!(error = %e, "Failed to set badge text");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
