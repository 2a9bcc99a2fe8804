//! Webhook mirror for notifications.
//!
//! Posts every notification as JSON to a user-supplied URL, e.g. a phone
//! push relay, so outcomes are visible when the browser window is hidden.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::NotificationChannel;
use crate::notification::events::NotificationOptions;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            headers: BTreeMap::new(),
            bearer_token: None,
            timeout_secs: 10,
        }
    }
}

pub struct WebhookChannel {
    config: WebhookConfig,
    headers: HeaderMap,
    client: Client,
}

impl WebhookChannel {
    /// Build the channel, rejecting header names or values that cannot be
    /// sent.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let headers = build_headers(&config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build webhook client: {}", e)))?;

        Ok(Self {
            config,
            headers,
            client,
        })
    }
}

fn build_headers(config: &WebhookConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.headers.len() + 1);

    for (name, value) in &config.headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| Error::config(format!("Invalid webhook header name {name:?}: {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| Error::config(format!("Invalid value for webhook header {name}: {e}")))?;
        headers.insert(name, value);
    }

    if let Some(token) = &config.bearer_token {
        let mut value = HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|e| Error::config(format!("Invalid webhook bearer token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn payload(id: &str, options: &NotificationOptions) -> Value {
    json!({
        "id": id,
        "title": options.title,
        "message": options.message,
        "iconUrl": options.icon_url,
        "sentAt": Utc::now().to_rfc3339(),
    })
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.url.is_empty()
    }

    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<()> {
        let response = self
            .client
            .post(&self.config.url)
            .headers(self.headers.clone())
            .json(&payload(id, options))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "Webhook rejected notification");
            return Err(Error::Other(format!("Webhook returned {status}")));
        }

        debug!(notification_id = %id, "Webhook notification sent");
        Ok(())
    }
}
