//! Service container.
//!
//! Builds the store, credential service, resolver client, feedback sinks and
//! the dispatcher from an [`AppConfig`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::config::AppConfig;
use crate::credentials::{CredentialService, SpotifyTokenRefresher};
use crate::dispatch::TokenGatedDispatcher;
use crate::host::HostOutbox;
use crate::notification::{
    BadgeGroup, LogChannel, NotificationChannel, NotificationService, StoreBadge, WebhookChannel,
};
use crate::outcome::OutcomeHandlers;
use crate::resolver::ResolverClient;
use crate::store::{JsonFileStore, KeyValueStore, MemoryStore};

/// Service container holding the wired application services.
pub struct ServiceContainer {
    pub config: AppConfig,
    /// Shared key/value store.
    pub store: Arc<dyn KeyValueStore>,
    pub credentials: Arc<CredentialService>,
    pub dispatcher: Arc<TokenGatedDispatcher>,
}

impl ServiceContainer {
    /// Open the configured store and wire everything on top of it.
    ///
    /// Pass `outbox` when running as a native messaging host so
    /// notifications and badge updates reach the extension.
    pub async fn new(config: AppConfig, outbox: Option<HostOutbox>) -> Result<Self> {
        let store = open_store(&config).await?;
        Self::with_store(config, store, outbox)
    }

    /// Wire services over an existing store.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        outbox: Option<HostOutbox>,
    ) -> Result<Self> {
        let client = config.http_client()?;

        let refresher = Arc::new(SpotifyTokenRefresher::new(
            client.clone(),
            config.token_url.clone(),
            config.client_id.clone(),
        ));
        let credentials = Arc::new(CredentialService::new(
            store.clone(),
            refresher,
            config.refresh_after(),
        ));

        let resolver = ResolverClient::new(client, &config.resolver_url)?;

        let mut notifications = NotificationService::new(config.icon_url.clone());
        notifications.add_channel(Arc::new(LogChannel));
        if let Some(webhook) = config.webhook.clone() {
            let channel = WebhookChannel::new(webhook)?;
            if channel.is_enabled() {
                notifications.add_channel(Arc::new(channel));
            }
        }

        let mut badge = BadgeGroup::new().with(Arc::new(StoreBadge::new(store.clone())));

        if let Some(outbox) = outbox {
            let outbox = Arc::new(outbox);
            notifications.add_channel(outbox.clone());
            badge = badge.with(outbox);
        }

        debug!(
            channels = notifications.channel_count(),
            resolver = %resolver.endpoint(),
            "Feedback sinks configured"
        );

        let outcomes = OutcomeHandlers::new(store.clone(), Arc::new(notifications), Arc::new(badge));
        let dispatcher = Arc::new(TokenGatedDispatcher::new(
            credentials.clone(),
            resolver,
            outcomes,
            config.gate_policy,
        ));

        info!(
            provider = credentials.provider_id(),
            gate_policy = ?config.gate_policy,
            "Services initialized"
        );

        Ok(Self {
            config,
            store,
            credentials,
            dispatcher,
        })
    }
}

/// JSON file store when a path is configured, otherwise in-memory.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    match &config.store_path {
        Some(path) => {
            let store = JsonFileStore::open(path).await?;
            info!(path = %store.path().display(), "Using JSON file store");
            Ok(Arc::new(store))
        }
        None => {
            debug!("No store path configured; using an in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_by_default() {
        let container = ServiceContainer::new(AppConfig::default(), None)
            .await
            .unwrap();
        assert!(container.credentials.load().await.unwrap().refresh_token.is_none());
        assert_eq!(container.credentials.provider_id(), "spotify");
    }

    #[tokio::test]
    async fn test_file_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            store_path: Some(dir.path().join("store.json")),
            ..Default::default()
        };

        let container = ServiceContainer::new(config.clone(), None).await.unwrap();
        container.credentials.store_grant("A1", "R1").await.unwrap();

        let reopened = ServiceContainer::new(config, None).await.unwrap();
        let stored = reopened.credentials.load().await.unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("A1"));
    }
}
