//! Credential service.
//!
//! Reads the stored record, decides whether it is fresh, and performs and
//! persists refreshes. Callers serialize refreshes themselves; see
//! [`crate::dispatch::TokenGatedDispatcher`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{debug, info, instrument, warn};

use crate::store::{KeyValueStore, keys};

use super::error::CredentialError;
use super::refresher::TokenRefresher;
use super::types::{CredentialRecord, Freshness, StoredCredentials};

/// Default age after which the access token is refreshed (50 minutes).
pub const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(3000);

pub struct CredentialService {
    store: Arc<dyn KeyValueStore>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_after: TimeDelta,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        refresher: Arc<dyn TokenRefresher>,
        refresh_after: Duration,
    ) -> Self {
        Self {
            store,
            refresher,
            refresh_after: TimeDelta::from_std(refresh_after).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn refresh_after(&self) -> TimeDelta {
        self.refresh_after
    }

    pub fn provider_id(&self) -> &'static str {
        self.refresher.provider_id()
    }

    /// Read the credential fields from the store.
    pub async fn load(&self) -> Result<StoredCredentials, CredentialError> {
        let map = self.store.get(keys::CREDENTIAL_KEYS).await?;
        StoredCredentials::from_store_map(&map)
    }

    /// Load the record and classify it against the current time.
    pub async fn check(&self) -> Result<(StoredCredentials, Freshness), CredentialError> {
        let stored = self.load().await?;
        let freshness = stored.freshness(Utc::now(), self.refresh_after);
        debug!(
            elapsed_secs = ?freshness.elapsed_secs(),
            expired = freshness.is_expired(),
            "Checked credential freshness"
        );
        Ok((stored, freshness))
    }

    /// Exchange the stored refresh token and persist the new pair.
    ///
    /// The new record is written in one store update. On failure the stored
    /// record is left untouched.
    #[instrument(skip_all, fields(provider = self.refresher.provider_id()))]
    pub async fn refresh(
        &self,
        stored: &StoredCredentials,
    ) -> Result<CredentialRecord, CredentialError> {
        let Some(current_refresh) = stored.refresh_token.as_deref() else {
            warn!("Missing refresh_token - cannot refresh");
            return Err(CredentialError::MissingRefreshToken);
        };

        info!("Starting credential refresh");

        let refreshed = self.refresher.refresh(current_refresh).await?;

        let refresh_token = match refreshed.refresh_token {
            Some(token) => token,
            None => {
                warn!("Provider did not rotate the refresh token; keeping the current one");
                current_refresh.to_string()
            }
        };

        let record = CredentialRecord::new(refreshed.access_token, refresh_token, Utc::now());
        self.store.set(record.to_store_map()).await?;

        info!(
            expires_in = ?refreshed.expires_in,
            "Credential refresh successful"
        );

        Ok(record)
    }

    /// Persist a token pair obtained from an external authorization.
    pub async fn store_grant(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<CredentialRecord, CredentialError> {
        let record = CredentialRecord::new(access_token, refresh_token, Utc::now());
        self.store.set(record.to_store_map()).await?;
        info!("Stored credential grant");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::credentials::RefreshedCredentials;
    use crate::store::{MemoryStore, store_map};

    struct FakeRefresher {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
        result: fn() -> Result<RefreshedCredentials, CredentialError>,
    }

    impl FakeRefresher {
        fn new(result: fn() -> Result<RefreshedCredentials, CredentialError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                result,
            })
        }
    }

    #[async_trait]
    impl TokenRefresher for FakeRefresher {
        fn provider_id(&self) -> &'static str {
            "fake"
        }

        async fn refresh(
            &self,
            refresh_token: &str,
        ) -> Result<RefreshedCredentials, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(refresh_token.to_string());
            (self.result)()
        }
    }

    fn rotated() -> Result<RefreshedCredentials, CredentialError> {
        Ok(RefreshedCredentials {
            access_token: "A2".to_string(),
            refresh_token: Some("R2".to_string()),
            expires_in: Some(3600),
        })
    }

    fn not_rotated() -> Result<RefreshedCredentials, CredentialError> {
        Ok(RefreshedCredentials {
            access_token: "A2".to_string(),
            refresh_token: None,
            expires_in: None,
        })
    }

    fn rejected() -> Result<RefreshedCredentials, CredentialError> {
        Err(CredentialError::InvalidRefreshToken)
    }

    fn expired_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_entries(store_map([
            (keys::ACCESS_TOKEN, json!("A1")),
            (keys::REFRESH_TOKEN, json!("R1")),
            (
                keys::TIME_STAMP,
                json!(Utc::now().timestamp_millis() - 3_100_000),
            ),
        ])))
    }

    #[tokio::test]
    async fn test_refresh_replaces_refresh_token() {
        let store = expired_store();
        let refresher = FakeRefresher::new(rotated);
        let service = CredentialService::new(
            store.clone(),
            refresher.clone(),
            DEFAULT_REFRESH_AFTER,
        );

        let (stored, freshness) = service.check().await.unwrap();
        assert!(freshness.is_expired());

        let record = service.refresh(&stored).await.unwrap();
        assert_eq!(record.refresh_token, "R2");
        assert_eq!(refresher.seen.lock().as_slice(), ["R1"]);

        let (stored, freshness) = service.check().await.unwrap();
        assert!(!freshness.is_expired());
        assert_eq!(stored.access_token.as_deref(), Some("A2"));
        assert_eq!(stored.refresh_token.as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_token_when_not_rotated() {
        let store = expired_store();
        let service =
            CredentialService::new(store.clone(), FakeRefresher::new(not_rotated), DEFAULT_REFRESH_AFTER);

        let stored = service.load().await.unwrap();
        let record = service.refresh(&stored).await.unwrap();
        assert_eq!(record.access_token, "A2");
        assert_eq!(record.refresh_token, "R1");
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_store_untouched() {
        let store = expired_store();
        let before = store.snapshot();
        let service =
            CredentialService::new(store.clone(), FakeRefresher::new(rejected), DEFAULT_REFRESH_AFTER);

        let stored = service.load().await.unwrap();
        let err = service.refresh(&stored).await.unwrap_err();
        assert!(err.requires_relogin());
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let refresher = FakeRefresher::new(rotated);
        let service = CredentialService::new(
            Arc::new(MemoryStore::new()),
            refresher.clone(),
            DEFAULT_REFRESH_AFTER,
        );

        let err = service
            .refresh(&StoredCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingRefreshToken));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_grant_is_fresh() {
        let store = Arc::new(MemoryStore::new());
        let service =
            CredentialService::new(store.clone(), FakeRefresher::new(rotated), DEFAULT_REFRESH_AFTER);

        service.store_grant("A1", "R1").await.unwrap();

        let (stored, freshness) = service.check().await.unwrap();
        assert!(matches!(freshness, Freshness::Fresh { .. }));
        assert_eq!(stored.refresh_token.as_deref(), Some("R1"));
    }
}
