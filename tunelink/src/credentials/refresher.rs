//! Provider-specific refresh-token grant.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::CredentialError;

/// Result of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedCredentials {
    pub access_token: String,
    /// Replacement refresh token, if the provider rotated it.
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds, if reported.
    pub expires_in: Option<u64>,
}

/// Exchanges a refresh token for a new token pair.
///
/// Implementations perform exactly one exchange per call and never retry.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Provider identifier (e.g., "spotify").
    fn provider_id(&self) -> &'static str;

    /// Perform the refresh-token grant.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedCredentials, CredentialError>;
}

/// Refresh-token grant against the Spotify accounts service.
pub struct SpotifyTokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
}

impl SpotifyTokenRefresher {
    /// `client` carries the request timeout.
    pub fn new(client: Client, token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for SpotifyTokenRefresher {
    fn provider_id(&self) -> &'static str {
        "spotify"
    }

    #[instrument(skip_all, fields(provider = "spotify"))]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedCredentials, CredentialError> {
        debug!(token_url = %self.token_url, "Exchanging refresh token");

        let tokens = spotify_auth::refresh_token(
            &self.client,
            &self.token_url,
            &self.client_id,
            refresh_token,
        )
        .await?;

        Ok(RefreshedCredentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        })
    }
}
