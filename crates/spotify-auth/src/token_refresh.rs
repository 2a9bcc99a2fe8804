//! OAuth2 refresh-token grant for Spotify.
//!
//! Refresh tokens obtained through the PKCE flow are single use: every
//! successful exchange returns a new refresh token that must replace the old
//! one, otherwise the next exchange is rejected with `invalid_grant`.

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Spotify accounts token endpoint.
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Client id registered for the browser extension.
pub const DEFAULT_CLIENT_ID: &str = "cc9e2365a9c1461ea9a251d446f347d0";

const GRANT_TYPE: &str = "refresh_token";

#[derive(Debug, Error)]
pub enum TokenRefreshError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid token endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("API error (status={status}): {error} {}", .description.as_deref().unwrap_or_default())]
    Api {
        status: u16,
        error: String,
        description: Option<String>,
    },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl TokenRefreshError {
    /// The provider rejected the refresh token itself (revoked, reused or expired).
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::Api { error, .. } if error == "invalid_grant")
    }

    /// Timeouts and connection failures.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Token pair returned by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Replacement refresh token. Spotify may omit it, in which case the
    /// current one stays valid.
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    /// Access token lifetime in seconds (3600 for Spotify).
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// Build the token endpoint URL carrying the grant parameters in its query.
pub fn build_refresh_url(
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(token_url)?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("grant_type", GRANT_TYPE)
        .append_pair("refresh_token", refresh_token);
    Ok(url)
}

/// Exchange `refresh_token` for a new token pair.
///
/// Timeouts come from the `client`; this function never retries.
pub async fn refresh_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<RefreshedTokens, TokenRefreshError> {
    let url = build_refresh_url(token_url, client_id, refresh_token)?;

    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    tracing::debug!(status = status.as_u16(), "Spotify token endpoint responded");

    let body: serde_json::Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(TokenRefreshError::Parse(e.to_string())),
        Err(_) => {
            return Err(TokenRefreshError::Api {
                status: status.as_u16(),
                error: status
                    .canonical_reason()
                    .unwrap_or("unknown_error")
                    .to_string(),
                description: (!text.is_empty()).then_some(text),
            });
        }
    };

    parse_token_response(status.as_u16(), &body)
}

fn parse_token_response(
    status: u16,
    body: &serde_json::Value,
) -> Result<RefreshedTokens, TokenRefreshError> {
    if let Some(error) = body.get("error") {
        // The token endpoint answers with a string; the Web API wraps errors
        // in `{status, message}`.
        let (error, description) = match error {
            serde_json::Value::String(s) => (
                s.clone(),
                body.get("error_description")
                    .and_then(|d| d.as_str())
                    .map(String::from),
            ),
            other => (
                other
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown_error")
                    .to_string(),
                None,
            ),
        };
        return Err(TokenRefreshError::Api {
            status,
            error,
            description,
        });
    }

    if !(200..300).contains(&status) {
        return Err(TokenRefreshError::Api {
            status,
            error: "http_error".to_string(),
            description: None,
        });
    }

    let access_token = body
        .get("access_token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| TokenRefreshError::Parse("No access_token field".to_string()))?
        .to_string();

    let str_field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(String::from);

    Ok(RefreshedTokens {
        access_token,
        refresh_token: str_field("refresh_token"),
        token_type: str_field("token_type"),
        expires_in: body.get("expires_in").and_then(|e| e.as_u64()),
        scope: str_field("scope"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Captured {
        query: Mutex<Option<HashMap<String, String>>>,
        content_type: Mutex<Option<String>>,
    }

    async fn spawn_token_server(
        status: StatusCode,
        body: serde_json::Value,
    ) -> (String, Arc<Captured>) {
        let captured = Arc::new(Captured::default());
        let state = (Arc::clone(&captured), status, body);

        async fn handler(
            State((captured, status, body)): State<(Arc<Captured>, StatusCode, serde_json::Value)>,
            Query(query): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> impl IntoResponse {
            *captured.query.lock().unwrap() = Some(query);
            *captured.content_type.lock().unwrap() = headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            (status, axum::Json(body))
        }

        let app = Router::new()
            .route("/api/token", post(handler))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/api/token"), captured)
    }

    #[test]
    fn test_build_refresh_url() {
        let url = build_refresh_url(SPOTIFY_TOKEN_URL, DEFAULT_CLIENT_ID, "R1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://accounts.spotify.com/api/token?client_id=cc9e2365a9c1461ea9a251d446f347d0&grant_type=refresh_token&refresh_token=R1"
        );
    }

    #[test]
    fn test_build_refresh_url_escapes_token() {
        let url = build_refresh_url(SPOTIFY_TOKEN_URL, "id", "a+b/c=").unwrap();
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["refresh_token"], "a+b/c=");
    }

    #[test]
    fn test_parse_error_payload() {
        let body = json!({"error": "invalid_grant", "error_description": "Refresh token revoked"});
        let err = parse_token_response(400, &body).unwrap_err();
        assert!(err.is_invalid_grant());
        assert!(err.to_string().contains("Refresh token revoked"));
    }

    #[test]
    fn test_parse_missing_access_token() {
        let err = parse_token_response(200, &json!({"token_type": "Bearer"})).unwrap_err();
        assert!(matches!(err, TokenRefreshError::Parse(_)));
    }

    #[tokio::test]
    async fn test_refresh_sends_grant_in_query() {
        let (url, captured) = spawn_token_server(
            StatusCode::OK,
            json!({
                "access_token": "A2",
                "refresh_token": "R2",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-library-modify"
            }),
        )
        .await;

        let tokens = refresh_token(&Client::new(), &url, "client-1", "R1")
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "A2");
        assert_eq!(tokens.refresh_token.as_deref(), Some("R2"));
        assert_eq!(tokens.expires_in, Some(3600));

        let query = captured.query.lock().unwrap().clone().unwrap();
        assert_eq!(query["client_id"], "client-1");
        assert_eq!(query["grant_type"], "refresh_token");
        assert_eq!(query["refresh_token"], "R1");
        assert_eq!(
            captured.content_type.lock().unwrap().as_deref(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[tokio::test]
    async fn test_refresh_rejected_by_provider() {
        let (url, _) = spawn_token_server(
            StatusCode::BAD_REQUEST,
            json!({"error": "invalid_grant", "error_description": "Invalid refresh token"}),
        )
        .await;

        let err = refresh_token(&Client::new(), &url, "client-1", "stale")
            .await
            .unwrap_err();

        assert!(err.is_invalid_grant());
        assert!(matches!(err, TokenRefreshError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_refresh_without_new_refresh_token() {
        let (url, _) = spawn_token_server(StatusCode::OK, json!({"access_token": "A3"})).await;

        let tokens = refresh_token(&Client::new(), &url, "client-1", "R1")
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "A3");
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_unreachable_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = refresh_token(
            &Client::new(),
            &format!("http://{addr}/api/token"),
            "client-1",
            "R1",
        )
        .await
        .unwrap_err();

        assert!(err.is_network());
    }
}
