//! Client for the song-resolver backend.
//!
//! The backend matches the page URL to a track and likes it on the user's
//! behalf. It answers `{title, artist}` on success and `{error}` otherwise,
//! with varying HTTP status codes, so the body shape decides the outcome.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Default resolver origin.
pub const DEFAULT_RESOLVER_URL: &str = "http://localhost:3000";

/// Relative to the base URL, so a path prefix on the base is kept.
const LIKE_SONG_PATH: &str = "api/like_song";

#[derive(Debug, Error)]
pub enum ResolverError {
    /// Connection failure or timeout.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid resolver URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-JSON body with a non-success status.
    #[error("Resolver returned HTTP {status}")]
    Status { status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Body of a like request. Built per dispatch and never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest<'a> {
    pub video_url: &'a str,
    pub access_token: &'a str,
}

/// Track the resolver liked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedTrack {
    pub title: String,
    #[serde(default)]
    pub artist: String,
}

/// Shape of a resolver answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverResponse {
    Added(AddedTrack),
    NotFound { error: Value },
    /// Neither `error` nor `title`; the raw body is kept for logging.
    Unrecognized(Value),
}

impl ResolverResponse {
    /// Route a body: `error` wins over `title`, anything else is unrecognized.
    pub fn classify(body: Value) -> Self {
        if let Some(error) = body.get("error").filter(|e| is_truthy(e)) {
            return Self::NotFound {
                error: error.clone(),
            };
        }

        match body.get("title") {
            Some(Value::String(title)) if !title.is_empty() => {
                let artist = match body.get("artist") {
                    Some(Value::String(artist)) => artist.clone(),
                    Some(Value::Array(names)) => names
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                    _ => String::new(),
                };
                Self::Added(AddedTrack {
                    title: title.clone(),
                    artist,
                })
            }
            _ => Self::Unrecognized(body),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::NotFound { .. } => "not_found",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Mirrors the extension's truthiness check on `data.error`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// HTTP client for `POST /api/like_song`.
#[derive(Debug, Clone)]
pub struct ResolverClient {
    client: Client,
    endpoint: Url,
}

impl ResolverClient {
    /// `client` carries the request timeout; `base_url` is the backend root,
    /// optionally with a path prefix.
    pub fn new(client: Client, base_url: &str) -> Result<Self, ResolverError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(LIKE_SONG_PATH)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit one like request. Never retries.
    #[instrument(skip_all, fields(video_url = %request.video_url))]
    pub async fn like_song(
        &self,
        request: &DispatchRequest<'_>,
    ) -> Result<ResolverResponse, ResolverError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(ResolverError::Status {
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(ResolverError::Parse(e.to_string())),
        };

        let classified = ResolverResponse::classify(body);
        debug!(status = status.as_u16(), kind = classified.kind(), "Resolver responded");
        Ok(classified)
    }
}
