//! The dispatcher.
//!
//! Ensures a usable access token, submits one like request, and routes the
//! answer to the outcome handlers. Nothing here retries; a later trigger
//! runs the whole pipeline again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{Span, error, info, instrument, warn};

use crate::credentials::{CredentialError, CredentialService, Freshness};
use crate::outcome::{FailureKind, OutcomeHandlers};
use crate::resolver::{AddedTrack, DispatchRequest, ResolverClient, ResolverResponse};

use super::state::{DispatchState, StateTracker};

/// What happens to a dispatch that arrives while another is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Wait for the in-flight dispatch to finish.
    #[default]
    Queue,
    /// Give up immediately with [`DispatchOutcome::Busy`].
    Reject,
}

/// Result of one dispatch. Callers are free to ignore it; every outcome the
/// user needs to see has already been stored and notified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Added(AddedTrack),
    NotFound,
    /// The resolver answered with neither `title` nor `error`.
    Unrecognized { body: Value },
    Failed { kind: FailureKind, error: String },
    /// Rejected by the in-flight gate; nothing was done.
    Busy,
}

impl DispatchOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Token-gated dispatcher.
pub struct TokenGatedDispatcher {
    credentials: Arc<CredentialService>,
    resolver: ResolverClient,
    outcomes: OutcomeHandlers,
    policy: GatePolicy,
    /// Held for a whole pass so only one refresh-and-dispatch runs at a time.
    gate: Mutex<()>,
    next_id: AtomicU64,
}

impl TokenGatedDispatcher {
    pub fn new(
        credentials: Arc<CredentialService>,
        resolver: ResolverClient,
        outcomes: OutcomeHandlers,
        policy: GatePolicy,
    ) -> Self {
        Self {
            credentials,
            resolver,
            outcomes,
            policy,
            gate: Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Run one dispatch for `target_url`.
    #[instrument(skip(self), fields(dispatch_id = tracing::field::Empty))]
    pub async fn dispatch(&self, target_url: &str) -> DispatchOutcome {
        let dispatch_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Span::current().record("dispatch_id", dispatch_id);

        let Some(_guard) = self.acquire_gate().await else {
            warn!("Another dispatch is in flight; rejecting");
            return DispatchOutcome::Busy;
        };

        let mut tracker = StateTracker::new(dispatch_id);
        let outcome = self.run(&mut tracker, target_url).await;
        info!(state = %tracker.state(), "Dispatch finished");
        outcome
    }

    /// Fire-and-forget variant for event handlers.
    pub fn spawn_dispatch(self: &Arc<Self>, target_url: String) -> JoinHandle<DispatchOutcome> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch(&target_url).await })
    }

    async fn acquire_gate(&self) -> Option<MutexGuard<'_, ()>> {
        match self.policy {
            GatePolicy::Queue => Some(self.gate.lock().await),
            GatePolicy::Reject => self.gate.try_lock().ok(),
        }
    }

    async fn run(&self, tracker: &mut StateTracker, target_url: &str) -> DispatchOutcome {
        self.enter(tracker, DispatchState::CheckingFreshness);

        let (stored, freshness) = match self.credentials.check().await {
            Ok(checked) => checked,
            Err(e) => return self.fail(tracker, failure_kind(&e, false), &e.to_string()).await,
        };

        let access_token = match freshness {
            Freshness::Missing => {
                let e = CredentialError::NotAuthorized;
                return self.fail(tracker, FailureKind::NotAuthorized, &e.to_string()).await;
            }
            Freshness::Expired { .. } => {
                info!(
                    elapsed_secs = ?freshness.elapsed_secs(),
                    "Access token expired; refreshing"
                );
                self.enter(tracker, DispatchState::Refreshing);
                match self.credentials.refresh(&stored).await {
                    Ok(record) => record.access_token,
                    Err(e) => {
                        error!(
                            error = %e,
                            transient = e.is_transient(),
                            relogin = e.requires_relogin(),
                            "Credential refresh failed; aborting dispatch"
                        );
                        return self.fail(tracker, failure_kind(&e, true), &e.to_string()).await;
                    }
                }
            }
            Freshness::Fresh { .. } => match stored.access_token {
                Some(token) => token,
                None => {
                    let e = CredentialError::MissingAccessToken;
                    return self.fail(tracker, FailureKind::NotAuthorized, &e.to_string()).await;
                }
            },
        };

        self.enter(tracker, DispatchState::Submitting);

        let request = DispatchRequest {
            video_url: target_url,
            access_token: &access_token,
        };

        match self.resolver.like_song(&request).await {
            Ok(ResolverResponse::Added(track)) => {
                self.enter(tracker, DispatchState::Added);
                if let Err(e) = self.outcomes.on_added(&track).await {
                    error!(error = %e, "Failed to record added song");
                }
                DispatchOutcome::Added(track)
            }
            Ok(ResolverResponse::NotFound { error }) => {
                self.enter(tracker, DispatchState::NotFound);
                info!(resolver_error = %error, "Resolver could not match the page");
                if let Err(e) = self.outcomes.on_not_found(target_url).await {
                    error!(error = %e, "Failed to record missing song");
                }
                DispatchOutcome::NotFound
            }
            Ok(ResolverResponse::Unrecognized(body)) => {
                self.enter(tracker, DispatchState::Unrecognized);
                warn!(%body, "Unrecognized resolver response; stored outcome left unchanged");
                DispatchOutcome::Unrecognized { body }
            }
            Err(e) => {
                error!(error = %e, "Resolver request failed");
                self.fail(tracker, FailureKind::Network, &e.to_string()).await
            }
        }
    }

    fn enter(&self, tracker: &mut StateTracker, to: DispatchState) {
        if let Err(e) = tracker.transition(to) {
            error!(error = %e, "Dispatch state machine violated");
            debug_assert!(false, "{e}");
        }
    }

    async fn fail(
        &self,
        tracker: &mut StateTracker,
        kind: FailureKind,
        detail: &str,
    ) -> DispatchOutcome {
        self.enter(tracker, DispatchState::Failed);
        warn!(kind = %kind, %detail, "Dispatch failed");

        if let Err(e) = self.outcomes.on_failure(kind, detail).await {
            error!(error = %e, "Failed to record dispatch failure");
        }

        DispatchOutcome::Failed {
            kind,
            error: detail.to_string(),
        }
    }
}

/// Map a credential error to the outcome the popup shows.
fn failure_kind(err: &CredentialError, during_refresh: bool) -> FailureKind {
    match err {
        CredentialError::Store(_) => FailureKind::Store,
        CredentialError::NotAuthorized
        | CredentialError::MissingRefreshToken
        | CredentialError::MissingAccessToken
        | CredentialError::InvalidRecord(_) => FailureKind::NotAuthorized,
        _ if during_refresh => FailureKind::RefreshFailed,
        _ => FailureKind::Network,
    }
}
