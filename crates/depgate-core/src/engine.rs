//! The validation engine.
//!
//! Drives every observed dependency through request, polling and terminal
//! resolution against the remote validation service:
//!
//! ```text
//! submit(obs) ──► tracker.register ──► client.request
//!                                         │
//!          ┌──────────────────────────────┼──────────────────────────┐
//!          ▼                              ▼                          ▼
//!    unreachable                   decision known              other failure
//!  ConnectionRetry ──success──► terminal? ──yes──► release   finalize(TransportError)
//!   (bounded)                          │
//!                                      no
//!                                      ▼
//!                               StatusPolling (unbounded) ──terminal──► release
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{DecisionResponse, DependencyRequest, ValidationClient};
use crate::credentials::CredentialProvider;
use crate::events::{EngineEvent, EventStream};
use crate::scheduler::{MonitorAction, Regime, RetryScheduler, Schedule, TickOutcome};
use crate::tracker::ApprovalTracker;
use crate::types::{Decision, DependencyKey, Observation};
use crate::Result;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONNECTION_ATTEMPTS: u32 = 30;

// ---------------------------------------------------------------------------
// EngineSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Disposition policy; when `false` every submission is ignored.
    pub enabled: bool,
    pub poll_interval: Duration,
    pub retry_interval: Duration,
    pub max_connection_attempts: u32,
    /// Project name sent with every `request`.
    pub project: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: DEFAULT_INTERVAL,
            retry_interval: DEFAULT_INTERVAL,
            max_connection_attempts: DEFAULT_MAX_CONNECTION_ATTEMPTS,
            project: String::new(),
        }
    }
}

/// What [`ValidationEngine::submit`] did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// A new request was started.
    Started,
    /// The key was already monitored; only its metadata was updated.
    Refreshed,
    /// Validation is disabled.
    Disabled,
    /// No credential configured; a `CredentialRequired` event was emitted.
    CredentialRequired,
    /// The engine has been disposed.
    Disposed,
}

// ---------------------------------------------------------------------------
// ValidationEngine
// ---------------------------------------------------------------------------

pub struct ValidationEngine {
    shared: Arc<Shared>,
}

struct Shared {
    settings: EngineSettings,
    client: Arc<dyn ValidationClient>,
    credentials: Arc<dyn CredentialProvider>,
    tracker: ApprovalTracker,
    scheduler: RetryScheduler,
    shutdown: CancellationToken,
    events: mpsc::UnboundedSender<EngineEvent>,
    reachable: Mutex<bool>,
}

impl ValidationEngine {
    /// Build an engine and the stream its notifications arrive on.
    pub fn new(
        settings: EngineSettings,
        client: Arc<dyn ValidationClient>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> (Self, EventStream) {
        let (events, stream) = EventStream::channel();
        let shutdown = CancellationToken::new();
        let shared = Arc::new(Shared {
            settings,
            client,
            credentials,
            tracker: ApprovalTracker::new(),
            scheduler: RetryScheduler::with_token(shutdown.child_token()),
            shutdown,
            events,
            reachable: Mutex::new(true),
        });
        (Self { shared }, stream)
    }

    /// Hand a newly observed dependency to the engine.
    ///
    /// Never blocks on network I/O: the remote request runs on a spawned task.
    /// Resubmitting a key that is already monitored only refreshes its
    /// version and source path.
    pub async fn submit(&self, obs: Observation) -> SubmitOutcome {
        let shared = &self.shared;
        if shared.shutdown.is_cancelled() {
            return SubmitOutcome::Disposed;
        }
        if !shared.settings.enabled {
            debug!(name = %obs.name, "validation disabled; ignoring observation");
            return SubmitOutcome::Disabled;
        }
        let key = obs.key();
        if shared.credentials.credential().is_none() {
            debug!(key = %key, "no credential configured; ignoring observation");
            shared.emit(EngineEvent::CredentialRequired { key });
            return SubmitOutcome::CredentialRequired;
        }
        if !shared.tracker.register(&obs).await {
            shared.tracker.refresh(&obs).await;
            debug!(key = %key, version = %obs.version, "already monitored; refreshed metadata");
            return SubmitOutcome::Refreshed;
        }

        info!(key = %key, version = %obs.version, path = %obs.path, "requesting validation");
        let task = Arc::clone(shared);
        tokio::spawn(async move {
            let shutdown = task.shutdown.clone();
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = task.initial_request(obs) => {}
            }
        });
        SubmitOutcome::Started
    }

    /// Stop monitoring every dependency. No event is emitted afterwards.
    pub async fn dispose(&self) {
        info!("disposing validation engine");
        self.shared.shutdown.cancel();
        self.shared.scheduler.dispose().await;
        self.shared.tracker.clear().await;
    }

    pub async fn is_reachable(&self) -> bool {
        *self.shared.reachable.lock().await
    }

    pub fn tracker(&self) -> &ApprovalTracker {
        &self.shared.tracker
    }

    /// Regime of the task currently monitoring `key`, if any.
    pub async fn regime(&self, key: &DependencyKey) -> Option<Regime> {
        self.shared.scheduler.regime(key).await
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.shared.settings
    }
}

impl Drop for ValidationEngine {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

// ---------------------------------------------------------------------------
// Engine internals
// ---------------------------------------------------------------------------

impl Shared {
    fn emit(&self, event: EngineEvent) {
        if self.shutdown.is_cancelled() {
            return;
        }
        if self.events.send(event).is_err() {
            debug!("event stream closed; dropping event");
        }
    }

    /// Record the outcome of a transport call; emits at most one event per flip.
    async fn set_reachable(&self, reachable: bool) {
        let mut current = self.reachable.lock().await;
        if *current != reachable {
            *current = reachable;
            info!(reachable, "validation service connectivity changed");
            self.emit(EngineEvent::ConnectivityChanged { reachable });
        }
    }

    async fn initial_request(self: Arc<Self>, obs: Observation) {
        let key = obs.key();
        let request = DependencyRequest::new(&obs, &self.settings.project);
        match self.client.request(&request).await {
            Ok(resp) => {
                self.set_reachable(true).await;
                if let Some(decision) = self.resolve(&key, &resp).await {
                    if !decision.is_terminal() {
                        self.start_polling(key).await;
                    }
                }
            }
            Err(e) if e.is_connectivity() => {
                warn!(key = %key, error = %e, "validation service unreachable; retrying");
                self.set_reachable(false).await;
                let schedule = Schedule::connection_retry(
                    self.settings.retry_interval,
                    self.settings.max_connection_attempts,
                );
                let action = ConnectionRetry {
                    shared: Arc::clone(&self),
                    key: key.clone(),
                };
                self.scheduler.start(key, schedule, Box::new(action)).await;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "validation request failed");
                self.finalize(&key, Decision::TransportError, Some(e.to_string()))
                    .await;
            }
        }
    }

    /// Classify a response and apply it to the record.
    ///
    /// Announces the decision if it changed and releases the key when it is
    /// terminal. Returns `None` if the key is no longer tracked.
    async fn resolve(&self, key: &DependencyKey, resp: &DecisionResponse) -> Option<Decision> {
        let decision = resp.classify();
        let changed = self.tracker.apply(key, &decision).await?;
        if changed {
            self.emit(EngineEvent::DecisionChanged {
                key: key.clone(),
                decision: decision.clone(),
                message: resp.message.clone(),
            });
        }
        if decision.is_terminal() {
            info!(key = %key, decision = %decision, "dependency resolved");
            self.tracker.release(key).await;
        }
        Some(decision)
    }

    /// End monitoring of `key` with a final decision.
    async fn finalize(&self, key: &DependencyKey, decision: Decision, message: Option<String>) {
        if self.tracker.apply(key, &decision).await == Some(true) {
            self.emit(EngineEvent::DecisionChanged {
                key: key.clone(),
                decision,
                message,
            });
        }
        self.tracker.release(key).await;
    }

    async fn start_polling(self: &Arc<Self>, key: DependencyKey) {
        debug!(key = %key, "starting status polling");
        let action = StatusPoll {
            shared: Arc::clone(self),
            key: key.clone(),
        };
        self.scheduler
            .start(
                key,
                Schedule::status_polling(self.settings.poll_interval),
                Box::new(action),
            )
            .await;
    }
}

// ---------------------------------------------------------------------------
// Monitor actions
// ---------------------------------------------------------------------------

/// Re-sends the initial request while the service is unreachable.
///
/// The request is rebuilt from the tracked record on every attempt so a
/// resubmission with a new version is picked up.
struct ConnectionRetry {
    shared: Arc<Shared>,
    key: DependencyKey,
}

#[async_trait]
impl MonitorAction for ConnectionRetry {
    async fn tick(&mut self, attempt: u32) -> Result<TickOutcome> {
        let Some(rec) = self.shared.tracker.record(&self.key).await else {
            debug!(key = %self.key, "no longer tracked; stopping connection retry");
            return Ok(TickOutcome::Done);
        };
        let request = DependencyRequest::for_record(&rec, &self.shared.settings.project);
        match self.shared.client.request(&request).await {
            Ok(resp) => {
                self.shared.set_reachable(true).await;
                debug!(key = %self.key, attempt, "connection retry succeeded");
                if let Some(decision) = self.shared.resolve(&self.key, &resp).await {
                    if !decision.is_terminal() {
                        self.shared.start_polling(self.key.clone()).await;
                    }
                }
                Ok(TickOutcome::Done)
            }
            Err(e) if e.is_connectivity() => {
                debug!(key = %self.key, attempt, error = %e, "still unreachable");
                self.shared.set_reachable(false).await;
                Ok(TickOutcome::Continue)
            }
            Err(e) => {
                warn!(key = %self.key, attempt, error = %e, "validation request failed");
                self.shared
                    .finalize(&self.key, Decision::TransportError, Some(e.to_string()))
                    .await;
                Ok(TickOutcome::Done)
            }
        }
    }

    async fn exhausted(&mut self, attempts: u32) {
        warn!(key = %self.key, attempts, "giving up on unreachable validation service");
        self.shared.emit(EngineEvent::ConnectionTimeout {
            key: self.key.clone(),
            attempts,
        });
        self.shared
            .finalize(
                &self.key,
                Decision::TransportError,
                Some(format!(
                    "validation service unreachable after {attempts} attempts"
                )),
            )
            .await;
    }
}

/// Re-checks a non-terminal decision until it becomes terminal.
struct StatusPoll {
    shared: Arc<Shared>,
    key: DependencyKey,
}

#[async_trait]
impl MonitorAction for StatusPoll {
    async fn tick(&mut self, attempt: u32) -> Result<TickOutcome> {
        match self.shared.client.check(&self.key).await {
            Ok(resp) => {
                self.shared.set_reachable(true).await;
                match self.shared.resolve(&self.key, &resp).await {
                    Some(decision) if !decision.is_terminal() => Ok(TickOutcome::Continue),
                    _ => Ok(TickOutcome::Done),
                }
            }
            Err(e) => {
                warn!(key = %self.key, attempt, error = %e, "status check failed");
                Ok(TickOutcome::Continue)
            }
        }
    }
}
