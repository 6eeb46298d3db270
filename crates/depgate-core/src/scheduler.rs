//! Per-key cancellable repeating tasks.
//!
//! Every monitored dependency owns at most one task. Starting a task for a key
//! cancels the key's previous task first, so two timers never race on the
//! same record. A cancelled task finishes the tick it is executing (if any)
//! but is never rescheduled.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::types::DependencyKey;
use crate::Result;

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Bounded retry while the service appears unreachable.
    ConnectionRetry,
    /// Unbounded re-check while the decision is known but not terminal.
    StatusPolling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub regime: Regime,
    pub interval: Duration,
    /// `None` repeats until the action reports [`TickOutcome::Done`].
    pub max_attempts: Option<u32>,
}

impl Schedule {
    pub fn connection_retry(interval: Duration, max_attempts: u32) -> Self {
        Self {
            regime: Regime::ConnectionRetry,
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn status_polling(interval: Duration) -> Self {
        Self {
            regime: Regime::StatusPolling,
            interval,
            max_attempts: None,
        }
    }
}

// ---------------------------------------------------------------------------
// MonitorAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Done,
}

/// The body of a repeating task.
///
/// Errors and panics from [`tick`](Self::tick) are logged by the scheduler
/// and the task carries on at the next interval.
#[async_trait]
pub trait MonitorAction: Send + 'static {
    /// Run one attempt. `attempt` starts at 1.
    async fn tick(&mut self, attempt: u32) -> Result<TickOutcome>;

    /// Called once when `max_attempts` ticks all returned `Continue`.
    async fn exhausted(&mut self, _attempts: u32) {}
}

// ---------------------------------------------------------------------------
// RetryScheduler
// ---------------------------------------------------------------------------

struct MonitorHandle {
    id: u64,
    regime: Regime,
    token: CancellationToken,
}

type TaskMap = Arc<Mutex<HashMap<DependencyKey, MonitorHandle>>>;

pub struct RetryScheduler {
    root: CancellationToken,
    tasks: TaskMap,
    next_id: AtomicU64,
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Build a scheduler whose tasks are all children of `root`; cancelling
    /// `root` stops every task.
    pub fn with_token(root: CancellationToken) -> Self {
        Self {
            root,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a repeating task for `key`, cancelling any task already running
    /// for it. Returns the task id, or `None` once the scheduler is disposed.
    pub async fn start(
        &self,
        key: DependencyKey,
        schedule: Schedule,
        action: Box<dyn MonitorAction>,
    ) -> Option<u64> {
        if self.root.is_cancelled() {
            return None;
        }

        let mut tasks = self.tasks.lock().await;
        if let Some(prev) = tasks.remove(&key) {
            debug!(key = %key, previous = ?prev.regime, next = ?schedule.regime, "replacing monitor task");
            prev.token.cancel();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        tokio::spawn(run_monitor(
            key.clone(),
            id,
            schedule,
            action,
            token.clone(),
            Arc::clone(&self.tasks),
        ));
        tasks.insert(
            key,
            MonitorHandle {
                id,
                regime: schedule.regime,
                token,
            },
        );
        Some(id)
    }

    /// Cancel the task for `key`. Returns `false` if none was running.
    pub async fn cancel(&self, key: &DependencyKey) -> bool {
        match self.tasks.lock().await.remove(key) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn regime(&self, key: &DependencyKey) -> Option<Regime> {
        self.tasks.lock().await.get(key).map(|h| h.regime)
    }

    #[cfg(test)]
    pub async fn active(&self) -> usize {
        self.tasks.lock().await.len()
    }

    #[cfg(test)]
    pub fn is_disposed(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancel every outstanding task and refuse new ones.
    pub async fn dispose(&self) {
        self.root.cancel();
        let drained: Vec<_> = self.tasks.lock().await.drain().collect();
        for (key, handle) in drained {
            debug!(key = %key, "monitor task cancelled by dispose");
            handle.token.cancel();
        }
    }
}

async fn run_monitor(
    key: DependencyKey,
    id: u64,
    schedule: Schedule,
    mut action: Box<dyn MonitorAction>,
    token: CancellationToken,
    tasks: TaskMap,
) {
    let mut attempt: u32 = 0;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(schedule.interval) => {}
        }

        attempt = attempt.saturating_add(1);
        debug!(key = %key, regime = ?schedule.regime, attempt, "monitor tick");
        match AssertUnwindSafe(action.tick(attempt)).catch_unwind().await {
            Ok(Ok(TickOutcome::Done)) => break,
            Ok(Ok(TickOutcome::Continue)) => {}
            Ok(Err(e)) => warn!(key = %key, attempt, error = %e, "monitor tick failed"),
            Err(_) => warn!(key = %key, attempt, "monitor tick panicked"),
        }

        if token.is_cancelled() {
            break;
        }
        if schedule.max_attempts.is_some_and(|max| attempt >= max) {
            if AssertUnwindSafe(action.exhausted(attempt))
                .catch_unwind()
                .await
                .is_err()
            {
                warn!(key = %key, attempt, "exhaustion handler panicked");
            }
            break;
        }
    }

    let mut tasks = tasks.lock().await;
    if tasks.get(&key).is_some_and(|h| h.id == id) {
        tasks.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportError;
    use std::sync::atomic::AtomicU32;

    const TICK: Duration = Duration::from_secs(10);

    #[derive(Clone, Default)]
    struct Counter {
        ticks: Arc<AtomicU32>,
        exhausted: Arc<AtomicU32>,
    }

    impl Counter {
        fn ticks(&self) -> u32 {
            self.ticks.load(Ordering::SeqCst)
        }
        fn exhausted(&self) -> u32 {
            self.exhausted.load(Ordering::SeqCst)
        }
    }

    /// Counts ticks; returns `Done` on tick `done_at` if set.
    struct Counting {
        counter: Counter,
        done_at: Option<u32>,
    }

    #[async_trait]
    impl MonitorAction for Counting {
        async fn tick(&mut self, attempt: u32) -> Result<TickOutcome> {
            self.counter.ticks.fetch_add(1, Ordering::SeqCst);
            if self.done_at == Some(attempt) {
                Ok(TickOutcome::Done)
            } else {
                Ok(TickOutcome::Continue)
            }
        }

        async fn exhausted(&mut self, _attempts: u32) {
            self.counter.exhausted.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Fails odd ticks with an error and panics on tick 2.
    struct Flaky {
        counter: Counter,
    }

    #[async_trait]
    impl MonitorAction for Flaky {
        async fn tick(&mut self, attempt: u32) -> Result<TickOutcome> {
            self.counter.ticks.fetch_add(1, Ordering::SeqCst);
            if attempt == 2 {
                panic!("bad tick");
            }
            if attempt % 2 == 1 {
                return Err(TransportError::Other("flaky".into()).into());
            }
            Ok(TickOutcome::Continue)
        }
    }

    fn counting(counter: &Counter, done_at: Option<u32>) -> Box<dyn MonitorAction> {
        Box::new(Counting {
            counter: counter.clone(),
            done_at,
        })
    }

    fn key() -> DependencyKey {
        DependencyKey::new("left-pad", "npm")
    }

    #[tokio::test(start_paused = true)]
    async fn polling_repeats_until_done() {
        let sched = RetryScheduler::new();
        let c = Counter::default();
        sched
            .start(key(), Schedule::status_polling(TICK), counting(&c, Some(4)))
            .await;

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(c.ticks(), 4);
        assert_eq!(sched.active().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let sched = RetryScheduler::new();
        let c = Counter::default();
        sched
            .start(key(), Schedule::status_polling(TICK), counting(&c, None))
            .await;

        tokio::time::sleep(TICK - Duration::from_millis(1)).await;
        assert_eq!(c.ticks(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(c.ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_retry_stops_at_budget() {
        let sched = RetryScheduler::new();
        let c = Counter::default();
        sched
            .start(
                key(),
                Schedule::connection_retry(TICK, 30),
                counting(&c, None),
            )
            .await;

        tokio::time::sleep(TICK * 50).await;
        assert_eq!(c.ticks(), 30);
        assert_eq!(c.exhausted(), 1);
        assert_eq!(sched.regime(&key()).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_a_key_cancels_previous_task() {
        let sched = RetryScheduler::new();
        let retry = Counter::default();
        let poll = Counter::default();

        sched
            .start(
                key(),
                Schedule::connection_retry(TICK, 30),
                counting(&retry, None),
            )
            .await;
        tokio::time::sleep(TICK * 2 + Duration::from_secs(5)).await;
        assert_eq!(retry.ticks(), 2);

        sched
            .start(key(), Schedule::status_polling(TICK), counting(&poll, None))
            .await;
        assert_eq!(sched.regime(&key()).await, Some(Regime::StatusPolling));

        tokio::time::sleep(TICK * 40 + Duration::from_secs(1)).await;
        assert_eq!(retry.ticks(), 2);
        assert_eq!(retry.exhausted(), 0);
        assert_eq!(poll.ticks(), 40);
        assert_eq!(sched.active().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_and_panicking_ticks_do_not_stop_task() {
        let sched = RetryScheduler::new();
        let c = Counter::default();
        sched
            .start(
                key(),
                Schedule::status_polling(TICK),
                Box::new(Flaky { counter: c.clone() }),
            )
            .await;

        tokio::time::sleep(TICK * 5 + Duration::from_secs(1)).await;
        assert_eq!(c.ticks(), 5);
        assert_eq!(sched.regime(&key()).await, Some(Regime::StatusPolling));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_one_key() {
        let sched = RetryScheduler::new();
        let a = Counter::default();
        let b = Counter::default();
        let other = DependencyKey::new("junit:junit", "maven");
        sched
            .start(key(), Schedule::status_polling(TICK), counting(&a, None))
            .await;
        sched
            .start(other.clone(), Schedule::status_polling(TICK), counting(&b, None))
            .await;

        assert!(sched.cancel(&key()).await);
        assert!(!sched.cancel(&key()).await);
        tokio::time::sleep(TICK * 3 + Duration::from_secs(1)).await;
        assert_eq!(a.ticks(), 0);
        assert_eq!(b.ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_everything_and_refuses_new_tasks() {
        let sched = RetryScheduler::new();
        let a = Counter::default();
        let b = Counter::default();
        sched
            .start(key(), Schedule::status_polling(TICK), counting(&a, None))
            .await;
        sched
            .start(
                DependencyKey::new("x", "npm"),
                Schedule::connection_retry(TICK, 30),
                counting(&b, None),
            )
            .await;
        tokio::time::sleep(TICK + Duration::from_secs(1)).await;

        sched.dispose().await;
        assert!(sched.is_disposed());
        assert_eq!(sched.active().await, 0);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(a.ticks(), 1);
        assert_eq!(b.ticks(), 1);
        assert_eq!(b.exhausted(), 0);

        let late = Counter::default();
        assert!(sched
            .start(key(), Schedule::status_polling(TICK), counting(&late, None))
            .await
            .is_none());
    }
}
