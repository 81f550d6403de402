//! Generation status poller
//!
//! Polls a [`StatusSource`] at a fixed interval until every tracked task has
//! completed or failed, the global timeout elapses, or the caller cancels.
//! Individual status checks are retried up to `max_check_retries` consecutive
//! errors before the task is marked failed.
//!
//! [`GenerationTracker`] holds the bookkeeping and has no I/O, so the rules can
//! be tested without a runtime. [`Poller`] drives it on tokio.

use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use tempt_core::models::{GenerationKind, GenerationStatus, TaskStatusReport};

use crate::source::StatusSource;

const DEFAULT_MAX_CHECK_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Invalid poller configuration: {0}")]
    InvalidConfig(String),
}

/// Timing and retry policy for one polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub timeout: Duration,
    /// Consecutive failed status checks tolerated per task
    pub max_check_retries: u32,
}

impl PollerConfig {
    pub fn image() -> Self {
        PollerConfig {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(5 * 60),
            max_check_retries: DEFAULT_MAX_CHECK_RETRIES,
        }
    }

    /// Advanced-mode images take longer to render
    pub fn advanced() -> Self {
        PollerConfig {
            timeout: Duration::from_secs(10 * 60),
            ..Self::image()
        }
    }

    pub fn video() -> Self {
        PollerConfig {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(15 * 60),
            max_check_retries: DEFAULT_MAX_CHECK_RETRIES,
        }
    }

    pub fn for_generation(kind: GenerationKind, advanced: bool) -> Self {
        match (kind, advanced) {
            (GenerationKind::Video, _) => Self::video(),
            (GenerationKind::Image, true) => Self::advanced(),
            (GenerationKind::Image, false) => Self::image(),
        }
    }

    pub fn validate(&self) -> Result<(), PollError> {
        if self.interval.is_zero() {
            return Err(PollError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout < self.interval {
            return Err(PollError::InvalidConfig(format!(
                "timeout ({:?}) must be at least the interval ({:?})",
                self.timeout, self.interval
            )));
        }
        Ok(())
    }
}

/// Why a task ended up failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// The provider reported the generation as failed
    Generation(Option<String>),
    /// The status could not be fetched after all retries
    StatusCheckFailed(String),
}

/// Progress notifications emitted while polling
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PollEvent {
    StatusChanged {
        task_id: String,
        status: GenerationStatus,
    },
    Completed {
        task_id: String,
        url: Option<String>,
    },
    Failed {
        task_id: String,
        reason: FailureReason,
    },
    CheckError {
        task_id: String,
        attempt: u32,
        error: String,
    },
    TimedOut {
        task_ids: Vec<String>,
    },
    Cancelled {
        task_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedTask {
    pub task_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTask {
    pub task_id: String,
    pub reason: FailureReason,
}

/// Final state of a polling session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub completed: Vec<CompletedTask>,
    pub failed: Vec<FailedTask>,
    pub timed_out: Vec<String>,
    pub cancelled: Vec<String>,
    /// Still unresolved; empty once a session has ended
    pub pending: Vec<String>,
}

impl PollSummary {
    pub fn all_completed(&self) -> bool {
        self.failed.is_empty()
            && self.timed_out.is_empty()
            && self.cancelled.is_empty()
            && self.pending.is_empty()
    }
}

#[derive(Debug)]
struct PendingTask {
    task_id: String,
    last_status: Option<GenerationStatus>,
    consecutive_errors: u32,
}

/// Per-task bookkeeping for a polling session
#[derive(Debug)]
pub struct GenerationTracker {
    max_check_retries: u32,
    pending: Vec<PendingTask>,
    summary: PollSummary,
}

impl GenerationTracker {
    pub fn new(max_check_retries: u32) -> Self {
        GenerationTracker {
            max_check_retries,
            pending: Vec::new(),
            summary: PollSummary::default(),
        }
    }

    /// Start tracking a task. Returns false if it is already tracked or resolved.
    pub fn track(&mut self, task_id: impl Into<String>) -> bool {
        let task_id = task_id.into();
        if self.pending.iter().any(|t| t.task_id == task_id) || self.is_resolved(&task_id) {
            return false;
        }
        self.pending.push(PendingTask {
            task_id,
            last_status: None,
            consecutive_errors: 0,
        });
        true
    }

    fn is_resolved(&self, task_id: &str) -> bool {
        self.summary.completed.iter().any(|t| t.task_id == task_id)
            || self.summary.failed.iter().any(|t| t.task_id == task_id)
            || self.summary.timed_out.iter().any(|t| t == task_id)
            || self.summary.cancelled.iter().any(|t| t == task_id)
    }

    fn position(&self, task_id: &str) -> Option<usize> {
        self.pending.iter().position(|t| t.task_id == task_id)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.iter().map(|t| t.task_id.clone()).collect()
    }

    /// Apply a successful status check. Returns the event it produced, if any.
    pub fn record_check(&mut self, report: &TaskStatusReport) -> Option<PollEvent> {
        let idx = self.position(&report.task_id)?;

        match report.status {
            GenerationStatus::Completed => {
                let task = self.pending.remove(idx);
                self.summary.completed.push(CompletedTask {
                    task_id: task.task_id.clone(),
                    url: report.url.clone(),
                });
                Some(PollEvent::Completed {
                    task_id: task.task_id,
                    url: report.url.clone(),
                })
            }
            GenerationStatus::Failed => {
                let task = self.pending.remove(idx);
                let reason = FailureReason::Generation(report.error.clone());
                self.summary.failed.push(FailedTask {
                    task_id: task.task_id.clone(),
                    reason: reason.clone(),
                });
                Some(PollEvent::Failed {
                    task_id: task.task_id,
                    reason,
                })
            }
            status => {
                let task = &mut self.pending[idx];
                task.consecutive_errors = 0;
                if task.last_status == Some(status) {
                    return None;
                }
                task.last_status = Some(status);
                Some(PollEvent::StatusChanged {
                    task_id: task.task_id.clone(),
                    status,
                })
            }
        }
    }

    /// Apply a failed status check. The task fails once its consecutive
    /// errors exceed the retry budget.
    pub fn record_check_error(&mut self, task_id: &str, error: &str) -> Option<PollEvent> {
        let idx = self.position(task_id)?;
        let task = &mut self.pending[idx];
        task.consecutive_errors += 1;

        if task.consecutive_errors <= self.max_check_retries {
            return Some(PollEvent::CheckError {
                task_id: task.task_id.clone(),
                attempt: task.consecutive_errors,
                error: error.to_string(),
            });
        }

        let task = self.pending.remove(idx);
        let reason = FailureReason::StatusCheckFailed(error.to_string());
        self.summary.failed.push(FailedTask {
            task_id: task.task_id.clone(),
            reason: reason.clone(),
        });
        Some(PollEvent::Failed {
            task_id: task.task_id,
            reason,
        })
    }

    /// Move every pending task to `timed_out`. Returns the moved ids.
    pub fn expire_all(&mut self) -> Vec<String> {
        let ids: Vec<String> = self.pending.drain(..).map(|t| t.task_id).collect();
        self.summary.timed_out.extend(ids.iter().cloned());
        ids
    }

    /// Move every pending task to `cancelled`. Returns the moved ids.
    pub fn cancel_all(&mut self) -> Vec<String> {
        let ids: Vec<String> = self.pending.drain(..).map(|t| t.task_id).collect();
        self.summary.cancelled.extend(ids.iter().cloned());
        ids
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn summary(&self) -> PollSummary {
        PollSummary {
            pending: self.pending_ids(),
            ..self.summary.clone()
        }
    }
}

/// Drives a [`GenerationTracker`] against a status source
pub struct Poller<S> {
    source: S,
    config: PollerConfig,
    events: Option<mpsc::Sender<PollEvent>>,
}

impl<S: StatusSource> Poller<S> {
    pub fn new(source: S, config: PollerConfig) -> Result<Self, PollError> {
        config.validate()?;
        Ok(Poller {
            source,
            config,
            events: None,
        })
    }

    /// Send progress events to `tx`. A dropped receiver is ignored.
    pub fn with_events(mut self, tx: mpsc::Sender<PollEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    async fn emit(&self, event: PollEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Poll until every task resolves, the timeout elapses or `cancel` fires.
    #[tracing::instrument(skip(self, task_ids, cancel), fields(interval = ?self.config.interval, timeout = ?self.config.timeout))]
    pub async fn run<I>(&self, task_ids: I, cancel: CancellationToken) -> PollSummary
    where
        I: IntoIterator<Item = String>,
    {
        let mut tracker = GenerationTracker::new(self.config.max_check_retries);
        for id in task_ids {
            tracker.track(id);
        }

        if tracker.is_finished() {
            return tracker.summary();
        }

        tracing::info!(tasks = tracker.pending.len(), "Polling generation status");

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // A round in flight is abandoned when the deadline or cancel fires
        let stop = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Some(Stop::Cancelled),
                _ = &mut deadline => break Some(Stop::TimedOut),
                _ = interval.tick() => {}
            }

            let task_ids = tracker.pending_ids();
            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Some(Stop::Cancelled),
                _ = &mut deadline => break Some(Stop::TimedOut),
                results = self.fetch_round(&task_ids) => results,
            };

            for (task_id, result) in task_ids.iter().zip(results) {
                let event = match result {
                    Ok(report) => tracker.record_check(&report),
                    Err(e) => {
                        tracing::debug!(task_id = %task_id, error = %e, "Status check failed");
                        tracker.record_check_error(task_id, &e.to_string())
                    }
                };
                if let Some(event) = event {
                    self.emit(event).await;
                }
            }

            if tracker.is_finished() {
                break None;
            }
        };

        match stop {
            Some(Stop::Cancelled) => {
                let task_ids = tracker.cancel_all();
                tracing::info!(remaining = task_ids.len(), "Polling cancelled");
                self.emit(PollEvent::Cancelled { task_ids }).await;
            }
            Some(Stop::TimedOut) => {
                let task_ids = tracker.expire_all();
                tracing::warn!(remaining = task_ids.len(), "Polling timed out");
                self.emit(PollEvent::TimedOut { task_ids }).await;
            }
            None => {}
        }

        let summary = tracker.summary();
        tracing::info!(
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            timed_out = summary.timed_out.len(),
            cancelled = summary.cancelled.len(),
            "Polling finished"
        );
        summary
    }

    /// Check every task at once; results keep the order of `task_ids`.
    async fn fetch_round(&self, task_ids: &[String]) -> Vec<anyhow::Result<TaskStatusReport>> {
        join_all(task_ids.iter().map(|id| self.source.fetch_status(id))).await
    }
}

enum Stop {
    Cancelled,
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    enum Reply {
        Status(GenerationStatus),
        Error,
    }

    /// Replays a script per task; the last reply repeats once the script runs out.
    #[derive(Default)]
    struct ScriptedSource {
        scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn with(mut self, task_id: &str, replies: Vec<Reply>) -> Self {
            self.scripts
                .get_mut()
                .unwrap()
                .insert(task_id.to_string(), replies.into());
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, task_id: &str) -> anyhow::Result<TaskStatusReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = {
                let mut scripts = self.scripts.lock().unwrap();
                let script = scripts
                    .get_mut(task_id)
                    .ok_or_else(|| anyhow!("unknown task {task_id}"))?;
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                }
            };
            match reply {
                Reply::Status(status) => Ok(report(task_id, status)),
                Reply::Error => Err(anyhow!("connection reset")),
            }
        }
    }

    fn report(task_id: &str, status: GenerationStatus) -> TaskStatusReport {
        TaskStatusReport {
            task_id: task_id.to_string(),
            kind: GenerationKind::Image,
            status,
            url: (status == GenerationStatus::Completed)
                .then(|| format!("https://cdn.example/{task_id}.png")),
            error: (status == GenerationStatus::Failed).then(|| "nsfw filter".to_string()),
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fast_config() -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(9),
            max_check_retries: 3,
        }
    }

    use GenerationStatus::{Completed, Failed, Processing, Queued};

    #[test]
    fn presets_are_valid() {
        for config in [
            PollerConfig::image(),
            PollerConfig::advanced(),
            PollerConfig::video(),
        ] {
            assert!(config.validate().is_ok());
            assert_eq!(config.max_check_retries, 3);
        }
        assert_eq!(PollerConfig::video().interval, Duration::from_secs(5));
        assert_eq!(PollerConfig::advanced().timeout, Duration::from_secs(600));
        assert_eq!(
            PollerConfig::for_generation(GenerationKind::Image, true),
            PollerConfig::advanced()
        );
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero = PollerConfig {
            interval: Duration::ZERO,
            ..PollerConfig::image()
        };
        assert!(zero.validate().is_err());

        let short = PollerConfig {
            timeout: Duration::from_secs(1),
            ..PollerConfig::image()
        };
        assert!(short.validate().is_err());
        assert!(Poller::new(ScriptedSource::default(), short).is_err());
    }

    #[test]
    fn tracker_empties_only_on_terminal_status() {
        let mut tracker = GenerationTracker::new(3);
        assert!(tracker.track("a"));
        assert!(tracker.track("b"));
        assert!(!tracker.track("a"));

        assert!(matches!(
            tracker.record_check(&report("a", Queued)),
            Some(PollEvent::StatusChanged { .. })
        ));
        assert_eq!(tracker.record_check(&report("a", Queued)), None);
        tracker.record_check(&report("b", Processing));
        assert!(!tracker.is_finished());

        tracker.record_check(&report("a", Completed));
        assert!(!tracker.is_finished());
        tracker.record_check(&report("b", Failed));
        assert!(tracker.is_finished());

        let summary = tracker.summary();
        assert_eq!(summary.completed[0].task_id, "a");
        assert_eq!(
            summary.failed[0].reason,
            FailureReason::Generation(Some("nsfw filter".to_string()))
        );
        assert!(!tracker.track("a"));
    }

    #[test]
    fn check_errors_fail_task_after_retry_budget() {
        let mut tracker = GenerationTracker::new(3);
        tracker.track("a");
        for attempt in 1..=3 {
            assert_eq!(
                tracker.record_check_error("a", "timeout"),
                Some(PollEvent::CheckError {
                    task_id: "a".to_string(),
                    attempt,
                    error: "timeout".to_string(),
                })
            );
        }
        assert!(!tracker.is_finished());
        assert!(matches!(
            tracker.record_check_error("a", "timeout"),
            Some(PollEvent::Failed {
                reason: FailureReason::StatusCheckFailed(_),
                ..
            })
        ));
        assert!(tracker.is_finished());
    }

    #[test]
    fn successful_check_resets_error_count() {
        let mut tracker = GenerationTracker::new(1);
        tracker.track("a");
        tracker.record_check_error("a", "boom");
        tracker.record_check(&report("a", Processing));
        assert!(matches!(
            tracker.record_check_error("a", "boom"),
            Some(PollEvent::CheckError { attempt: 1, .. })
        ));
        assert!(!tracker.is_finished());
    }

    #[test]
    fn unknown_tasks_are_ignored() {
        let mut tracker = GenerationTracker::new(3);
        tracker.track("a");
        assert_eq!(tracker.record_check(&report("zzz", Completed)), None);
        assert_eq!(tracker.record_check_error("zzz", "x"), None);
        assert_eq!(tracker.pending_ids(), vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_when_all_tasks_resolve() {
        let source = ScriptedSource::default()
            .with("a", vec![Reply::Status(Queued), Reply::Status(Completed)])
            .with(
                "b",
                vec![
                    Reply::Status(Processing),
                    Reply::Status(Processing),
                    Reply::Status(Failed),
                ],
            );
        let poller = Poller::new(
            source,
            PollerConfig {
                timeout: Duration::from_secs(60),
                ..fast_config()
            },
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        let summary = poller
            .run(ids(&["a", "b"]), CancellationToken::new())
            .await;

        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.timed_out.is_empty());
        assert!(summary.pending.is_empty());
        // third round resolves b: ticks at 0s, 3s and 6s
        assert_eq!(start.elapsed(), Duration::from_secs(6));
        assert_eq!(poller.source.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn run_times_out_unresolved_tasks() {
        let source = ScriptedSource::default()
            .with("a", vec![Reply::Status(Processing)])
            .with("b", vec![Reply::Status(Queued), Reply::Status(Completed)]);
        let poller = Poller::new(source, fast_config()).unwrap();

        let start = tokio::time::Instant::now();
        let summary = poller
            .run(ids(&["a", "b"]), CancellationToken::new())
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(9));
        assert_eq!(summary.timed_out, ids(&["a"]));
        assert_eq!(summary.completed.len(), 1);
        assert!(!summary.all_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn run_marks_failed_after_repeated_check_errors() {
        let source = ScriptedSource::default().with("a", vec![Reply::Error]);
        let poller = Poller::new(
            source,
            PollerConfig {
                timeout: Duration::from_secs(60),
                ..fast_config()
            },
        )
        .unwrap();

        let summary = poller.run(ids(&["a"]), CancellationToken::new()).await;

        assert!(matches!(
            summary.failed[0].reason,
            FailureReason::StatusCheckFailed(_)
        ));
        // one initial check plus three retries
        assert_eq!(poller.source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn run_recovers_from_transient_errors() {
        let source = ScriptedSource::default().with(
            "a",
            vec![
                Reply::Error,
                Reply::Error,
                Reply::Status(Processing),
                Reply::Error,
                Reply::Status(Completed),
            ],
        );
        let poller = Poller::new(
            source,
            PollerConfig {
                timeout: Duration::from_secs(60),
                max_check_retries: 2,
                ..fast_config()
            },
        )
        .unwrap();

        let summary = poller.run(ids(&["a"]), CancellationToken::new()).await;
        assert!(summary.all_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_reports_remaining_tasks() {
        let source = Arc::new(ScriptedSource::default().with("a", vec![Reply::Status(Processing)]));
        let poller = Poller::new(source, PollerConfig::image()).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let summary = poller.run(ids(&["a"]), cancel).await;
        assert_eq!(summary.cancelled, ids(&["a"]));
        assert!(summary.timed_out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_emitted_in_order() {
        let source = ScriptedSource::default().with(
            "a",
            vec![Reply::Status(Processing), Reply::Status(Completed)],
        );
        let (tx, mut rx) = mpsc::channel(16);
        let poller = Poller::new(source, fast_config()).unwrap().with_events(tx);

        poller.run(ids(&["a"]), CancellationToken::new()).await;
        drop(poller);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                PollEvent::StatusChanged {
                    task_id: "a".to_string(),
                    status: Processing,
                },
                PollEvent::Completed {
                    task_id: "a".to_string(),
                    url: Some("https://cdn.example/a.png".to_string()),
                },
            ]
        );
    }

    /// Answers every check, but only after `delay`
    struct SlowSource {
        delay: Duration,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StatusSource for SlowSource {
        async fn fetch_status(&self, task_id: &str) -> anyhow::Result<TaskStatusReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(report(task_id, Processing))
        }
    }

    impl SlowSource {
        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn slow(delay: Duration) -> SlowSource {
        SlowSource {
            delay,
            calls: AtomicU32::new(0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_checks_do_not_extend_the_timeout() {
        let poller = Poller::new(slow(Duration::from_secs(30)), fast_config()).unwrap();

        let start = tokio::time::Instant::now();
        let summary = poller
            .run(ids(&["a", "b", "c", "d"]), CancellationToken::new())
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(9));
        assert_eq!(summary.timed_out, ids(&["a", "b", "c", "d"]));
        // all four checks start together in the first round
        assert_eq!(poller.source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_round_in_flight() {
        let poller = Poller::new(slow(Duration::from_secs(30)), PollerConfig::image()).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let summary = poller.run(ids(&["a", "b", "c", "d"]), cancel).await;

        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(summary.cancelled.len(), 4);
        assert!(summary.timed_out.is_empty());
    }

    #[tokio::test]
    async fn empty_task_list_returns_immediately() {
        let poller = Poller::new(ScriptedSource::default(), PollerConfig::image()).unwrap();
        let summary = poller.run(Vec::new(), CancellationToken::new()).await;
        assert!(summary.all_completed());
        assert_eq!(poller.source.calls(), 0);
    }
}
