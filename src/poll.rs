//! Polling controller for job-based tasks.
//!
//! Logically a loop with a sleep between iterations, not a free-running
//! timer: each tick sleeps for the configured interval, issues exactly one
//! status refresh, and waits for it to resolve before the next sleep begins.
//! Refreshes for a task are therefore strictly sequential and can never be
//! applied out of order.
//!
//! Cancellation is cooperative: it stops further ticks immediately but
//! cannot abort a refresh already in flight; a result arriving after
//! cancellation is discarded rather than applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use crate::providers::StatusSource;
use crate::task::Task;

/// Refresh cadence used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Observable state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
}

/// What a poll tick produced.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A refresh resolved; the tracked task was replaced with this state.
    Refreshed(Task),
    /// A status check failed; polling stopped and the last successfully
    /// fetched task state stands.
    CheckFailed(String),
}

/// Consumer of poll events. Events are delivered sequentially, in order.
#[async_trait]
pub trait PollSink: Send + Sync {
    async fn on_event(&self, event: PollEvent);
}

struct ActivePoll {
    cancel: watch::Sender<bool>,
}

struct Inner {
    interval: Duration,
    state: watch::Sender<PollState>,
    active: Mutex<Option<ActivePoll>>,
    /// Bumped on every start/cancel so a superseded loop cannot write state.
    generation: AtomicU64,
}

/// Schedules repeated status refreshes for one task at a time.
pub struct PollingController {
    inner: Arc<Inner>,
}

impl PollingController {
    pub fn new(interval: Duration) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            inner: Arc::new(Inner {
                interval,
                state,
                active: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> PollState {
        *self.inner.state.borrow()
    }

    /// Begin polling a task.
    ///
    /// Returns `false` without scheduling anything when the task is not from
    /// the job-based provider family or is already terminal. Any schedule
    /// previously held by this controller is cancelled first.
    pub async fn start(
        &self,
        task: Task,
        source: Arc<dyn StatusSource>,
        sink: Arc<dyn PollSink>,
    ) -> bool {
        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            let _ = previous.cancel.send(true);
        }

        if !task.provider.is_job_based() || task.status.is_terminal() {
            return false;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.inner.state.send_replace(PollState::Polling);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut current = task;
            loop {
                tokio::select! {
                    _ = cancel_rx.changed() => break,
                    _ = tokio::time::sleep(inner.interval) => {}
                }
                if *cancel_rx.borrow() {
                    break;
                }

                match source.refresh(&current).await {
                    Ok(updated) => {
                        if *cancel_rx.borrow() {
                            // Cancelled while the refresh was in flight.
                            break;
                        }
                        let terminal = updated.status.is_terminal();
                        current = updated.clone();
                        sink.on_event(PollEvent::Refreshed(updated)).await;
                        if terminal {
                            break;
                        }
                    }
                    Err(err) => {
                        if !*cancel_rx.borrow() {
                            tracing::warn!(
                                id = %current.id,
                                error = %err,
                                "status check failed; polling stopped"
                            );
                            sink.on_event(PollEvent::CheckFailed(
                                "status check failed".to_string(),
                            ))
                            .await;
                        }
                        break;
                    }
                }
            }

            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.state.send_replace(PollState::Stopped);
            }
        });

        *active = Some(ActivePoll { cancel: cancel_tx });
        true
    }

    /// Stop polling. Idempotent; callable in any state. No further ticks
    /// fire after this returns.
    pub async fn cancel(&self) {
        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            let _ = previous.cancel.send(true);
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(PollState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use chrono::Utc;

    use crate::providers::ProviderError;
    use crate::task::{ProviderKind, TaskStatus};

    const TICK: Duration = Duration::from_millis(10);

    fn job_task(status: TaskStatus) -> Task {
        Task {
            id: "job-1".to_string(),
            provider: ProviderKind::Runway,
            status,
            model: "veo3.1".to_string(),
            duration_seconds: 4,
            progress: None,
            output: Vec::new(),
            error_message: None,
            estimated_cost: Some(0.5),
            cost: None,
            cost_breakdown: None,
            created_at: Utc::now(),
        }
    }

    /// Replays a scripted sequence of refresh results and counts calls.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Task, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Task, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn refresh(&self, task: &Task) -> Result<Task, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(task.clone()))
        }
    }

    struct RecordingSink {
        events: Mutex<Vec<PollEvent>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PollSink for RecordingSink {
        async fn on_event(&self, event: PollEvent) {
            self.events.lock().await.push(event);
        }
    }

    async fn wait_for_stop(controller: &PollingController) {
        for _ in 0..200 {
            if controller.state() == PollState::Stopped {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("controller never stopped");
    }

    #[tokio::test]
    async fn test_polls_until_terminal_then_stops() {
        let mut running = job_task(TaskStatus::Running);
        running.progress = Some(0.5);
        let succeeded = job_task(TaskStatus::Succeeded);
        let source = ScriptedSource::new(vec![Ok(running), Ok(succeeded)]);
        let sink = RecordingSink::new();

        let controller = PollingController::new(TICK);
        assert!(
            controller
                .start(job_task(TaskStatus::Pending), source.clone(), sink.clone())
                .await
        );
        assert_eq!(controller.state(), PollState::Polling);

        wait_for_stop(&controller).await;

        // Terminal after the second refresh: exactly two calls, no more
        // after the terminal state even though time keeps passing.
        assert_eq!(source.calls(), 2);
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(source.calls(), 2);

        let events = sink.events.lock().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            PollEvent::Refreshed(task) if task.status == TaskStatus::Succeeded
        ));
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick_prevents_all_calls() {
        let source = ScriptedSource::new(vec![]);
        let sink = RecordingSink::new();

        let controller = PollingController::new(Duration::from_millis(50));
        controller
            .start(job_task(TaskStatus::Pending), source.clone(), sink.clone())
            .await;
        controller.cancel().await;
        assert_eq!(controller.state(), PollState::Stopped);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(source.calls(), 0);
        assert!(sink.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let controller = PollingController::new(TICK);
        controller.cancel().await;
        controller.cancel().await;
        assert_eq!(controller.state(), PollState::Stopped);
    }

    #[tokio::test]
    async fn test_immediate_result_task_is_never_polled() {
        let mut task = job_task(TaskStatus::Succeeded);
        task.provider = ProviderKind::Runware;
        let source = ScriptedSource::new(vec![]);
        let sink = RecordingSink::new();

        let controller = PollingController::new(TICK);
        assert!(!controller.start(task, source.clone(), sink).await);
        assert_eq!(controller.state(), PollState::Idle);

        tokio::time::sleep(TICK * 5).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_terminal_task_is_not_polled() {
        let source = ScriptedSource::new(vec![]);
        let sink = RecordingSink::new();

        let controller = PollingController::new(TICK);
        assert!(
            !controller
                .start(job_task(TaskStatus::Failed), source.clone(), sink)
                .await
        );
        assert_eq!(controller.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_refresh_failure_stops_polling_with_generic_error() {
        let source = ScriptedSource::new(vec![Err(ProviderError::network("connection refused"))]);
        let sink = RecordingSink::new();

        let controller = PollingController::new(TICK);
        controller
            .start(job_task(TaskStatus::Pending), source.clone(), sink.clone())
            .await;
        wait_for_stop(&controller).await;

        // No retry of a broken poll.
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(source.calls(), 1);

        let events = sink.events.lock().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            PollEvent::CheckFailed(message) if message == "status check failed"
        ));
    }

    #[tokio::test]
    async fn test_starting_again_cancels_prior_schedule() {
        let slow_source = ScriptedSource::new(vec![]);
        let sink = RecordingSink::new();

        let controller = PollingController::new(Duration::from_millis(100));
        controller
            .start(job_task(TaskStatus::Pending), slow_source.clone(), sink.clone())
            .await;

        let succeeded = job_task(TaskStatus::Succeeded);
        let fast_source = ScriptedSource::new(vec![Ok(succeeded)]);
        let controller2_started = controller
            .start(job_task(TaskStatus::Pending), fast_source.clone(), sink.clone())
            .await;
        assert!(controller2_started);

        wait_for_stop(&controller).await;

        // The first schedule was cancelled before its first 100ms tick.
        assert_eq!(slow_source.calls(), 0);
        assert_eq!(fast_source.calls(), 1);
    }
}
