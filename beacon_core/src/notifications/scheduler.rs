//! Registry of per-user poll streams.
//!
//! Every stream runs in its own task: wait for the next tick, run one cycle,
//! install the returned state, repeat. Cycles of one stream therefore never
//! overlap, and the registry only holds handles (cancel token, generation,
//! latest-state receiver), never the state being mutated.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::Result;
use crate::models::UserId;
use crate::notifications::cycle::{CycleReport, CycleResult, PollCycleExecutor};
use crate::notifications::models::{RegistrationEvent, StreamRegistration, StreamState};
use crate::notifications::notice::DISABLED_NOTICE;
use crate::notifications::traits::NoticeSender;

const CYCLE_REPORT_CAPACITY: usize = 256;

struct StreamHandle {
    generation: u64,
    cancel: CancellationToken,
    state: watch::Receiver<StreamState>,
}

struct SchedulerInner {
    executor: PollCycleExecutor,
    notices: Arc<dyn NoticeSender>,
    streams: DashMap<UserId, StreamHandle>,
    next_generation: AtomicU64,
    tasks: TaskTracker,
    cycles: broadcast::Sender<CycleReport>,
}

/// Owns one recurring poll stream per registered user.
#[derive(Clone)]
pub struct StreamScheduler {
    inner: Arc<SchedulerInner>,
}

impl StreamScheduler {
    pub fn new(executor: PollCycleExecutor, notices: Arc<dyn NoticeSender>) -> Self {
        let (cycles, _) = broadcast::channel(CYCLE_REPORT_CAPACITY);
        Self {
            inner: Arc::new(SchedulerInner {
                executor,
                notices,
                streams: DashMap::new(),
                next_generation: AtomicU64::new(1),
                tasks: TaskTracker::new(),
                cycles,
            }),
        }
    }

    /// Start polling for a user, replacing any stream already registered for them.
    ///
    /// A replaced stream's in-flight cycle may still finish and publish.
    #[tracing::instrument(level = "info", skip_all, fields(user_id = %reg.user_id, room_id = %reg.room_id))]
    pub fn add_user(&self, reg: StreamRegistration) -> Result<()> {
        reg.validate()?;

        let state = StreamState::from_registration(reg);
        let user_id = state.user_id().clone();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(state.clone());

        let handle = StreamHandle {
            generation,
            cancel: cancel.clone(),
            state: state_rx,
        };
        if let Some(previous) = self.inner.streams.insert(user_id.clone(), handle) {
            previous.cancel.cancel();
            tracing::info!(
                previous_generation = previous.generation,
                "replaced existing notification stream"
            );
        }

        // Spawn only after the handle is installed so a trip in the very first
        // cycle finds its own entry.
        let inner = self.inner.clone();
        self.inner
            .tasks
            .spawn(run_stream(inner, state, generation, cancel, state_tx));

        tracing::info!(generation, "notification stream started");
        Ok(())
    }

    /// Stop polling for a user. Returns whether a stream was registered.
    ///
    /// Future cycles are cancelled; one already in flight runs to completion.
    #[tracing::instrument(level = "info", skip(self), fields(user_id = %user_id))]
    pub fn remove_user(&self, user_id: &UserId) -> bool {
        match self.inner.streams.remove(user_id) {
            Some((_, handle)) => {
                handle.cancel.cancel();
                tracing::info!(generation = handle.generation, "notification stream removed");
                true
            }
            None => {
                tracing::info!("no notification stream registered; nothing to remove");
                false
            }
        }
    }

    /// Apply an enable/disable request from the registration collaborator.
    pub fn handle_event(&self, event: RegistrationEvent) -> Result<()> {
        match event {
            RegistrationEvent::Enable(reg) => self.add_user(reg),
            RegistrationEvent::Disable { user_id } => {
                self.remove_user(&user_id);
                Ok(())
            }
        }
    }

    /// Latest installed state for a user.
    pub fn snapshot(&self, user_id: &UserId) -> Option<StreamState> {
        self.inner
            .streams
            .get(user_id)
            .map(|h| h.state.borrow().clone())
    }

    /// Latest installed state of every stream, ordered by user id.
    pub fn list_streams(&self) -> Vec<StreamState> {
        let mut out: Vec<StreamState> = self
            .inner
            .streams
            .iter()
            .map(|entry| entry.value().state.borrow().clone())
            .collect();
        out.sort_by(|a, b| a.user_id().cmp(b.user_id()));
        out
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.inner.streams.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.inner.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.streams.is_empty()
    }

    /// Receive a report after every completed cycle of every stream.
    pub fn subscribe_cycles(&self) -> broadcast::Receiver<CycleReport> {
        self.inner.cycles.subscribe()
    }

    /// Cancel every stream and wait for their tasks to finish.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn shutdown(&self) {
        let users: Vec<UserId> = self
            .inner
            .streams
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for user_id in &users {
            if let Some((_, handle)) = self.inner.streams.remove(user_id) {
                handle.cancel.cancel();
            }
        }
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        tracing::info!(streams = users.len(), "notification scheduler stopped");
    }
}

impl SchedulerInner {
    /// Deregister a stream whose failures exceeded the threshold and tell the user.
    ///
    /// Skipped when the user has since been removed or re-registered.
    async fn disable(&self, state: &StreamState, generation: u64) {
        let removed = self
            .streams
            .remove_if(state.user_id(), |_, h| h.generation == generation);
        let Some((_, handle)) = removed else {
            tracing::info!(
                user_id = %state.user_id(),
                "stream already replaced or removed; not sending disable notice"
            );
            return;
        };
        handle.cancel.cancel();

        tracing::warn!(
            user_id = %state.user_id(),
            room_id = %state.room_id(),
            failure_count = state.failure_count,
            "notification fetch failures exceeded threshold; stream disabled"
        );
        if let Err(e) = self.notices.send_notice(state.room_id(), DISABLED_NOTICE).await {
            tracing::error!(
                user_id = %state.user_id(),
                error = %e,
                "failed to send disable notice"
            );
        }
    }
}

async fn run_stream(
    inner: Arc<SchedulerInner>,
    mut state: StreamState,
    generation: u64,
    cancel: CancellationToken,
    state_tx: watch::Sender<StreamState>,
) {
    let mut ticker = tokio::time::interval(inner.executor.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let CycleResult { state: next, report } = inner.executor.run_cycle(state).await;
        state = next;
        state_tx.send_replace(state.clone());

        let tripped = report.threshold_tripped;
        if tripped {
            inner.disable(&state, generation).await;
        }
        // No subscribers is fine.
        let _ = inner.cycles.send(report);
        if tripped {
            break;
        }
    }

    tracing::debug!(user_id = %state.user_id(), generation, "notification stream task exited");
}
