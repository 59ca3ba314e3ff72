use std::{cell::RefCell, fmt, future::Future, sync::Arc};

use client::{Client, ClientError, CredentialStore, Transport};

use crate::snapshot::{DashboardSnapshot, PartialAggregationError, combine};

/// Number of resource calls in one batch.
const BATCH_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    Idle,
    Loading,
    Ready,
    Refreshing,
    Failed,
}

impl DashboardState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Refreshing => "refreshing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DashboardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        action: &'static str,
        from: DashboardState,
    },
    #[error("dashboard closed")]
    Closed,
}

/// What a `load`/`refresh` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A new snapshot was committed and the state is `ready`.
    Committed,
    /// A batch was already in flight; nothing was issued.
    Ignored,
    /// The batch settled after the dashboard was closed or reset.
    Discarded,
    /// The batch could not be dispatched; the state is `failed`.
    Failed,
}

/// Everything a consumer needs to render one frame.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub state: DashboardState,
    pub snapshot: Arc<DashboardSnapshot>,
    pub partial_error: Option<PartialAggregationError>,
    pub last_error: Option<ClientError>,
}

#[derive(Debug)]
struct Inner {
    state: DashboardState,
    snapshot: Arc<DashboardSnapshot>,
    partial_error: Option<PartialAggregationError>,
    last_error: Option<ClientError>,
    /// Bumped for every batch and on reset; stale batches compare unequal.
    generation: u64,
    in_flight: bool,
    pending: usize,
    closed: bool,
}

impl Inner {
    fn is_current(&self, ticket: u64) -> bool {
        !self.closed && self.generation == ticket
    }
}

/// Fetches the monthly summary, predictions and spending analysis together
/// and keeps the last combined snapshot.
///
/// Meant to be driven from a single task: calls interleave on one thread and
/// the internal `RefCell` is never borrowed across an `.await`.
pub struct Dashboard<'c, T, S> {
    client: &'c Client<T, S>,
    inner: RefCell<Inner>,
}

impl<'c, T: Transport, S: CredentialStore> Dashboard<'c, T, S> {
    /// Starts in `loading`: the owning screen shows a spinner until the
    /// first [`Self::load`] completes.
    pub fn new(client: &'c Client<T, S>) -> Self {
        Self {
            client,
            inner: RefCell::new(Inner {
                state: DashboardState::Loading,
                snapshot: Arc::new(DashboardSnapshot::default()),
                partial_error: None,
                last_error: None,
                generation: 0,
                in_flight: false,
                pending: 0,
                closed: false,
            }),
        }
    }

    pub fn state(&self) -> DashboardState {
        self.inner.borrow().state
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        Arc::clone(&self.inner.borrow().snapshot)
    }

    pub fn partial_error(&self) -> Option<PartialAggregationError> {
        self.inner.borrow().partial_error.clone()
    }

    /// Resource calls of the current batch that have not settled yet.
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    pub fn view(&self) -> DashboardView {
        let inner = self.inner.borrow();
        DashboardView {
            state: inner.state,
            snapshot: Arc::clone(&inner.snapshot),
            partial_error: inner.partial_error.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Issues a fresh batch. Ignored while another batch is in flight.
    pub async fn load(&self) -> Result<BatchOutcome, DashboardError> {
        {
            let inner = self.inner.borrow();
            if inner.closed {
                return Err(DashboardError::Closed);
            }
            if inner.in_flight {
                tracing::debug!("load ignored, batch already in flight");
                return Ok(BatchOutcome::Ignored);
            }
        }
        self.run_batch(DashboardState::Loading).await
    }

    /// Re-fetches everything while the previous snapshot stays visible.
    ///
    /// Only valid from `ready` or `failed`; a call while `refreshing` is a
    /// no-op.
    pub async fn refresh(&self) -> Result<BatchOutcome, DashboardError> {
        {
            let inner = self.inner.borrow();
            if inner.closed {
                return Err(DashboardError::Closed);
            }
            match inner.state {
                DashboardState::Refreshing => {
                    tracing::debug!("refresh ignored, already refreshing");
                    return Ok(BatchOutcome::Ignored);
                }
                DashboardState::Ready | DashboardState::Failed => {}
                from @ (DashboardState::Idle | DashboardState::Loading) => {
                    return Err(DashboardError::InvalidTransition {
                        action: "refresh",
                        from,
                    });
                }
            }
        }
        self.run_batch(DashboardState::Refreshing).await
    }

    /// Marks the consumer as gone. Batches settling afterwards are dropped
    /// without touching state.
    pub fn close(&self) {
        self.inner.borrow_mut().closed = true;
    }

    /// Back to `idle` with an empty snapshot, e.g. after signing out.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return;
        }
        inner.generation += 1;
        inner.state = DashboardState::Idle;
        inner.snapshot = Arc::new(DashboardSnapshot::default());
        inner.partial_error = None;
        inner.last_error = None;
        inner.in_flight = false;
        inner.pending = 0;
    }

    async fn run_batch(&self, busy: DashboardState) -> Result<BatchOutcome, DashboardError> {
        let (ticket, previous) = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            let previous = inner.state;
            inner.state = busy;
            (inner.generation, previous)
        };

        if let Err(err) = self.client.ensure_dispatchable() {
            tracing::warn!("dashboard batch not dispatched: {err}");
            let mut inner = self.inner.borrow_mut();
            inner.state = DashboardState::Failed;
            inner.last_error = Some(err);
            return Ok(BatchOutcome::Failed);
        }

        {
            let mut inner = self.inner.borrow_mut();
            inner.in_flight = true;
            inner.pending = BATCH_SIZE;
        }
        let mut guard = BatchGuard {
            inner: &self.inner,
            ticket,
            previous,
            armed: true,
        };

        let (monthly_summary, predictions, spending_analysis) = tokio::join!(
            self.settle(ticket, self.client.monthly_summary()),
            self.settle(ticket, self.client.predictions()),
            self.settle(ticket, self.client.spending_analysis()),
        );
        guard.armed = false;

        let (snapshot, partial_error) = combine(monthly_summary, predictions, spending_analysis);
        Ok(self.commit(ticket, snapshot, partial_error))
    }

    async fn settle<R>(&self, ticket: u64, call: impl Future<Output = R>) -> R {
        let result = call.await;
        let mut inner = self.inner.borrow_mut();
        if inner.is_current(ticket) {
            inner.pending = inner.pending.saturating_sub(1);
        }
        result
    }

    fn commit(
        &self,
        ticket: u64,
        snapshot: DashboardSnapshot,
        partial_error: Option<PartialAggregationError>,
    ) -> BatchOutcome {
        let mut inner = self.inner.borrow_mut();
        if !inner.is_current(ticket) {
            tracing::debug!("discarding dashboard batch {ticket}");
            return BatchOutcome::Discarded;
        }

        match &partial_error {
            Some(partial) => tracing::warn!("{partial}"),
            None => tracing::info!("dashboard ready"),
        }

        inner.snapshot = Arc::new(snapshot);
        inner.partial_error = partial_error;
        inner.last_error = None;
        inner.state = DashboardState::Ready;
        inner.in_flight = false;
        inner.pending = 0;
        BatchOutcome::Committed
    }
}

/// Puts the state back when a batch future is dropped before it settles.
struct BatchGuard<'a> {
    inner: &'a RefCell<Inner>,
    ticket: u64,
    previous: DashboardState,
    armed: bool,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        if !inner.is_current(self.ticket) {
            return;
        }
        tracing::debug!("dashboard batch {} cancelled", self.ticket);
        inner.state = self.previous;
        inner.in_flight = false;
        inner.pending = 0;
    }
}
