//! Runtime driver for [`EstimateSession`].
//!
//! The orchestrator owns the session behind a mutex, arms one debounce timer
//! task per qualifying edit (aborting the previous one), and dispatches each
//! released request in its own task so that superseding a request never
//! cancels it at the transport level. Stale responses are dropped by the
//! session's generation check. The current status is published on a
//! `watch` channel for subscribers and for synchronous reads.

use crate::core::session::{Dispatch, EstimateSession};
use crate::domain::model::{
    EstimateCandidate, EstimateRequest, EstimateResult, EstimateStatus, Generation,
    RawEstimateOutcome,
};
use crate::domain::ports::{ConfigProvider, EstimateClient};
use crate::utils::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct EstimateOrchestrator<C: EstimateClient + ?Sized + 'static> {
    shared: Arc<Shared<C>>,
}

struct Shared<C: ?Sized> {
    inner: Mutex<Inner>,
    status: watch::Sender<EstimateStatus>,
    client: Arc<C>,
}

struct Inner {
    session: EstimateSession,
    timer: Option<JoinHandle<()>>,
}

impl<C: EstimateClient + ?Sized + 'static> EstimateOrchestrator<C> {
    pub fn new(client: Arc<C>, debounce: Duration) -> Self {
        let (status, _) = watch::channel(EstimateStatus::NotRequested);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session: EstimateSession::new(debounce),
                    timer: None,
                }),
                status,
                client,
            }),
        }
    }

    pub fn from_config<P: ConfigProvider>(client: Arc<C>, config: &P) -> Self {
        Self::new(client, config.debounce())
    }

    /// Feeds the merged form state after an edit. Never blocks.
    ///
    /// A candidate that fails local validation is rejected without touching
    /// the session: nothing is scheduled and the status is unchanged.
    /// Must be called from within a tokio runtime.
    pub fn on_field_change(&self, candidate: &EstimateCandidate) -> Result<Generation> {
        let request = candidate.to_request().inspect_err(|e| {
            tracing::debug!("Edit not dispatched: {}", e);
        })?;

        let mut inner = self.shared.lock();
        let generation = inner.session.schedule(request, Instant::now());
        tracing::debug!(
            "Scheduled estimate generation {} (debounce {:?})",
            generation,
            inner.session.debounce()
        );
        self.arm_timer(&mut inner, generation);
        self.shared.publish(&inner.session);
        Ok(generation)
    }

    /// User-triggered retry of a failed estimate. Dispatches immediately.
    pub fn retry(&self) -> Option<Generation> {
        let mut inner = self.shared.lock();
        let generation = inner.session.retry(Instant::now())?;
        tracing::info!("Retrying estimate as generation {}", generation);
        self.arm_timer(&mut inner, generation);
        self.shared.publish(&inner.session);
        Some(generation)
    }

    pub fn current_estimate(&self) -> EstimateStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EstimateStatus> {
        self.shared.status.subscribe()
    }

    pub fn last_result(&self) -> Option<EstimateResult> {
        self.shared.lock().session.last_result().cloned()
    }

    pub fn last_request(&self) -> Option<EstimateRequest> {
        self.shared.lock().session.last_request().cloned()
    }

    /// Waits until the current edit generation resolves.
    /// Returns `None` if nothing has been requested yet.
    pub async fn resolved(&self) -> Option<EstimateResult> {
        let mut rx = self.subscribe();
        if *rx.borrow_and_update() == EstimateStatus::NotRequested {
            return None;
        }
        let status = rx.wait_for(EstimateStatus::is_ready).await.ok()?;
        status.result().cloned()
    }

    fn arm_timer(&self, inner: &mut Inner, generation: Generation) {
        if let Some(previous) = inner.timer.take() {
            previous.abort();
        }
        let Some(deadline) = inner.session.deadline() else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.fire(generation);
        }));
    }
}

impl<C: EstimateClient + ?Sized + 'static> Drop for EstimateOrchestrator<C> {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.lock().timer.take() {
            timer.abort();
        }
    }
}

impl<C: EstimateClient + ?Sized + 'static> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &EstimateSession) {
        let next = session.current_estimate();
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn fire(self: Arc<Self>, generation: Generation) {
        let dispatch = self.lock().session.poll_due(generation, Instant::now());
        let Some(Dispatch {
            generation,
            request,
        }) = dispatch
        else {
            return;
        };

        tracing::debug!(
            "Dispatching estimate generation {}: {} lbs {} -> {}",
            generation,
            request.weight_estimate,
            request.origin_postal_code,
            request.destination_postal_code
        );

        tokio::spawn(async move {
            let outcome = self.client.compute_estimate(&request).await;
            self.resolve(generation, outcome);
        });
    }

    fn resolve(&self, generation: Generation, outcome: RawEstimateOutcome) {
        let mut inner = self.lock();
        let Some(result) = inner.session.on_request_resolved(generation, outcome) else {
            return;
        };

        match &result {
            EstimateResult::Success(range) => tracing::info!(
                "Estimate generation {} accepted: {}..{} cents",
                generation,
                range.min(),
                range.max()
            ),
            EstimateResult::Failure { kind, detail } => tracing::warn!(
                "Estimate generation {} failed ({:?}): {}",
                generation,
                kind,
                detail
            ),
        }
        self.publish(&inner.session);
    }
}
