//! Explicit state machine for one mounted edit form.
//!
//! The session is a plain value: it never spawns, sleeps or performs I/O.
//! Callers feed it qualifying edits, clock readings and resolved outcomes,
//! and it decides what may be dispatched and which result is current.

use crate::core::reconcile::classify_failure;
use crate::domain::model::{
    EstimateRequest, EstimateResult, EstimateStatus, Generation, RawEstimateOutcome,
};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Debouncing {
        generation: Generation,
        request: EstimateRequest,
        deadline: Instant,
    },
    InFlight {
        generation: Generation,
        request: EstimateRequest,
    },
    Resolved {
        generation: Generation,
        result: EstimateResult,
    },
}

/// A request released from debounce and owed to the estimate client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub generation: Generation,
    pub request: EstimateRequest,
}

#[derive(Debug)]
pub struct EstimateSession {
    debounce: Duration,
    state: SessionState,
    last_generation: Generation,
    last_request: Option<EstimateRequest>,
    last_result: Option<EstimateResult>,
}

impl Default for EstimateSession {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl EstimateSession {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: SessionState::Idle,
            last_generation: 0,
            last_request: None,
            last_result: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Starts (or restarts) the trailing debounce for a validated request.
    ///
    /// Any in-flight request is superseded: its generation is no longer
    /// current, so its response will be dropped when it lands.
    pub fn schedule(&mut self, request: EstimateRequest, now: Instant) -> Generation {
        self.enter_debounce(request, now + self.debounce)
    }

    /// Re-dispatches the last request without waiting for the debounce.
    /// Only a generation that resolved to a failure can be retried.
    pub fn retry(&mut self, now: Instant) -> Option<Generation> {
        match &self.state {
            SessionState::Resolved {
                result: EstimateResult::Failure { .. },
                ..
            } => {}
            _ => return None,
        }
        let request = self.last_request.clone()?;
        Some(self.enter_debounce(request, now))
    }

    fn enter_debounce(&mut self, request: EstimateRequest, deadline: Instant) -> Generation {
        self.last_generation += 1;
        let generation = self.last_generation;

        if let SessionState::InFlight { generation: stale, .. } = &self.state {
            tracing::debug!("Generation {} superseded by {} while in flight", stale, generation);
        }

        self.last_request = Some(request.clone());
        self.state = SessionState::Debouncing {
            generation,
            request,
            deadline,
        };
        generation
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            SessionState::Debouncing { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Releases the request for `generation` once its debounce has elapsed.
    pub fn poll_due(&mut self, generation: Generation, now: Instant) -> Option<Dispatch> {
        let request = match &self.state {
            SessionState::Debouncing {
                generation: current,
                request,
                deadline,
            } if *current == generation && *deadline <= now => request.clone(),
            _ => return None,
        };

        self.state = SessionState::InFlight {
            generation,
            request: request.clone(),
        };
        Some(Dispatch {
            generation,
            request,
        })
    }

    /// Accepts the outcome only if it belongs to the most recent dispatch.
    /// Returns the classified result when accepted, `None` when discarded.
    pub fn on_request_resolved(
        &mut self,
        generation: Generation,
        outcome: RawEstimateOutcome,
    ) -> Option<EstimateResult> {
        match &self.state {
            SessionState::InFlight {
                generation: current,
                ..
            } if *current == generation => {}
            _ => {
                tracing::debug!(
                    "Discarding response for superseded generation {} (latest {})",
                    generation,
                    self.last_generation
                );
                return None;
            }
        }

        let result = match outcome {
            Ok(range) => EstimateResult::Success(range),
            Err(err) => EstimateResult::Failure {
                kind: classify_failure(&err),
                detail: err.to_string(),
            },
        };

        self.last_result = Some(result.clone());
        self.state = SessionState::Resolved {
            generation,
            result: result.clone(),
        };
        Some(result)
    }

    pub fn current_estimate(&self) -> EstimateStatus {
        match &self.state {
            SessionState::Idle => EstimateStatus::NotRequested,
            SessionState::Debouncing { .. } | SessionState::InFlight { .. } => {
                EstimateStatus::Pending
            }
            SessionState::Resolved { result, .. } => EstimateStatus::Ready(result.clone()),
        }
    }

    /// Most recent accepted result of any generation.
    pub fn last_result(&self) -> Option<&EstimateResult> {
        self.last_result.as_ref()
    }

    pub fn last_request(&self) -> Option<&EstimateRequest> {
        self.last_request.as_ref()
    }
}
