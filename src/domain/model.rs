use crate::utils::error::{EstimateError, Result};
use crate::utils::validation::{validate_postal_code, validate_sit_days};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Money amounts are carried as integer cents end to end.
pub type Cents = u64;

/// Identity of one qualifying edit. Strictly increasing per session.
pub type Generation = u64;

/// Merged form state handed over by the edit form on every relevant change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateCandidate {
    pub move_date: Option<NaiveDate>,
    pub origin_postal_code: String,
    pub destination_postal_code: String,
    pub sit_requested: bool,
    pub sit_days: Option<u32>,
    pub weight_estimate: Option<u32>,
}

impl EstimateCandidate {
    /// Builds the request that would be dispatched, or the reason it must not be.
    pub fn to_request(&self) -> Result<EstimateRequest> {
        let move_date = self.move_date.ok_or_else(|| EstimateError::ValidationRejected {
            field: "move_date".to_string(),
            reason: "a move date is required".to_string(),
        })?;
        validate_postal_code("origin_postal_code", &self.origin_postal_code)?;
        validate_postal_code("destination_postal_code", &self.destination_postal_code)?;

        // A leftover duration from an unticked SIT box is not sent.
        let sit_days = if self.sit_requested {
            Some(validate_sit_days("sit_days", self.sit_days)?)
        } else {
            None
        };

        let weight_estimate =
            self.weight_estimate
                .ok_or_else(|| EstimateError::ValidationRejected {
                    field: "weight_estimate".to_string(),
                    reason: "a weight estimate is required".to_string(),
                })?;

        Ok(EstimateRequest {
            move_date,
            origin_postal_code: self.origin_postal_code.clone(),
            destination_postal_code: self.destination_postal_code.clone(),
            sit_requested: self.sit_requested,
            sit_days,
            weight_estimate,
        })
    }
}

/// A validated recalculation request, serialized as the rate engine payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub move_date: NaiveDate,
    pub origin_postal_code: String,
    pub destination_postal_code: String,
    pub sit_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sit_days: Option<u32>,
    pub weight_estimate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRange")]
pub struct IncentiveRange {
    min: Cents,
    max: Cents,
}

#[derive(Deserialize)]
struct UncheckedRange {
    min: Cents,
    max: Cents,
}

impl TryFrom<UncheckedRange> for IncentiveRange {
    type Error = String;

    fn try_from(raw: UncheckedRange) -> std::result::Result<Self, Self::Error> {
        IncentiveRange::new(raw.min, raw.max)
            .ok_or_else(|| format!("min {} exceeds max {}", raw.min, raw.max))
    }
}

impl IncentiveRange {
    /// Returns `None` when `min > max`.
    pub fn new(min: Cents, max: Cents) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> Cents {
        self.min
    }

    pub fn max(&self) -> Cents {
        self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The rate engine has no pricing for this route/date (e.g. short haul).
    RateEngineUnavailable,
    /// Timeout, malformed payload, 5xx or any other unexpected failure.
    ComputationError,
}

impl FailureKind {
    pub fn remediation(&self) -> &'static str {
        match self {
            FailureKind::RateEngineUnavailable => {
                "We can't estimate your incentive for this move. Contact your local transportation office."
            }
            FailureKind::ComputationError => {
                "Your incentive estimate is temporarily unavailable. Try again in a moment."
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::ComputationError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateResult {
    Success(IncentiveRange),
    Failure { kind: FailureKind, detail: String },
}

impl EstimateResult {
    pub fn incentive(&self) -> Option<&IncentiveRange> {
        match self {
            EstimateResult::Success(range) => Some(range),
            EstimateResult::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            EstimateResult::Success(_) => None,
            EstimateResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// What the transport layer hands back when a computation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawEstimateError {
    #[error("rate engine responded with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("rate engine request timed out")]
    Timeout,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed rate engine response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for RawEstimateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RawEstimateError::Timeout
        } else if err.is_decode() {
            RawEstimateError::Malformed(err.to_string())
        } else {
            RawEstimateError::Transport(err.to_string())
        }
    }
}

pub type RawEstimateOutcome = std::result::Result<IncentiveRange, RawEstimateError>;

/// Synchronous view of the orchestrator for the form layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimateStatus {
    /// No qualifying edit has happened yet.
    NotRequested,
    /// A debounce or request is outstanding for the current edit.
    Pending,
    Ready(EstimateResult),
}

impl EstimateStatus {
    pub fn result(&self) -> Option<&EstimateResult> {
        match self {
            EstimateStatus::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EstimateStatus::Ready(_))
    }
}

/// The shipment's estimate state as last saved to the PPM store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPpmRecord {
    pub id: String,
    pub weight_estimate: u32,
    pub original_move_date: NaiveDate,
    pub pickup_postal_code: String,
    pub destination_postal_code: String,
    pub has_sit: bool,
    #[serde(default)]
    pub days_in_storage: Option<u32>,
    #[serde(default)]
    pub incentive_estimate_min: Option<Cents>,
    #[serde(default)]
    pub incentive_estimate_max: Option<Cents>,
    #[serde(default)]
    pub advance_requested: bool,
    #[serde(default)]
    pub advance_amount: Option<Cents>,
}

impl PersistedPpmRecord {
    pub fn saved_range(&self) -> Option<IncentiveRange> {
        match (self.incentive_estimate_min, self.incentive_estimate_max) {
            (Some(min), Some(max)) => IncentiveRange::new(min, max),
            _ => None,
        }
    }

    /// Requested advance in cents; zero when no advance was asked for.
    pub fn requested_advance(&self) -> Cents {
        if self.advance_requested {
            self.advance_amount.unwrap_or(0)
        } else {
            0
        }
    }

    /// Form state seeded from the saved record on mount.
    pub fn to_candidate(&self) -> EstimateCandidate {
        EstimateCandidate {
            move_date: Some(self.original_move_date),
            origin_postal_code: self.pickup_postal_code.clone(),
            destination_postal_code: self.destination_postal_code.clone(),
            sit_requested: self.has_sit,
            sit_days: self.days_in_storage,
            weight_estimate: Some(self.weight_estimate),
        }
    }

    /// The record to patch on save: edited fields plus the accepted estimate, if any.
    pub fn with_estimate(
        &self,
        request: &EstimateRequest,
        estimate: Option<&IncentiveRange>,
    ) -> PersistedPpmRecord {
        PersistedPpmRecord {
            id: self.id.clone(),
            weight_estimate: request.weight_estimate,
            original_move_date: request.move_date,
            pickup_postal_code: request.origin_postal_code.clone(),
            destination_postal_code: request.destination_postal_code.clone(),
            has_sit: request.sit_requested,
            days_in_storage: request.sit_days,
            incentive_estimate_min: estimate.map(IncentiveRange::min),
            incentive_estimate_max: estimate.map(IncentiveRange::max),
            advance_requested: self.advance_requested,
            advance_amount: self.advance_amount,
        }
    }
}
