pub mod orchestrator;
pub mod reconcile;
pub mod session;

pub use crate::domain::model::{
    Cents, EstimateCandidate, EstimateRequest, EstimateResult, EstimateStatus, FailureKind,
    Generation, IncentiveRange, PersistedPpmRecord, RawEstimateError, RawEstimateOutcome,
};
pub use crate::domain::ports::{ConfigProvider, EstimateClient, PpmStore, UnavailablePolicy};
pub use crate::utils::error::Result;
