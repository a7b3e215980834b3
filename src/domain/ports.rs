use crate::domain::model::{EstimateRequest, PersistedPpmRecord, RawEstimateOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote procedure turning a request into an incentive range.
#[async_trait]
pub trait EstimateClient: Send + Sync {
    async fn compute_estimate(&self, request: &EstimateRequest) -> RawEstimateOutcome;
}

/// Durable storage of the shipment's PPM record.
#[async_trait]
pub trait PpmStore: Send + Sync {
    async fn get_ppm_for_move(&self, move_id: &str) -> Result<PersistedPpmRecord>;
    async fn patch_ppm(
        &self,
        move_id: &str,
        record: &PersistedPpmRecord,
    ) -> Result<PersistedPpmRecord>;
}

/// Whether a PPM may be saved while the rate engine reports no pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    /// Pricing is deferred to manual office review.
    #[default]
    AllowSave,
    BlockSave,
}

pub trait ConfigProvider: Send + Sync {
    fn rate_engine_endpoint(&self) -> &str;
    fn ppm_store_endpoint(&self) -> Option<&str>;
    fn ppm_store_directory(&self) -> Option<&str>;
    fn debounce(&self) -> Duration;
    fn request_timeout(&self) -> Duration;
    fn unavailable_policy(&self) -> UnavailablePolicy;
}
