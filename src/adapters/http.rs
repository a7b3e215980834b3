use crate::core::{
    ConfigProvider, EstimateClient, EstimateRequest, IncentiveRange, PersistedPpmRecord, PpmStore,
    RawEstimateError, RawEstimateOutcome,
};
use crate::utils::error::{EstimateError, Result};
use crate::utils::validation::validate_record_id;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct IncentivePayload {
    incentive_estimate_min: u64,
    incentive_estimate_max: u64,
}

/// Rate engine client. Timeouts are enforced here, not by the orchestrator.
#[derive(Debug, Clone)]
pub struct HttpEstimateClient {
    client: Client,
    endpoint: String,
}

impl HttpEstimateClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(config.rate_engine_endpoint(), config.request_timeout())
    }
}

#[async_trait]
impl EstimateClient for HttpEstimateClient {
    async fn compute_estimate(&self, request: &EstimateRequest) -> RawEstimateOutcome {
        tracing::debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(RawEstimateError::from)?;

        let status = response.status();
        tracing::debug!("Rate engine response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RawEstimateError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let payload: IncentivePayload = response
            .json()
            .await
            .map_err(|e| RawEstimateError::Malformed(e.to_string()))?;

        IncentiveRange::new(payload.incentive_estimate_min, payload.incentive_estimate_max)
            .ok_or_else(|| {
                RawEstimateError::Malformed(format!(
                    "incentive_estimate_min {} exceeds incentive_estimate_max {}",
                    payload.incentive_estimate_min, payload.incentive_estimate_max
                ))
            })
    }
}

/// PPM store behind the move REST API.
#[derive(Debug, Clone)]
pub struct HttpPpmStore {
    client: Client,
    base_url: Url,
}

impl HttpPpmStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).map_err(|e| EstimateError::InvalidConfigValueError {
            field: "ppm_store_endpoint".to_string(),
            value: base_url.clone(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(EstimateError::InvalidConfigValueError {
                field: "ppm_store_endpoint".to_string(),
                value: base_url,
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// `{base}/moves/{move_id}/ppm[/{ppm_id}]`, one encoded segment per id.
    fn ppm_url(&self, move_id: &str, ppm_id: Option<&str>) -> Result<Url> {
        validate_record_id("move_id", move_id)?;
        if let Some(ppm_id) = ppm_id {
            validate_record_id("ppm_id", ppm_id)?;
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                EstimateError::InvalidConfigValueError {
                    field: "ppm_store_endpoint".to_string(),
                    value: self.base_url.to_string(),
                    reason: "URL cannot carry a path".to_string(),
                }
            })?;
            segments.pop_if_empty().extend(["moves", move_id, "ppm"]);
            if let Some(ppm_id) = ppm_id {
                segments.push(ppm_id);
            }
        }
        Ok(url)
    }

    async fn read_record(
        &self,
        move_id: &str,
        response: reqwest::Response,
    ) -> Result<PersistedPpmRecord> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EstimateError::RecordNotFound {
                move_id: move_id.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EstimateError::StoreError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PpmStore for HttpPpmStore {
    async fn get_ppm_for_move(&self, move_id: &str) -> Result<PersistedPpmRecord> {
        let url = self.ppm_url(move_id, None)?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        self.read_record(move_id, response).await
    }

    async fn patch_ppm(
        &self,
        move_id: &str,
        record: &PersistedPpmRecord,
    ) -> Result<PersistedPpmRecord> {
        let url = self.ppm_url(move_id, Some(&record.id))?;
        tracing::debug!("PATCH {}", url);
        let response = self.client.patch(url).json(record).send().await?;
        self.read_record(move_id, response).await
    }
}
