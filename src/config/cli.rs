use crate::core::{ConfigProvider, EstimateCandidate, UnavailablePolicy};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_record_id,
    validate_required_field, validate_url, Validate,
};
use chrono::NaiveDate;
use clap::{Args, Parser};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "ppm-estimate")]
#[command(about = "Compute and reconcile the incentive estimate of a PPM shipment")]
pub struct CliConfig {
    #[arg(long, default_value = "http://localhost:8080/internal/ppm/estimates")]
    pub rate_engine_endpoint: String,

    #[arg(long, help = "Base URL of the move API holding PPM records")]
    pub ppm_store_endpoint: Option<String>,

    #[arg(long, help = "Directory of local PPM records, used when no store endpoint is set")]
    pub ppm_dir: Option<String>,

    #[arg(long, default_value = "300")]
    pub debounce_ms: u64,

    #[arg(long, default_value = "10")]
    pub timeout_seconds: u64,

    #[arg(long, help = "Refuse to save while the rate engine has no pricing")]
    pub block_save_when_unavailable: bool,

    #[arg(short, long, help = "TOML configuration file; replaces the connection flags")]
    pub config: Option<String>,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(flatten)]
    pub shipment: ShipmentArgs,
}

/// Shipment fields; each one overrides the persisted record when given.
#[derive(Debug, Clone, Default, Args)]
pub struct ShipmentArgs {
    #[arg(long)]
    pub move_id: Option<String>,

    #[arg(long, help = "Expected departure date (YYYY-MM-DD)")]
    pub move_date: Option<NaiveDate>,

    #[arg(long, help = "Origin postal code")]
    pub origin: Option<String>,

    #[arg(long, help = "Destination postal code")]
    pub destination: Option<String>,

    #[arg(long, help = "Request storage in transit for this many days")]
    pub sit_days: Option<u32>,

    #[arg(long, conflicts_with = "sit_days", help = "Drop storage in transit from the shipment")]
    pub no_sit: bool,

    #[arg(long, help = "Estimated weight in pounds")]
    pub weight: Option<u32>,

    #[arg(long, help = "Requested advance in cents")]
    pub advance: Option<u64>,

    #[arg(long, help = "Persist the accepted estimate when saving is allowed")]
    pub save: bool,

    #[arg(long, default_value = "30")]
    pub wait_seconds: u64,
}

impl ShipmentArgs {
    pub fn apply_to(&self, mut candidate: EstimateCandidate) -> EstimateCandidate {
        if let Some(date) = self.move_date {
            candidate.move_date = Some(date);
        }
        if let Some(origin) = &self.origin {
            candidate.origin_postal_code = origin.clone();
        }
        if let Some(destination) = &self.destination {
            candidate.destination_postal_code = destination.clone();
        }
        if let Some(days) = self.sit_days {
            candidate.sit_requested = true;
            candidate.sit_days = Some(days);
        }
        if self.no_sit {
            candidate.sit_requested = false;
            candidate.sit_days = None;
        }
        if let Some(weight) = self.weight {
            candidate.weight_estimate = Some(weight);
        }
        candidate
    }
}

impl ConfigProvider for CliConfig {
    fn rate_engine_endpoint(&self) -> &str {
        &self.rate_engine_endpoint
    }

    fn ppm_store_endpoint(&self) -> Option<&str> {
        self.ppm_store_endpoint.as_deref()
    }

    fn ppm_store_directory(&self) -> Option<&str> {
        self.ppm_dir.as_deref()
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn unavailable_policy(&self) -> UnavailablePolicy {
        if self.block_save_when_unavailable {
            UnavailablePolicy::BlockSave
        } else {
            UnavailablePolicy::AllowSave
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("rate_engine_endpoint", &self.rate_engine_endpoint)?;
        if let Some(endpoint) = &self.ppm_store_endpoint {
            validate_url("ppm_store_endpoint", endpoint)?;
        }
        if let Some(dir) = &self.ppm_dir {
            validate_path("ppm_dir", dir)?;
        }
        validate_positive_number("timeout_seconds", self.timeout_seconds, 1)?;
        validate_range("debounce_ms", self.debounce_ms, 0, 5_000)?;
        validate_positive_number("wait_seconds", self.shipment.wait_seconds, 1)?;
        if self.shipment.save {
            validate_required_field("move_id", &self.shipment.move_id)?;
        }
        if let Some(move_id) = &self.shipment.move_id {
            validate_record_id("move_id", move_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_and_validate() {
        let config = CliConfig::parse_from(["ppm-estimate"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.unavailable_policy(), UnavailablePolicy::AllowSave);
    }

    #[test]
    fn test_invalid_endpoint_fails_validation() {
        let config = CliConfig::parse_from(["ppm-estimate", "--rate-engine-endpoint", "nope"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_requires_move_id() {
        let config = CliConfig::parse_from(["ppm-estimate", "--save"]);
        assert!(matches!(
            config.validate(),
            Err(crate::utils::error::EstimateError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_move_id_must_be_a_single_segment() {
        let config = CliConfig::parse_from(["ppm-estimate", "--move-id", "../other"]);
        assert!(matches!(
            config.validate(),
            Err(crate::utils::error::EstimateError::InvalidConfigValueError { .. })
        ));
        let config = CliConfig::parse_from(["ppm-estimate", "--move-id", "move-1", "--save"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipment_flags_override_candidate() {
        let config = CliConfig::parse_from([
            "ppm-estimate",
            "--move-date",
            "2026-11-02",
            "--origin",
            "90210",
            "--destination",
            "76127",
            "--sit-days",
            "30",
            "--weight",
            "4000",
            "--block-save-when-unavailable",
        ]);
        let candidate = config.shipment.apply_to(EstimateCandidate::default());

        assert_eq!(candidate.move_date, NaiveDate::from_ymd_opt(2026, 11, 2));
        assert!(candidate.sit_requested);
        assert_eq!(candidate.sit_days, Some(30));
        assert!(candidate.to_request().is_ok());
        assert_eq!(config.unavailable_policy(), UnavailablePolicy::BlockSave);
    }

    #[test]
    fn test_no_sit_clears_persisted_storage() {
        let persisted = EstimateCandidate {
            move_date: NaiveDate::from_ymd_opt(2026, 11, 2),
            origin_postal_code: "90210".to_string(),
            destination_postal_code: "76127".to_string(),
            sit_requested: true,
            sit_days: Some(30),
            weight_estimate: Some(4000),
        };

        let config = CliConfig::parse_from(["ppm-estimate", "--no-sit"]);
        let candidate = config.shipment.apply_to(persisted.clone());
        assert!(!candidate.sit_requested);
        assert_eq!(candidate.sit_days, None);
        assert_eq!(candidate.to_request().unwrap().sit_days, None);

        let untouched = CliConfig::parse_from(["ppm-estimate"]).shipment.apply_to(persisted);
        assert!(untouched.sit_requested);

        assert!(CliConfig::try_parse_from(["ppm-estimate", "--no-sit", "--sit-days", "10"]).is_err());
    }
}
