use crate::core::session::DEFAULT_DEBOUNCE;
use crate::core::{ConfigProvider, UnavailablePolicy};
use crate::utils::error::{EstimateError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub rate_engine: RateEngineConfig,
    pub store: Option<StoreConfig>,
    pub orchestrator: Option<OrchestratorConfig>,
    pub policy: Option<PolicyConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateEngineConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: Option<String>,
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub on_rate_engine_unavailable: Option<UnavailablePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EstimateError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EstimateError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RATE_ENGINE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EstimateError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url("rate_engine.endpoint", &self.rate_engine.endpoint)?;

        if let Some(timeout) = self.rate_engine.timeout_seconds {
            crate::utils::validation::validate_positive_number(
                "rate_engine.timeout_seconds",
                timeout,
                1,
            )?;
        }

        if let Some(store) = &self.store {
            if let Some(endpoint) = &store.endpoint {
                crate::utils::validation::validate_url("store.endpoint", endpoint)?;
            }
            if let Some(directory) = &store.directory {
                crate::utils::validation::validate_path("store.directory", directory)?;
            }
        }

        crate::utils::validation::validate_range(
            "orchestrator.debounce_ms",
            self.debounce().as_millis() as u64,
            0,
            5_000,
        )?;

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            let valid_formats = ["compact", "json"];
            if !valid_formats.contains(&format) {
                return Err(EstimateError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }

        if let Some(level) = self.log_level() {
            crate::utils::validation::validate_non_empty_string("logging.level", level)?;
        }

        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|f| f == "json")
            .unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn rate_engine_endpoint(&self) -> &str {
        &self.rate_engine.endpoint
    }

    fn ppm_store_endpoint(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.endpoint.as_deref())
    }

    fn ppm_store_directory(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.directory.as_deref())
    }

    fn debounce(&self) -> Duration {
        self.orchestrator
            .as_ref()
            .and_then(|o| o.debounce_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.rate_engine
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    fn unavailable_policy(&self) -> UnavailablePolicy {
        self.policy
            .as_ref()
            .and_then(|p| p.on_rate_engine_unavailable)
            .unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let toml_content = r#"
[rate_engine]
endpoint = "https://rates.example.com/estimates"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.rate_engine_endpoint(), "https://rates.example.com/estimates");
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.unavailable_policy(), UnavailablePolicy::AllowSave);
        assert!(config.ppm_store_endpoint().is_none());
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[rate_engine]
endpoint = "https://rates.example.com/estimates"
timeout_seconds = 4

[store]
endpoint = "https://moves.example.com/internal"

[orchestrator]
debounce_ms = 150

[policy]
on_rate_engine_unavailable = "block_save"

[logging]
level = "debug"
format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(150));
        assert_eq!(config.request_timeout(), Duration::from_secs(4));
        assert_eq!(config.unavailable_policy(), UnavailablePolicy::BlockSave);
        assert_eq!(
            config.ppm_store_endpoint(),
            Some("https://moves.example.com/internal")
        );
        assert!(config.json_logs());
        assert_eq!(config.log_level(), Some("debug"));
    }

    #[test]
    fn test_unknown_policy_is_a_parse_error() {
        let toml_content = r#"
[rate_engine]
endpoint = "https://rates.example.com/estimates"

[policy]
on_rate_engine_unavailable = "shrug"
"#;

        let err = TomlConfig::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, EstimateError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_RATE_ENGINE_URL", "https://test.rates.com/estimates");

        let toml_content = r#"
[rate_engine]
endpoint = "${TEST_RATE_ENGINE_URL}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.rate_engine.endpoint, "https://test.rates.com/estimates");

        std::env::remove_var("TEST_RATE_ENGINE_URL");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[rate_engine]
endpoint = "invalid-url"
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[rate_engine]
endpoint = "https://rates.example.com"

[logging]
format = "xml"
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[rate_engine]
endpoint = "https://rates.example.com"

[store]
directory = "./ppm-records"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.ppm_store_directory(), Some("./ppm-records"));
    }
}
