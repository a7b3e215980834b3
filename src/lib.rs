pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::adapters::{FilePpmStore, HttpEstimateClient, HttpPpmStore};
pub use crate::core::orchestrator::EstimateOrchestrator;
pub use crate::utils::error::{EstimateError, Result};
