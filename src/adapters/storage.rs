use crate::core::{PersistedPpmRecord, PpmStore};
use crate::utils::error::{EstimateError, Result};
use crate::utils::validation::validate_record_id;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One pretty-printed `{move_id}.json` per move under `base_path`.
#[derive(Debug, Clone)]
pub struct FilePpmStore {
    base_path: String,
}

impl FilePpmStore {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn record_path(&self, move_id: &str) -> Result<PathBuf> {
        validate_record_id("move_id", move_id)?;
        Ok(Path::new(&self.base_path).join(format!("{}.json", move_id)))
    }
}

#[async_trait]
impl PpmStore for FilePpmStore {
    async fn get_ppm_for_move(&self, move_id: &str) -> Result<PersistedPpmRecord> {
        let full_path = self.record_path(move_id)?;
        let data = match tokio::fs::read(&full_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EstimateError::RecordNotFound {
                    move_id: move_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    async fn patch_ppm(
        &self,
        move_id: &str,
        record: &PersistedPpmRecord,
    ) -> Result<PersistedPpmRecord> {
        let full_path = self.record_path(move_id)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&full_path, json).await?;
        tracing::debug!("PPM record {} written to {}", record.id, full_path.display());
        Ok(record.clone())
    }
}
