// src/store/mod.rs
use crate::model::{FinancialYearRecord, UploadRecord};
use crate::utils::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// Upload status values written back to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Extracted,
    Failed,
}

/// One status write. Success carries the latest-year headline fields and the
/// full per-year array for audit; failure carries the user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: UploadStatus,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_extraction: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusUpdate {
    fn base(status: UploadStatus) -> Self {
        Self {
            status,
            updated_at: chrono::Utc::now().to_rfc3339(),
            fiscal_year: None,
            fiscal_year_end: None,
            extraction_confidence: None,
            raw_extraction: None,
            error_message: None,
        }
    }

    pub fn processing() -> Self {
        Self::base(UploadStatus::Processing)
    }

    pub fn extracted(latest: &FinancialYearRecord, all_years: &[FinancialYearRecord]) -> Self {
        let mut update = Self::base(UploadStatus::Extracted);
        update.fiscal_year = Some(latest.fiscal_year);
        update.fiscal_year_end = latest.fiscal_year_end.clone();
        update.extraction_confidence = Some(latest.confidence);
        update.raw_extraction = Some(json!({ "years": all_years }));
        update
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut update = Self::base(UploadStatus::Failed);
        update.error_message = Some(message.into());
        update
    }
}

/// Platform-side persistence the pipeline collaborates with.
///
/// The upsert is keyed by `(client_id, fiscal_year)`; concurrent invocations
/// on the same key are last-writer-wins and the caller's job to serialize.
pub trait UploadStore {
    fn fetch_upload(&self, upload_id: &str) -> Result<UploadRecord, StoreError>;
    fn set_status(&self, upload_id: &str, update: &StatusUpdate) -> Result<(), StoreError>;
    fn upsert_year_record(
        &self,
        client_id: &str,
        record: &FinancialYearRecord,
    ) -> Result<(), StoreError>;
}

/// Object storage holding the uploaded document bytes.
pub trait ObjectStore {
    fn download(&self, storage_path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Filesystem-backed implementation of both collaborator interfaces, used by
/// the CLI and by tests. Layout under the base directory:
///
/// ```text
/// uploads/<id>.json          upload record (read)
/// uploads/<id>.status.json   status writes
/// objects/<storage_path>     document bytes
/// records/<client_id>/<fiscal_year>.json   per-year upserts
/// ```
pub struct FsStore {
    base_dir: PathBuf,
}

impl FsStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StoreError> {
        let base_path = base_dir.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StoreError::Io)?;
        }
        Ok(Self {
            base_dir: base_path,
        })
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }
        let serialized = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(path, serialized).map_err(StoreError::Io)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl UploadStore for FsStore {
    fn fetch_upload(&self, upload_id: &str) -> Result<UploadRecord, StoreError> {
        let path = self.base_dir.join("uploads").join(format!("{}.json", upload_id));
        let raw = fs::read_to_string(&path)
            .map_err(|_| StoreError::UploadNotFound(upload_id.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn set_status(&self, upload_id: &str, update: &StatusUpdate) -> Result<(), StoreError> {
        let path = self
            .base_dir
            .join("uploads")
            .join(format!("{}.status.json", upload_id));
        self.write_json(&path, update)
    }

    fn upsert_year_record(
        &self,
        client_id: &str,
        record: &FinancialYearRecord,
    ) -> Result<(), StoreError> {
        let path = self
            .base_dir
            .join("records")
            .join(client_id)
            .join(format!("{}.json", record.fiscal_year));

        // Upsert = overwrite for the (client, year) key. Notes are flattened
        // to one newline-joined column the way the platform stores them.
        let mut row = serde_json::to_value(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(obj) = row.as_object_mut() {
            obj.insert("client_id".to_string(), json!(client_id));
            obj.insert("data_source".to_string(), json!("upload"));
            obj.insert("confidence_score".to_string(), json!(record.confidence));
            obj.insert("notes".to_string(), json!(record.notes.join("\n")));
        }
        self.write_json(&path, &row)?;
        tracing::info!(
            "Upserted year record {} for client {}",
            record.fiscal_year,
            client_id
        );
        Ok(())
    }
}

impl ObjectStore for FsStore {
    fn download(&self, storage_path: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.base_dir.join("objects").join(storage_path);
        fs::read(&path).map_err(|e| {
            StoreError::DownloadFailure(format!("{}: {}", storage_path, e))
        })
    }
}
