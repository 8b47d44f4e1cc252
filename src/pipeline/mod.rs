// src/pipeline/mod.rs

// --- Imports ---
use crate::extractors::{excel_text, pdf_text, table};
use crate::llm::LlmClient;
use crate::metrics::apply_derived_metrics;
use crate::model::{
    ExtractionFailure, ExtractionSummary, FileType, FinancialYearRecord, LatestYearSummary,
    UploadRecord,
};
use crate::store::{ObjectStore, StatusUpdate, UploadStore};
use crate::utils::error::{AppError, ExtractError};

/// Minimum characters of recovered text worth sending to the model.
const MIN_TEXT_CHARS: usize = 100;

/// Pipeline stages. Every exit path goes through [`ExtractionOrchestrator::transition`],
/// so the failure transition is reachable before any year record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Received,
    Downloading,
    Extracting,
    Deriving,
    Persisting,
    Extracted,
    Failed,
}

/// Drives one upload through extraction, derivation and persistence.
///
/// Strictly sequential; one invocation handles exactly one upload. All
/// external calls are awaited with default timeouts and never retried.
pub struct ExtractionOrchestrator<S: UploadStore, O: ObjectStore> {
    store: S,
    objects: O,
    llm: LlmClient,
    state: UploadState,
}

impl<S: UploadStore, O: ObjectStore> ExtractionOrchestrator<S, O> {
    pub fn new(store: S, objects: O, llm: LlmClient) -> Self {
        Self {
            store,
            objects,
            llm,
            state: UploadState::Received,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    fn transition(&mut self, next: UploadState) {
        tracing::info!("Pipeline state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Entry point: runs the pipeline and funnels every fatal error through
    /// the single catch boundary, which best-effort records the failure and
    /// returns the failure contract.
    pub async fn process_upload(
        &mut self,
        upload_id: &str,
    ) -> Result<ExtractionSummary, ExtractionFailure> {
        match self.run(upload_id).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.transition(UploadState::Failed);
                let message = e.to_string();
                tracing::error!("Extraction failed for upload {}: {}", upload_id, message);
                // Best effort: the status write itself must not mask the
                // original failure (the upload row may not even exist).
                if let Err(write_err) = self
                    .store
                    .set_status(upload_id, &StatusUpdate::failed(&message))
                {
                    tracing::warn!("Could not record failure status: {}", write_err);
                }
                Err(ExtractionFailure::new(message))
            }
        }
    }

    async fn run(&mut self, upload_id: &str) -> Result<ExtractionSummary, AppError> {
        tracing::info!("Processing upload {}", upload_id);

        let upload = self.store.fetch_upload(upload_id)?;
        self.store.set_status(upload_id, &StatusUpdate::processing())?;

        self.transition(UploadState::Downloading);
        let bytes = self.objects.download(&upload.storage_path)?;
        tracing::info!("Downloaded {} bytes ({:?})", bytes.len(), upload.file_type);

        self.transition(UploadState::Extracting);
        let mut records = self.extract(&upload, &bytes).await?;
        if records.is_empty() {
            return Err(ExtractError::NoUsableRecords(
                "the document did not contain recognizable financial figures".to_string(),
            )
            .into());
        }

        self.transition(UploadState::Deriving);
        for rec in &mut records {
            apply_derived_metrics(rec);
        }

        self.transition(UploadState::Persisting);
        let saved = self.persist_years(&upload, &records);

        // Records are ascending, so the latest year is last.
        let latest = records.last().expect("non-empty records");
        self.store
            .set_status(upload_id, &StatusUpdate::extracted(latest, &records))?;

        self.transition(UploadState::Extracted);
        tracing::info!(
            "Upload {} extracted: {} year(s), {} saved",
            upload_id,
            records.len(),
            saved
        );

        Ok(ExtractionSummary {
            success: true,
            upload_id: upload_id.to_string(),
            years_extracted: records.len(),
            saved_records: saved,
            fiscal_years: records.iter().map(|r| r.fiscal_year).collect(),
            latest_year: LatestYearSummary {
                fiscal_year: latest.fiscal_year,
                revenue: latest.revenue,
                gross_profit: latest.gross_profit,
                net_profit: latest.net_profit,
                confidence: latest.confidence,
            },
            notes: latest.notes.clone(),
        })
    }

    /// Format dispatch. Each binary path gates on recovered-text quality
    /// before spending a language-model call on unusable input.
    async fn extract(
        &self,
        upload: &UploadRecord,
        bytes: &[u8],
    ) -> Result<Vec<FinancialYearRecord>, AppError> {
        match upload.file_type {
            FileType::Pdf => {
                let text = pdf_text::extract_pdf_text(bytes);
                if text.len() < MIN_TEXT_CHARS || !pdf_text::has_financial_signal(&text) {
                    tracing::warn!(
                        "PDF heuristic recovery insufficient ({} chars, signal: {})",
                        text.len(),
                        pdf_text::has_financial_signal(&text)
                    );
                    return Err(ExtractError::insufficient_text(text.len()).into());
                }
                Ok(self
                    .llm
                    .extract_from_raw_text(&text, upload.fiscal_year)
                    .await?)
            }
            FileType::Csv => {
                let text = decode_csv_bytes(bytes);
                match table::extract_structured(&text) {
                    Some(records) => Ok(records),
                    None => {
                        tracing::info!("Structured extraction failed; falling back to model");
                        Ok(self
                            .llm
                            .extract_from_document_text(&text, upload.fiscal_year)
                            .await?)
                    }
                }
            }
            FileType::Xlsx | FileType::Xls => {
                let text = excel_text::extract_excel_text(bytes);
                if text.len() < MIN_TEXT_CHARS {
                    tracing::warn!(
                        "Spreadsheet heuristic recovery insufficient ({} chars)",
                        text.len()
                    );
                    return Err(ExtractError::insufficient_text(text.len()).into());
                }
                Ok(self
                    .llm
                    .extract_from_document_text(&text, upload.fiscal_year)
                    .await?)
            }
        }
    }

    /// Sequential ascending per-year upserts. A single year's failure is
    /// logged and excluded from the saved count without aborting the rest;
    /// partial success is a designed outcome.
    fn persist_years(&self, upload: &UploadRecord, records: &[FinancialYearRecord]) -> usize {
        let mut saved = 0;
        for rec in records {
            match self.store.upsert_year_record(&upload.client_id, rec) {
                Ok(()) => saved += 1,
                Err(e) => {
                    tracing::error!(
                        "Failed to persist fiscal year {} for client {}: {}",
                        rec.fiscal_year,
                        upload.client_id,
                        e
                    );
                }
            }
        }
        saved
    }
}

/// CSV uploads arrive as raw bytes; strip a UTF-8 BOM before parsing.
fn decode_csv_bytes(bytes: &[u8]) -> String {
    let stripped = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(stripped).into_owned()
}
