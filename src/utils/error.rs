// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the pipeline

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Heuristic text recovery produced too little usable text to extract
    /// from. Expected for encrypted or scanned statutory filings; carries
    /// concrete remediation steps the caller can show to the user.
    #[error("could not recover enough readable text ({chars} usable characters)")]
    InsufficientText {
        chars: usize,
        remediation: Vec<String>,
    },

    #[error("no meaningful year records found: {0}")]
    NoUsableRecords(String),
}

impl ExtractError {
    /// Standard user-actionable error for documents the heuristics cannot
    /// read. Rendering of the remediation list stays outside the core.
    pub fn insufficient_text(chars: usize) -> Self {
        ExtractError::InsufficientText {
            chars,
            remediation: vec![
                "Export the accounts from your bookkeeping software as CSV and upload that instead".to_string(),
                "Transcribe the key figures (revenue, profit, assets) into a spreadsheet and upload it".to_string(),
            ],
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("Language-model endpoint returned HTTP {0}")]
    Http(reqwest::StatusCode),

    /// The response survived normalization attempts but still would not
    /// parse. Raw content is logged at the call site for diagnosis.
    #[error("Could not parse language-model response: {0}")]
    Unparseable(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Upload not found: {0}")]
    UploadNotFound(String),

    #[error("Could not download document: {0}")]
    DownloadFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Language-model extraction failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_text_carries_remediation() {
        let err = ExtractError::insufficient_text(42);
        match &err {
            ExtractError::InsufficientText { chars, remediation } => {
                assert_eq!(*chars, 42);
                assert_eq!(remediation.len(), 2);
                assert!(remediation[0].contains("CSV"));
            }
            _ => panic!("wrong variant"),
        }
        assert!(err.to_string().contains("42"));
    }
}
