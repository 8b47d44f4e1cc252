// src/llm/client.rs
use crate::llm::normalize;
use crate::model::FinancialYearRecord;
use crate::utils::error::LlmError;
use serde_json::json;

// Defaults, overridable via environment (LLM_API_BASE / LLM_API_KEY / LLM_MODEL).
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Low temperature: extraction wants determinism, not creativity.
const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 4_000;

/// Raw-text prompts are truncated to this many characters; statutory accounts
/// put the figures well inside this window.
const MAX_PROMPT_TEXT_CHARS: usize = 15_000;

const FIELD_LIST: &str = "fiscal_year (integer), fiscal_year_end (YYYY-MM-DD), period_months, \
revenue, cost_of_sales, gross_profit, operating_expenses, ebitda, depreciation, amortisation, \
interest_paid, tax, net_profit, operating_profit, total_assets, current_assets, fixed_assets, \
total_liabilities, current_liabilities, net_assets, debtors, creditors, stock, cash, \
employee_count, staff_costs, directors_remuneration, confidence (0-1)";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("LLM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }
}

/// Client for the external chat-completion endpoint.
///
/// One attempt per call, default timeouts, no retries: a transient failure
/// aborts the pipeline and surfaces as `failed`.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Extraction from heuristically recovered raw text (the PDF path).
    /// Requests a bare JSON array; the fiscal-year hint is passed as
    /// non-binding guidance.
    pub async fn extract_from_raw_text(
        &self,
        text: &str,
        fiscal_year_hint: Option<i32>,
    ) -> Result<Vec<FinancialYearRecord>, LlmError> {
        let truncated = truncate_chars(text, MAX_PROMPT_TEXT_CHARS);
        let hint_line = match fiscal_year_hint {
            Some(y) => format!(
                "The user suggested the accounts may relate to fiscal year {}; \
                 prefer years stated in the document if they differ.\n",
                y
            ),
            None => String::new(),
        };
        let prompt = format!(
            "The following text was recovered from a company accounts document. It may be \
             fragmentary and out of order.\n\n\
             Extract the financial figures for every fiscal year you can identify.\n\
             {hint_line}\
             Respond with a bare JSON array (no prose, no code fences) of objects with these \
             fields, omitting any you cannot determine:\n{FIELD_LIST}\n\n\
             Document text:\n{truncated}"
        );

        let content = self.chat(&prompt).await?;
        normalize::parse_year_records(&content, fiscal_year_hint, 0.5)
    }

    /// Extraction from document-shaped text (the CSV-fallback and spreadsheet
    /// paths). Requests an object `{{"years": [...]}}` and explicitly asks
    /// for every year present.
    pub async fn extract_from_document_text(
        &self,
        text: &str,
        fiscal_year_hint: Option<i32>,
    ) -> Result<Vec<FinancialYearRecord>, LlmError> {
        let truncated = truncate_chars(text, MAX_PROMPT_TEXT_CHARS);
        let prompt = format!(
            "The following is the textual content of a company accounts document. It may \
             contain figures for several fiscal years; extract ALL of them, one entry per \
             year. Do not stop at the first year found.\n\n\
             Respond with JSON of the form {{\"years\": [...]}} where each entry has these \
             fields, omitting any you cannot determine:\n{FIELD_LIST}\n\n\
             Include a confidence between 0 and 1 reflecting how certain you are of each \
             year's figures.\n\n\
             Document content:\n{truncated}"
        );

        let content = self.chat(&prompt).await?;
        normalize::parse_year_records(&content, fiscal_year_hint, 0.5)
    }

    /// One chat-completion round trip. Non-2xx is fatal and not retried.
    async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.api_base);
        tracing::info!(
            "Calling language-model endpoint (model {}, prompt {} chars)",
            self.config.model,
            prompt.len()
        );

        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Language-model endpoint returned {} for {}", status, url);
            return Err(LlmError::Http(status));
        }

        let payload: serde_json::Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::Unparseable("response missing choices[0].message.content".to_string())
            })?;

        tracing::debug!("Received {} chars of model output", content.len());
        Ok(content.to_string())
    }
}

/// Char-boundary-safe truncation.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
