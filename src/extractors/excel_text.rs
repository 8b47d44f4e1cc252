// src/extractors/excel_text.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

/// How many inline numeric-value tags to pull out of the package bytes.
const MAX_NUMERIC_VALUES: usize = 50;

/// Returned when nothing readable is found, so downstream length gates see
/// a non-empty string and fail predictably instead of on an empty one.
pub const NO_TEXT_SENTINEL: &str = "[no readable text recovered from spreadsheet]";

// --- Regex Patterns (Lazy Static) ---
static FINANCIAL_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(turnover|revenue|sales|gross profit|net profit|profit|loss|cost of sales|debtors|creditors|assets|liabilities|equity|cash|ebitda|staff costs)\b[^<>\r\n]{0,60}",
    )
    .expect("valid regex")
});

// Inline-string worksheets keep cell values in <v>...</v> tags even when the
// surrounding archive structure is unreadable without decompression.
static VALUE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<v>(-?[0-9][0-9.]*)</v>").expect("valid regex"));

/// Best-effort text recovery from raw spreadsheet package bytes.
///
/// Decodes the bytes as UTF-8 (lossy, no archive or XML decompression) and
/// pools keyword-anchored financial phrases plus a one-line summary of the
/// first inline numeric values found.
pub fn extract_excel_text(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    let mut lines: Vec<String> = Vec::new();

    for m in FINANCIAL_PHRASE_RE.find_iter(&decoded) {
        let phrase = m.as_str().trim();
        if phrase.len() > 2 {
            lines.push(phrase.to_string());
        }
    }

    let values: Vec<&str> = VALUE_TAG_RE
        .captures_iter(&decoded)
        .take(MAX_NUMERIC_VALUES)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if !values.is_empty() {
        lines.push(format!("Cell values found: {}", values.join(", ")));
    }

    if lines.is_empty() {
        tracing::debug!("Spreadsheet heuristic recovery found nothing usable");
        return NO_TEXT_SENTINEL.to_string();
    }

    tracing::debug!("Spreadsheet heuristic recovery kept {} lines", lines.len());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn financial_phrases_are_recovered() {
        let bytes = b"<si><t>Turnover for the year 500,000</t></si><si><t>Net profit 80,000</t></si>";
        let text = extract_excel_text(bytes);
        assert!(text.contains("Turnover for the year 500,000"));
        assert!(text.contains("Net profit 80,000"));
    }

    #[test]
    fn value_tags_are_summarized_on_one_line() {
        let bytes = b"<c r=\"B2\"><v>500000</v></c><c r=\"B3\"><v>-1200.5</v></c>";
        let text = extract_excel_text(bytes);
        let value_lines: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("Cell values found:"))
            .collect();
        assert_eq!(value_lines.len(), 1);
        assert!(value_lines[0].contains("500000"));
        assert!(value_lines[0].contains("-1200.5"));
    }

    #[test]
    fn value_tags_are_capped() {
        let mut doc = String::new();
        for i in 0..80 {
            doc.push_str(&format!("<v>{}</v>", i));
        }
        let text = extract_excel_text(doc.as_bytes());
        let summary = text
            .lines()
            .find(|l| l.starts_with("Cell values found:"))
            .unwrap();
        assert!(summary.contains("49"));
        assert!(!summary.contains(", 50"));
    }

    #[test]
    fn unreadable_bytes_return_sentinel() {
        let bytes: Vec<u8> = vec![0x50, 0x4b, 0x03, 0x04, 0xff, 0xfe, 0x00];
        assert_eq!(extract_excel_text(&bytes), NO_TEXT_SENTINEL);
        assert!(!extract_excel_text(&bytes).is_empty());
    }
}
