// src/extractors/pdf_text.rs
//
// No general PDF decoder is available to this pipeline. Text is recovered
// best-effort from raw content-stream bytes by four independent passes whose
// candidates are pooled (not short-circuited) and filtered once. Encrypted
// or compressed streams defeating all four passes is an expected outcome for
// scanned statutory filings; the orchestrator turns that into a
// user-actionable error rather than proceeding on garbage.

// --- Imports ---
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use std::collections::HashSet;

// --- Regex Patterns (Lazy Static) ---

// Pass 1: parenthesis-delimited draw-text operators: (...) Tj
static TJ_OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)\s*Tj").expect("valid regex"));

// Pass 2: bracketed multi-string arrays: [ (...) n (...) ] TJ
static TJ_ARRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]\s*TJ").expect("valid regex"));
static ARRAY_STRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)").expect("valid regex"));

// Pass 3: keyword-anchored scans, run directly against the raw bytes.
// The asymmetry with the decoded-text passes is deliberate output parity
// with the behavior this pipeline replaces.
static KEYWORD_BYTES_RE: Lazy<BytesRegex> = Lazy::new(|| {
    BytesRegex::new(
        r"(?i)(?:turnover|revenue|gross\s+profit|cost\s+of\s+sales|profit|loss|debtors|creditors|(?:total|net)\s+assets)[ \t]*[:£$€0-9(][^\r\n]{0,60}",
    )
    .expect("valid regex")
});
static CURRENCY_BYTES_RE: Lazy<BytesRegex> = Lazy::new(|| {
    // 0xA3 covers the Latin-1 pound sign common in older PDF streams.
    BytesRegex::new(r"(?:£|\$|€|(?-u:\xA3))\s?[0-9][0-9,]*(?:\.[0-9]+)?")
        .expect("valid regex")
});

// Pass 4: generic parenthesis-delimited literals with escape support.
static GENERIC_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(((?:\\.|[^()\\]){3,100})\)").expect("valid regex"));

static LETTER_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]{3}").expect("valid regex"));
static DIGIT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9,]{4}").expect("valid regex"));

// Financial-signal gate used before spending a language-model call.
static FINANCIAL_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(turnover|revenue|gross profit|cost of sales|profit|loss|debtors|creditors|total assets|net assets|ebitda|balance sheet)\b",
    )
    .expect("valid regex")
});
static CURRENCY_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[£$€]\s?\d").expect("valid regex"));

/// Recovers plausible plain text from raw PDF bytes.
///
/// All four passes run over the whole input; their candidates are pooled in
/// pass order, trimmed, length-filtered, stripped of special-char-only
/// lines, de-duplicated (first-seen order) and joined by newline.
pub fn extract_pdf_text(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    let mut candidates: Vec<String> = Vec::new();

    // Pass 1: (...) Tj operators, pure printable ASCII only.
    for caps in TJ_OPERATOR_RE.captures_iter(&decoded) {
        let text = &caps[1];
        if is_printable_ascii(text) {
            candidates.push(text.to_string());
        }
    }

    // Pass 2: [...] TJ arrays, inner strings concatenated.
    for caps in TJ_ARRAY_RE.captures_iter(&decoded) {
        let mut joined = String::new();
        for inner in ARRAY_STRING_RE.captures_iter(&caps[1]) {
            joined.push_str(&inner[1]);
        }
        if !joined.is_empty() && is_printable_ascii(&joined) {
            candidates.push(joined);
        }
    }

    // Pass 3: keyword-anchored scans against the raw bytes.
    for m in KEYWORD_BYTES_RE.find_iter(bytes) {
        candidates.push(String::from_utf8_lossy(m.as_bytes()).into_owned());
    }
    for m in CURRENCY_BYTES_RE.find_iter(bytes) {
        candidates.push(String::from_utf8_lossy(m.as_bytes()).into_owned());
    }

    // Pass 4: generic literals with PDF escape decoding.
    for caps in GENERIC_LITERAL_RE.captures_iter(&decoded) {
        let text = decode_pdf_escapes(&caps[1]);
        if is_printable_ascii_or_newline(&text) && looks_like_text(&text) {
            candidates.push(text);
        }
    }

    pool_and_filter(candidates)
}

/// True when recovered text carries a financial keyword or a
/// currency-prefixed number, the minimum signal worth a model call.
pub fn has_financial_signal(text: &str) -> bool {
    FINANCIAL_KEYWORD_RE.is_match(text) || CURRENCY_NUMBER_RE.is_match(text)
}

fn pool_and_filter(candidates: Vec<String>) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut lines: Vec<String> = Vec::new();

    for candidate in candidates {
        let trimmed = candidate.trim();
        if trimmed.len() <= 2 {
            continue;
        }
        // Drop lines made only of punctuation / operators.
        if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            lines.push(trimmed.to_string());
        }
    }

    tracing::debug!("PDF heuristic recovery kept {} unique lines", lines.len());
    lines.join("\n")
}

fn is_printable_ascii(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| (' '..='~').contains(&c))
}

fn is_printable_ascii_or_newline(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| (' '..='~').contains(&c) || c == '\n')
}

fn looks_like_text(s: &str) -> bool {
    LETTER_RUN_RE.is_match(s) || DIGIT_RUN_RE.is_match(s)
}

/// Decodes the PDF string-literal escapes: \n \r \t \( \) \\ and 1 to 3 digit
/// octal codes. Unknown escapes keep the escaped character.
fn decode_pdf_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(d) if d.is_digit(8) => {
                let mut code = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&next) if next.is_digit(8) => {
                            code = code * 8 + next.to_digit(8).unwrap_or(0);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if let Some(decoded) = char::from_u32(code) {
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other), // covers \( \) \\ and anything else
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tj_operators_are_recovered() {
        let bytes = b"BT /F1 12 Tf (Turnover for the year) Tj ET";
        let text = extract_pdf_text(bytes);
        assert!(text.contains("Turnover for the year"));
    }

    #[test]
    fn tj_arrays_are_concatenated() {
        let bytes = b"[(Gross ) -20 (profit) 3 ( 2024)] TJ";
        let text = extract_pdf_text(bytes);
        assert!(text.contains("Gross profit 2024"));
    }

    #[test]
    fn octal_escapes_are_decoded() {
        let bytes = br"(Profit \050before tax\051 rose) Tj";
        let text = extract_pdf_text(bytes);
        assert!(text.contains("Profit (before tax) rose"), "got: {text}");
    }

    #[test]
    fn keyword_pass_reads_raw_bytes() {
        // Not a valid draw-text operator, but the keyword scan still finds it.
        let bytes = b"stream\x00\x01Revenue: 500,000 for the period\x02endstream";
        let text = extract_pdf_text(bytes);
        assert!(text.contains("Revenue: 500,000"));
    }

    #[test]
    fn currency_numbers_are_recovered() {
        let bytes = "xx \u{a3}1,234.50 yy".as_bytes();
        let text = extract_pdf_text(bytes);
        assert!(text.contains("1,234.50"));
    }

    #[test]
    fn duplicates_keep_first_seen_order() {
        let bytes = b"(Net assets) Tj (Cash at bank) Tj (Net assets) Tj";
        let text = extract_pdf_text(bytes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines.iter().filter(|l| l.contains("Net assets")).count(),
            1
        );
        assert!(lines[0].contains("Net assets"));
    }

    #[test]
    fn binary_garbage_yields_little_or_nothing() {
        let bytes: Vec<u8> = (0u8..=255).cycle().take(2000).collect();
        let text = extract_pdf_text(&bytes);
        assert!(text.len() < 100, "garbage should not look like text: {text}");
    }

    #[test]
    fn special_char_only_lines_are_dropped() {
        let bytes = b"(---***---) Tj (Balance sheet total) Tj";
        let text = extract_pdf_text(bytes);
        assert!(!text.contains("---***---"));
        assert!(text.contains("Balance sheet total"));
    }

    #[test]
    fn financial_signal_gate() {
        assert!(has_financial_signal("Turnover was strong this year"));
        assert!(has_financial_signal("total \u{a3}9,000 received"));
        assert!(!has_financial_signal("nothing of interest here"));
    }
}
