// src/extractors/years.rs

// --- Imports ---
use crate::model::fiscal_year_in_range;
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;

/// A fiscal year located in a header row, with the column its values live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearColumn {
    pub year: i32,
    pub col: usize,
}

// --- Regex Patterns (Lazy Static) ---
static BARE_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"));

// "Year 2024", "FY2024", "FY 24", "FY:" with nothing after, etc.
static YEAR_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:year|fy)\s*[-:]?\s*(\d{1,4})?").expect("valid regex"));

/// Scans a header row for fiscal-year columns.
///
/// A column qualifies if its cell contains a bare 4-digit year inside the
/// accepted window, or a "Year"/"FY" token (which defaults to the current
/// year when no digits follow). Duplicate years after the first occurrence
/// are ignored; the result is ascending by year.
pub fn detect_year_columns(header: &[String]) -> Vec<YearColumn> {
    let mut found: Vec<YearColumn> = Vec::new();

    for (col, cell) in header.iter().enumerate() {
        let year = cell_year(cell);
        if let Some(year) = year {
            if found.iter().all(|yc| yc.year != year) {
                found.push(YearColumn { year, col });
            } else {
                tracing::debug!("Ignoring duplicate year {} in column {}", year, col);
            }
        }
    }

    found.sort_by_key(|yc| yc.year);
    found
}

fn cell_year(cell: &str) -> Option<i32> {
    // Bare 4-digit year wins; out-of-window numbers (IDs, amounts) do not.
    if let Some(caps) = BARE_YEAR_RE.captures(cell) {
        if let Ok(year) = caps[1].parse::<i32>() {
            if fiscal_year_in_range(year) {
                return Some(year);
            }
        }
    }

    if let Some(caps) = YEAR_TOKEN_RE.captures(cell) {
        let year = match caps.get(1) {
            Some(digits) => {
                let n: i32 = digits.as_str().parse().ok()?;
                // 2-digit shorthand ("FY24") is relative to 2000.
                if digits.as_str().len() <= 2 { 2000 + n } else { n }
            }
            None => chrono::Utc::now().year(),
        };
        if fiscal_year_in_range(year) {
            return Some(year);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::max_fiscal_year;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_years_map_to_columns() {
        let cols = detect_year_columns(&row(&["", "2024", "2025"]));
        assert_eq!(
            cols,
            vec![
                YearColumn { year: 2024, col: 1 },
                YearColumn { year: 2025, col: 2 }
            ]
        );
    }

    // Out-of-window header years are rejected even if numerically present.
    #[test]
    fn out_of_range_years_are_rejected() {
        let cols = detect_year_columns(&row(&["", "1998", "3024"]));
        assert!(cols.is_empty());
        assert!(!fiscal_year_in_range(max_fiscal_year() + 1));
    }

    #[test]
    fn fy_tokens_parse() {
        let cols = detect_year_columns(&row(&["Account", "FY2023", "FY 24"]));
        assert_eq!(cols[0].year, 2023);
        assert_eq!(cols[1].year, 2024);
    }

    #[test]
    fn bare_year_token_defaults_to_current_year() {
        let cols = detect_year_columns(&row(&["Account", "Year"]));
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].year, chrono::Utc::now().year());
    }

    #[test]
    fn duplicate_years_keep_first_column() {
        let cols = detect_year_columns(&row(&["2024", "2024", "2023"]));
        assert_eq!(
            cols,
            vec![
                YearColumn { year: 2023, col: 2 },
                YearColumn { year: 2024, col: 0 }
            ]
        );
    }

    #[test]
    fn amount_like_cells_are_not_years() {
        assert!(detect_year_columns(&row(&["Revenue", "120000"])).is_empty());
    }
}
