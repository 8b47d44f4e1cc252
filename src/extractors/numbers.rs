// src/extractors/numbers.rs

/// Parses a numeric table cell, tolerating the formatting found in exported
/// accounts: currency symbols, thousands commas, percent signs and interior
/// whitespace are stripped. `N/A`, a bare `-` and the empty string all mean
/// "no value".
pub fn parse_cell_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',' | '%') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    if cleaned.eq_ignore_ascii_case("n/a") || cleaned.eq_ignore_ascii_case("na") {
        return None;
    }

    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_and_commas_are_stripped() {
        assert_eq!(parse_cell_number("£1,234.50"), Some(1234.5));
        assert_eq!(parse_cell_number("$ 2,000"), Some(2000.0));
        assert_eq!(parse_cell_number("12.5%"), Some(12.5));
    }

    #[test]
    fn placeholders_are_null() {
        assert_eq!(parse_cell_number("N/A"), None);
        assert_eq!(parse_cell_number("n/a"), None);
        assert_eq!(parse_cell_number("-"), None);
        assert_eq!(parse_cell_number(""), None);
        assert_eq!(parse_cell_number("   "), None);
    }

    #[test]
    fn negatives_still_parse() {
        assert_eq!(parse_cell_number("-1,500"), Some(-1500.0));
    }

    #[test]
    fn non_numeric_text_is_null() {
        assert_eq!(parse_cell_number("see note 4"), None);
    }
}
