// src/llm/normalize.rs
//
// Shared normalization for model responses. Models are asked for bare JSON
// but routinely wrap it in code fences, emit trailing commas, rename fields
// or return a single object where an array was requested; everything here
// exists to absorb that without guessing at figures.

// --- Imports ---
use crate::extractors::numbers::parse_cell_number;
use crate::model::{fiscal_year_in_range, CanonicalField, FinancialYearRecord};
use crate::utils::error::LlmError;
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Alias table consulted per canonical field, in priority order. Making the
/// coalescing explicit keeps alias coverage auditable.
const FIELD_ALIASES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::Revenue, &["revenue", "turnover", "sales", "total_revenue"]),
    (CanonicalField::CostOfSales, &["cost_of_sales", "cogs", "cost_of_goods_sold"]),
    (CanonicalField::GrossProfit, &["gross_profit"]),
    (
        CanonicalField::OperatingExpenses,
        &["operating_expenses", "opex", "overheads", "administrative_expenses"],
    ),
    (CanonicalField::Ebitda, &["ebitda"]),
    (CanonicalField::Depreciation, &["depreciation"]),
    (CanonicalField::Amortisation, &["amortisation", "amortization"]),
    (
        CanonicalField::InterestPaid,
        &["interest_paid", "interest_payable", "interest_expense", "finance_costs"],
    ),
    (CanonicalField::Tax, &["tax", "taxation", "corporation_tax"]),
    (
        CanonicalField::NetProfit,
        &["net_profit", "profit_after_tax", "net_income", "profit_for_the_year"],
    ),
    (CanonicalField::OperatingProfit, &["operating_profit", "ebit"]),
    (CanonicalField::TotalAssets, &["total_assets"]),
    (CanonicalField::CurrentAssets, &["current_assets"]),
    (CanonicalField::FixedAssets, &["fixed_assets", "non_current_assets"]),
    (CanonicalField::TotalLiabilities, &["total_liabilities"]),
    (CanonicalField::CurrentLiabilities, &["current_liabilities"]),
    (
        CanonicalField::NetAssets,
        &["net_assets", "total_equity", "shareholders_funds"],
    ),
    (
        CanonicalField::Debtors,
        &["debtors", "trade_debtors", "receivables", "accounts_receivable"],
    ),
    (
        CanonicalField::Creditors,
        &["creditors", "trade_creditors", "payables", "accounts_payable"],
    ),
    (CanonicalField::Stock, &["stock", "inventory", "inventories"]),
    (
        CanonicalField::Cash,
        &["cash", "cash_at_bank", "cash_and_cash_equivalents", "cash_and_equivalents"],
    ),
    (
        CanonicalField::EmployeeCount,
        &["employee_count", "employees", "headcount", "number_of_employees"],
    ),
    (
        CanonicalField::StaffCosts,
        &["staff_costs", "wages_and_salaries", "payroll", "employee_costs"],
    ),
    (
        CanonicalField::DirectorsRemuneration,
        &["directors_remuneration", "directors_emoluments"],
    ),
];

const YEAR_ALIASES: &[&str] = &["fiscal_year", "year", "fy"];

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Normalizes model output into meaningful year records, ascending by year.
///
/// Accepts a top-level array, `{"years": [...]}`, or a single object
/// (wrapped). Unparseable content after normalization is a hard, non-retried
/// error; the raw content is logged for diagnosis.
pub fn parse_year_records(
    content: &str,
    fiscal_year_hint: Option<i32>,
    default_confidence: f64,
) -> Result<Vec<FinancialYearRecord>, LlmError> {
    let stripped = strip_code_fence(content);
    let cleaned = TRAILING_COMMA_RE.replace_all(&stripped, "$1");

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        tracing::error!("Unparseable model response: {}; raw content: {}", e, content);
        LlmError::Unparseable(e.to_string())
    })?;

    let entries: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(ref obj) if obj.contains_key("years") => match &obj["years"] {
            Value::Array(items) => items.clone(),
            single @ Value::Object(_) => vec![single.clone()],
            other => {
                tracing::error!("Unexpected 'years' shape; raw content: {}", content);
                return Err(LlmError::Unparseable(format!(
                    "'years' is neither array nor object: {}",
                    other
                )));
            }
        },
        single @ Value::Object(_) => vec![single],
        other => {
            tracing::error!("Unexpected response shape; raw content: {}", content);
            return Err(LlmError::Unparseable(format!(
                "expected array or object, got: {}",
                other
            )));
        }
    };

    let mut records: Vec<FinancialYearRecord> = entries
        .iter()
        .filter_map(|entry| entry.as_object().map(|_| entry))
        .map(|entry| normalize_entry(entry, fiscal_year_hint, default_confidence))
        .filter(|rec| rec.is_meaningful())
        .collect();

    records.sort_by_key(|rec| rec.fiscal_year);
    Ok(records)
}

fn normalize_entry(
    entry: &Value,
    fiscal_year_hint: Option<i32>,
    default_confidence: f64,
) -> FinancialYearRecord {
    let current_year = chrono::Utc::now().year();

    let reported_year = YEAR_ALIASES.iter().find_map(|key| coerce_i64(&entry[*key]));
    let (year, year_note) = match reported_year {
        Some(y) if fiscal_year_in_range(y as i32) => (y as i32, None),
        _ => {
            let fallback = fiscal_year_hint.unwrap_or(current_year);
            (
                fallback,
                Some(format!(
                    "Fiscal year not reported by extraction; defaulted to {}",
                    fallback
                )),
            )
        }
    };

    let mut rec = FinancialYearRecord::new(year);

    for (field, aliases) in FIELD_ALIASES {
        let value = aliases.iter().find_map(|key| coerce_f64(&entry[*key]));
        if let Some(mut v) = value {
            // Models sometimes report cost lines as negatives; the canonical
            // representation is magnitude.
            if matches!(
                field,
                CanonicalField::CostOfSales | CanonicalField::OperatingExpenses
            ) && v < 0.0
            {
                v = v.abs();
            }
            rec.set(*field, v);
        }
    }

    rec.fiscal_year_end = entry["fiscal_year_end"]
        .as_str()
        .or_else(|| entry["year_end"].as_str())
        .map(str::to_string);
    rec.period_months = coerce_i64(&entry["period_months"]).map(|m| m as i32).unwrap_or(12);
    rec.confidence = entry["confidence"]
        .as_f64()
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(default_confidence);

    match &entry["notes"] {
        Value::String(s) => rec.notes.push(s.clone()),
        Value::Array(items) => rec
            .notes
            .extend(items.iter().filter_map(|v| v.as_str().map(str::to_string))),
        _ => {}
    }
    if let Some(note) = year_note {
        rec.notes.push(note);
    }

    rec
}

fn coerce_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn coerce_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(parse_cell_number))
}

/// Strips one leading/trailing fenced code block if present.
fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return trimmed.to_string();
    }
    let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
        lines.len() - 1
    } else {
        lines.len()
    };
    lines[1..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fenced array with an aliased field coalesces to revenue.
    #[test]
    fn fenced_array_with_turnover_alias() {
        let content = "```json\n[{\"fiscal_year\":2024,\"turnover\":500000}]\n```";
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fiscal_year, 2024);
        assert_eq!(records[0].revenue, Some(500_000.0));
        assert_eq!(records[0].confidence, 0.5);
    }

    #[test]
    fn years_object_and_sorting() {
        let content = r#"{"years":[
            {"fiscal_year":2025,"revenue":120000},
            {"fiscal_year":2023,"revenue":100000}
        ]}"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(
            records.iter().map(|r| r.fiscal_year).collect::<Vec<_>>(),
            vec![2023, 2025]
        );
    }

    #[test]
    fn single_object_is_wrapped() {
        let content = r#"{"fiscal_year":2024,"net_profit":80000,"confidence":0.9}"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, 0.9);
    }

    #[test]
    fn trailing_commas_are_tolerated() {
        let content = r#"[{"fiscal_year":2024,"revenue":500000,}]"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records[0].revenue, Some(500_000.0));
    }

    #[test]
    fn missing_fiscal_year_defaults_to_hint_with_note() {
        let content = r#"[{"revenue":500000}]"#;
        let records = parse_year_records(content, Some(2022), 0.5).unwrap();
        assert_eq!(records[0].fiscal_year, 2022);
        assert!(records[0].notes.iter().any(|n| n.contains("defaulted to 2022")));
    }

    #[test]
    fn out_of_range_year_falls_back() {
        let content = r#"[{"fiscal_year":1823,"revenue":500000}]"#;
        let records = parse_year_records(content, Some(2024), 0.5).unwrap();
        assert_eq!(records[0].fiscal_year, 2024);
    }

    #[test]
    fn negative_cost_lines_become_magnitudes() {
        let content = r#"[{"fiscal_year":2024,"cost_of_sales":-200000,"operating_expenses":-50000,"net_profit":-10000}]"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records[0].cost_of_sales, Some(200_000.0));
        assert_eq!(records[0].operating_expenses, Some(50_000.0));
        // Losses stay negative.
        assert_eq!(records[0].net_profit, Some(-10_000.0));
    }

    #[test]
    fn alias_priority_prefers_canonical_name() {
        let content = r#"[{"fiscal_year":2024,"debtors":30000,"receivables":99999}]"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records[0].debtors, Some(30_000.0));
    }

    #[test]
    fn string_figures_are_coerced() {
        let content = r#"[{"fiscal_year":"2024","revenue":"£1,234.50"}]"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records[0].fiscal_year, 2024);
        assert_eq!(records[0].revenue, Some(1234.5));
    }

    #[test]
    fn non_meaningful_entries_are_discarded() {
        let content = r#"[{"fiscal_year":2024,"employee_count":10}]"#;
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn prose_is_a_hard_error() {
        let err = parse_year_records("I could not find any figures.", None, 0.5).unwrap_err();
        assert!(matches!(err, LlmError::Unparseable(_)));
    }

    #[test]
    fn fence_without_language_tag() {
        let content = "```\n[{\"fiscal_year\":2024,\"cash\":5000}]\n```";
        let records = parse_year_records(content, None, 0.5).unwrap();
        assert_eq!(records[0].cash, Some(5_000.0));
    }
}
