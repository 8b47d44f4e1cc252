// src/extractors/table.rs

// --- Imports ---
use crate::extractors::{grid, labels, numbers, years};
use crate::model::FinancialYearRecord;
use std::collections::BTreeMap;

/// How far above a data row we look for its year header. Kept per data row
/// rather than global so multi-table documents resolve each table's own
/// header.
const HEADER_LOOKBACK_ROWS: usize = 5;

/// Fixed confidence for figures recovered by deterministic parsing.
const STRUCTURED_CONFIDENCE: f64 = 0.9;

/// Deterministic extraction from delimited tabular text.
///
/// Returns one record per fiscal year found, ascending, or `None` when the
/// input has fewer than 2 rows or yields zero meaningful years, the signal
/// for the caller to fall back to language-model extraction.
pub fn extract_structured(text: &str) -> Option<Vec<FinancialYearRecord>> {
    let rows = grid::parse_grid(text);
    if rows.len() < 2 {
        tracing::debug!("Structured extraction skipped: {} usable rows", rows.len());
        return None;
    }

    let mut by_year: BTreeMap<i32, FinancialYearRecord> = BTreeMap::new();

    for (i, row) in rows.iter().enumerate() {
        let Some(field) = labels::match_row(row) else {
            continue;
        };

        let Some(header_cols) = nearest_header_above(&rows, i) else {
            tracing::debug!("Row {} matched a label but has no year header above", i);
            continue;
        };

        for yc in &header_cols {
            let Some(value) = row.get(yc.col).and_then(|c| numbers::parse_cell_number(c))
            else {
                continue;
            };
            by_year
                .entry(yc.year)
                .or_insert_with(|| {
                    let mut rec = FinancialYearRecord::new(yc.year);
                    rec.confidence = STRUCTURED_CONFIDENCE;
                    rec
                })
                .set(field, value);
        }
    }

    let records: Vec<FinancialYearRecord> = by_year
        .into_values()
        .filter(|rec| rec.is_meaningful())
        .collect();

    if records.is_empty() {
        tracing::info!("Structured extraction found no meaningful years");
        None
    } else {
        tracing::info!("Structured extraction produced {} year(s)", records.len());
        Some(records)
    }
}

/// Finds the nearest row above `row_idx` (within the lookback window) that
/// contains qualifying year columns.
fn nearest_header_above(
    rows: &[Vec<String>],
    row_idx: usize,
) -> Option<Vec<years::YearColumn>> {
    let lowest = row_idx.saturating_sub(HEADER_LOOKBACK_ROWS);
    for j in (lowest..row_idx).rev() {
        let cols = years::detect_year_columns(&rows[j]);
        if !cols.is_empty() {
            return Some(cols);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two-column grid yields 2 sorted records at fixed confidence.
    #[test]
    fn two_year_grid_extracts_both_years() {
        let text = "Account,2024,2025\n\
                    Revenue,500000,600000\n\
                    Cost of sales,200000,240000\n\
                    Net profit,80000,95000\n";
        let records = extract_structured(text).expect("should extract");
        assert_eq!(records.len(), 2);
        assert_eq!(
            records.iter().map(|r| r.fiscal_year).collect::<Vec<_>>(),
            vec![2024, 2025]
        );
        assert_eq!(records[0].revenue, Some(500_000.0));
        assert_eq!(records[1].cost_of_sales, Some(240_000.0));
        assert_eq!(records[1].net_profit, Some(95_000.0));
        assert!(records.iter().all(|r| r.confidence == 0.9));
        assert!(records.iter().all(|r| r.notes.is_empty()));
    }

    // A year with only employee_count is dropped; cost_of_sales alone keeps it.
    #[test]
    fn context_only_years_are_dropped() {
        let only_employees = "Account,2024\nNumber of employees,12\n";
        assert!(extract_structured(only_employees).is_none());

        let only_cos = "Account,2024\nCost of sales,50000\n";
        let records = extract_structured(only_cos).expect("cost_of_sales is meaningful");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cost_of_sales, Some(50_000.0));
    }

    // Hierarchical row with the header two rows above.
    #[test]
    fn header_found_within_lookback_window() {
        let text = ",,,2024\n\
                    SECTION,,,\n\
                    KEY RATIOS,Cost Structure,Staff Costs Total,120000\n\
                    Revenue,,,600000\n";
        let records = extract_structured(text).expect("should extract");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].staff_costs, Some(120_000.0));
        assert_eq!(records[0].revenue, Some(600_000.0));
    }

    #[test]
    fn multi_table_documents_use_nearest_header() {
        // Two tables with different year columns; each data row must bind to
        // its own table's header.
        let text = "P&L,2023\n\
                    Revenue,100000\n\
                    Balance Sheet,2024\n\
                    Net assets,40000\n";
        let records = extract_structured(text).expect("should extract");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fiscal_year, 2023);
        assert_eq!(records[0].revenue, Some(100_000.0));
        assert_eq!(records[1].fiscal_year, 2024);
        assert_eq!(records[1].net_assets, Some(40_000.0));
    }

    #[test]
    fn placeholder_cells_stay_null() {
        let text = "Account,2023,2024\nRevenue,N/A,500000\nDebtors,-,25000\n";
        let records = extract_structured(text).expect("should extract");
        // 2023 has no parseable value in any meaningful field, so only 2024 survives.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fiscal_year, 2024);
        assert_eq!(records[0].revenue, Some(500_000.0));
        assert_eq!(records[0].debtors, Some(25_000.0));
    }

    #[test]
    fn too_few_rows_triggers_fallback() {
        assert!(extract_structured("Revenue,500000\n").is_none());
        assert!(extract_structured("").is_none());
    }
}
