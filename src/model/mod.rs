// src/model/mod.rs
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Earliest fiscal year the pipeline will accept from any source.
pub const MIN_FISCAL_YEAR: i32 = 2000;

/// Latest acceptable fiscal year (documents may report the year in progress,
/// or one year ahead for a year-end that has not closed yet).
pub fn max_fiscal_year() -> i32 {
    chrono::Utc::now().year() + 1
}

/// True if `year` is inside the accepted fiscal-year window.
pub fn fiscal_year_in_range(year: i32) -> bool {
    (MIN_FISCAL_YEAR..=max_fiscal_year()).contains(&year)
}

/// The canonical financial attributes every heuristic and alias resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Revenue,
    CostOfSales,
    GrossProfit,
    OperatingExpenses,
    Ebitda,
    Depreciation,
    Amortisation,
    InterestPaid,
    Tax,
    NetProfit,
    OperatingProfit,
    TotalAssets,
    CurrentAssets,
    FixedAssets,
    TotalLiabilities,
    CurrentLiabilities,
    NetAssets,
    Debtors,
    Creditors,
    Stock,
    Cash,
    EmployeeCount,
    StaffCosts,
    DirectorsRemuneration,
}

/// One structured financial record per fiscal year found in a document.
///
/// Source fields are all optional; a record survives extraction only if it is
/// "meaningful" (see [`FinancialYearRecord::is_meaningful`]). Derived fields
/// are back-filled once by the metrics pass after extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialYearRecord {
    pub fiscal_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year_end: Option<String>,
    pub period_months: i32,

    // P&L
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_sales: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_expenses: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amortisation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_paid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_profit: Option<f64>,

    // Balance sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_assets: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_assets: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_assets: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_liabilities: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_liabilities: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_assets: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debtors: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creditors: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,

    // People
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_costs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directors_remuneration: Option<f64>,

    // Derived (back-filled by the metrics pass)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_margin_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda_margin_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_margin_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_per_employee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debtor_days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creditor_days: Option<f64>,

    pub confidence: f64,
    pub notes: Vec<String>,
}

impl FinancialYearRecord {
    pub fn new(fiscal_year: i32) -> Self {
        Self {
            fiscal_year,
            period_months: 12,
            ..Default::default()
        }
    }

    /// Writes `value` into the slot named by `field`.
    pub fn set(&mut self, field: CanonicalField, value: f64) {
        use CanonicalField::*;
        let slot = match field {
            Revenue => &mut self.revenue,
            CostOfSales => &mut self.cost_of_sales,
            GrossProfit => &mut self.gross_profit,
            OperatingExpenses => &mut self.operating_expenses,
            Ebitda => &mut self.ebitda,
            Depreciation => &mut self.depreciation,
            Amortisation => &mut self.amortisation,
            InterestPaid => &mut self.interest_paid,
            Tax => &mut self.tax,
            NetProfit => &mut self.net_profit,
            OperatingProfit => &mut self.operating_profit,
            TotalAssets => &mut self.total_assets,
            CurrentAssets => &mut self.current_assets,
            FixedAssets => &mut self.fixed_assets,
            TotalLiabilities => &mut self.total_liabilities,
            CurrentLiabilities => &mut self.current_liabilities,
            NetAssets => &mut self.net_assets,
            Debtors => &mut self.debtors,
            Creditors => &mut self.creditors,
            Stock => &mut self.stock,
            Cash => &mut self.cash,
            EmployeeCount => &mut self.employee_count,
            StaffCosts => &mut self.staff_costs,
            DirectorsRemuneration => &mut self.directors_remuneration,
        };
        *slot = Some(value);
    }

    /// A record is worth keeping only if at least one primary financial
    /// figure is populated. Years that carry only context (employee counts,
    /// ratios) are discarded.
    pub fn is_meaningful(&self) -> bool {
        [
            self.revenue,
            self.gross_profit,
            self.net_profit,
            self.ebitda,
            self.total_assets,
            self.net_assets,
            self.cash,
            self.debtors,
            self.cost_of_sales,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Supported upload formats. Detection policy lives upstream; the pipeline
/// only dispatches on the recorded type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Csv,
    Xlsx,
    Xls,
}

/// Upload record as read from the collaborating platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    pub client_id: String,
    pub practice_id: String,
    pub storage_path: String,
    pub file_type: FileType,
    /// Optional user-supplied fiscal-year hint, used as non-binding guidance
    /// when document year markers are absent or ambiguous.
    pub fiscal_year: Option<i32>,
}

/// Headline figures for the most recent extracted year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestYearSummary {
    #[serde(rename = "fiscalYear")]
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    #[serde(rename = "grossProfit")]
    pub gross_profit: Option<f64>,
    #[serde(rename = "netProfit")]
    pub net_profit: Option<f64>,
    pub confidence: f64,
}

/// Successful pipeline response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub success: bool,
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    #[serde(rename = "yearsExtracted")]
    pub years_extracted: usize,
    #[serde(rename = "savedRecords")]
    pub saved_records: usize,
    #[serde(rename = "fiscalYears")]
    pub fiscal_years: Vec<i32>,
    #[serde(rename = "latestYear")]
    pub latest_year: LatestYearSummary,
    pub notes: Vec<String>,
}

/// Failure contract returned from the single catch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub success: bool,
    pub error: String,
}

impl ExtractionFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meaningful_requires_a_primary_figure() {
        let mut rec = FinancialYearRecord::new(2024);
        assert!(!rec.is_meaningful());

        rec.employee_count = Some(12.0);
        assert!(!rec.is_meaningful(), "employee count alone is not meaningful");

        rec.cost_of_sales = Some(50_000.0);
        assert!(rec.is_meaningful());
    }

    #[test]
    fn set_routes_to_the_right_slot() {
        let mut rec = FinancialYearRecord::new(2023);
        rec.set(CanonicalField::Revenue, 600_000.0);
        rec.set(CanonicalField::StaffCosts, 120_000.0);
        assert_eq!(rec.revenue, Some(600_000.0));
        assert_eq!(rec.staff_costs, Some(120_000.0));
        assert_eq!(rec.net_profit, None);
    }

    #[test]
    fn fiscal_year_window() {
        assert!(fiscal_year_in_range(2000));
        assert!(fiscal_year_in_range(chrono::Utc::now().year()));
        assert!(fiscal_year_in_range(chrono::Utc::now().year() + 1));
        assert!(!fiscal_year_in_range(1999));
        assert!(!fiscal_year_in_range(chrono::Utc::now().year() + 2));
    }

    #[test]
    fn file_type_deserializes_lowercase() {
        let ft: FileType = serde_json::from_str("\"xlsx\"").unwrap();
        assert_eq!(ft, FileType::Xlsx);
        assert!(serde_json::from_str::<FileType>("\"docx\"").is_err());
    }
}
