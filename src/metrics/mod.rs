// src/metrics/mod.rs
use crate::model::FinancialYearRecord;

/// Back-fills the derived fields on one extracted record.
///
/// Pure numeric post-processing: margins to one decimal place, per-employee
/// revenue and days-outstanding to whole numbers. Any missing or zero
/// denominator silently skips that metric rather than guessing or dividing by zero.
pub fn apply_derived_metrics(rec: &mut FinancialYearRecord) {
    let round1 = |v: f64| (v * 10.0).round() / 10.0;

    if let Some(revenue) = rec.revenue.filter(|r| *r != 0.0) {
        if let Some(gross) = rec.gross_profit {
            rec.gross_margin_pct = Some(round1(gross / revenue * 100.0));
        }
        if let Some(ebitda) = rec.ebitda {
            rec.ebitda_margin_pct = Some(round1(ebitda / revenue * 100.0));
        }
        if let Some(net) = rec.net_profit {
            rec.net_margin_pct = Some(round1(net / revenue * 100.0));
        }
        if let Some(employees) = rec.employee_count.filter(|e| *e > 0.0) {
            rec.revenue_per_employee = Some((revenue / employees).round());
        }
        if let Some(debtors) = rec.debtors {
            rec.debtor_days = Some((debtors / revenue * 365.0).round());
        }
    }

    if let Some(cost_of_sales) = rec.cost_of_sales.filter(|c| *c != 0.0) {
        if let Some(creditors) = rec.creditors {
            rec.creditor_days = Some((creditors / cost_of_sales * 365.0).round());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margins_are_rounded_to_one_decimal() {
        let mut rec = FinancialYearRecord::new(2024);
        rec.revenue = Some(600_000.0);
        rec.gross_profit = Some(300_000.0);
        rec.net_profit = Some(81_234.0);
        apply_derived_metrics(&mut rec);
        assert_eq!(rec.gross_margin_pct, Some(50.0));
        assert_eq!(rec.net_margin_pct, Some(13.5));
    }

    #[test]
    fn zero_or_missing_revenue_skips_dependent_metrics() {
        let mut rec = FinancialYearRecord::new(2024);
        rec.gross_profit = Some(300_000.0);
        rec.debtors = Some(40_000.0);
        rec.employee_count = Some(10.0);
        apply_derived_metrics(&mut rec);
        assert_eq!(rec.gross_margin_pct, None);
        assert_eq!(rec.debtor_days, None);
        assert_eq!(rec.revenue_per_employee, None);

        rec.revenue = Some(0.0);
        apply_derived_metrics(&mut rec);
        assert_eq!(rec.gross_margin_pct, None);
    }

    #[test]
    fn days_outstanding() {
        let mut rec = FinancialYearRecord::new(2024);
        rec.revenue = Some(365_000.0);
        rec.debtors = Some(30_000.0);
        rec.cost_of_sales = Some(182_500.0);
        rec.creditors = Some(20_000.0);
        apply_derived_metrics(&mut rec);
        assert_eq!(rec.debtor_days, Some(30.0));
        assert_eq!(rec.creditor_days, Some(40.0));
    }

    #[test]
    fn revenue_per_employee_needs_positive_headcount() {
        let mut rec = FinancialYearRecord::new(2024);
        rec.revenue = Some(500_000.0);
        rec.employee_count = Some(0.0);
        apply_derived_metrics(&mut rec);
        assert_eq!(rec.revenue_per_employee, None);

        rec.employee_count = Some(7.0);
        apply_derived_metrics(&mut rec);
        assert_eq!(rec.revenue_per_employee, Some(71_429.0));
    }
}
