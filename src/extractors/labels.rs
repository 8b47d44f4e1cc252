// src/extractors/labels.rs

// --- Imports ---
use crate::model::CanonicalField;
use once_cell::sync::Lazy;
use regex::Regex;

/// One ordered taxonomy rule: the first pattern that matches a normalized
/// row label resolves it to the canonical field.
struct LabelRule {
    field: CanonicalField,
    patterns: Vec<Regex>,
}

fn rule(field: CanonicalField, patterns: &[&str]) -> LabelRule {
    LabelRule {
        field,
        patterns: patterns
            .iter()
            .filter_map(|pat| Regex::new(pat).ok())
            .collect(),
    }
}

// --- Fixed Taxonomy (Lazy Static) ---
// Order matters: specific lines (gross profit, cost of sales) must precede
// the broader catch-alls (revenue, tax) they would otherwise shadow.
static LABEL_RULES: Lazy<Vec<LabelRule>> = Lazy::new(|| {
    use CanonicalField::*;
    vec![
        rule(GrossProfit, &[r"(?i)\bgross\s+profit\b"]),
        rule(
            CostOfSales,
            &[
                r"(?i)\bcost\s+of\s+(sales|goods\s+sold)\b",
                r"(?i)^cogs$",
                r"(?i)\bdirect\s+costs?\b",
            ],
        ),
        rule(Ebitda, &[r"(?i)\bebitda\b"]),
        rule(
            OperatingProfit,
            &[
                r"(?i)\boperating\s+profit\b",
                r"(?i)^ebit$",
                r"(?i)\bprofit\s+from\s+operations\b",
            ],
        ),
        rule(
            OperatingExpenses,
            &[
                r"(?i)\boperating\s+(expenses|costs)\b",
                r"(?i)\badministrative\s+expenses\b",
                r"(?i)\boverheads?\b",
            ],
        ),
        rule(Depreciation, &[r"(?i)\bdepreciation\b"]),
        rule(Amortisation, &[r"(?i)\bamorti[sz]ation\b"]),
        rule(
            InterestPaid,
            &[
                r"(?i)\binterest\s+(paid|payable|expense)\b",
                r"(?i)\bfinance\s+costs?\b",
            ],
        ),
        rule(
            DirectorsRemuneration,
            &[r"(?i)\bdirectors.?\s+(remuneration|emoluments)\b"],
        ),
        rule(
            StaffCosts,
            &[
                r"(?i)\bstaff\s+costs?\b",
                r"(?i)\bwages\s+and\s+salaries\b",
                r"(?i)\bemployee\s+costs?\b",
                r"(?i)\bpayroll\b",
            ],
        ),
        rule(
            EmployeeCount,
            &[
                r"(?i)\b(number|no\.?)\s+of\s+(employees|staff)\b",
                r"(?i)\baverage\s+(number\s+of\s+)?employees\b",
                r"(?i)\bheadcount\b",
                r"(?i)^employees$",
            ],
        ),
        rule(
            NetProfit,
            &[
                r"(?i)\bnet\s+profit\b",
                r"(?i)\bprofit\s+(after\s+tax|for\s+the\s+(financial\s+)?(year|period))\b",
                r"(?i)\bnet\s+income\b",
            ],
        ),
        rule(
            Tax,
            &[
                r"(?i)^tax(ation)?\b",
                r"(?i)\bcorporation\s+tax\b",
                r"(?i)\btax\s+on\s+profit\b",
            ],
        ),
        rule(
            Revenue,
            &[
                r"(?i)^(total\s+)?(revenue|turnover|sales)\b",
                r"(?i)^income$",
            ],
        ),
        rule(TotalAssets, &[r"(?i)\btotal\s+assets\b"]),
        // "Creditors: amounts falling due within one year" is the UK statutory
        // wording for current liabilities; it must win over the Creditors rule.
        rule(
            CurrentLiabilities,
            &[
                r"(?i)\bcurrent\s+liabilities\b",
                r"(?i)\bcreditors\b.*\bdue\s+within\s+one\s+year\b",
            ],
        ),
        rule(TotalLiabilities, &[r"(?i)\btotal\s+liabilities\b"]),
        rule(
            CurrentAssets,
            &[r"(?i)\b(total\s+)?current\s+assets\b"],
        ),
        rule(
            FixedAssets,
            &[
                r"(?i)\bfixed\s+assets\b",
                r"(?i)\bnon[-\s]current\s+assets\b",
                r"(?i)\btangible\s+assets\b",
            ],
        ),
        rule(
            NetAssets,
            &[
                r"(?i)\bnet\s+assets\b",
                r"(?i)\btotal\s+equity\b",
                r"(?i)\bshareholders.?\s+funds\b",
            ],
        ),
        rule(
            Debtors,
            &[
                r"(?i)^(trade\s+)?debtors\b",
                r"(?i)\baccounts\s+receivable\b",
                r"(?i)\breceivables\b",
            ],
        ),
        rule(
            Creditors,
            &[
                r"(?i)^(trade\s+)?creditors\b",
                r"(?i)\baccounts\s+payable\b",
                r"(?i)\bpayables\b",
            ],
        ),
        rule(Stock, &[r"(?i)^stocks?\b", r"(?i)\binventor(y|ies)\b"]),
        rule(
            Cash,
            &[
                r"(?i)\bcash\s+(at\s+bank|and\s+cash\s+equivalents)\b",
                r"(?i)^cash\b",
            ],
        ),
    ]
});

static TRAILING_PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalizes a row label before taxonomy matching: strips one trailing
/// parenthetical and collapses runs of whitespace.
pub fn normalize_label(raw: &str) -> String {
    let stripped = TRAILING_PARENTHETICAL_RE.replace(raw, "");
    WHITESPACE_RE.replace_all(stripped.trim(), " ").to_string()
}

/// Resolves a grid row to a canonical field by scanning its first 4 cells
/// (hierarchical "Section, Subsection, Item, Description" layouts put the
/// real label anywhere in that span). First rule match wins, columns in
/// order; rows matching no rule are skipped without error.
pub fn match_row(cells: &[String]) -> Option<CanonicalField> {
    for cell in cells.iter().take(4) {
        let label = normalize_label(cell);
        if label.is_empty() {
            continue;
        }
        for rule in LABEL_RULES.iter() {
            if rule.patterns.iter().any(|re| re.is_match(&label)) {
                return Some(rule.field);
            }
        }
    }
    None
}
