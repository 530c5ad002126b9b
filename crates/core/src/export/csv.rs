use crate::domain::recommendation::DerivedRecommendation;
use serde::{Deserialize, Serialize};

pub const EXPORT_FILENAME: &str = "alfred_recommendations.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

const MINIMAL_COLUMNS: [&str; 9] = [
    "sku",
    "product_name",
    "strategy",
    "price_action",
    "price_change_pct",
    "units_ordered",
    "current_price",
    "gross_profit_unit",
    "reason",
];

const DERIVED_COLUMNS: [&str; 4] = [
    "suggested_new_price",
    "suggested_price_delta",
    "gross_profit_total",
    "revenue_impact_est",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvColumns {
    Minimal,
    #[default]
    Extended,
}

impl CsvColumns {
    pub fn header(self) -> Vec<&'static str> {
        let mut cols = MINIMAL_COLUMNS.to_vec();
        if self == Self::Extended {
            cols.extend(DERIVED_COLUMNS);
        }
        cols
    }
}

impl std::str::FromStr for CsvColumns {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "extended" => Ok(Self::Extended),
            other => anyhow::bail!("unknown column set {other:?} (expected minimal|extended)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl CsvExport {
    /// `None` when there is nothing to export.
    pub fn build(records: &[DerivedRecommendation], columns: CsvColumns) -> Option<Self> {
        to_csv(records, columns).map(|body| Self {
            filename: EXPORT_FILENAME,
            content_type: EXPORT_CONTENT_TYPE,
            body,
        })
    }
}

/// Serializes records as comma-joined lines under a header. `product_name` and `reason` are
/// quoted with `"` doubled; no other escaping is applied, so embedded commas or newlines in free
/// text produce malformed rows. Returns `None` for an empty collection.
pub fn to_csv(records: &[DerivedRecommendation], columns: CsvColumns) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(columns.header().join(","));

    for rec in records {
        let raw = &rec.raw;
        let mut fields = vec![
            raw.sku.clone(),
            quote(&raw.product_name),
            raw.strategy.clone(),
            raw.price_action.clone(),
            number_cell(raw.price_change_pct),
            number_cell(raw.units_ordered),
            number_cell(raw.current_price),
            number_cell(raw.gross_profit_unit),
            quote(raw.reason.as_deref().unwrap_or("")),
        ];
        if columns == CsvColumns::Extended {
            fields.extend([
                format_number(rec.suggested_new_price),
                format_number(rec.suggested_price_delta),
                format_number(rec.gross_profit_total),
                format_number(rec.revenue_impact_est),
            ]);
        }
        lines.push(fields.join(","));
    }

    Some(lines.join("\n"))
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn number_cell(v: Option<f64>) -> String {
    v.map(format_number).unwrap_or_default()
}

/// Plain, locale-free rendering: `5` rather than `5.0`, never a signed zero.
pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    format!("{v}")
}
