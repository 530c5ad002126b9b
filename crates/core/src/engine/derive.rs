use crate::domain::recommendation::{DerivedRecommendation, RawRecommendation};

/// Absent and NaN inputs count as zero.
pub fn coerce(v: Option<f64>) -> f64 {
    match v {
        Some(x) if !x.is_nan() => x,
        _ => 0.0,
    }
}

pub fn derive(raw: &RawRecommendation) -> DerivedRecommendation {
    let units = coerce(raw.units_ordered);
    let price = coerce(raw.current_price);
    let pct = coerce(raw.price_change_pct);
    let gp_unit = coerce(raw.gross_profit_unit);

    let suggested_new_price = price * (1.0 + pct);
    let suggested_price_delta = suggested_new_price - price;

    DerivedRecommendation {
        raw: raw.clone(),
        suggested_new_price,
        suggested_price_delta,
        revenue_impact_est: units * suggested_price_delta,
        gross_profit_total: gp_unit * units,
    }
}

pub fn derive_all(raws: &[RawRecommendation]) -> Vec<DerivedRecommendation> {
    raws.iter().map(derive).collect()
}
