use crate::domain::recommendation::{DerivedRecommendation, PriceAction, StrategyClass};
use crate::engine::derive::coerce;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Declared `sku_count` of the payload, or the collection length when absent.
    pub sku_count: u64,
    pub record_count: usize,
    pub hold_count: usize,
    pub premium_count: usize,
    pub increase_count: usize,
    pub decrease_count: usize,
    /// Sum of `units_ordered * current_price * price_change_pct`.
    pub est_revenue_uplift: f64,
    /// Sum of `revenue_impact_est` (`units_ordered * suggested_price_delta`).
    pub est_revenue_impact: f64,
    pub est_gross_profit_total: f64,
}

pub fn summarize(records: &[DerivedRecommendation], declared_sku_count: Option<u64>) -> Summary {
    let mut out = Summary {
        sku_count: declared_sku_count.unwrap_or(records.len() as u64),
        record_count: records.len(),
        ..Default::default()
    };

    for rec in records {
        let raw = &rec.raw;

        match StrategyClass::classify(&raw.strategy) {
            Some(StrategyClass::Hold) => out.hold_count += 1,
            Some(StrategyClass::Premium) => out.premium_count += 1,
            None => {}
        }

        match PriceAction::classify(&raw.price_action) {
            Some(PriceAction::Increase) => out.increase_count += 1,
            Some(PriceAction::Decrease) => out.decrease_count += 1,
            Some(PriceAction::None) | None => {}
        }

        let units = coerce(raw.units_ordered);
        out.est_revenue_uplift +=
            units * coerce(raw.current_price) * coerce(raw.price_change_pct);
        out.est_revenue_impact += rec.revenue_impact_est;
        out.est_gross_profit_total += coerce(raw.gross_profit_unit) * units;
    }

    out
}
