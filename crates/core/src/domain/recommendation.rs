use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One pricing recommendation exactly as received. Numeric fields keep their absence so exports can
/// reproduce the source; arithmetic goes through `engine::derive::coerce`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecommendation {
    pub sku: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub units_ordered: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub gross_profit_unit: Option<f64>,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub price_action: String,
    #[serde(default)]
    pub price_change_pct: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub run_id: Option<String>,
    /// Advisory total; the list may be truncated by the source.
    pub sku_count: Option<u64>,
    pub recommendations: Vec<RawRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecommendation {
    #[serde(flatten)]
    pub raw: RawRecommendation,
    pub suggested_new_price: f64,
    pub suggested_price_delta: f64,
    pub revenue_impact_est: f64,
    pub gross_profit_total: f64,
}

/// Known strategy families. Anything else stays in the collection but is not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyClass {
    Hold,
    /// Any tag containing "premium", e.g. `premium_position`.
    Premium,
}

impl StrategyClass {
    pub fn classify(tag: &str) -> Option<Self> {
        let tag = tag.to_lowercase();
        if tag == "hold" {
            Some(Self::Hold)
        } else if tag.contains("premium") {
            Some(Self::Premium)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceAction {
    None,
    Increase,
    Decrease,
}

impl PriceAction {
    pub fn classify(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

/// Steers the remote analysis; the response is handled identically for every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Balanced,
    Profit,
    Inventory,
    Revenue,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Balanced, Mode::Profit, Mode::Inventory, Mode::Revenue];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Profit => "profit",
            Self::Inventory => "inventory",
            Self::Revenue => "revenue",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown mode {s:?} (expected balanced|profit|inventory|revenue)"))
    }
}
