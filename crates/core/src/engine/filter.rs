use crate::domain::recommendation::{DerivedRecommendation, RawRecommendation};
use serde::{Deserialize, Serialize};

/// Gives the filter access to the raw fields of either record flavour.
pub trait AsRaw {
    fn as_raw(&self) -> &RawRecommendation;
}

impl AsRaw for RawRecommendation {
    fn as_raw(&self) -> &RawRecommendation {
        self
    }
}

impl AsRaw for DerivedRecommendation {
    fn as_raw(&self) -> &RawRecommendation {
        &self.raw
    }
}

pub const ALL_SENTINEL: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// `"all"` (any case) or an empty selection disables the predicate.
    pub fn parse(selection: Option<&str>) -> Self {
        match selection.map(str::trim) {
            None | Some("") => Self::All,
            Some(s) if s.eq_ignore_ascii_case(ALL_SENTINEL) => Self::All,
            Some(s) => Self::Only(s.to_string()),
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// sku and product name.
    Basic,
    /// Also strategy and price action.
    #[default]
    Extended,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: String,
    pub strategy: CategoryFilter,
    pub price_action: CategoryFilter,
    pub scope: SearchScope,
}

impl FilterCriteria {
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn strategy(mut self, strategy: CategoryFilter) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn price_action(mut self, price_action: CategoryFilter) -> Self {
        self.price_action = price_action;
        self
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn matches(&self, rec: &RawRecommendation) -> bool {
        self.matches_query(rec)
            && self.strategy.matches(&rec.strategy)
            && self.price_action.matches(&rec.price_action)
    }

    fn matches_query(&self, rec: &RawRecommendation) -> bool {
        let q = self.query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }

        let hit = |field: &str| field.to_lowercase().contains(&q);
        match self.scope {
            SearchScope::Basic => hit(&rec.sku) || hit(&rec.product_name),
            SearchScope::Extended => {
                hit(&rec.sku)
                    || hit(&rec.product_name)
                    || hit(&rec.strategy)
                    || hit(&rec.price_action)
            }
        }
    }
}

pub fn filter_records<T: AsRaw + Clone>(records: &[T], criteria: &FilterCriteria) -> Vec<T> {
    records
        .iter()
        .filter(|r| criteria.matches(r.as_raw()))
        .cloned()
        .collect()
}

/// Distinct tag values, first-seen order, for populating filter selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub strategies: Vec<String>,
    pub price_actions: Vec<String>,
}

impl FilterOptions {
    pub fn collect<T: AsRaw>(records: &[T]) -> Self {
        let mut out = Self::default();
        for r in records {
            let raw = r.as_raw();
            push_distinct(&mut out.strategies, &raw.strategy);
            push_distinct(&mut out.price_actions, &raw.price_action);
        }
        out
    }
}

fn push_distinct(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}
