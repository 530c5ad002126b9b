use crate::domain::recommendation::{Payload, RawRecommendation};
use crate::error::DashboardError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Deserialize)]
struct WirePayload {
    #[serde(default)]
    run_id: Option<String>,
    #[serde(default)]
    sku_count: Option<u64>,
    recommendations: Vec<RawRecommendation>,
}

/// Parses an uploaded or fetched body into a [`Payload`]. Anything that is not the expected
/// shape is rejected as [`DashboardError::InvalidPayload`] with the underlying reason.
pub fn parse_payload(text: &str) -> Result<Payload, DashboardError> {
    let value = serde_json::from_str::<Value>(text)
        .map_err(|e| DashboardError::InvalidPayload(format!("not valid JSON: {e}")))?;
    payload_from_value(value)
}

pub fn payload_from_value(value: Value) -> Result<Payload, DashboardError> {
    check_shape(&value)?;

    let wire = serde_json::from_value::<WirePayload>(value)
        .map_err(|e| DashboardError::InvalidPayload(e.to_string()))?;
    wire.validate_and_into_payload()
}

// serde accepts sequences for structs, so objects are checked up front.
fn check_shape(value: &Value) -> Result<(), DashboardError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("top-level value must be an object"))?;
    let recs = obj
        .get("recommendations")
        .ok_or_else(|| invalid("missing field `recommendations`"))?
        .as_array()
        .ok_or_else(|| invalid("`recommendations` must be an array"))?;

    if let Some(idx) = recs.iter().position(|r| !r.is_object()) {
        return Err(invalid(format!("recommendations[{idx}] must be an object")));
    }
    Ok(())
}

impl WirePayload {
    fn validate_and_into_payload(self) -> Result<Payload, DashboardError> {
        let mut seen = BTreeSet::<String>::new();
        let mut duplicates = 0usize;
        let mut recommendations = Vec::with_capacity(self.recommendations.len());

        // Records are kept as received; trimming only decides emptiness and duplicates.
        for (idx, rec) in self.recommendations.into_iter().enumerate() {
            let key = rec.sku.trim();
            if key.is_empty() {
                return Err(invalid(format!("recommendations[{idx}].sku must be non-empty")));
            }
            if !seen.insert(key.to_string()) {
                duplicates += 1;
            }
            recommendations.push(rec);
        }

        if duplicates > 0 {
            tracing::warn!(
                duplicates,
                run_id = self.run_id.as_deref().unwrap_or(""),
                "payload contains duplicate SKUs"
            );
        }

        Ok(Payload {
            run_id: self.run_id,
            sku_count: self.sku_count,
            recommendations,
        })
    }
}

fn invalid(detail: impl Into<String>) -> DashboardError {
    DashboardError::InvalidPayload(detail.into())
}
