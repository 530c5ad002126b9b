use crate::domain::recommendation::{DerivedRecommendation, Mode, PriceAction};
use crate::engine::derive::coerce;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedAction {
    pub sku: String,
    pub price_action: PriceAction,
    pub current_price: f64,
    pub suggested_new_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPlan {
    pub run_id: Option<String>,
    pub mode: Option<Mode>,
    pub actions: Vec<PlannedAction>,
}

impl ActionPlan {
    /// Only records with a known increase/decrease action become planned price changes.
    pub fn from_records(
        run_id: Option<String>,
        mode: Option<Mode>,
        records: &[DerivedRecommendation],
    ) -> Self {
        let actions = records
            .iter()
            .filter_map(|rec| {
                let action = PriceAction::classify(&rec.raw.price_action)?;
                if action == PriceAction::None {
                    return None;
                }
                Some(PlannedAction {
                    sku: rec.raw.sku.clone(),
                    price_action: action,
                    current_price: coerce(rec.raw.current_price),
                    suggested_new_price: rec.suggested_new_price,
                })
            })
            .collect();

        Self {
            run_id,
            mode,
            actions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReceipt {
    pub id: Uuid,
    pub queued: usize,
    pub submitted_at: DateTime<Utc>,
    pub executor: &'static str,
}

#[async_trait::async_trait]
pub trait ActionExecutor: Send + Sync {
    fn executor_name(&self) -> &'static str;

    async fn execute_actions(&self, plan: &ActionPlan) -> anyhow::Result<ExecutionReceipt>;
}

/// Placeholder executor: waits, then reports every planned action as queued. Nothing leaves the
/// process.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl ActionExecutor for SimulatedExecutor {
    fn executor_name(&self) -> &'static str {
        "simulated"
    }

    async fn execute_actions(&self, plan: &ActionPlan) -> anyhow::Result<ExecutionReceipt> {
        anyhow::ensure!(!plan.is_empty(), "action plan has no price changes to queue");

        tokio::time::sleep(self.delay).await;

        let receipt = ExecutionReceipt {
            id: Uuid::new_v4(),
            queued: plan.actions.len(),
            submitted_at: Utc::now(),
            executor: self.executor_name(),
        };
        tracing::info!(
            receipt_id = %receipt.id,
            queued = receipt.queued,
            run_id = plan.run_id.as_deref().unwrap_or(""),
            "simulated action execution"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::RawRecommendation;
    use crate::engine::derive::derive_all;

    fn records() -> Vec<DerivedRecommendation> {
        let raw = |sku: &str, action: &str| RawRecommendation {
            sku: sku.to_string(),
            price_action: action.to_string(),
            current_price: Some(10.0),
            price_change_pct: Some(0.1),
            ..Default::default()
        };
        derive_all(&[
            raw("A1", "none"),
            raw("A2", "increase"),
            raw("A3", "Decrease"),
            raw("A4", "reprice_later"),
        ])
    }

    #[test]
    fn plan_keeps_only_price_changes() {
        let plan = ActionPlan::from_records(Some("r1".to_string()), Some(Mode::Profit), &records());
        let skus: Vec<_> = plan.actions.iter().map(|a| a.sku.as_str()).collect();
        assert_eq!(skus, vec!["A2", "A3"]);
        assert_eq!(plan.actions[1].price_action, PriceAction::Decrease);
        assert!((plan.actions[0].suggested_new_price - 11.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn simulated_executor_queues_plan() {
        let plan = ActionPlan::from_records(None, None, &records());
        let exec = SimulatedExecutor::new(Duration::ZERO);
        let receipt = exec.execute_actions(&plan).await.unwrap();
        assert_eq!(receipt.queued, 2);
        assert_eq!(receipt.executor, "simulated");
    }

    #[tokio::test]
    async fn simulated_executor_rejects_empty_plan() {
        let plan = ActionPlan::from_records(None, None, &[]);
        let exec = SimulatedExecutor::new(Duration::ZERO);
        assert!(exec.execute_actions(&plan).await.is_err());
    }
}
