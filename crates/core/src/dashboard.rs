use crate::domain::contract::parse_payload;
use crate::domain::recommendation::{DerivedRecommendation, Mode, Payload};
use crate::engine::{derive_all, filter_records, summarize, FilterCriteria, FilterOptions, Summary};
use crate::error::DashboardError;
use crate::execution::ActionPlan;
use crate::export::{CsvColumns, CsvExport};
use crate::ingest::{load_payload_file, PayloadSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadSource {
    Remote { mode: Option<Mode> },
    File { path: String },
    Upload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedPayload {
    pub payload: Payload,
    pub source: LoadSource,
    pub loaded_at: DateTime<Utc>,
}

/// Transient user-facing error, replaced by the next failure and cleared by the next success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: &'static str,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub run_id: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub total_records: usize,
    pub records: Vec<DerivedRecommendation>,
    pub summary: Summary,
    pub options: FilterOptions,
}

/// Holds the one current payload. Loads replace it wholesale; failed loads leave it in place.
#[derive(Debug, Default)]
pub struct Dashboard {
    current: Option<Arc<LoadedPayload>>,
    loading: bool,
    notice: Option<Notice>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<LoadedPayload>> {
        self.current.clone()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Applies the outcome of any load. The swap happens only on success.
    pub fn accept(
        &mut self,
        result: Result<Payload, DashboardError>,
        source: LoadSource,
    ) -> Result<Arc<LoadedPayload>, DashboardError> {
        match result {
            Ok(payload) => {
                let loaded = Arc::new(LoadedPayload {
                    payload,
                    source,
                    loaded_at: Utc::now(),
                });
                tracing::info!(
                    run_id = loaded.payload.run_id.as_deref().unwrap_or(""),
                    records = loaded.payload.recommendations.len(),
                    source = ?loaded.source,
                    "payload loaded"
                );
                self.current = Some(loaded.clone());
                self.notice = None;
                Ok(loaded)
            }
            Err(err) => {
                tracing::warn!(error = %err, source = ?source, "payload load failed; keeping current payload");
                self.notice = Some(Notice {
                    kind: err.kind(),
                    message: err.to_string(),
                    at: Utc::now(),
                });
                Err(err)
            }
        }
    }

    pub fn load_text(
        &mut self,
        text: &str,
        source: LoadSource,
    ) -> Result<Arc<LoadedPayload>, DashboardError> {
        self.accept(parse_payload(text), source)
    }

    pub async fn load_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<LoadedPayload>, DashboardError> {
        let path = path.as_ref();
        let result = load_payload_file(path).await;
        self.accept(
            result,
            LoadSource::File {
                path: path.display().to_string(),
            },
        )
    }

    /// Soft lock: refuses a second fetch while one is outstanding.
    pub fn begin_fetch(&mut self) -> Result<(), DashboardError> {
        if self.loading {
            return Err(DashboardError::Busy);
        }
        self.loading = true;
        Ok(())
    }

    /// Releases the fetch lock for an abandoned request. Payload and notice are left as they are.
    pub fn cancel_fetch(&mut self) {
        if self.loading {
            tracing::debug!("fetch abandoned; releasing lock");
        }
        self.loading = false;
    }

    pub fn finish_fetch(
        &mut self,
        result: Result<Payload, DashboardError>,
        mode: Option<Mode>,
    ) -> Result<Arc<LoadedPayload>, DashboardError> {
        self.loading = false;
        self.accept(result, LoadSource::Remote { mode })
    }

    pub async fn refresh(
        &mut self,
        source: &dyn PayloadSource,
        mode: Option<Mode>,
    ) -> Result<Arc<LoadedPayload>, DashboardError> {
        self.begin_fetch()?;
        let result = source.fetch_payload(mode).await;
        self.finish_fetch(result, mode)
    }

    fn filtered(
        &self,
        criteria: &FilterCriteria,
    ) -> Option<(Arc<LoadedPayload>, Vec<DerivedRecommendation>)> {
        let loaded = self.current.clone()?;
        let derived = derive_all(&loaded.payload.recommendations);
        let records = filter_records(&derived, criteria);
        Some((loaded, records))
    }

    /// Recomputed on every call from the current payload.
    pub fn view(&self, criteria: &FilterCriteria) -> Option<DashboardView> {
        let loaded = self.current.clone()?;
        let derived = derive_all(&loaded.payload.recommendations);
        let options = FilterOptions::collect(&derived);
        let records = filter_records(&derived, criteria);
        let summary = summarize(&records, loaded.payload.sku_count);

        Some(DashboardView {
            run_id: loaded.payload.run_id.clone(),
            loaded_at: loaded.loaded_at,
            total_records: derived.len(),
            records,
            summary,
            options,
        })
    }

    /// `None` when nothing is loaded or the filter leaves no rows.
    pub fn export(&self, criteria: &FilterCriteria, columns: CsvColumns) -> Option<CsvExport> {
        let (_, records) = self.filtered(criteria)?;
        let export = CsvExport::build(&records, columns);
        if export.is_none() {
            tracing::debug!("nothing to export");
        }
        export
    }

    pub fn action_plan(&self, criteria: &FilterCriteria, mode: Option<Mode>) -> Option<ActionPlan> {
        let (loaded, records) = self.filtered(criteria)?;
        Some(ActionPlan::from_records(
            loaded.payload.run_id.clone(),
            mode,
            &records,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CategoryFilter;
    use serde_json::json;

    fn scenario_json() -> String {
        json!({
            "run_id": "r1",
            "sku_count": 2,
            "recommendations": [
                {"sku": "A1", "product_name": "Widget", "units_ordered": 10, "current_price": 5.00,
                 "gross_profit_unit": 1.00, "strategy": "hold", "price_action": "none", "price_change_pct": 0},
                {"sku": "A2", "product_name": "Gadget", "units_ordered": 4, "current_price": 20.00,
                 "gross_profit_unit": 3.00, "strategy": "premium_position", "price_action": "increase",
                 "price_change_pct": 0.1}
            ]
        })
        .to_string()
    }

    struct FakeSource(Result<Payload, DashboardError>);

    #[async_trait::async_trait]
    impl PayloadSource for FakeSource {
        fn source_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_payload(&self, _mode: Option<Mode>) -> Result<Payload, DashboardError> {
            self.0.clone()
        }
    }

    #[test]
    fn end_to_end_scenario() {
        let mut dash = Dashboard::new();
        dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();

        let view = dash.view(&FilterCriteria::default()).unwrap();
        assert_eq!(view.run_id.as_deref(), Some("r1"));
        assert_eq!(view.summary.sku_count, 2);
        assert_eq!(view.summary.hold_count, 1);
        assert_eq!(view.summary.premium_count, 1);
        assert_eq!(view.summary.increase_count, 1);

        let a2 = view.records.iter().find(|r| r.raw.sku == "A2").unwrap();
        assert!((a2.suggested_new_price - 22.0).abs() < 1e-9);
        assert!((a2.suggested_price_delta - 2.0).abs() < 1e-9);
        assert!((a2.revenue_impact_est - 8.0).abs() < 1e-9);
        assert!((a2.gross_profit_total - 12.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_upload_keeps_previous_payload() {
        let mut dash = Dashboard::new();
        let first = dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();

        let err = dash
            .load_text("definitely not json", LoadSource::Upload)
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidPayload(_)));

        let current = dash.current().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(current.payload.recommendations.len(), 2);
        let notice = dash.notice().unwrap();
        assert_eq!(notice.kind, "invalid");
        assert!(notice.message.contains("invalid"));
    }

    #[test]
    fn success_replaces_payload_and_clears_notice() {
        let mut dash = Dashboard::new();
        dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();
        let _ = dash.load_text("[]", LoadSource::Upload);
        assert!(dash.notice().is_some());

        let next = json!({"run_id": "r2", "recommendations": [{"sku": "Z1"}]}).to_string();
        dash.load_text(&next, LoadSource::Upload).unwrap();
        assert!(dash.notice().is_none());

        let view = dash.view(&FilterCriteria::default()).unwrap();
        assert_eq!(view.run_id.as_deref(), Some("r2"));
        assert_eq!(view.total_records, 1);
        assert_eq!(view.summary.sku_count, 1);
    }

    #[test]
    fn view_and_export_without_payload() {
        let dash = Dashboard::new();
        assert!(dash.view(&FilterCriteria::default()).is_none());
        assert!(dash.export(&FilterCriteria::default(), CsvColumns::Minimal).is_none());
        assert!(dash.action_plan(&FilterCriteria::default(), None).is_none());
    }

    #[test]
    fn export_follows_filter_and_skips_empty() {
        let mut dash = Dashboard::new();
        dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();

        let criteria = FilterCriteria::default().strategy(CategoryFilter::parse(Some("hold")));
        let export = dash.export(&criteria, CsvColumns::Minimal).unwrap();
        assert_eq!(export.body.lines().count(), 2);
        assert!(export.body.contains("A1,\"Widget\""));

        let criteria = FilterCriteria::default().query("no such product");
        assert!(dash.export(&criteria, CsvColumns::Extended).is_none());
    }

    #[test]
    fn summary_uses_filtered_records() {
        let mut dash = Dashboard::new();
        dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();

        let criteria = FilterCriteria::default().query("gadget");
        let view = dash.view(&criteria).unwrap();
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.summary.record_count, 1);
        assert_eq!(view.summary.hold_count, 0);
        assert_eq!(view.summary.sku_count, 2);
        assert_eq!(view.options.strategies.len(), 2);
    }

    #[test]
    fn fetch_lock_is_exclusive() {
        let mut dash = Dashboard::new();
        dash.begin_fetch().unwrap();
        assert!(dash.is_loading());
        assert_eq!(dash.begin_fetch(), Err(DashboardError::Busy));

        let _ = dash.finish_fetch(Err(DashboardError::Fetch("HTTP 500".to_string())), None);
        assert!(!dash.is_loading());
        assert_eq!(dash.notice().unwrap().kind, "fetch");
        dash.begin_fetch().unwrap();
    }

    #[test]
    fn cancel_fetch_releases_lock_only() {
        let mut dash = Dashboard::new();
        dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();
        let _ = dash.load_text("nope", LoadSource::Upload);

        dash.begin_fetch().unwrap();
        dash.cancel_fetch();
        assert!(!dash.is_loading());
        assert_eq!(dash.notice().unwrap().kind, "invalid");
        assert_eq!(
            dash.current().unwrap().payload.run_id.as_deref(),
            Some("r1")
        );
        dash.begin_fetch().unwrap();
    }

    #[tokio::test]
    async fn failed_refresh_keeps_payload() {
        let mut dash = Dashboard::new();
        let ok = FakeSource(parse_payload(&scenario_json()));
        let loaded = dash.refresh(&ok, Some(Mode::Balanced)).await.unwrap();
        assert_eq!(
            loaded.source,
            LoadSource::Remote {
                mode: Some(Mode::Balanced)
            }
        );

        let failing = FakeSource(Err(DashboardError::Fetch("HTTP 503".to_string())));
        let err = dash.refresh(&failing, None).await.unwrap_err();
        assert_eq!(err, DashboardError::Fetch("HTTP 503".to_string()));
        assert!(!dash.is_loading());
        assert_eq!(
            dash.current().unwrap().payload.run_id.as_deref(),
            Some("r1")
        );
    }

    #[tokio::test]
    async fn file_load_records_path() {
        let path = std::env::temp_dir().join(format!("alfred_dash_{}.json", std::process::id()));
        tokio::fs::write(&path, scenario_json()).await.unwrap();

        let mut dash = Dashboard::new();
        let loaded = dash.load_file(&path).await.unwrap();
        assert!(matches!(loaded.source, LoadSource::File { .. }));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[test]
    fn action_plan_from_filtered_view() {
        let mut dash = Dashboard::new();
        dash.load_text(&scenario_json(), LoadSource::Upload).unwrap();
        let plan = dash
            .action_plan(&FilterCriteria::default(), Some(Mode::Revenue))
            .unwrap();
        assert_eq!(plan.run_id.as_deref(), Some("r1"));
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].sku, "A2");
    }
}
