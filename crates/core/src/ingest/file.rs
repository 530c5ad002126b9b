use crate::domain::contract::parse_payload;
use crate::domain::recommendation::Payload;
use crate::error::DashboardError;
use std::path::Path;

pub async fn load_payload_file(path: impl AsRef<Path>) -> Result<Payload, DashboardError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        DashboardError::InvalidPayload(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_payload(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("alfred_{}_{name}", std::process::id()))
    }

    #[tokio::test]
    async fn loads_valid_file() {
        let path = temp_path("valid.json");
        tokio::fs::write(
            &path,
            r#"{"run_id":"f1","sku_count":1,"recommendations":[{"sku":"F1","units_ordered":2}]}"#,
        )
        .await
        .unwrap();

        let payload = load_payload_file(&path).await.unwrap();
        assert_eq!(payload.run_id.as_deref(), Some("f1"));
        assert_eq!(payload.recommendations[0].units_ordered, Some(2.0));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn rejects_plain_text_and_missing_files() {
        let path = temp_path("plain.txt");
        tokio::fs::write(&path, "sku,price\nA1,5").await.unwrap();
        let err = load_payload_file(&path).await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidPayload(_)));
        let _ = tokio::fs::remove_file(&path).await;

        let err = load_payload_file(temp_path("missing.json")).await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidPayload(_)));
    }
}
