pub mod dashboard;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod export;
pub mod ingest;

pub mod config {
    use crate::domain::recommendation::Mode;
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_SIMULATED_DELAY_MS: u64 = 1500;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub endpoint_url: Option<String>,
        pub default_mode: Option<Mode>,
        pub fetch_timeout: Option<Duration>,
        pub simulated_delay: Duration,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                endpoint_url: None,
                default_mode: None,
                fetch_timeout: None,
                simulated_delay: Duration::from_millis(DEFAULT_SIMULATED_DELAY_MS),
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let default_mode = match non_empty_var("ALFRED_DEFAULT_MODE") {
                Some(s) => Some(
                    s.parse::<Mode>()
                        .with_context(|| format!("invalid ALFRED_DEFAULT_MODE: {s}"))?,
                ),
                None => None,
            };

            let fetch_timeout = non_empty_var("ALFRED_FETCH_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);

            let simulated_delay = non_empty_var("ALFRED_SIMULATED_DELAY_MS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(DEFAULT_SIMULATED_DELAY_MS));

            Ok(Self {
                endpoint_url: non_empty_var("ALFRED_ENDPOINT_URL"),
                default_mode,
                fetch_timeout,
                simulated_delay,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_endpoint_url(&self) -> anyhow::Result<&str> {
            self.endpoint_url
                .as_deref()
                .context("ALFRED_ENDPOINT_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
