use alfred_core::dashboard::Dashboard;
use alfred_core::domain::recommendation::Mode;
use alfred_core::engine::{CategoryFilter, FilterCriteria, SearchScope};
use alfred_core::execution::{ActionExecutor, SimulatedExecutor};
use alfred_core::export::CsvColumns;
use alfred_core::ingest::HttpPayloadSource;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "alfred_cli")]
struct Args {
    /// Load recommendations from a local JSON file instead of ALFRED_ENDPOINT_URL.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Analysis mode sent to the endpoint (balanced|profit|inventory|revenue).
    #[arg(long)]
    mode: Option<String>,

    /// Case-insensitive search over sku, product name, strategy and price action.
    #[arg(long, default_value = "")]
    query: String,

    /// Exact strategy tag, or "all".
    #[arg(long)]
    strategy: Option<String>,

    /// Exact price action tag, or "all".
    #[arg(long)]
    action: Option<String>,

    /// Restrict the search to sku and product name.
    #[arg(long)]
    basic_search: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print summary statistics for the filtered records (default).
    Summary,
    /// Print the filtered records with derived fields as JSON.
    List,
    /// Write the filtered records as CSV.
    Export {
        #[arg(long, default_value = alfred_core::export::csv::EXPORT_FILENAME)]
        out: PathBuf,

        /// minimal|extended
        #[arg(long, default_value = "extended")]
        columns: String,
    },
    /// Print the price changes that would be queued; `--execute` hands them to the executor.
    Plan {
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = alfred_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let mode = match args.mode.as_deref() {
        Some(s) => Some(s.parse::<Mode>()?),
        None => settings.default_mode,
    };

    let criteria = FilterCriteria::default()
        .query(args.query.clone())
        .strategy(CategoryFilter::parse(args.strategy.as_deref()))
        .price_action(CategoryFilter::parse(args.action.as_deref()))
        .scope(if args.basic_search {
            SearchScope::Basic
        } else {
            SearchScope::Extended
        });

    let mut dashboard = Dashboard::new();
    match &args.file {
        Some(path) => {
            dashboard
                .load_file(path)
                .await
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            let source = HttpPayloadSource::from_settings(&settings)?;
            dashboard
                .refresh(&source, mode)
                .await
                .context("failed to fetch recommendations")?;
        }
    }

    let view = dashboard
        .view(&criteria)
        .context("no recommendations loaded")?;

    match args.command.unwrap_or(Command::Summary) {
        Command::Summary => {
            println!("{}", serde_json::to_string_pretty(&view.summary)?);
        }
        Command::List => {
            println!("{}", serde_json::to_string_pretty(&view.records)?);
        }
        Command::Export { out, columns } => {
            let columns = columns.parse::<CsvColumns>()?;
            let Some(export) = dashboard.export(&criteria, columns) else {
                tracing::info!("no records match; nothing exported");
                return Ok(());
            };
            tokio::fs::write(&out, export.body.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(
                path = %out.display(),
                rows = view.records.len(),
                content_type = export.content_type,
                "exported recommendations"
            );
        }
        Command::Plan { execute } => {
            let plan = dashboard
                .action_plan(&criteria, mode)
                .context("no recommendations loaded")?;
            println!("{}", serde_json::to_string_pretty(&plan)?);

            if execute {
                let executor = SimulatedExecutor::new(settings.simulated_delay);
                match executor.execute_actions(&plan).await {
                    Ok(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
                    Err(err) => {
                        sentry_anyhow::capture_anyhow(&err);
                        tracing::error!(error = %err, "action execution failed");
                        return Err(err);
                    }
                }
            }
        }
    }

    Ok(())
}

fn init_sentry(settings: &alfred_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_subcommand() {
        let args = Args::try_parse_from([
            "alfred_cli",
            "--file",
            "payload.json",
            "--strategy",
            "hold",
            "export",
            "--columns",
            "minimal",
        ])
        .unwrap();
        assert_eq!(args.file, Some(PathBuf::from("payload.json")));
        assert_eq!(args.strategy.as_deref(), Some("hold"));
        match args.command {
            Some(Command::Export { out, columns }) => {
                assert_eq!(out, PathBuf::from("alfred_recommendations.csv"));
                assert_eq!(columns, "minimal");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn defaults_to_summary() {
        let args = Args::try_parse_from(["alfred_cli", "--mode", "profit"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.mode.as_deref(), Some("profit"));
        assert!(!args.basic_search);
    }
}
