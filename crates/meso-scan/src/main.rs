use std::sync::Arc;

use anyhow::Result;
use meso_core::{provider_date, SectorDataProvider, SnapshotProvider};
use meso_orchestrator::{render_report, CachedProvider, MesoOrchestrator};

mod config;

use config::{CliConfig, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Panic hook: log panic info before crashing
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    // 2. Load configuration
    let config = CliConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Snapshot: {}", config.snapshot_path.display());
    tracing::info!("  Benchmark: {}", config.scan.benchmark);
    tracing::info!("  Top N: {}", config.scan.top_n);
    tracing::info!(
        "  Rebound: 5d <= {}%, vol ratio >= {}",
        config.scan.decline_floor,
        config.scan.vol_ratio_floor
    );
    tracing::info!("  Degraded policy: {:?}", config.scan.degraded_policy);

    let trade_date = config.resolve_trade_date(chrono::Local::now().date_naive());
    tracing::info!("Trade date: {} ({})", trade_date, provider_date(trade_date));

    // 3. Provider: snapshot replay behind the response cache
    let snapshot = SnapshotProvider::from_file(&config.snapshot_path)?;
    let provider: Arc<dyn SectorDataProvider> =
        Arc::new(CachedProvider::with_ttl(snapshot, config.cache_ttl_secs));

    // 4. Run the scan
    let orchestrator = MesoOrchestrator::new(provider, config.scan.clone())?;
    let report = orchestrator.run_meso_scan(trade_date).await;

    // 5. Output
    match config.output {
        OutputFormat::Text => println!("{}", render_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.is_complete() {
        tracing::warn!("Scan finished with {} recorded issues", report.issues.len());
    }

    Ok(())
}
