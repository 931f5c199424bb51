use accumulator_rollover::{
    accumulator_builder::CategoryResult,
    config::AppConfig,
    prediction::{validate_all, PredictionCandidate},
    rollover_ledger::RolloverProgress,
};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    predictions: usize,
    categories: &'a [CategoryResult],
    rollover: Option<&'a RolloverProgress>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("ROLLOVER_CONFIG").unwrap_or_else(|_| "rollover.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    info!("Loading predictions from {}", cfg.input.predictions_path);
    let raw = tokio::fs::read_to_string(&cfg.input.predictions_path)
        .await
        .with_context(|| format!("Failed to read {}", cfg.input.predictions_path))?;
    let candidates: Vec<PredictionCandidate> =
        serde_json::from_str(&raw).context("Failed to parse predictions snapshot")?;
    validate_all(&candidates)?;
    info!("Loaded {} predictions", candidates.len());

    let categories = cfg
        .accumulator_builder()
        .build_concurrent(candidates.clone())
        .await?;

    let bucketer = cfg.bucketer()?;
    let start_date = cfg
        .rollover
        .start_date
        .or_else(|| bucketer.earliest_day(&candidates));

    let progress = match start_date {
        Some(start_date) => Some(cfg.challenge(start_date)?.progress(&candidates)?),
        None => {
            warn!("⚠️ No predictions to schedule - skipping rollover challenge");
            None
        }
    };

    if let Some(progress) = &progress {
        info!(
            "📊 Rollover - Day {}/{}, Current: {:.2}, Projected: {:.2}, Won: {}, Lost: {}, Pending: {}",
            progress.current_day,
            cfg.rollover.length,
            progress.current_amount,
            progress.projected_amount,
            progress.statistics.won_days,
            progress.statistics.lost_days,
            progress.statistics.pending_days
        );
    }

    let report = Report {
        predictions: candidates.len(),
        categories: &categories,
        rollover: progress.as_ref(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
