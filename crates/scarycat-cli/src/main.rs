//! ScaryCat CLI
//!
//! Loads every model in a directory with the Candle backend and screens
//! image files against the ensemble.
//!
//! Exit status: 0 when nothing is flagged, 1 when at least one image is
//! flagged, 2 on error or when any image failed to score.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use scarycat_candle_backend::CandleVitBackend;
use scarycat_core::{EventSink, TracingSink};
use scarycat_screener::{
    InferenceBackend, OnImageError, OverallScreeningResult, Screener, ScreenerConfig,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

mod cli;

use cli::{Cli, Commands, ModelArgs, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Screen {
            images,
            models,
            threshold,
            format,
            continue_on_error,
            metrics,
        } => {
            let recorder = if metrics { Some(init_metrics()?) } else { None };

            let mut config = load_config(&models)?;
            if continue_on_error {
                config.on_image_error = OnImageError::Continue;
            }
            let threshold = threshold.unwrap_or(config.probability_threshold);

            let screener = build_screener(config).await?;
            let batch = read_images(&images).await?;

            info!("Screening {} images at threshold {:.3}", batch.len(), threshold);
            let overall = screener.screen(batch, threshold).await?;

            match format {
                OutputFormat::Text => {
                    for (index, path) in images.iter().enumerate() {
                        println!("#{}: {}", index, path.display());
                    }
                    println!();
                    print!("{}", overall.generate_report());
                }
                OutputFormat::Json => println!("{}", overall.to_json_pretty()?),
            }

            if let Some(handle) = recorder {
                eprint!("{}", handle.render());
            }

            Ok(ExitCode::from(exit_status(&overall)))
        }
        Commands::Models { models } => {
            let screener = build_screener(load_config(&models)?).await?;
            let catalog = screener.catalog();

            println!(
                "{} models loaded with the {} backend:",
                catalog.len(),
                catalog.backend().name()
            );
            for entry in catalog.entries() {
                println!("  {:<32} {}", entry.name(), entry.source().display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Partial runs report as errors so scripts can tell them apart
fn exit_status(overall: &OverallScreeningResult) -> u8 {
    if !overall.failures().is_empty() {
        2
    } else if overall.has_flagged() {
        1
    } else {
        0
    }
}

/// Config file (if any) with command-line overrides applied
fn load_config(args: &ModelArgs) -> Result<ScreenerConfig> {
    let mut config = match &args.config {
        Some(path) => ScreenerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScreenerConfig::default(),
    };

    if let Some(dir) = &args.models_dir {
        config.models_dir = dir.clone();
    }
    Ok(config)
}

async fn build_screener(config: ScreenerConfig) -> Result<Screener<CandleVitBackend>> {
    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let models_dir = config.models_dir.clone();

    Screener::from_config(CandleVitBackend::new(), config, events)
        .await
        .with_context(|| format!("Failed to load models from {}", models_dir.display()))
}

async fn read_images(paths: &[PathBuf]) -> Result<Vec<Bytes>> {
    futures::future::try_join_all(paths.iter().map(|path| read_image(path))).await
}

async fn read_image(path: &Path) -> Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(Bytes::from(data))
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("scarycat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scarycat=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Install the Prometheus recorder and describe the screener's metrics
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "scarycat_images_screened_total",
        "Images scored by the ensemble"
    );
    metrics::describe_counter!(
        "scarycat_images_flagged_total",
        "Images with a label above the probability threshold"
    );
    metrics::describe_counter!(
        "scarycat_prediction_failures_total",
        "Model inference errors during ensemble scoring"
    );
    metrics::describe_counter!(
        "scarycat_disambiguations_total",
        "Disambiguation passes by outcome"
    );
    metrics::describe_histogram!(
        "scarycat_model_load_duration_ms",
        metrics::Unit::Milliseconds,
        "Time to load a single model"
    );

    Ok(handle)
}
