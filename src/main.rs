// src/main.rs

use anyhow::{Context, Result};
use gate_counter::pipeline::{GatePipeline, RunSummary, StopSignal, TracingObserver};
use gate_counter::{Config, JsonLinesSource};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("GATE_COUNTER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gate_counter={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚪 Gate Counter Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Gate: x={} y=[{}, {}] | frame_skip={} | idle eviction={}",
        config.gate.line_x,
        config.gate.gate_y_min,
        config.gate.gate_y_max,
        config.sampling.frame_skip,
        config
            .tracking
            .max_idle_frames
            .map(|n| format!("{} sampled frames", n))
            .unwrap_or_else(|| "never".to_string())
    );

    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, stopping after the current observation");
                stop.trigger();
            }
        });
    }

    let summary = tokio::task::spawn_blocking(move || run(&config, &stop))
        .await
        .context("pipeline task panicked")?;

    match summary {
        Ok(summary) => {
            report(&summary);
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            Err(e)
        }
    }
}

fn run(config: &Config, stop: &StopSignal) -> Result<RunSummary> {
    let mut source = JsonLinesSource::open(&config.source, config.sampling)?;
    let mut pipeline = GatePipeline::new(config)?;
    pipeline.add_observer(TracingObserver);
    info!("✓ Event log: {}", pipeline.log_path().display());

    Ok(pipeline.run(&mut source, stop)?)
}

fn report(summary: &RunSummary) {
    info!("\n========================================");
    if summary.cancelled {
        info!("Run stopped early");
    } else {
        info!("✓ Run complete");
    }
    info!("  Entered: {}", summary.counts.enter_count);
    info!("  Exited: {}", summary.counts.exit_count);
    info!("  Net: {}", summary.counts.net());
    info!("  Sampled frames: {}", summary.metrics.frames_sampled);
    info!("  Observations: {}", summary.metrics.observations);

    if summary.metrics.observations_skipped > 0 || summary.metrics.malformed_records > 0 {
        warn!(
            "  ⚠️  Skipped: {} observation(s), {} malformed record(s)",
            summary.metrics.observations_skipped, summary.metrics.malformed_records
        );
    }
    if summary.metrics.tracks_evicted > 0 {
        info!("  Idle tracks evicted: {}", summary.metrics.tracks_evicted);
    }
    info!("  Processing Speed: {:.1} FPS", summary.metrics.fps);
    info!("========================================");

    match serde_json::to_string(summary) {
        Ok(json) => info!("summary={}", json),
        Err(e) => warn!("Could not serialize run summary: {}", e),
    }
}
