use anyhow::{Context, Result};
use std::{env, fs, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use zipfips::{sink, HttpFetcher, PeriodStatus, Pipeline, PipelineConfig};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::var_os("ZIPFIPS_CONFIG").map(PathBuf::from));
    let config = match &config_path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    // ─── 3) wire fetcher + sink ──────────────────────────────────────
    let fetcher = HttpFetcher::new(
        config.request_timeout(),
        config.max_retries,
        config.retry_backoff(),
    )?;
    let output = config.output_path();
    let sink = sink::for_format(config.output_format, &output);

    // ─── 4) run ──────────────────────────────────────────────────────
    let mut pipeline = Pipeline::new(config, fetcher, sink);
    let summary = match pipeline.run() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "run failed");
            return Err(e).context("pipeline aborted");
        }
    };

    for outcome in &summary.periods {
        if let PeriodStatus::Skipped { reason } = &outcome.status {
            println!("skipped {}: {}", outcome.period, reason);
        }
    }
    println!(
        "periods: {} succeeded, {} skipped; {} records → {}",
        summary.succeeded(),
        summary.skipped(),
        summary.records,
        output.display()
    );
    Ok(())
}
