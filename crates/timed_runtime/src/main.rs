//! Timed Runtime
//!
//! Minimal binary that instruments a demo type, drives it and prints the
//! per-operation timing report.
//!
//! Set `TIMED_SETTINGS` to a JSON settings file to change report layout or
//! the private-operation prefix.

mod pipeline;

use anyhow::{Context, Result};
use serde_json::json;
use timed_core::{Instrumenter, Settings};
use timed_metrics::{format_duration, Timer};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Timed v{}", timed_core::VERSION);
    let settings = match std::env::var_os("TIMED_SETTINGS") {
        Some(path) => Settings::load(&path).context("loading settings")?,
        None => Settings::default(),
    };

    let pipeline = Instrumenter::with_settings(settings.instrument.clone())
        .instrument(pipeline::definition())
        .context("instrumenting pipeline")?;
    let mut instance = pipeline.instantiate(&[])?;

    let run = Timer::new();
    {
        let _main = run.scope()?;
        instance.call("load", &[json!(100_000)])?;
        for factor in [2.0, 0.5, 3.0] {
            instance.call("transform", &[json!(factor)])?;
        }
        let summary = instance.call("summarize", &[])?;
        tracing::info!(%summary, "pipeline finished");
    }
    tracing::info!(wall = %format_duration(run.elapsed()), "run complete");

    if let Err(err) = instance.call("load", &[json!("many")]) {
        tracing::warn!(error = %err, "rejected load");
    }

    println!("{}", instance.timer().report_with(&settings.report));
    Ok(())
}
