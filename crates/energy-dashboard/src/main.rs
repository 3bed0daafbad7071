mod bootstrap;

use anyhow::{Context, Result};
use dashboard_core::settings::Settings;
use dashboard_report::charts::ChartDataWriter;
use dashboard_runtime::pipeline::{Pipeline, PipelineConfig, Stage};

fn main() -> Result<()> {
    let settings = Settings::load().context("loading settings")?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Energy Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data: {}, Output: {}, Timezone: {}",
        settings.data_dir.display(),
        settings.output_dir.display(),
        settings.timezone
    );

    let config = PipelineConfig::from_settings(&settings)?;
    let renderer = ChartDataWriter::in_dir(&config.output_dir);
    let pipeline = Pipeline::new(config);

    let outcome = pipeline
        .run_with_progress(&renderer, |stage| match stage {
            Stage::Loading => println!("Loading data..."),
            Stage::Aggregating => println!("Generating aggregation..."),
            Stage::Exporting => println!("Exporting results..."),
        })
        .context("No valid dataset found. Check logs")?;

    for skipped in &outcome.build.skipped {
        println!("Skipped {}: {}", skipped.source_id, skipped.reason);
    }

    println!();
    println!(
        "Loaded {} readings from {} of {} file(s)",
        outcome.metadata.readings, outcome.metadata.files_loaded, outcome.metadata.files_considered
    );
    println!(
        "Finished in {:.2}s (load {:.2}s, aggregate {:.2}s, export {:.2}s)",
        outcome.metadata.total_time_seconds(),
        outcome.metadata.load_time_seconds,
        outcome.metadata.aggregate_time_seconds,
        outcome.metadata.export_time_seconds
    );
    println!("Generated files:");
    for artifact in outcome.export.succeeded() {
        println!("- {}", artifact.artifact);
    }

    let failed: Vec<_> = outcome.export.failed().collect();
    if !failed.is_empty() {
        eprintln!("Some artifacts could not be written:");
        for artifact in &failed {
            if let Err(e) = &artifact.result {
                eprintln!("- {}", e);
            }
        }
    }

    Ok(())
}
