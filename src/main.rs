use anyhow::{Context, Result};
use clap::Parser;
use pinpoint::{
    cli::{Cli, OutputFormat},
    config::PinpointConfig,
    csv_output::CsvOutput,
    engine,
    json_output::JsonOutput,
    text_output::TextOutput,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Collect every displayed record into a CSV formatter
fn csv_rows(report: &engine::SbflReport) -> CsvOutput {
    let mut csv = CsvOutput::new();
    for file in &report.files {
        csv.extend(&file.records);
    }
    csv
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = PinpointConfig::discover(args.config.as_deref(), Path::new("."))?.apply_cli(&args);
    tracing::debug!("Effective configuration: {:?}", config);

    // Both artifacts must open before anything is ranked or printed
    let report = engine::localize_files(&config.coverage, &config.outcomes)?;

    // An unwritable CSV target is fatal, so open it before printing anything
    let mut csv_sink = config
        .csv_out
        .as_deref()
        .map(CsvOutput::open_append)
        .transpose()?;

    let shown = report.select(config.select, &config.metrics);

    match config.format {
        OutputFormat::Text => {
            print!(
                "{}",
                TextOutput::new(&config.metrics, config.show_counts).render(&shown)
            );
        }
        OutputFormat::Json => {
            let json = JsonOutput::new(&shown, &config.metrics)
                .to_json()
                .context("Failed to serialize report")?;
            println!("{}", json);
        }
        OutputFormat::Csv => {
            print!("{}", csv_rows(&shown).to_csv());
        }
    }

    if let Some(sink) = csv_sink.as_mut() {
        csv_rows(&shown).write_to(sink)?;
    }

    Ok(())
}
