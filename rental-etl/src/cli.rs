/// # rental-etl CLI Interface (Module)
///
/// This module implements the CLI for rental-etl: command parsing, sink construction, and the
/// user-visible run summaries.
///
/// All cleaning, mapping and load logic lives in the [`rental-etl-core`] crate. This module is
/// strictly CLI glue.
///
/// ## Commands
/// - `clean`: raw export → canonical file
/// - `load`: canonical file → destination collection (replace semantics)
/// - `run`: `clean` then `load`
///
/// For programmatic/integration use, call [`run`] with a constructed [`Cli`].
///
/// [`rental-etl-core`]: ../../rental_etl_core/
use crate::load_config::{load_config, CliConfig, SinkKind};
use crate::mongo::{MongoSettings, MongoSink};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rental_etl_core::clean::CleanReport;
use rental_etl_core::contract::DocumentSink;
use rental_etl_core::load::LoadReport;
use rental_etl_core::memory_sink::MemorySink;
use rental_etl_core::pipeline::{clean_stage, load_stage};
use std::path::PathBuf;

/// CLI for rental-etl: clean rental listing exports and load them into a document store.
#[derive(Parser)]
#[clap(
    name = "rental-etl",
    version,
    about = "Clean rental listing CSV exports and load them into MongoDB"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the raw export into the canonical CSV file
    Clean {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Replace the destination collection with the canonical file's listings
    Load {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Clean, then load
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Clean { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "clean", "Starting clean stage");
            let report = clean(&config)?;
            print_clean_report(&report);
        }
        Commands::Load { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "load", "Starting load stage");
            let sink = build_sink(&config).await?;
            let report = load(&config, sink.as_ref()).await?;
            print_load_report(&report, sink.as_ref()).await;
        }
        Commands::Run { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "run", "Starting full run");
            let sink = build_sink(&config).await?;
            let clean_report = clean(&config)?;
            print_clean_report(&clean_report);
            let load_report = load(&config, sink.as_ref()).await?;
            print_load_report(&load_report, sink.as_ref()).await;
        }
    }

    tracing::info!("CLI command finished");
    Ok(())
}

fn clean(config: &CliConfig) -> Result<CleanReport> {
    clean_stage(&config.clean.raw_path, &config.clean.canonical_path).map_err(|e| {
        tracing::error!(command = "clean", error = %e, "Clean stage failed");
        anyhow::Error::new(e).context("Clean stage failed")
    })
}

async fn load(config: &CliConfig, sink: &dyn DocumentSink) -> Result<LoadReport> {
    load_stage(&config.clean.canonical_path, sink, &config.load.policy)
        .await
        .map_err(|e| {
            tracing::error!(command = "load", error = %e, "Load stage failed");
            anyhow::Error::new(e).context("Load stage failed")
        })
}

async fn build_sink(config: &CliConfig) -> Result<Box<dyn DocumentSink>> {
    match config.load.sink {
        SinkKind::Memory => {
            tracing::warn!("Using in-memory sink; loaded documents are discarded on exit");
            Ok(Box::new(MemorySink::new()))
        }
        SinkKind::Mongo => {
            let settings = MongoSettings::from_env()?;
            let sink = MongoSink::connect(&settings, &config.load.database, config.load.timeout())
                .await
                .context("Failed to set up MongoDB sink")?;
            Ok(Box::new(sink))
        }
    }
}

fn print_clean_report(report: &CleanReport) {
    println!(
        "Clean report: attempted={} cleaned={} rejected={}",
        report.attempted,
        report.cleaned,
        report.rejected.len()
    );
    for rejection in &report.rejected {
        println!("  rejected {rejection}");
    }
    for (field, count) in &report.defaulted {
        println!("  defaulted {field}: {count}");
    }
}

async fn print_load_report(report: &LoadReport, sink: &dyn DocumentSink) {
    println!(
        "Load report: collection={} strategy={:?} attempted={} inserted={} failed={} cleared={}",
        report.collection,
        report.strategy,
        report.attempted,
        report.inserted,
        report.failures.len(),
        report.cleared
    );
    for failure in &report.failures {
        match failure.id {
            Some(id) => println!("  not inserted id={id}: {}", failure.reason),
            None => println!("  not inserted (no id): {}", failure.reason),
        }
    }
    match sink.count_documents(&report.collection).await {
        Ok(count) => println!("Collection '{}' now holds {count} documents", report.collection),
        Err(e) => tracing::warn!(error = %e, "Could not count documents after load"),
    }
}
