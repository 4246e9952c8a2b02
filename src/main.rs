use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use seedsweep::balance::HttpOracle;
use seedsweep::config::Config;
use seedsweep::pipeline;
use seedsweep::sampler::PhraseSampler;
use seedsweep::sink::ResultSink;
use seedsweep::stats::Statistics;
use seedsweep::wallet::AddressDeriver;
use seedsweep::wordlist::Wordlist;

/// Concurrent mnemonic sweep: sample phrases, derive addresses, check balances
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Worker pool size (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose)?;

    if args.init_config {
        Config::save_default(&args.config)?;
        info!("Wrote default configuration to {}", args.config);
        return Ok(());
    }

    // Load configuration
    let mut config = Config::load(&args.config)?;
    info!("Configuration loaded from: {}", args.config);

    // Override worker count if specified
    if let Some(workers) = args.workers {
        config.pipeline.workers = workers;
        config.validate()?;
    }

    // Load the vocabulary; refuses to start when undersized
    let wordlist = Arc::new(Wordlist::load(&config.wordlist.path)?);

    // Initialize components
    let sampler = PhraseSampler::new(wordlist);
    let deriver = Arc::new(AddressDeriver::new());
    let oracle = Arc::new(HttpOracle::new(&config.oracle)?);
    let sink = Arc::new(ResultSink::new(&config.output.results));
    let stats = Arc::new(Statistics::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Ctrl-C stops the sampler; workers finish their in-flight lookups
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested, draining workers...");
        let _ = shutdown_tx.send(true);
    });

    let reporter = spawn_reporter(stats.clone(), shutdown_rx.clone());

    info!(
        "Starting sweep: {} workers against {}",
        config.pipeline.workers, config.oracle.endpoint
    );

    pipeline::run(
        sampler,
        deriver,
        oracle,
        sink.clone(),
        stats.clone(),
        config.pipeline.clone(),
        shutdown_rx,
    )
    .await;

    reporter.abort();
    let _ = reporter.await;

    // Final statistics
    info!("═══════════════════════════════════════════════");
    info!("FINAL STATISTICS:");
    info!("Checked: {}", stats.checked());
    info!("Matches: {}", stats.matched());
    info!("Oracle misses: {}", stats.oracle_misses());
    info!("Derive failures: {}", stats.derive_failures());
    info!("Rate: {:.2} phrase/s", stats.rate());
    info!("Elapsed: {:.2}s", stats.elapsed());
    info!("Results: {}", sink.path().display());
    info!("═══════════════════════════════════════════════");

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(())
}

fn spawn_reporter(
    stats: Arc<Statistics>,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    spinner.set_message(format!(
                        "checked {} | matches {} | {:.1} phrase/s",
                        stats.checked(),
                        stats.matched(),
                        stats.rate(),
                    ));
                }
                _ = shutdown.changed() => break,
            }
        }
        spinner.finish_and_clear();
    })
}
