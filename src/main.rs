//! resize-images CLI - resize every JPEG in a directory to a list of sizes
//!
//! Configuration problems (missing source directory, bad size list, nothing
//! to resize) exit with status 1 before any image is touched. Once resizing
//! starts the process exits 0, however many individual files fail; failures
//! show up in the log.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tokio::sync::watch;
use tracing::{debug, warn};

use resize_images::{
    discover_sources, init_logging, parse_sizes, prepare_destination, validate_directory,
    BatchSummary, Config, Pipeline,
};

/// Conventional status for termination by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// resize-images - concurrent batch JPEG resizer
#[derive(Parser)]
#[command(
    name = "resize-images",
    version,
    about = "Resize all the JPEGs in a directory to a list of sizes",
    long_about = "Resizes every .jpg in the source directory so it fits inside each requested \
                  square, writing <name>_<size>.jpg into the destination directory. Sources and \
                  sizes are processed concurrently on a bounded worker pool."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory of original images
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    from: PathBuf,

    /// Directory to store resized images (created if missing)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    to: PathBuf,

    /// Comma-separated list of sizes, e.g. 64,256,1024
    #[arg(short, long, value_name = "LIST", allow_hyphen_values = true)]
    sizes: Option<String>,

    /// Worker pool size (default: one per CPU)
    #[arg(short = 'j', long, value_name = "COUNT")]
    threads: Option<usize>,

    /// JPEG output quality (1-100)
    #[arg(short, long, value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the batch summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "resize-images.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

/// First interrupt cancels pending work and waits for in-flight tasks.
/// Returns `true` once a second interrupt arrives.
async fn escalate_interrupts<F, Fut>(mut next_interrupt: F, cancel: watch::Sender<bool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("Interrupted; waiting for in-flight work to finish (press Ctrl-C again to abort)");
    if cancel.send(true).is_err() {
        debug!("Pipeline already finished; nothing to cancel");
    }

    next_interrupt().await.is_ok()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(command) = &cli.command {
        if let Err(e) = handle_subcommand(command) {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    };

    init_logging(&config.logging);

    match run(&cli, &config).await {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to serialize summary: {}", e),
                }
            }
        }
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    }
}

/// Handle subcommands
fn handle_subcommand(command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::ExampleConfig { output, yaml } => generate_example_config(output, *yaml),
    }
}

/// Load the config file, if any, then apply command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("can't load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if cli.threads.is_some() {
        config.processing.threads = cli.threads;
    }
    if let Some(quality) = cli.quality {
        config.processing.quality = quality;
    }
    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

/// Validate inputs in order, then run the pipeline.
///
/// Sizes are parsed before the destination is created so a bad list leaves
/// nothing behind.
async fn run(cli: &Cli, config: &Config) -> anyhow::Result<BatchSummary> {
    validate_directory(&cli.from, true).await?;
    validate_directory(&cli.to, false).await?;

    let sizes = parse_sizes(cli.sizes.as_deref().unwrap_or(""))
        .context("can't parse sizes")?
        .non_empty()?;

    prepare_destination(&cli.to).await?;

    let sources = discover_sources(&cli.from)
        .await
        .context("can't get image filenames")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if escalate_interrupts(tokio::signal::ctrl_c, cancel_tx).await {
            eprintln!("{}: interrupted twice, aborting", style("Error").red().bold());
            process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let pipeline = Pipeline::new(&cli.to, sizes, &config.processing).with_cancellation(cancel_rx);
    Ok(pipeline.run(sources).await)
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> anyhow::Result<()> {
    let output_path = if use_yaml {
        output_path.with_extension("yaml")
    } else {
        output_path.to_path_buf()
    };

    Config::default().to_file(&output_path)?;

    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        if use_yaml { "YAML" } else { "TOML" },
        output_path.display()
    );

    Ok(())
}
