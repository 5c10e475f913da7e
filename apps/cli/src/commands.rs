//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use currichef_core::pipeline::{self, Progress, RunSummary};
use currichef_core::JsonTreeWriter;
use currichef_extract::HttpFetcher;
use currichef_media::YtDlpProvider;
use currichef_shared::{config_file_path, init_config, load_config, AppConfig};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// currichef — package a curriculum site into a publishable channel tree.
#[derive(Parser)]
#[command(
    name = "currichef",
    version,
    about = "Crawl a curriculum site and assemble its content tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Channel language: en or es.
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Download videos instead of recording them by reference.
    #[arg(long, global = true)]
    pub download_videos: bool,

    /// Working directory for archives, attachments, and tree files.
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enumerate the search index into the resource tree file.
    Crawl,

    /// Assemble crawled resources into the channel tree.
    Scrape,

    /// Crawl then scrape in one go.
    Run,

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize the config file with defaults.
    Init,
    /// Print the config file path.
    Path,
    /// Show the resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "currichef=info",
        1 => "currichef=debug",
        _ => "currichef=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Crawl => {
            let config = resolved_config(&cli)?;
            cmd_crawl(&config).await
        }
        Command::Scrape => {
            let config = resolved_config(&cli)?;
            cmd_scrape(&config).await
        }
        Command::Run => {
            let config = resolved_config(&cli)?;
            cmd_crawl(&config).await?;
            cmd_scrape(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Path => cmd_config_path(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Config file values with CLI flag overrides applied on top.
fn resolved_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(lang) = &cli.lang {
        config.channel.language = lang.clone();
    }
    if cli.download_videos {
        config.scrape.download_videos = true;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.scrape.data_dir = data_dir.clone();
    }
    Ok(config)
}

async fn cmd_crawl(config: &AppConfig) -> Result<()> {
    info!(base_url = %config.channel.base_url, "starting crawl stage");

    let progress = CliProgress::new();
    let path = pipeline::crawl(config, &JsonTreeWriter, &progress).await?;
    progress.finish();

    println!("Resource tree written to {}", path.display());
    Ok(())
}

async fn cmd_scrape(config: &AppConfig) -> Result<()> {
    info!(
        language = %config.channel.language,
        download_videos = config.scrape.download_videos,
        "starting scrape stage"
    );

    let fetcher = HttpFetcher::new(
        config.scrape.max_retries,
        Duration::from_secs(config.scrape.retry_delay_secs),
    )?;
    let videos = YtDlpProvider::new();

    let progress = CliProgress::new();
    let summary =
        pipeline::scrape(config, &fetcher, &videos, &JsonTreeWriter, &progress).await?;

    println!();
    println!("  Channel tree assembled!");
    println!("  Resources: {}", summary.resources);
    println!("  Assembled: {}", summary.assembled);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Tree:      {}", summary.tree_path.display());
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_path() -> Result<()> {
    println!("{}", config_file_path()?.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner-based progress reporting for interactive runs.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Progress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, current: usize, total: usize, title: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {title}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
