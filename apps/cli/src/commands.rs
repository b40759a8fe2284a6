//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use devlog_core::analytics::{AnalyticsRenderer, AssetDirectoryRenderer, NoAnalytics};
use devlog_core::generator::SectionGenerator;
use devlog_core::tags::normalize_tags;
use devlog_core::{
    BatchReport, GenerationClient, OpenAiCompatibleBackend, Pipeline, ProgressReporter,
    RetryPolicy,
};
use devlog_github::{GitHubClient, GitHubOptions};
use devlog_shared::{
    AppConfig, GenerationSettings, PublishSettings, init_config, load_config, load_config_from,
};
use devlog_storage::{FsArtifactStore, TagStore};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// devlog: write development-log articles from your GitHub activity.
#[derive(Parser)]
#[command(
    name = "devlog",
    version,
    about = "Generate Markdown development-log articles for recently pushed GitHub repositories.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.devlog/devlog.toml.
    #[arg(long, global = true, env = "DEVLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Generate articles for the configured account.
    Run(RunArgs),

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Tag utilities.
    Tags {
        #[command(subcommand)]
        action: TagsAction,
    },
}

/// Overrides for a single batch run.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// GitHub account whose repositories are listed.
    #[arg(short, long)]
    pub username: Option<String>,

    /// Directory articles are written to.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Freshness window in days.
    #[arg(short, long)]
    pub days: Option<i64>,

    /// Maximum number of repositories considered.
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Tag subcommands.
#[derive(Subcommand)]
pub(crate) enum TagsAction {
    /// Print the normalized form of each tag.
    Normalize {
        #[arg(required = true)]
        tags: Vec<String>,

        /// Also merge the result into the configured tag file.
        #[arg(long)]
        save: bool,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "devlog=info",
        1 => "devlog=debug",
        _ => "devlog=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => {
            let mut config = resolve_config(cli.config.as_ref())?;
            apply_overrides(&mut config, &args);
            cmd_run(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&resolve_config(cli.config.as_ref())?),
        },
        Command::Tags { action } => match action {
            TagsAction::Normalize { tags, save } => {
                let config = resolve_config(cli.config.as_ref())?;
                cmd_tags_normalize(&config, &tags, save).await
            }
        },
    }
}

fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Command-line flags win over the config file.
pub(crate) fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(username) = &args.username {
        config.defaults.username = username.clone();
    }
    if let Some(out) = &args.out {
        config.defaults.output_dir = out.to_string_lossy().into_owned();
    }
    if let Some(days) = args.days {
        config.defaults.days_threshold = days;
    }
    if let Some(limit) = args.limit {
        config.defaults.max_repositories = limit;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    let generation = GenerationSettings::from(config);
    let publish = PublishSettings::from(config);

    let backend = OpenAiCompatibleBackend::from_env(&generation)?;
    let client = GenerationClient::new(Arc::new(backend), RetryPolicy::from(&generation));
    let generator = SectionGenerator::new(client);

    let mut github = GitHubOptions::new(&config.github.api_url, &publish.username);
    github.token = std::env::var(&config.github.token_env)
        .ok()
        .filter(|t| !t.is_empty());
    github.max_repositories = publish.max_repositories;
    let source = GitHubClient::new(github)?;

    let artifacts = FsArtifactStore::new(&publish.output_dir);
    let tags = TagStore::new(&publish.tag_file_path);

    let renderer: Arc<dyn AnalyticsRenderer> = if config.analytics.assets_save_folder.is_empty() {
        Arc::new(NoAnalytics)
    } else {
        Arc::new(AssetDirectoryRenderer::new(
            &config.analytics.assets_save_folder,
            &config.analytics.assets_read_folder,
        ))
    };
    let checkout_root = config.analytics.checkout_root.as_ref().map(PathBuf::from);

    info!(
        username = %publish.username,
        out = %publish.output_dir.display(),
        days = publish.days_threshold,
        limit = publish.max_repositories,
        model = %generation.model,
        "starting run"
    );

    let pipeline = Pipeline::new(
        Arc::new(source),
        generator,
        Arc::new(artifacts),
        Arc::new(tags),
        &publish,
    )
    .with_analytics(renderer, checkout_root);

    let reporter = CliProgress::new()?;
    let report = pipeline.run(Utc::now(), &reporter).await?;

    print_summary(&report);
    if report.processed.is_empty() && !report.failed.is_empty() {
        return Err(eyre!("every accepted repository failed"));
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("  Run complete!");
    println!("  Written:  {}", report.processed.len());
    for (name, path) in &report.processed {
        println!("    {name} -> {}", path.display());
    }
    println!("  Skipped:  {}", report.skipped.len());
    for (name, reason) in &report.skipped {
        println!("    {name} ({reason})");
    }
    println!("  Failed:   {}", report.failed.len());
    for (name, error) in &report.failed {
        println!("    {name}: {error}");
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

async fn cmd_tags_normalize(config: &AppConfig, raw: &[String], save: bool) -> Result<()> {
    let normalized = normalize_tags(raw);
    for tag in &normalized {
        println!("{tag}");
    }

    if save {
        let publish = PublishSettings::from(config);
        let store = TagStore::new(&publish.tag_file_path);
        let merged = store.merge(&normalized).await?;
        info!(path = %store.path().display(), total = merged.len(), "tags saved");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner that follows the pipeline's progress callbacks.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn repository(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {name}"));
    }

    fn done(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}
