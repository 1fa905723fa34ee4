//! spirewatchd — the spirewatch dashboard daemon.
//!
//! Assembles the data source, state store and refresh scheduler, then
//! either keeps a live dashboard on the terminal or prints a single
//! report:
//! - `watch` re-renders on every store update and takes console commands
//! - `once` refreshes every category once and prints text, JSON or
//!   Prometheus output
//!
//! # Usage
//!
//! ```text
//! spirewatchd --config spirewatch.toml watch --interval 15
//! spirewatchd once --source directory --dir /var/lib/spirewatch/data --format json
//! ```

mod console;
mod render;
mod source;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use spirewatch_core::config::{DEFAULT_FETCH_TIMEOUT_SECS, SourceKind};
use spirewatch_core::{Category, Settings, SpirewatchConfig};
use spirewatch_metrics::{derive, render_prometheus};
use spirewatch_scheduler::{ConfigManager, RefreshScheduler, SchedulerHandle, SchedulerOptions};
use spirewatch_source::DataSource;
use spirewatch_state::{StateStore, StateView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleCommand;
use crate::source::ConfiguredSource;

const DEFAULT_LOG_FILTER: &str = "info,spirewatchd=debug,spirewatch_scheduler=debug";

#[derive(Parser)]
#[command(name = "spirewatchd", about = "Workload identity control-plane dashboard")]
struct Cli {
    /// Path to spirewatch.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep a live dashboard on the terminal.
    Watch(RunArgs),
    /// Refresh every category once, print a report and exit.
    Once {
        #[command(flatten)]
        run: RunArgs,

        /// Report format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Overrides for values from the config file.
#[derive(Args)]
struct RunArgs {
    /// Refresh interval in seconds (invalid values fall back to 30).
    #[arg(long)]
    interval: Option<String>,

    /// Cluster context of the identity server.
    #[arg(long)]
    server_context: Option<String>,

    /// Cluster context of the workloads.
    #[arg(long)]
    workload_context: Option<String>,

    /// Where status data comes from.
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Data directory for the directory source.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Upper bound on a single fetch, in seconds.
    #[arg(long)]
    fetch_timeout: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Fixture,
    Directory,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Prometheus,
}

/// Everything a run needs, resolved from file and flags.
struct App {
    settings: Settings,
    source: ConfiguredSource,
    options: SchedulerOptions,
    workloads_per_agent: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = match cli.config {
        Some(ref path) => SpirewatchConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SpirewatchConfig::default(),
    };

    match cli.command {
        Command::Watch(run) => run_watch(resolve(config, &run)?).await,
        Command::Once { run, format } => run_once(resolve(config, &run)?, format).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Logs go to stderr; stdout carries the dashboard and reports.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn resolve(mut config: SpirewatchConfig, args: &RunArgs) -> anyhow::Result<App> {
    if let Some(source) = args.source {
        config.source.kind = match source {
            SourceArg::Fixture => SourceKind::Fixture,
            SourceArg::Directory => SourceKind::Directory,
        };
    }
    if let Some(ref dir) = args.dir {
        config.source.dir = Some(dir.clone());
    }
    if let Some(secs) = args.fetch_timeout {
        config.source.fetch_timeout_secs = secs;
    }

    let mut settings = config.settings();
    if let Some(ref interval) = args.interval {
        settings = settings.with_refresh_interval(Settings::refresh_interval_or_default(interval));
    }
    if args.server_context.is_some() || args.workload_context.is_some() {
        let server = args
            .server_context
            .as_deref()
            .unwrap_or(settings.server_context());
        let workload = args
            .workload_context
            .as_deref()
            .unwrap_or(settings.workload_context());
        settings = settings.with_contexts(server, workload);
    }

    let mut options = SchedulerOptions::default()
        .with_shutdown_grace(Duration::from_secs(config.shutdown.grace_period_secs));
    match config.source.fetch_timeout_secs {
        0 => warn!(
            default_secs = DEFAULT_FETCH_TIMEOUT_SECS,
            "fetch timeout must be positive, using default"
        ),
        secs => options = options.with_fetch_timeout(Duration::from_secs(secs)),
    }

    Ok(App {
        settings,
        source: ConfiguredSource::from_config(&config.source)?,
        options,
        workloads_per_agent: config.metrics.workloads_per_agent,
    })
}

async fn run_watch(app: App) -> anyhow::Result<()> {
    let store = StateStore::new();
    let config = ConfigManager::new(app.settings);
    info!(
        source = %app.source.describe(),
        interval_secs = config.current().refresh_interval_secs(),
        "spirewatch dashboard starting"
    );
    let mut revisions = store.subscribe();
    let handle = RefreshScheduler::new(app.source, store.clone(), &config)
        .with_options(app.options)
        .start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", console::HELP);

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = store.get();
                let metrics = derive(&view, app.workloads_per_agent);
                println!("{}", render::dashboard(&view, &config.current(), &metrics));
            }

            line = lines.next_line() => match line {
                Ok(Some(line)) => match console::parse(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => apply(command, &handle, &config)?,
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                },
                Ok(None) => {
                    info!("console input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read console input");
                    break;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    let state = handle.shutdown().await;
    info!(?state, "spirewatch dashboard stopped");
    Ok(())
}

fn apply(
    command: ConsoleCommand,
    handle: &SchedulerHandle,
    config: &ConfigManager,
) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::Refresh(Some(category)) => handle.refresh(category)?,
        ConsoleCommand::Refresh(None) => handle.refresh_all()?,
        ConsoleCommand::Interval(text) => {
            config.set_refresh_interval(Settings::refresh_interval_or_default(&text));
            println!("refresh interval: {}s", config.current().refresh_interval_secs());
        }
        ConsoleCommand::Contexts { server, workload } => {
            config.set_contexts(&server, &workload);
            println!("contexts: server {server}, workload {workload}");
        }
        ConsoleCommand::Help => println!("{}", console::HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

async fn run_once(app: App, format: OutputFormat) -> anyhow::Result<()> {
    let App {
        settings,
        source,
        options,
        workloads_per_agent,
    } = app;
    let deadline = options.fetch_timeout + options.shutdown_grace;
    info!(source = %source.describe(), "refreshing every category once");

    let view = refresh_once(source, &settings, options, deadline).await?;
    print!("{}", report(format, &view, &settings, workloads_per_agent)?);
    Ok(())
}

/// Run one refresh cycle and wait up to `deadline` for every category to
/// report. Categories still in flight at the deadline stay unloaded.
async fn refresh_once<S: DataSource>(
    source: S,
    settings: &Settings,
    options: SchedulerOptions,
    deadline: Duration,
) -> anyhow::Result<StateView> {
    let store = StateStore::new();
    let config = ConfigManager::new(settings.clone());
    let mut revisions = store.subscribe();
    let handle = RefreshScheduler::new(source, store.clone(), &config)
        .with_options(options)
        .start()?;

    let reported = async {
        while !all_reported(&store.get()) {
            if revisions.changed().await.is_err() {
                break;
            }
        }
    };
    if tokio::time::timeout(deadline, reported).await.is_err() {
        warn!(
            deadline_secs = deadline.as_secs(),
            "not every category reported in time"
        );
    }
    handle.shutdown().await;

    Ok(store.get())
}

fn all_reported(view: &StateView) -> bool {
    Category::ALL.iter().all(|c| view.has_reported(*c))
}

fn report(
    format: OutputFormat,
    view: &StateView,
    settings: &Settings,
    workloads_per_agent: u32,
) -> anyhow::Result<String> {
    let metrics = derive(view, workloads_per_agent);
    Ok(match format {
        OutputFormat::Text => render::dashboard(view, settings, &metrics),
        OutputFormat::Json => render::json(view, settings, &metrics)?,
        OutputFormat::Prometheus => render_prometheus(&metrics, view),
    })
}
