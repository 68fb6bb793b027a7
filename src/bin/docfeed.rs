// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use docfeed::{
    config::{FeedConfig, TimestampKind, CONFIG_FILE_NAME},
    SyncOptions, SyncReport, Synchronizer,
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "docfeed [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file [default: ./docfeed.toml if present].
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Log debug information.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Sync(opts) => run_sync(self.config, opts),
            Command::Status(opts) => run_status(self.config, opts),
            Command::Init(opts) => run_init(self.config, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Synchronize feed with documentation directory.
    #[command(override_usage = "docfeed sync [options]")]
    Sync(SyncArgs),

    /// Show pending feed changes without writing anything.
    #[command(override_usage = "docfeed status [options]")]
    Status(OverrideArgs),

    /// Write default configuration file.
    #[command(override_usage = "docfeed init [options]")]
    Init(InitArgs),
}

#[derive(Args, Clone, Debug)]
struct OverrideArgs {
    /// Documentation directory to scan.
    #[arg(short, long, value_name = "path")]
    pub docs_dir: Option<PathBuf>,

    /// Feed document to maintain.
    #[arg(short, long, value_name = "path")]
    pub feed: Option<PathBuf>,

    /// Base address of entry links.
    #[arg(short, long, value_name = "url")]
    pub base_url: Option<String>,

    /// Source of publication instants.
    #[arg(short, long, value_name = "kind")]
    pub timestamps: Option<TimestampKind>,
}

impl OverrideArgs {
    fn apply(self, config: &mut FeedConfig) {
        if let Some(docs_dir) = self.docs_dir {
            config.docs_dir = docs_dir;
        }
        if let Some(feed) = self.feed {
            config.feed_file = Some(feed);
        }
        if let Some(base_url) = self.base_url {
            config.channel.link = base_url;
        }
        if let Some(timestamps) = self.timestamps {
            config.timestamps = timestamps;
        }
    }
}

#[derive(Args, Clone, Debug)]
struct SyncArgs {
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Write feed even if nothing changed.
    #[arg(long)]
    pub force: bool,

    /// Report changes without writing feed.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args, Clone, Debug)]
struct InitArgs {
    /// Overwrite existing configuration file.
    #[arg(long)]
    pub force: bool,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn load_config(path: Option<PathBuf>) -> Result<FeedConfig> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (PathBuf::from(CONFIG_FILE_NAME), false),
    };

    if !required && !path.exists() {
        info!("no {CONFIG_FILE_NAME} found, using defaults");
        return Ok(FeedConfig::default());
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {:?}", path.display()))?;
    data.parse::<FeedConfig>()
        .with_context(|| format!("failed to parse config at {:?}", path.display()))
}

fn run_sync(config: Option<PathBuf>, opts: SyncArgs) -> Result<()> {
    let mut config = load_config(config)?;
    opts.overrides.apply(&mut config);

    let options = SyncOptions {
        force: opts.force,
        dry_run: opts.dry_run,
    };
    let report = Synchronizer::from_config(config).run(options, Utc::now())?;
    print_summary(&report);

    Ok(())
}

fn run_status(config: Option<PathBuf>, opts: OverrideArgs) -> Result<()> {
    let mut config = load_config(config)?;
    opts.apply(&mut config);

    let options = SyncOptions {
        force: false,
        dry_run: true,
    };
    let report = Synchronizer::from_config(config).run(options, Utc::now())?;

    for (label, links) in [
        ("new", &report.merge.added),
        ("updated", &report.merge.updated),
        ("retitled", &report.merge.retitled),
        ("removed", &report.merge.removed),
    ] {
        for link in links {
            println!("{label:>9}  {link}");
        }
    }
    print_summary(&report);

    Ok(())
}

fn run_init(config: Option<PathBuf>, opts: InitArgs) -> Result<()> {
    let path = config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if path.exists() && !opts.force {
        bail!("{:?} already exists, use --force to overwrite", path.display());
    }

    fs::write(&path, FeedConfig::default().to_string())
        .with_context(|| format!("failed to write config at {:?}", path.display()))?;
    info!("wrote default configuration to {:?}", path.display());

    Ok(())
}

fn print_summary(report: &SyncReport) {
    let merge = &report.merge;
    let counts = format!(
        "{} documents, {} new, {} updated, {} removed, {} unchanged",
        report.discovered,
        merge.added.len(),
        merge.updated.len() + merge.retitled.len(),
        merge.removed.len(),
        merge.unchanged,
    );

    if report.written {
        println!("feed written to {}: {counts}", report.feed_path.display());
    } else if report.changed() {
        println!("feed not written (dry run): {counts}");
    } else {
        println!("feed up to date: {counts}");
    }
}
