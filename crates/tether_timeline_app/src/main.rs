// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tether Timeline playback service.
//!
//! A headless process that plays timelines and streams their evaluated
//! output:
//! - Snapshots on stdout (or a file), one line per emission
//! - Control commands on stdin, one JSON object per line
//! - Structural state from a file, re-applied when it changes
//!
//! Logs go to stderr so they never mix with the output stream.

mod control;
mod error;
mod file_watcher;
mod service;
mod settings;
mod sink;

use clap::Parser;
use error::ServiceResult;
use service::Service;
use settings::ServiceSettings;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Timeline state file (JSON or RON), overrides the settings
    #[arg(long)]
    state: Option<PathBuf>,

    /// Timeline to start playing on boot, overrides the settings
    #[arg(long)]
    autoplay: Option<String>,

    /// Write the effective settings to this file and exit
    #[arg(long)]
    save_settings: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn settings(&self) -> ServiceResult<ServiceSettings> {
        let mut settings = match &self.settings {
            Some(path) => ServiceSettings::load(path)?,
            None => ServiceSettings::default(),
        };
        if let Some(state) = &self.state {
            settings.state_file = Some(state.clone());
        }
        if let Some(name) = &self.autoplay {
            settings.autoplay = Some(name.clone());
        }
        Ok(settings)
    }
}

/// Build the log filter: `RUST_LOG` first, then per-crate defaults
fn env_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut filter = EnvFilter::from_default_env();
    for directive in [
        format!("tether_timeline_app={level}"),
        format!("tether_timeline_core={level}"),
    ] {
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Invalid log directive '{directive}': {e}"),
        }
    }
    filter
}

fn run(args: &Args) -> ServiceResult<()> {
    let settings = args.settings()?;
    if let Some(path) = &args.save_settings {
        settings.save(path)?;
        tracing::info!("Settings written to {}", path.display());
        return Ok(());
    }

    let sink = sink::open(&settings.output)?;
    let service = Service::new(&settings, sink)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(service::run(service, &settings))
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(env_filter(args.verbose))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Tether Timeline v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        tracing::error!("Service failed: {e}");
        std::process::exit(1);
    }
}
