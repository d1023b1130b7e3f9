// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command-line front end for the crash notifier.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use loom_crash_notify::{
	LogDelivery, Notifier, NotifierConfig, NotifyError, ReportQueue, NOTIFIER_NAME,
	NOTIFIER_VERSION,
};
use loom_crash_report::CrashReport;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Render and deliver crash reports captured by the Loom collector.
#[derive(Parser, Debug)]
#[command(name = "loom-crash-notify", about = "Loom crash report notifier", version)]
struct Args {
	/// Notifier configuration file (TOML)
	#[arg(long, global = true, env = "LOOM_CRASH_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the payload a collector document would be sent as
	Render {
		/// Collector crash document (JSON)
		#[arg(long)]
		report: PathBuf,

		/// Pretty-print the payload
		#[arg(long)]
		pretty: bool,
	},
	/// Queue collector documents for delivery to the log sink
	Deliver {
		/// Collector crash documents (JSON)
		#[arg(long = "report", required = true)]
		reports: Vec<PathBuf>,
	},
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{NOTIFIER_NAME} {NOTIFIER_VERSION}");
		return Ok(());
	}

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let config = NotifierConfig::load(args.config.as_deref())?;
	let notifier = Arc::new(Notifier::new(config));

	match args.command {
		Command::Render { report, pretty } => render(&notifier, &report, pretty)?,
		Command::Deliver { reports } => deliver(notifier, &reports).await?,
		Command::Version => {}
	}

	Ok(())
}

fn render(notifier: &Notifier, path: &Path, pretty: bool) -> Result<(), NotifyError> {
	let report = read_report(notifier, path)?;
	let Some(payload) = notifier.prepare(&report) else {
		eprintln!(
			"report filtered: release stage {} is not in the notify list",
			report.release_stage().unwrap_or("(unset)")
		);
		return Ok(());
	};

	let body = if pretty {
		serde_json::to_string_pretty(&payload)?
	} else {
		serde_json::to_string(&payload)?
	};
	println!("{body}");
	Ok(())
}

async fn deliver(notifier: Arc<Notifier>, paths: &[PathBuf]) -> Result<(), NotifyError> {
	let queue = ReportQueue::spawn(notifier.clone(), Arc::new(LogDelivery));
	for path in paths {
		match read_report(&notifier, path) {
			Ok(report) => queue.enqueue(report).await?,
			Err(e) => {
				tracing::error!(path = %path.display(), error = %e, "skipping unreadable report");
			}
		}
	}
	let delivered = queue.shutdown().await?;
	tracing::info!(submitted = paths.len(), delivered, "delivery finished");
	Ok(())
}

fn read_report(notifier: &Notifier, path: &Path) -> Result<CrashReport, NotifyError> {
	let contents = std::fs::read_to_string(path)?;
	let raw: Value = serde_json::from_str(&contents)?;
	notifier.load_report(&raw)
}
