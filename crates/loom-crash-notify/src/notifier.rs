// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload assembly for the delivery pipeline.

use std::fmt;

use loom_crash_report::{CrashReport, MetadataStore, Severity};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::NotifierConfig;
use crate::error::Result;

/// Notifier name sent with every payload.
pub const NOTIFIER_NAME: &str = "loom-crash-notify";
/// Notifier version sent with every payload.
pub const NOTIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NOTIFIER_URL: &str = "https://github.com/ghuntley/loom";

/// Builds reports with configured defaults and turns them into payloads.
#[derive(Clone)]
pub struct Notifier {
	config: NotifierConfig,
	top_level: Map<String, Value>,
}

impl fmt::Debug for Notifier {
	// top-level data carries the API key
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Notifier").field("config", &self.config).finish_non_exhaustive()
	}
}

impl Notifier {
	pub fn new(config: NotifierConfig) -> Self {
		let top_level = build_top_level(&config);
		info!(
			release_stage = config.release_stage.as_deref().unwrap_or("unset"),
			notify_release_stages = ?config.notify_release_stages,
			"crash notifier initialized"
		);
		Self { config, top_level }
	}

	pub fn config(&self) -> &NotifierConfig {
		&self.config
	}

	/// Ambient data placed underneath every serialized report.
	pub fn top_level_data(&self) -> &Map<String, Value> {
		&self.top_level
	}

	/// Create a report carrying the configured release stages and metadata.
	pub fn report(
		&self,
		error_class: impl Into<String>,
		error_message: impl Into<String>,
		metadata: MetadataStore,
		severity: Severity,
	) -> CrashReport {
		CrashReport::new(
			error_class,
			error_message,
			&self.config.report_defaults(),
			metadata,
			severity,
		)
	}

	/// Parse a collector document, filling release stages the document
	/// leaves unset from configuration. Configured metadata sits underneath
	/// the document's own tabs.
	pub fn load_report(&self, raw: &Value) -> Result<CrashReport> {
		let mut report = CrashReport::from_collector(raw)?;
		if report.release_stage().is_none() {
			report.set_release_stage(self.config.release_stage.clone());
		}
		if report.notify_release_stages().is_none() && !self.config.notify_release_stages.is_empty() {
			report.set_notify_release_stages(Some(self.config.notify_release_stages.clone()));
		}
		if !self.config.metadata.is_empty() {
			let mut metadata = self.config.metadata.clone();
			metadata.merge(report.metadata());
			report.set_metadata(metadata);
		}
		debug!(
			error_class = report.error_class(),
			severity = %report.severity(),
			"loaded report from collector document"
		);
		Ok(report)
	}

	/// Serialize `report` unless its release stage filters it out.
	pub fn prepare(&self, report: &CrashReport) -> Option<Map<String, Value>> {
		if !report.should_be_sent() {
			debug!(
				error_class = report.error_class(),
				release_stage = report.release_stage().unwrap_or("unset"),
				"report filtered by release stage"
			);
			return None;
		}
		Some(report.serialize(&self.top_level))
	}
}

fn build_top_level(config: &NotifierConfig) -> Map<String, Value> {
	let mut data = Map::new();
	data.insert("apiKey".into(), Value::from(config.api_key.expose()));
	data.insert(
		"payloadVersion".into(),
		Value::from(config.payload_version.as_str()),
	);
	data.insert(
		"notifier".into(),
		json!({
			"name": NOTIFIER_NAME,
			"version": NOTIFIER_VERSION,
			"url": NOTIFIER_URL,
		}),
	);
	data
}
