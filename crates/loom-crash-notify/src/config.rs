// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notifier configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables.
//!
//! ```toml
//! api_key = "0123456789abcdef"
//! release_stage = "production"
//! notify_release_stages = ["production", "staging"]
//!
//! [metadata.team]
//! owner = "payments"
//! ```

use std::path::Path;

use loom_crash_report::{MetadataStore, ReportDefaults};
use serde::Deserialize;
use tracing::debug;

use crate::error::{NotifyError, Result};
use crate::secret::SecretString;

pub const ENV_API_KEY: &str = "LOOM_CRASH_API_KEY";
pub const ENV_RELEASE_STAGE: &str = "LOOM_CRASH_RELEASE_STAGE";
pub const ENV_NOTIFY_RELEASE_STAGES: &str = "LOOM_CRASH_NOTIFY_RELEASE_STAGES";

pub const DEFAULT_PAYLOAD_VERSION: &str = "4";
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Settings shared by every report the notifier handles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
	pub api_key: SecretString,
	pub release_stage: Option<String>,
	/// Empty means reports are sent in every stage.
	pub notify_release_stages: Vec<String>,
	pub payload_version: String,
	pub queue_capacity: usize,
	/// Baseline metadata tabs merged into every report built by the notifier.
	pub metadata: MetadataStore,
}

impl Default for NotifierConfig {
	fn default() -> Self {
		Self {
			api_key: SecretString::default(),
			release_stage: None,
			notify_release_stages: Vec::new(),
			payload_version: DEFAULT_PAYLOAD_VERSION.to_string(),
			queue_capacity: DEFAULT_QUEUE_CAPACITY,
			metadata: MetadataStore::new(),
		}
	}
}

impl NotifierConfig {
	/// Load defaults, then `path` if given, then the process environment, and
	/// validate the result.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let mut config = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		config.apply_env(|key| std::env::var(key).ok());
		config.validate()?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path)?;
		let config: Self = toml::from_str(&contents).map_err(|source| NotifyError::TomlParse {
			path: path.to_path_buf(),
			source,
		})?;
		debug!(path = %path.display(), "loaded notifier config");
		Ok(config)
	}

	/// Override fields from environment variables resolved through `lookup`.
	pub fn apply_env<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(api_key) = lookup(ENV_API_KEY) {
			self.api_key = SecretString::new(api_key);
		}
		if let Some(stage) = lookup(ENV_RELEASE_STAGE) {
			self.release_stage = Some(stage).filter(|s| !s.trim().is_empty());
		}
		if let Some(stages) = lookup(ENV_NOTIFY_RELEASE_STAGES) {
			self.notify_release_stages = parse_stage_list(&stages);
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.api_key.is_blank() {
			return Err(NotifyError::invalid_value("api_key", "must not be empty"));
		}
		if self.queue_capacity == 0 {
			return Err(NotifyError::invalid_value(
				"queue_capacity",
				"must be greater than zero",
			));
		}
		if self.payload_version.trim().is_empty() {
			return Err(NotifyError::invalid_value(
				"payload_version",
				"must not be empty",
			));
		}
		Ok(())
	}

	/// Report defaults derived from this configuration.
	pub fn report_defaults(&self) -> ReportDefaults {
		ReportDefaults {
			release_stage: self.release_stage.clone(),
			notify_release_stages: self.notify_release_stages.clone(),
			metadata: self.metadata.clone(),
		}
	}
}

/// Split a comma-separated stage list, dropping blanks.
pub fn parse_stage_list(raw: &str) -> Vec<String> {
	raw.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}
