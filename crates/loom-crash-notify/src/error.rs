// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crash notifier.

use std::path::PathBuf;

use loom_crash_report::ReportError;
use thiserror::Error;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur while configuring or running the notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// I/O error reading a config or report file.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// TOML parsing error.
	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// A configuration value failed validation.
	#[error("invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },

	/// The report queue no longer accepts reports.
	#[error("report queue has been shut down")]
	QueueClosed,

	/// The report queue is at capacity.
	#[error("report queue is full")]
	QueueFull,

	/// The queue worker stopped abnormally.
	#[error("report queue worker failed: {0}")]
	Worker(String),

	/// A delivery sink rejected a payload.
	#[error("delivery failed: {0}")]
	Delivery(String),

	/// A collector document could not be turned into a report.
	#[error(transparent)]
	Report(#[from] ReportError),

	/// JSON (de)serialization error.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl NotifyError {
	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}
