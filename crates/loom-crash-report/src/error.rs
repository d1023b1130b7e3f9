// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for crash report construction.

use thiserror::Error;

/// Errors that can occur while building a crash report.
///
/// Mutation and serialization of an already constructed report never fail;
/// only ingestion of collector data can.
#[derive(Debug, Error)]
pub enum ReportError {
	#[error("missing required field: {0}")]
	MissingField(String),

	#[error("invalid value for {field}: {message}")]
	InvalidField { field: String, message: String },
}

impl ReportError {
	pub fn missing_field(field: impl Into<String>) -> Self {
		Self::MissingField(field.into())
	}

	pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidField {
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Result type for crash report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
