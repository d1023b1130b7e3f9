// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Severity classification of a crash report.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Severity of the error that generated a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
	#[default]
	Error,
	Warning,
	Info,
}

impl Severity {
	pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

	/// Wire representation of the severity.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Warning => "warning",
			Self::Info => "info",
		}
	}
}

/// Convert a string to a severity.
///
/// Matching is case-sensitive against `"error"`, `"warning"` and `"info"`.
/// Anything else is treated as [`Severity::Error`].
pub fn parse_severity(text: &str) -> Severity {
	match text {
		"info" => Severity::Info,
		"warning" => Severity::Warning,
		_ => Severity::Error,
	}
}

/// Format a severity for JSON payloads.
pub fn format_severity(severity: Severity) -> &'static str {
	severity.as_str()
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Severity {
	type Err = Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(parse_severity(s))
	}
}

impl Serialize for Severity {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for Severity {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Ok(parse_severity(&text))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn canonical_strings_roundtrip() {
		for s in ["error", "warning", "info"] {
			assert_eq!(format_severity(parse_severity(s)), s);
		}
	}

	#[test]
	fn unknown_level_falls_back_to_error() {
		assert_eq!(parse_severity("not-a-level"), Severity::Error);
		assert_eq!(parse_severity(""), Severity::Error);
	}

	#[test]
	fn parsing_is_case_sensitive() {
		assert_eq!(parse_severity("WARNING"), Severity::Error);
		assert_eq!(parse_severity("Info"), Severity::Error);
	}

	#[test]
	fn serde_uses_lowercase_strings() {
		let json = serde_json::to_string(&Severity::Warning).unwrap();
		assert_eq!(json, "\"warning\"");

		let parsed: Severity = serde_json::from_str("\"fatal\"").unwrap();
		assert_eq!(parsed, Severity::Error);
	}

	proptest! {
		#[test]
		fn severity_roundtrip(severity in prop_oneof![
			Just(Severity::Error),
			Just(Severity::Warning),
			Just(Severity::Info),
		]) {
			let s = severity.to_string();
			let parsed: Severity = s.parse().unwrap();
			prop_assert_eq!(severity, parsed);
		}

		#[test]
		fn parse_never_panics(s in ".*") {
			let severity = parse_severity(&s);
			prop_assert!(Severity::ALL.contains(&severity));
		}
	}
}
