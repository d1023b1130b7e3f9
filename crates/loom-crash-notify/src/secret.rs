// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret string wrapper for credentials such as the notifier API key.
//!
//! `Debug` and `Display` print [`REDACTED`]; the value is only reachable
//! through [`SecretString::expose`] and is zeroed on drop.

use std::fmt;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

/// Placeholder printed instead of a secret value.
pub const REDACTED: &str = "[REDACTED]";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(value: impl Into<String>) -> Self {
		Self(Zeroizing::new(value.into()))
	}

	/// Borrow the secret value. Do not log the result.
	pub fn expose(&self) -> &str {
		self.0.as_str()
	}

	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(Self::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formatting_never_shows_value() {
		let secret = SecretString::new("hunter2");
		assert_eq!(format!("{secret:?}"), REDACTED);
		assert_eq!(secret.to_string(), REDACTED);
		assert_eq!(secret.expose(), "hunter2");
	}

	#[test]
	fn deserializes_from_plain_string() {
		let secret: SecretString = serde_json::from_str("\"abc\"").unwrap();
		assert_eq!(secret.expose(), "abc");
	}

	#[test]
	fn blank_detection() {
		assert!(SecretString::default().is_blank());
		assert!(SecretString::new("  ").is_blank());
		assert!(!SecretString::new("k").is_blank());
	}
}
