// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumb types (user and system actions leading up to the error).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// A record of something that happened before the error was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
	pub timestamp: DateTime<Utc>,
	pub name: String,
	#[serde(rename = "type", default)]
	pub kind: BreadcrumbType,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub meta_data: Value,
}

impl Breadcrumb {
	/// Parse collector breadcrumbs, skipping entries that do not match the
	/// breadcrumb shape.
	pub fn parse_all(raw: &[Value]) -> Vec<Breadcrumb> {
		raw.iter()
			.enumerate()
			.filter_map(|(index, entry)| {
				match serde_json::from_value::<Breadcrumb>(entry.clone()) {
					Ok(crumb) => Some(crumb),
					Err(e) => {
						warn!(index, error = %e, "skipping malformed breadcrumb");
						None
					}
				}
			})
			.collect()
	}
}

/// Category of a breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbType {
	#[default]
	Manual,
	Error,
	Log,
	Navigation,
	Process,
	Request,
	State,
	User,
}

impl fmt::Display for BreadcrumbType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Manual => write!(f, "manual"),
			Self::Error => write!(f, "error"),
			Self::Log => write!(f, "log"),
			Self::Navigation => write!(f, "navigation"),
			Self::Process => write!(f, "process"),
			Self::Request => write!(f, "request"),
			Self::State => write!(f, "state"),
			Self::User => write!(f, "user"),
		}
	}
}

impl FromStr for BreadcrumbType {
	type Err = std::convert::Infallible;

	/// Unknown categories read as [`BreadcrumbType::Manual`].
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"error" => Self::Error,
			"log" => Self::Log,
			"navigation" => Self::Navigation,
			"process" => Self::Process,
			"request" => Self::Request,
			"state" => Self::State,
			"user" => Self::User,
			_ => Self::Manual,
		})
	}
}

impl<'de> Deserialize<'de> for BreadcrumbType {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Ok(text.parse().unwrap_or_default())
	}
}
