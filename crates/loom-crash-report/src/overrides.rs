// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ledger of top-level report fields customized after construction.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Top-level report fields that can be overridden by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverridableField {
	ErrorClass,
	ErrorMessage,
	Context,
	GroupingHash,
	Severity,
	ReleaseStage,
}

/// Field identifiers and their payload keys.
const FIELDS: &[(OverridableField, &str)] = &[
	(OverridableField::ErrorClass, "errorClass"),
	(OverridableField::ErrorMessage, "errorMessage"),
	(OverridableField::Context, "context"),
	(OverridableField::GroupingHash, "groupingHash"),
	(OverridableField::Severity, "severity"),
	(OverridableField::ReleaseStage, "releaseStage"),
];

impl OverridableField {
	/// Look up a field by its payload key.
	pub fn from_name(name: &str) -> Option<Self> {
		FIELDS
			.iter()
			.find(|(_, key)| *key == name)
			.map(|(field, _)| *field)
	}

	/// Payload key written for this field.
	pub fn key(&self) -> &'static str {
		FIELDS
			.iter()
			.find(|(field, _)| field == self)
			.map(|(_, key)| *key)
			.unwrap_or_default()
	}

	pub fn all() -> impl Iterator<Item = OverridableField> {
		FIELDS.iter().map(|(field, _)| *field)
	}
}

impl fmt::Display for OverridableField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

/// Explicitly customized top-level values, in the order they were first set.
///
/// Read-only outside this crate; writes go through
/// [`CrashReport::add_attribute`](crate::CrashReport::add_attribute) so the
/// matching typed property stays in sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeOverrides {
	values: IndexMap<OverridableField, Value>,
}

impl AttributeOverrides {
	pub fn get(&self, field: OverridableField) -> Option<&Value> {
		self.values.get(&field)
	}

	pub fn contains(&self, field: OverridableField) -> bool {
		self.values.contains_key(&field)
	}

	pub fn iter(&self) -> impl Iterator<Item = (OverridableField, &Value)> {
		self.values.iter().map(|(field, value)| (*field, value))
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub(crate) fn set(&mut self, field: OverridableField, value: Value) {
		self.values.insert(field, value);
	}

	pub(crate) fn remove(&mut self, field: OverridableField) -> Option<Value> {
		self.values.shift_remove(&field)
	}
}
