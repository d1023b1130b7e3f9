// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tabbed metadata attached to a crash report.
//!
//! Each tab is a named section of key/value pairs displayed together. Writing
//! [`Value::Null`] to a key removes it. Tabs emptied by removals are kept so
//! that an explicitly created section survives until serialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Reserved tab name that addresses top-level report fields instead of a
/// metadata section.
pub const TOP_LEVEL_TAB: &str = "__top_level__";

/// Key/value pairs of a single tab.
pub type Tab = IndexMap<String, Value>;

/// Destination of an attribute write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget<'a> {
	/// A top-level report field, recorded as an override.
	TopLevel,
	/// A named metadata tab.
	Tab(&'a str),
}

impl<'a> From<&'a str> for AttributeTarget<'a> {
	fn from(tab: &'a str) -> Self {
		if tab == TOP_LEVEL_TAB {
			Self::TopLevel
		} else {
			Self::Tab(tab)
		}
	}
}

/// Ordered mapping of tab name to key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
	tabs: IndexMap<String, Tab>,
}

impl MetadataStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Merge `values` into `tab`, creating the tab if needed.
	///
	/// Null values delete the matching key; deleting a key that does not exist
	/// is a no-op.
	pub fn add_metadata<I, K>(&mut self, values: I, tab: &str)
	where
		I: IntoIterator<Item = (K, Value)>,
		K: Into<String>,
	{
		let section = self.tabs.entry(tab.to_string()).or_default();
		for (key, value) in values {
			apply(section, tab, key.into(), value);
		}
	}

	/// Set or remove a single key in `tab`.
	pub fn add_attribute(&mut self, name: &str, value: Option<Value>, tab: &str) {
		match value {
			Some(value) if !value.is_null() => {
				self.tabs
					.entry(tab.to_string())
					.or_default()
					.insert(name.to_string(), value);
			}
			_ => {
				if let Some(section) = self.tabs.get_mut(tab) {
					if section.shift_remove(name).is_some() {
						debug!(tab, key = name, "removed metadata value");
					}
				}
			}
		}
	}

	/// Merge every tab of `other` into this store, key by key.
	pub fn merge(&mut self, other: &MetadataStore) {
		for (tab, values) in &other.tabs {
			self.add_metadata(values.iter().map(|(k, v)| (k.clone(), v.clone())), tab);
		}
	}

	pub fn tab(&self, name: &str) -> Option<&Tab> {
		self.tabs.get(name)
	}

	pub fn get(&self, tab: &str, key: &str) -> Option<&Value> {
		self.tabs.get(tab).and_then(|section| section.get(key))
	}

	pub fn contains_tab(&self, name: &str) -> bool {
		self.tabs.contains_key(name)
	}

	pub fn remove_tab(&mut self, name: &str) -> Option<Tab> {
		self.tabs.shift_remove(name)
	}

	pub fn tabs(&self) -> impl Iterator<Item = (&str, &Tab)> {
		self.tabs.iter().map(|(name, tab)| (name.as_str(), tab))
	}

	pub fn len(&self) -> usize {
		self.tabs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tabs.is_empty()
	}

	/// Build a store from a JSON object of tab objects.
	///
	/// Tabs that are not objects, and a tab named [`TOP_LEVEL_TAB`], are dropped.
	/// Null values inside a tab are dropped as well.
	pub fn from_value(value: &Value) -> Self {
		let mut store = Self::new();
		let Some(tabs) = value.as_object() else {
			if !value.is_null() {
				warn!("metadata is not an object, ignoring");
			}
			return store;
		};

		for (name, section) in tabs {
			if name == TOP_LEVEL_TAB {
				warn!(tab = %name, "metadata tab shadowed by top-level sentinel, dropping");
				continue;
			}
			match section.as_object() {
				Some(values) => {
					store.add_metadata(values.iter().map(|(k, v)| (k.clone(), v.clone())), name)
				}
				None => warn!(tab = %name, "metadata tab is not an object, dropping"),
			}
		}
		store
	}

	/// Render the store as a JSON object of tab objects.
	pub fn to_value(&self) -> Value {
		let tabs: Map<String, Value> = self
			.tabs
			.iter()
			.map(|(name, tab)| {
				let section: Map<String, Value> =
					tab.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
				(name.clone(), Value::Object(section))
			})
			.collect();
		Value::Object(tabs)
	}
}

fn apply(section: &mut Tab, tab: &str, key: String, value: Value) {
	if value.is_null() {
		if section.shift_remove(&key).is_some() {
			debug!(tab, key = %key, "removed metadata value");
		}
	} else {
		section.insert(key, value);
	}
}
