// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire payload rendering.
//!
//! Layers, later ones winning on key conflicts:
//! 1. caller-supplied top-level data (API key, payload version, ...)
//! 2. the report's typed fields
//! 3. the override ledger
//! 4. metadata, always under [`keys::META_DATA`]

use serde_json::{Map, Value};

use crate::overrides::OverridableField;
use crate::report::CrashReport;
use crate::stacktrace::{Frame, Stacktrace};

/// Payload keys shared with the backend.
pub mod keys {
	pub const ERROR_CLASS: &str = "errorClass";
	pub const ERROR_MESSAGE: &str = "errorMessage";
	pub const SEVERITY: &str = "severity";
	pub const CONTEXT: &str = "context";
	pub const GROUPING_HASH: &str = "groupingHash";
	pub const RELEASE_STAGE: &str = "releaseStage";
	pub const EXCEPTIONS: &str = "exceptions";
	pub const THREADS: &str = "threads";
	pub const DEVICE: &str = "device";
	pub const DEVICE_STATE: &str = "deviceState";
	pub const APP: &str = "app";
	pub const APP_STATE: &str = "appState";
	pub const BREADCRUMBS: &str = "breadcrumbs";
	pub const USER: &str = "user";
	pub const META_DATA: &str = "metaData";
	pub const ERROR_TAB: &str = "error";
	pub const USER_TAB: &str = "user";
}

impl CrashReport {
	/// Render the report as a payload document.
	///
	/// `top_level` is copied, never modified, so one map can be reused for
	/// every report in a batch.
	pub fn serialize(&self, top_level: &Map<String, Value>) -> Map<String, Value> {
		let mut event = top_level.clone();

		event.insert(keys::ERROR_CLASS.into(), Value::from(self.error_class.as_str()));
		event.insert(keys::ERROR_MESSAGE.into(), Value::from(self.error_message.as_str()));
		event.insert(keys::SEVERITY.into(), Value::from(self.severity.as_str()));
		insert_text(&mut event, keys::CONTEXT, self.context.as_deref());
		insert_text(&mut event, keys::GROUPING_HASH, self.grouping_hash.as_deref());
		insert_text(&mut event, keys::RELEASE_STAGE, self.release_stage.as_deref());

		event.insert(keys::EXCEPTIONS.into(), Value::Array(self.serialize_exceptions()));
		if !self.threads.is_empty() {
			event.insert(keys::THREADS.into(), Value::Array(self.serialize_threads()));
		}

		insert_map(&mut event, keys::DEVICE, self.device.as_ref());
		insert_map(&mut event, keys::DEVICE_STATE, self.device_state.as_ref());
		insert_map(&mut event, keys::APP, self.app.as_ref());
		insert_map(&mut event, keys::APP_STATE, self.app_state.as_ref());

		if let Some(breadcrumbs) = &self.breadcrumbs {
			event.insert(
				keys::BREADCRUMBS.into(),
				serde_json::to_value(breadcrumbs).unwrap_or_else(|_| Value::Array(Vec::new())),
			);
		}
		if let Some(user) = self.serialize_user() {
			event.insert(keys::USER.into(), Value::Object(user));
		}

		for (field, value) in self.overrides.iter() {
			event.insert(field.key().into(), value.clone());
		}

		event.insert(keys::META_DATA.into(), self.serialize_metadata());
		event
	}

	fn effective_text(&self, field: OverridableField, typed: &str) -> String {
		self.overrides
			.get(field)
			.and_then(Value::as_str)
			.unwrap_or(typed)
			.to_string()
	}

	fn serialize_exceptions(&self) -> Vec<Value> {
		let error_class = self.effective_text(OverridableField::ErrorClass, &self.error_class);
		let message = self.effective_text(OverridableField::ErrorMessage, &self.error_message);

		self.stacktraces()
			.map(|trace| {
				let mut exception = Map::new();
				exception.insert("errorClass".into(), Value::from(error_class.as_str()));
				exception.insert("message".into(), Value::from(message.as_str()));
				exception.insert("type".into(), Value::from(trace.kind.as_str()));
				exception.insert("stacktrace".into(), frames_value(self.frames_for(trace)));
				Value::Object(exception)
			})
			.collect()
	}

	/// Depth trimming applies to the primary trace only.
	fn frames_for<'a>(&'a self, trace: &'a Stacktrace) -> &'a [Frame] {
		if std::ptr::eq(trace, &self.primary) {
			trace.trimmed(self.depth)
		} else {
			&trace.frames
		}
	}

	fn serialize_threads(&self) -> Vec<Value> {
		self.threads
			.iter()
			.map(|thread| {
				let frames = if thread.crashed {
					self.primary.trimmed(self.depth)
				} else {
					&thread.frames[..]
				};
				let mut entry = Map::new();
				entry.insert("id".into(), Value::from(thread.id));
				if let Some(name) = &thread.name {
					entry.insert("name".into(), Value::from(name.as_str()));
				}
				entry.insert("type".into(), Value::from(self.primary.kind.as_str()));
				entry.insert("errorReportingThread".into(), Value::Bool(thread.crashed));
				entry.insert("stacktrace".into(), frames_value(frames));
				Value::Object(entry)
			})
			.collect()
	}

	/// The `user` tab, with the device id standing in for a missing user id.
	fn serialize_user(&self) -> Option<Map<String, Value>> {
		let mut user: Map<String, Value> = self
			.metadata
			.tab(keys::USER_TAB)
			.map(|tab| tab.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
			.unwrap_or_default();

		if !user.contains_key("id") {
			if let Some(id) = self.device.as_ref().and_then(|d| d.get("id")) {
				user.insert("id".into(), id.clone());
			}
		}
		(!user.is_empty()).then_some(user)
	}

	fn serialize_metadata(&self) -> Value {
		let mut metadata = self.metadata.to_value();
		if let (Some(tabs), Some(error)) = (metadata.as_object_mut(), &self.error) {
			if !tabs.contains_key(keys::ERROR_TAB) {
				tabs.insert(keys::ERROR_TAB.into(), Value::Object(error.clone()));
			}
		}
		metadata
	}
}

fn frames_value(frames: &[Frame]) -> Value {
	Value::Array(
		frames
			.iter()
			.filter_map(|frame| serde_json::to_value(frame).ok())
			.collect(),
	)
}

fn insert_text(event: &mut Map<String, Value>, key: &str, value: Option<&str>) {
	if let Some(value) = value {
		event.insert(key.into(), Value::from(value));
	}
}

fn insert_map(event: &mut Map<String, Value>, key: &str, value: Option<&Map<String, Value>>) {
	if let Some(value) = value {
		event.insert(key.into(), Value::Object(value.clone()));
	}
}
