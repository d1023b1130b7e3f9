// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frames and named stacktraces.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Kind tag of the collector-captured trace.
pub const PRIMARY_STACKTRACE_KIND: &str = "native";

/// A single stack frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	/// Binary image the frame belongs to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub macho_file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub frame_address: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub symbol_address: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub macho_load_address: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub line_number: Option<u32>,
	#[serde(default)]
	pub in_project: bool,
}

impl Frame {
	/// Read a collector frame dictionary.
	///
	/// Returns `None` when the entry is not an object.
	pub fn from_collector(raw: &Value) -> Option<Self> {
		let map = raw.as_object()?;
		let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
		let addr = |key: &str| map.get(key).and_then(Value::as_u64);

		Some(Self {
			method: text("symbol_name"),
			macho_file: text("object_name"),
			frame_address: addr("instruction_addr"),
			symbol_address: addr("symbol_addr"),
			macho_load_address: addr("object_addr"),
			file: text("file"),
			line_number: map
				.get("line")
				.and_then(Value::as_u64)
				.and_then(|n| u32::try_from(n).ok()),
			in_project: map.get("in_project").and_then(Value::as_bool).unwrap_or(false),
		})
	}
}

/// Parse a collector frame list, skipping malformed entries.
pub fn frames_from_collector(raw: &[Value]) -> Vec<Frame> {
	let mut frames = Vec::with_capacity(raw.len());
	for (index, entry) in raw.iter().enumerate() {
		match Frame::from_collector(entry) {
			Some(frame) => frames.push(frame),
			None => warn!(index, "skipping malformed stack frame"),
		}
	}
	frames
}

/// A stacktrace tagged with the kind of event that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
	/// "native" for the collector trace, or a custom tag such as "app hang".
	#[serde(rename = "type")]
	pub kind: String,
	pub frames: Vec<Frame>,
}

impl Stacktrace {
	pub fn new(kind: impl Into<String>, frames: Vec<Frame>) -> Self {
		Self {
			kind: kind.into(),
			frames,
		}
	}

	pub fn primary(frames: Vec<Frame>) -> Self {
		Self::new(PRIMARY_STACKTRACE_KIND, frames)
	}

	/// Frames after dropping the first `depth`; empty when `depth` exceeds the
	/// frame count.
	pub fn trimmed(&self, depth: usize) -> &[Frame] {
		self.frames.get(depth..).unwrap_or_default()
	}
}

/// A thread captured alongside the crash.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadTrace {
	pub id: u64,
	pub name: Option<String>,
	pub crashed: bool,
	pub frames: Vec<Frame>,
}

impl ThreadTrace {
	/// Read a collector thread dictionary; `None` when it is not an object.
	pub fn from_collector(raw: &Value, position: usize) -> Option<Self> {
		let map = raw.as_object()?;
		let frames = map
			.get("backtrace")
			.and_then(|bt| bt.get("contents"))
			.and_then(Value::as_array)
			.map(|contents| frames_from_collector(contents))
			.unwrap_or_default();

		Some(Self {
			id: map
				.get("index")
				.and_then(Value::as_u64)
				.unwrap_or(position as u64),
			name: map.get("name").and_then(Value::as_str).map(str::to_string),
			crashed: map.get("crashed").and_then(Value::as_bool).unwrap_or(false),
			frames,
		})
	}
}
