// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Building reports from native crash collector documents.
//!
//! The collector writes one JSON document per crash:
//!
//! ```text
//! crash.error        { type, reason, signal|mach|nsexception|cpp_exception|user_reported }
//! crash.diagnosis    free text, first line used as a fallback message
//! crash.threads[]    { index, name, crashed, backtrace.contents[] }
//! system             device and application facts
//! user.config        { releaseStage, notifyReleaseStages, context }
//! user.metaData      tab -> key -> value
//! user.breadcrumbs[] breadcrumb records
//! user.state         { crash: { severity, depth, groupingHash, context }, deviceState, appState }
//! user.overrides     top-level field -> value
//! ```

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::breadcrumb::Breadcrumb;
use crate::error::{ReportError, Result};
use crate::metadata::{MetadataStore, TOP_LEVEL_TAB};
use crate::report::CrashReport;
use crate::severity::parse_severity;
use crate::stacktrace::ThreadTrace;

/// Error class used when the collector names none.
pub const DEFAULT_ERROR_CLASS: &str = "Exception";

impl CrashReport {
	/// Build a report from a collector crash document.
	///
	/// Fails when `crash.error` is missing or is not an object.
	pub fn from_collector(raw: &Value) -> Result<Self> {
		let error = raw
			.pointer("/crash/error")
			.ok_or_else(|| ReportError::missing_field("crash.error"))?
			.as_object()
			.ok_or_else(|| ReportError::invalid_field("crash.error", "expected an object"))?;

		let error_type = error.get("type").and_then(Value::as_str).unwrap_or_default();
		let error_class = parse_error_class(error, error_type);
		let error_message = parse_error_message(raw, error, error_type);

		let mut report = CrashReport::empty(error_class, error_message);
		report.error = Some(error.clone());

		report.release_stage = text_at(raw, "/user/config/releaseStage");
		report.notify_release_stages = raw
			.pointer("/user/config/notifyReleaseStages")
			.and_then(Value::as_array)
			.map(|stages| {
				stages
					.iter()
					.filter_map(Value::as_str)
					.map(str::to_string)
					.collect()
			});
		report.context = text_at(raw, "/user/state/crash/context")
			.or_else(|| text_at(raw, "/user/config/context"));
		report.grouping_hash = text_at(raw, "/user/state/crash/groupingHash");
		if let Some(severity) = text_at(raw, "/user/state/crash/severity") {
			report.severity = parse_severity(&severity);
		}
		report.depth = parse_depth(raw.pointer("/user/state/crash/depth"));

		report.set_metadata(MetadataStore::from_value(
			raw.pointer("/user/metaData").unwrap_or(&Value::Null),
		));
		report.breadcrumbs = raw
			.pointer("/user/breadcrumbs")
			.and_then(Value::as_array)
			.map(|crumbs| Breadcrumb::parse_all(crumbs));

		let system = raw.get("system").and_then(Value::as_object);
		report.device = non_empty(system.map(parse_device).unwrap_or_default());
		report.device_state = non_empty(merged(
			system.map(parse_device_state).unwrap_or_default(),
			raw.pointer("/user/state/deviceState"),
		));
		report.app = non_empty(system.map(parse_app).unwrap_or_default());
		report.app_state = non_empty(merged(
			system.map(parse_app_state).unwrap_or_default(),
			raw.pointer("/user/state/appState"),
		));

		let threads: Vec<ThreadTrace> = raw
			.pointer("/crash/threads")
			.and_then(Value::as_array)
			.map(|threads| {
				threads
					.iter()
					.enumerate()
					.filter_map(|(position, t)| ThreadTrace::from_collector(t, position))
					.collect()
			})
			.unwrap_or_default();
		if let Some(crashed) = threads.iter().find(|t| t.crashed) {
			report.primary.frames = crashed.frames.clone();
		}
		report.threads = threads;

		if let Some(overrides) = raw.pointer("/user/overrides").and_then(Value::as_object) {
			for (name, value) in overrides {
				report.add_attribute(name, Some(value.clone()), TOP_LEVEL_TAB);
			}
		}

		debug!(
			error_class = %report.error_class,
			error_type,
			frames = report.primary.frames.len(),
			threads = report.threads.len(),
			"built crash report from collector document"
		);
		Ok(report)
	}
}

fn parse_error_class(error: &Map<String, Value>, error_type: &str) -> String {
	let (section, key) = match error_type {
		"cpp_exception" => ("cpp_exception", "name"),
		"mach" => ("mach", "exception_name"),
		"signal" => ("signal", "name"),
		"nsexception" => ("nsexception", "name"),
		"user" => ("user_reported", "name"),
		_ => return DEFAULT_ERROR_CLASS.to_string(),
	};

	error
		.get(section)
		.and_then(|s| s.get(key))
		.and_then(Value::as_str)
		.unwrap_or(DEFAULT_ERROR_CLASS)
		.to_string()
}

fn parse_error_message(raw: &Value, error: &Map<String, Value>, error_type: &str) -> String {
	let reason = error.get("reason").and_then(Value::as_str);

	if error_type == "mach" || reason.is_none() {
		let diagnosis = raw
			.pointer("/crash/diagnosis")
			.and_then(Value::as_str)
			.filter(|d| !d.starts_with("No diagnosis"))
			.and_then(|d| d.lines().next());
		if let Some(line) = diagnosis {
			return line.to_string();
		}
	}

	reason.unwrap_or_default().to_string()
}

fn parse_depth(raw: Option<&Value>) -> usize {
	match raw {
		None | Some(Value::Null) => 0,
		Some(value) => match value.as_u64().and_then(|d| usize::try_from(d).ok()) {
			Some(depth) => depth,
			None => {
				warn!(depth = %value, "ignoring invalid frame depth");
				0
			}
		},
	}
}

fn parse_device(system: &Map<String, Value>) -> Map<String, Value> {
	let mut device = Map::new();
	copy(system, "device_id", &mut device, "id");
	copy(system, "os_name", &mut device, "osName");
	copy(system, "os_version", &mut device, "osVersion");
	copy(system, "os_build", &mut device, "osBuild");
	copy(system, "machine", &mut device, "model");
	copy(system, "model", &mut device, "modelNumber");
	copy(system, "cpu_arch", &mut device, "cpuArch");
	copy(system, "jailbroken", &mut device, "jailbroken");
	copy(system, "time_zone", &mut device, "timezone");
	if let Some(size) = system.get("memory").and_then(|m| m.get("size")) {
		device.insert("totalMemory".to_string(), size.clone());
	}
	device
}

fn parse_device_state(system: &Map<String, Value>) -> Map<String, Value> {
	let mut state = Map::new();
	if let Some(free) = system.get("memory").and_then(|m| m.get("free")) {
		state.insert("freeMemory".to_string(), free.clone());
	}
	copy(system, "storage_free", &mut state, "freeDisk");
	state
}

fn parse_app(system: &Map<String, Value>) -> Map<String, Value> {
	let mut app = Map::new();
	copy(system, "app_id", &mut app, "id");
	copy(system, "app_name", &mut app, "name");
	copy(system, "app_version", &mut app, "version");
	copy(system, "app_build", &mut app, "bundleVersion");
	if let Some(uuid) = system.get("app_uuid").filter(|v| v.is_string()) {
		app.insert("dsymUUIDs".to_string(), Value::Array(vec![uuid.clone()]));
	}
	app
}

fn parse_app_state(system: &Map<String, Value>) -> Map<String, Value> {
	let mut state = Map::new();
	let Some(stats) = system.get("app_stats").and_then(Value::as_object) else {
		return state;
	};

	copy(stats, "in_foreground", &mut state, "inForeground");
	let active = stats.get("active_secs").and_then(Value::as_f64);
	let background = stats.get("background_secs").and_then(Value::as_f64);
	if let Some(active) = active {
		state.insert("durationInForeground".to_string(), Value::from(millis(active)));
	}
	if active.is_some() || background.is_some() {
		let total = active.unwrap_or(0.0) + background.unwrap_or(0.0);
		state.insert("duration".to_string(), Value::from(millis(total)));
	}
	state
}

fn millis(secs: f64) -> u64 {
	(secs.max(0.0) * 1000.0).round() as u64
}

fn copy(from: &Map<String, Value>, key: &str, to: &mut Map<String, Value>, as_key: &str) {
	if let Some(value) = from.get(key).filter(|v| !v.is_null()) {
		to.insert(as_key.to_string(), value.clone());
	}
}

/// Overlay collector-supplied state onto the values derived from `system`.
fn merged(mut base: Map<String, Value>, overlay: Option<&Value>) -> Map<String, Value> {
	if let Some(overlay) = overlay.and_then(Value::as_object) {
		for (key, value) in overlay {
			if !value.is_null() {
				base.insert(key.clone(), value.clone());
			}
		}
	}
	base
}

fn non_empty(map: Map<String, Value>) -> Option<Map<String, Value>> {
	(!map.is_empty()).then_some(map)
}

fn text_at(raw: &Value, pointer: &str) -> Option<String> {
	raw.pointer(pointer)
		.and_then(Value::as_str)
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::overrides::OverridableField;
	use crate::severity::Severity;
	use serde_json::json;

	fn signal_report() -> Value {
		json!({
			"crash": {
				"error": {
					"type": "signal",
					"reason": "Segmentation fault",
					"signal": {"name": "SIGSEGV", "signal": 11},
				},
				"threads": [
					{"index": 0, "name": "main", "crashed": false, "backtrace": {"contents": [
						{"symbol_name": "idle"},
					]}},
					{"index": 1, "crashed": true, "backtrace": {"contents": [
						{"symbol_name": "capture", "instruction_addr": 16},
						{"symbol_name": "handler", "instruction_addr": 32},
						{"symbol_name": "work", "instruction_addr": 48},
					]}},
				],
			},
			"system": {
				"device_id": "dev-123",
				"os_name": "iOS",
				"os_version": "17.2",
				"machine": "iPhone15,2",
				"memory": {"size": 6000, "free": 1200},
				"app_id": "com.example.app",
				"app_version": "2.1.0",
				"app_uuid": "ABCD-1234",
				"app_stats": {"in_foreground": true, "active_secs": 1.5, "background_secs": 2.0},
			},
			"user": {
				"config": {"releaseStage": "production", "notifyReleaseStages": ["production", 5]},
				"metaData": {"account": {"plan": "pro"}},
				"state": {
					"crash": {"severity": "warning", "depth": 1, "groupingHash": "g1"},
					"deviceState": {"orientation": "portrait"},
					"appState": {"screen": "checkout"},
				},
				"breadcrumbs": [
					{"timestamp": "2025-03-01T10:00:00Z", "name": "Opened cart", "type": "navigation"},
				],
			},
		})
	}

	#[test]
	fn builds_identity_and_classification() {
		let report = CrashReport::from_collector(&signal_report()).unwrap();

		assert_eq!(report.error_class(), "SIGSEGV");
		assert_eq!(report.error_message(), "Segmentation fault");
		assert_eq!(report.error().and_then(|e| e.get("type")), Some(&json!("signal")));
		assert_eq!(report.severity(), Severity::Warning);
		assert_eq!(report.grouping_hash(), Some("g1"));
		assert_eq!(report.depth(), 1);
		assert_eq!(report.release_stage(), Some("production"));
		assert_eq!(report.notify_release_stages(), Some(&["production".to_string()][..]));
		assert!(report.should_be_sent());
	}

	#[test]
	fn primary_trace_comes_from_crashed_thread() {
		let report = CrashReport::from_collector(&signal_report()).unwrap();

		let methods: Vec<_> = report
			.primary_stacktrace()
			.frames
			.iter()
			.filter_map(|f| f.method.as_deref())
			.collect();
		assert_eq!(methods, vec!["capture", "handler", "work"]);
		assert_eq!(report.threads().len(), 2);
	}

	#[test]
	fn environment_snapshots() {
		let report = CrashReport::from_collector(&signal_report()).unwrap();

		let device = report.device().unwrap();
		assert_eq!(device.get("id"), Some(&json!("dev-123")));
		assert_eq!(device.get("model"), Some(&json!("iPhone15,2")));
		assert_eq!(device.get("totalMemory"), Some(&json!(6000)));

		let device_state = report.device_state().unwrap();
		assert_eq!(device_state.get("freeMemory"), Some(&json!(1200)));
		assert_eq!(device_state.get("orientation"), Some(&json!("portrait")));

		let app = report.app().unwrap();
		assert_eq!(app.get("dsymUUIDs"), Some(&json!(["ABCD-1234"])));

		let app_state = report.app_state().unwrap();
		assert_eq!(app_state.get("durationInForeground"), Some(&json!(1500)));
		assert_eq!(app_state.get("duration"), Some(&json!(3500)));
		assert_eq!(app_state.get("screen"), Some(&json!("checkout")));
	}

	#[test]
	fn metadata_and_breadcrumbs() {
		let report = CrashReport::from_collector(&signal_report()).unwrap();
		assert_eq!(report.metadata().get("account", "plan"), Some(&json!("pro")));
		assert_eq!(report.breadcrumbs().map(<[_]>::len), Some(1));
	}

	#[test]
	fn missing_error_is_rejected() {
		let err = CrashReport::from_collector(&json!({"crash": {}})).unwrap_err();
		assert!(matches!(err, ReportError::MissingField(ref f) if f == "crash.error"));

		let err = CrashReport::from_collector(&json!({"crash": {"error": "oops"}})).unwrap_err();
		assert!(matches!(err, ReportError::InvalidField { .. }));
	}

	#[test]
	fn error_class_by_type() {
		let cases = [
			(json!({"type": "nsexception", "nsexception": {"name": "NSRangeException"}}), "NSRangeException"),
			(json!({"type": "cpp_exception", "cpp_exception": {"name": "std::bad_alloc"}}), "std::bad_alloc"),
			(json!({"type": "mach", "mach": {"exception_name": "EXC_BAD_ACCESS"}}), "EXC_BAD_ACCESS"),
			(json!({"type": "user", "user_reported": {"name": "HandledError"}}), "HandledError"),
			(json!({"type": "deadlock"}), DEFAULT_ERROR_CLASS),
			(json!({"type": "signal"}), DEFAULT_ERROR_CLASS),
		];
		for (error, expected) in cases {
			let report = CrashReport::from_collector(&json!({"crash": {"error": error}})).unwrap();
			assert_eq!(report.error_class(), expected);
		}
	}

	#[test]
	fn mach_message_prefers_diagnosis() {
		let raw = json!({"crash": {
			"error": {"type": "mach", "reason": "raw reason", "mach": {"exception_name": "EXC_BAD_ACCESS"}},
			"diagnosis": "Attempted to dereference null pointer.\nMore detail",
		}});
		let report = CrashReport::from_collector(&raw).unwrap();
		assert_eq!(report.error_message(), "Attempted to dereference null pointer.");

		let raw = json!({"crash": {
			"error": {"type": "signal"},
			"diagnosis": "No diagnosis available",
		}});
		let report = CrashReport::from_collector(&raw).unwrap();
		assert_eq!(report.error_message(), "");
	}

	#[test]
	fn invalid_depth_defaults_to_zero() {
		for depth in [json!(-3), json!("two"), json!(1.5)] {
			let raw = json!({"crash": {"error": {}}, "user": {"state": {"crash": {"depth": depth}}}});
			assert_eq!(CrashReport::from_collector(&raw).unwrap().depth(), 0);
		}
	}

	#[test]
	fn collector_overrides_use_dispatch_table() {
		let raw = json!({
			"crash": {"error": {"type": "signal", "signal": {"name": "SIGABRT"}}},
			"user": {
				"overrides": {"errorClass": "Renamed", "context": "login", "bogus": 1},
				"metaData": {TOP_LEVEL_TAB: {"errorClass": "Ignored"}},
			},
		});
		let report = CrashReport::from_collector(&raw).unwrap();

		assert_eq!(report.error_class(), "Renamed");
		assert_eq!(report.context(), Some("login"));
		assert_eq!(report.overrides().len(), 2);
		assert!(report.overrides().contains(OverridableField::ErrorClass));
		assert!(report.metadata().is_empty());
	}
}
