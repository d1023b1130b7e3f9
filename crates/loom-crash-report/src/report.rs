// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The crash report aggregate.

use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::breadcrumb::Breadcrumb;
use crate::metadata::{AttributeTarget, MetadataStore, TOP_LEVEL_TAB};
use crate::overrides::{AttributeOverrides, OverridableField};
use crate::severity::{parse_severity, Severity};
use crate::stacktrace::{Frame, Stacktrace, ThreadTrace};

/// Defaults supplied by the notifier configuration when a report is built
/// from an error name and message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDefaults {
	pub release_stage: Option<String>,
	/// Empty means "notify in every stage".
	pub notify_release_stages: Vec<String>,
	/// Baseline metadata merged under the report's own metadata.
	pub metadata: MetadataStore,
}

/// A single captured error event.
///
/// Built once per event, mutated by its owner, then serialized with
/// [`CrashReport::serialize`]. A report is not shared between threads while
/// it is being mutated; hand it over by value instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CrashReport {
	pub(crate) error_class: String,
	pub(crate) error_message: String,
	pub(crate) grouping_hash: Option<String>,
	pub(crate) context: Option<String>,
	pub(crate) severity: Severity,
	pub(crate) release_stage: Option<String>,
	pub(crate) notify_release_stages: Option<Vec<String>>,
	pub(crate) device: Option<Map<String, Value>>,
	pub(crate) device_state: Option<Map<String, Value>>,
	pub(crate) app: Option<Map<String, Value>>,
	pub(crate) app_state: Option<Map<String, Value>>,
	pub(crate) metadata: MetadataStore,
	pub(crate) overrides: AttributeOverrides,
	pub(crate) breadcrumbs: Option<Vec<Breadcrumb>>,
	pub(crate) depth: usize,
	pub(crate) error: Option<Map<String, Value>>,
	pub(crate) primary: Stacktrace,
	/// Most recently attached first.
	pub(crate) custom_stacktraces: VecDeque<Stacktrace>,
	pub(crate) threads: Vec<ThreadTrace>,
}

impl CrashReport {
	/// Create a basic report from an error name and message.
	///
	/// `defaults.metadata` is applied first and `metadata` merged over it.
	pub fn new(
		error_class: impl Into<String>,
		error_message: impl Into<String>,
		defaults: &ReportDefaults,
		metadata: MetadataStore,
		severity: Severity,
	) -> Self {
		let mut report = Self::empty(error_class.into(), error_message.into());
		report.severity = severity;
		report.release_stage = defaults.release_stage.clone();
		report.notify_release_stages = Some(defaults.notify_release_stages.clone());

		let mut merged = defaults.metadata.clone();
		merged.merge(&metadata);
		report.set_metadata(merged);
		report
	}

	pub(crate) fn empty(error_class: String, error_message: String) -> Self {
		Self {
			error_class,
			error_message,
			grouping_hash: None,
			context: None,
			severity: Severity::Error,
			release_stage: None,
			notify_release_stages: None,
			device: None,
			device_state: None,
			app: None,
			app_state: None,
			metadata: MetadataStore::new(),
			overrides: AttributeOverrides::default(),
			breadcrumbs: None,
			depth: 0,
			error: None,
			primary: Stacktrace::primary(Vec::new()),
			custom_stacktraces: VecDeque::new(),
			threads: Vec::new(),
		}
	}

	pub fn error_class(&self) -> &str {
		&self.error_class
	}

	pub fn set_error_class(&mut self, error_class: impl Into<String>) {
		self.error_class = error_class.into();
	}

	pub fn error_message(&self) -> &str {
		&self.error_message
	}

	pub fn set_error_message(&mut self, error_message: impl Into<String>) {
		self.error_message = error_message.into();
	}

	pub fn grouping_hash(&self) -> Option<&str> {
		self.grouping_hash.as_deref()
	}

	pub fn set_grouping_hash(&mut self, grouping_hash: Option<String>) {
		self.grouping_hash = grouping_hash;
	}

	pub fn context(&self) -> Option<&str> {
		self.context.as_deref()
	}

	pub fn set_context(&mut self, context: Option<String>) {
		self.context = context;
	}

	pub fn severity(&self) -> Severity {
		self.severity
	}

	pub fn set_severity(&mut self, severity: Severity) {
		self.severity = severity;
	}

	pub fn release_stage(&self) -> Option<&str> {
		self.release_stage.as_deref()
	}

	pub fn set_release_stage(&mut self, release_stage: Option<String>) {
		self.release_stage = release_stage;
	}

	pub fn notify_release_stages(&self) -> Option<&[String]> {
		self.notify_release_stages.as_deref()
	}

	pub fn set_notify_release_stages(&mut self, stages: Option<Vec<String>>) {
		self.notify_release_stages = stages;
	}

	pub fn device(&self) -> Option<&Map<String, Value>> {
		self.device.as_ref()
	}

	pub fn set_device(&mut self, device: Option<Map<String, Value>>) {
		self.device = device;
	}

	pub fn device_state(&self) -> Option<&Map<String, Value>> {
		self.device_state.as_ref()
	}

	pub fn set_device_state(&mut self, device_state: Option<Map<String, Value>>) {
		self.device_state = device_state;
	}

	pub fn app(&self) -> Option<&Map<String, Value>> {
		self.app.as_ref()
	}

	pub fn set_app(&mut self, app: Option<Map<String, Value>>) {
		self.app = app;
	}

	pub fn app_state(&self) -> Option<&Map<String, Value>> {
		self.app_state.as_ref()
	}

	pub fn set_app_state(&mut self, app_state: Option<Map<String, Value>>) {
		self.app_state = app_state;
	}

	pub fn breadcrumbs(&self) -> Option<&[Breadcrumb]> {
		self.breadcrumbs.as_deref()
	}

	pub fn set_breadcrumbs(&mut self, breadcrumbs: Option<Vec<Breadcrumb>>) {
		self.breadcrumbs = breadcrumbs;
	}

	/// Number of leading primary frames hidden from the payload.
	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn set_depth(&mut self, depth: usize) {
		self.depth = depth;
	}

	pub fn error(&self) -> Option<&Map<String, Value>> {
		self.error.as_ref()
	}

	pub fn set_error(&mut self, error: Option<Map<String, Value>>) {
		self.error = error;
	}

	pub fn primary_stacktrace(&self) -> &Stacktrace {
		&self.primary
	}

	pub fn set_primary_frames(&mut self, frames: Vec<Frame>) {
		self.primary.frames = frames;
	}

	pub fn threads(&self) -> &[ThreadTrace] {
		&self.threads
	}

	pub fn set_threads(&mut self, threads: Vec<ThreadTrace>) {
		self.threads = threads;
	}

	pub fn metadata(&self) -> &MetadataStore {
		&self.metadata
	}

	/// Replace all metadata. A tab named [`TOP_LEVEL_TAB`] is dropped.
	pub fn set_metadata(&mut self, mut metadata: MetadataStore) {
		if metadata.remove_tab(TOP_LEVEL_TAB).is_some() {
			warn!(tab = TOP_LEVEL_TAB, "metadata tab shadowed by top-level sentinel, dropping");
		}
		self.metadata = metadata;
	}

	pub fn overrides(&self) -> &AttributeOverrides {
		&self.overrides
	}

	/// Merge key/value pairs into a tab; null values delete keys.
	///
	/// Writing to [`TOP_LEVEL_TAB`] sets top-level overrides instead.
	pub fn add_metadata<I, K>(&mut self, values: I, tab: &str)
	where
		I: IntoIterator<Item = (K, Value)>,
		K: Into<String>,
	{
		match AttributeTarget::from(tab) {
			AttributeTarget::TopLevel => {
				for (name, value) in values {
					let name: String = name.into();
					self.set_top_level(&name, Some(value));
				}
			}
			AttributeTarget::Tab(tab) => self.metadata.add_metadata(values, tab),
		}
	}

	/// Set or remove one value. `None` and null both remove.
	pub fn add_attribute(&mut self, name: &str, value: Option<Value>, tab: &str) {
		match AttributeTarget::from(tab) {
			AttributeTarget::TopLevel => self.set_top_level(name, value),
			AttributeTarget::Tab(tab) => self.metadata.add_attribute(name, value, tab),
		}
	}

	fn set_top_level(&mut self, name: &str, value: Option<Value>) {
		match OverridableField::from_name(name) {
			Some(field) => self.set_override(field, value),
			None => warn!(field = name, "ignoring override of unknown top-level field"),
		}
	}

	/// Record an override and keep the typed property in step with it.
	///
	/// Overrides must be strings; anything else is ignored. Removing an
	/// override clears optional properties and leaves required ones as they
	/// are.
	pub fn set_override(&mut self, field: OverridableField, value: Option<Value>) {
		let Some(value) = value.filter(|v| !v.is_null()) else {
			if self.overrides.remove(field).is_some() {
				debug!(field = %field, "removed override");
			}
			match field {
				OverridableField::Context => self.context = None,
				OverridableField::GroupingHash => self.grouping_hash = None,
				OverridableField::ReleaseStage => self.release_stage = None,
				OverridableField::ErrorClass
				| OverridableField::ErrorMessage
				| OverridableField::Severity => {}
			}
			return;
		};

		let Some(text) = value.as_str() else {
			warn!(field = %field, "ignoring non-string override");
			return;
		};

		let stored = match field {
			OverridableField::ErrorClass => {
				self.error_class = text.to_string();
				value
			}
			OverridableField::ErrorMessage => {
				self.error_message = text.to_string();
				value
			}
			OverridableField::Context => {
				self.context = Some(text.to_string());
				value
			}
			OverridableField::GroupingHash => {
				self.grouping_hash = Some(text.to_string());
				value
			}
			OverridableField::ReleaseStage => {
				self.release_stage = Some(text.to_string());
				value
			}
			OverridableField::Severity => {
				self.severity = parse_severity(text);
				Value::from(self.severity.as_str())
			}
		};
		self.overrides.set(field, stored);
	}

	/// Prepend a synthetic stacktrace, e.g. for an app hang.
	///
	/// The most recent custom trace is serialized first; the primary trace
	/// always comes last.
	pub fn attach_custom_stacktrace(&mut self, frames: Vec<Frame>, kind: impl Into<String>) {
		self.custom_stacktraces.push_front(Stacktrace::new(kind, frames));
	}

	/// Custom traces (newest first) followed by the primary trace.
	pub fn stacktraces(&self) -> impl Iterator<Item = &Stacktrace> {
		self.custom_stacktraces.iter().chain(std::iter::once(&self.primary))
	}

	/// Whether the current release stage is one the report should be sent in.
	pub fn should_be_sent(&self) -> bool {
		match &self.notify_release_stages {
			Some(stages) if !stages.is_empty() => self
				.release_stage
				.as_ref()
				.is_some_and(|stage| stages.contains(stage)),
			_ => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn report() -> CrashReport {
		CrashReport::new(
			"RuntimeError",
			"boom",
			&ReportDefaults::default(),
			MetadataStore::new(),
			Severity::Warning,
		)
	}

	fn staged(stages: &[&str], stage: Option<&str>) -> CrashReport {
		let defaults = ReportDefaults {
			release_stage: stage.map(str::to_string),
			notify_release_stages: stages.iter().map(|s| s.to_string()).collect(),
			..Default::default()
		};
		CrashReport::new("E", "m", &defaults, MetadataStore::new(), Severity::Error)
	}

	#[test]
	fn new_applies_defaults() {
		let mut baseline = MetadataStore::new();
		baseline.add_metadata([("build", json!("debug")), ("region", json!("eu"))], "app");
		let defaults = ReportDefaults {
			release_stage: Some("beta".into()),
			notify_release_stages: vec!["beta".into()],
			metadata: baseline,
		};
		let mut own = MetadataStore::new();
		own.add_metadata([("region", json!("us"))], "app");

		let report = CrashReport::new("E", "m", &defaults, own, Severity::Info);

		assert_eq!(report.release_stage(), Some("beta"));
		assert_eq!(report.notify_release_stages(), Some(&["beta".to_string()][..]));
		assert_eq!(
			report.metadata().to_value(),
			json!({"app": {"build": "debug", "region": "us"}})
		);
		assert_eq!(report.severity(), Severity::Info);
	}

	#[test]
	fn empty_notify_stages_always_send() {
		assert!(staged(&[], None).should_be_sent());
		assert!(staged(&[], Some("staging")).should_be_sent());

		let mut unset = report();
		unset.set_notify_release_stages(None);
		assert!(unset.should_be_sent());
	}

	#[test]
	fn stage_filter_membership() {
		assert!(!staged(&["production"], Some("staging")).should_be_sent());
		assert!(staged(&["production"], Some("production")).should_be_sent());
		assert!(!staged(&["production"], None).should_be_sent());
	}

	#[test]
	fn filter_reads_current_stage() {
		let mut report = staged(&["production"], Some("staging"));
		assert!(!report.should_be_sent());
		report.set_release_stage(Some("production".into()));
		assert!(report.should_be_sent());
	}

	#[test]
	fn top_level_attribute_syncs_typed_property() {
		let mut report = report();
		report.add_attribute("errorClass", Some(json!("Custom")), TOP_LEVEL_TAB);

		assert_eq!(report.error_class(), "Custom");
		assert_eq!(
			report.overrides().get(OverridableField::ErrorClass),
			Some(&json!("Custom"))
		);
		assert!(report.metadata().is_empty());
	}

	#[test]
	fn severity_override_is_canonical() {
		let mut report = report();
		report.add_attribute("severity", Some(json!("info")), TOP_LEVEL_TAB);
		assert_eq!(report.severity(), Severity::Info);

		report.add_attribute("severity", Some(json!("catastrophic")), TOP_LEVEL_TAB);
		assert_eq!(report.severity(), Severity::Error);
		assert_eq!(
			report.overrides().get(OverridableField::Severity),
			Some(&json!("error"))
		);
	}

	#[test]
	fn removing_override_clears_optional_property() {
		let mut report = report();
		report.add_attribute("context", Some(json!("checkout")), TOP_LEVEL_TAB);
		assert_eq!(report.context(), Some("checkout"));

		report.add_attribute("context", None, TOP_LEVEL_TAB);
		assert_eq!(report.context(), None);
		assert!(!report.overrides().contains(OverridableField::Context));

		report.add_attribute("errorClass", Some(json!("X")), TOP_LEVEL_TAB);
		report.add_attribute("errorClass", Some(Value::Null), TOP_LEVEL_TAB);
		assert_eq!(report.error_class(), "X");
		assert!(report.overrides().is_empty());
	}

	#[test]
	fn unknown_and_non_string_overrides_are_ignored() {
		let mut report = report();
		report.add_attribute("apiKey", Some(json!("secret")), TOP_LEVEL_TAB);
		report.add_attribute("errorClass", Some(json!(42)), TOP_LEVEL_TAB);

		assert!(report.overrides().is_empty());
		assert_eq!(report.error_class(), "RuntimeError");
	}

	#[test]
	fn bulk_top_level_write_routes_to_overrides() {
		let mut report = report();
		report.add_metadata(
			[("groupingHash", json!("abc")), ("releaseStage", json!("qa"))],
			TOP_LEVEL_TAB,
		);

		assert_eq!(report.grouping_hash(), Some("abc"));
		assert_eq!(report.release_stage(), Some("qa"));
		assert_eq!(report.overrides().len(), 2);
		assert!(!report.metadata().contains_tab(TOP_LEVEL_TAB));
	}

	#[test]
	fn tabbed_attribute_goes_to_metadata() {
		let mut report = report();
		report.add_metadata([("a", json!(1))], "tab1");
		report.add_metadata([("b", json!(2))], "tab1");
		report.add_attribute("a", None, "tab1");

		assert_eq!(report.metadata().to_value(), json!({"tab1": {"b": 2}}));
		assert!(report.overrides().is_empty());
	}

	#[test]
	fn set_metadata_drops_sentinel_tab() {
		let mut store = MetadataStore::new();
		store.add_metadata([("errorClass", json!("Sneaky"))], TOP_LEVEL_TAB);
		store.add_metadata([("k", json!("v"))], "kept");

		let mut report = report();
		report.set_metadata(store);

		assert!(!report.metadata().contains_tab(TOP_LEVEL_TAB));
		assert!(report.metadata().contains_tab("kept"));
		assert_eq!(report.error_class(), "RuntimeError");
	}

	#[test]
	fn custom_stacktraces_are_prepended() {
		let frame = |name: &str| Frame {
			method: Some(name.into()),
			..Default::default()
		};
		let mut report = report();
		report.set_primary_frames(vec![frame("main")]);
		report.attach_custom_stacktrace(vec![frame("a")], "A");
		report.attach_custom_stacktrace(vec![frame("b")], "B");

		let kinds: Vec<_> = report.stacktraces().map(|s| s.kind.as_str()).collect();
		assert_eq!(kinds, vec!["B", "A", "native"]);
	}
}
