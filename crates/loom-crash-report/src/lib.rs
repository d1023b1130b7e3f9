// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash report event model for Loom crash analytics.
//!
//! A [`CrashReport`] captures one error event. It is built either from a
//! native crash collector document ([`CrashReport::from_collector`]) or from an
//! error name and message ([`CrashReport::new`]), customised by its owner, and
//! finally rendered into the payload sent to the backend
//! ([`CrashReport::serialize`]).
//!
//! # Overview
//!
//! - [`Severity`] with lenient parsing (unknown strings read as `error`)
//! - [`MetadataStore`]: named tabs of key/value pairs, null deletes a key
//! - [`AttributeOverrides`]: top-level fields customised through
//!   [`TOP_LEVEL_TAB`], which take precedence when serializing
//! - release-stage delivery filtering via [`CrashReport::should_be_sent`]
//! - custom stacktraces prepended ahead of the collector trace
//!
//! # Example
//!
//! ```
//! use loom_crash_report::{CrashReport, MetadataStore, ReportDefaults, Severity, TOP_LEVEL_TAB};
//! use serde_json::{json, Map};
//!
//! let defaults = ReportDefaults {
//!     release_stage: Some("production".into()),
//!     notify_release_stages: vec!["production".into()],
//!     ..Default::default()
//! };
//! let mut report = CrashReport::new("IoError", "disk full", &defaults, MetadataStore::new(), Severity::Warning);
//! report.add_metadata([("free_bytes", json!(0))], "disk");
//! report.add_attribute("context", Some(json!("sync")), TOP_LEVEL_TAB);
//!
//! assert!(report.should_be_sent());
//! let payload = report.serialize(&Map::new());
//! assert_eq!(payload["context"], json!("sync"));
//! assert_eq!(payload["metaData"]["disk"]["free_bytes"], json!(0));
//! ```

pub mod breadcrumb;
pub mod collector;
pub mod error;
pub mod metadata;
pub mod overrides;
pub mod report;
pub mod serialize;
pub mod severity;
pub mod stacktrace;

pub use breadcrumb::{Breadcrumb, BreadcrumbType};
pub use collector::DEFAULT_ERROR_CLASS;
pub use error::{ReportError, Result};
pub use metadata::{AttributeTarget, MetadataStore, Tab, TOP_LEVEL_TAB};
pub use overrides::{AttributeOverrides, OverridableField};
pub use report::{CrashReport, ReportDefaults};
pub use severity::{format_severity, parse_severity, Severity};
pub use stacktrace::{Frame, Stacktrace, ThreadTrace, PRIMARY_STACKTRACE_KIND};
