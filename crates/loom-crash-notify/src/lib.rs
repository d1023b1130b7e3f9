// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery-side handling of Loom crash reports.
//!
//! This crate provides:
//! - [`NotifierConfig`]: API key, release stages and baseline metadata, loaded
//!   from TOML and the environment
//! - [`Notifier`]: builds reports with those defaults, filters them by release
//!   stage and serializes them over the ambient top-level data
//! - [`ReportQueue`]: a bounded queue that takes ownership of reports and feeds
//!   a single worker
//! - [`Delivery`]: the sink trait the worker hands payloads to
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_crash_notify::{LogDelivery, Notifier, NotifierConfig, ReportQueue};
//! use loom_crash_report::{MetadataStore, Severity};
//!
//! let notifier = Arc::new(Notifier::new(NotifierConfig::load(None)?));
//! let queue = ReportQueue::spawn(notifier.clone(), Arc::new(LogDelivery));
//!
//! let report = notifier.report("TimeoutError", "upstream timed out", MetadataStore::new(), Severity::Warning);
//! queue.enqueue(report).await?;
//! queue.shutdown().await?;
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod notifier;
pub mod queue;
pub mod secret;

pub use config::{parse_stage_list, NotifierConfig};
pub use delivery::{Delivery, LogDelivery, MemoryDelivery};
pub use error::{NotifyError, Result};
pub use notifier::{Notifier, NOTIFIER_NAME, NOTIFIER_VERSION};
pub use queue::ReportQueue;
pub use secret::{SecretString, REDACTED};
