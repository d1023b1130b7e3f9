// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded report queue drained by a single worker task.
//!
//! Reports are moved into the queue, so once enqueued a report is owned by the
//! worker alone.

use std::sync::Arc;

use loom_crash_report::CrashReport;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::delivery::Delivery;
use crate::error::{NotifyError, Result};
use crate::notifier::Notifier;

/// Handle for submitting reports to the delivery worker.
pub struct ReportQueue {
	sender: mpsc::Sender<CrashReport>,
	worker: JoinHandle<usize>,
}

impl ReportQueue {
	/// Spawn the worker on the current tokio runtime.
	///
	/// Capacity comes from the notifier configuration.
	pub fn spawn(notifier: Arc<Notifier>, delivery: Arc<dyn Delivery>) -> Self {
		let capacity = notifier.config().queue_capacity.max(1);
		let (sender, receiver) = mpsc::channel(capacity);
		let worker = tokio::spawn(run_worker(receiver, notifier, delivery));
		debug!(capacity, "report queue started");
		Self { sender, worker }
	}

	/// Hand a report over to the worker, waiting while the queue is full.
	pub async fn enqueue(&self, report: CrashReport) -> Result<()> {
		self.sender
			.send(report)
			.await
			.map_err(|_| NotifyError::QueueClosed)
	}

	/// Hand a report over without waiting; fails when the queue is full.
	pub fn try_enqueue(&self, report: CrashReport) -> Result<()> {
		self.sender.try_send(report).map_err(|e| match e {
			mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
			mpsc::error::TrySendError::Closed(_) => NotifyError::QueueClosed,
		})
	}

	/// Stop accepting reports, drain the queue and return how many payloads
	/// were delivered.
	pub async fn shutdown(self) -> Result<usize> {
		drop(self.sender);
		let delivered = self
			.worker
			.await
			.map_err(|e| NotifyError::Worker(e.to_string()))?;
		info!(delivered, "report queue shut down");
		Ok(delivered)
	}
}

async fn run_worker(
	mut receiver: mpsc::Receiver<CrashReport>,
	notifier: Arc<Notifier>,
	delivery: Arc<dyn Delivery>,
) -> usize {
	let mut delivered = 0;
	while let Some(report) = receiver.recv().await {
		let Some(payload) = notifier.prepare(&report) else {
			continue;
		};
		match delivery.deliver(payload).await {
			Ok(()) => {
				delivered += 1;
				debug!(error_class = report.error_class(), "report delivered");
			}
			Err(e) => {
				error!(error = %e, error_class = report.error_class(), "failed to deliver report");
			}
		}
	}
	delivered
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::NotifierConfig;
	use crate::delivery::MemoryDelivery;
	use loom_crash_report::{MetadataStore, Severity};

	fn notifier(capacity: usize) -> Arc<Notifier> {
		Arc::new(Notifier::new(NotifierConfig {
			api_key: "k".into(),
			release_stage: Some("production".into()),
			notify_release_stages: vec!["production".into()],
			queue_capacity: capacity,
			..Default::default()
		}))
	}

	#[tokio::test]
	async fn delivers_enqueued_reports_in_order() {
		let notifier = notifier(4);
		let sink = Arc::new(MemoryDelivery::new());
		let queue = ReportQueue::spawn(notifier.clone(), sink.clone());

		for i in 0..3 {
			let report = notifier.report(format!("E{i}"), "m", MetadataStore::new(), Severity::Error);
			queue.enqueue(report).await.unwrap();
		}

		assert_eq!(queue.shutdown().await.unwrap(), 3);
		let classes: Vec<_> = sink
			.payloads()
			.await
			.iter()
			.map(|p| p["errorClass"].as_str().unwrap().to_string())
			.collect();
		assert_eq!(classes, vec!["E0", "E1", "E2"]);
	}

	#[tokio::test]
	async fn filtered_reports_are_not_delivered() {
		let notifier = notifier(4);
		let sink = Arc::new(MemoryDelivery::new());
		let queue = ReportQueue::spawn(notifier.clone(), sink.clone());

		let mut report = notifier.report("E", "m", MetadataStore::new(), Severity::Error);
		report.set_release_stage(Some("development".into()));
		queue.enqueue(report).await.unwrap();

		assert_eq!(queue.shutdown().await.unwrap(), 0);
		assert!(sink.is_empty().await);
	}

	#[tokio::test]
	async fn try_enqueue_hands_over_without_waiting() {
		let notifier = notifier(2);
		let sink = Arc::new(MemoryDelivery::new());
		let queue = ReportQueue::spawn(notifier.clone(), sink.clone());

		let report = notifier.report("E", "m", MetadataStore::new(), Severity::Error);
		queue.try_enqueue(report).unwrap();

		assert_eq!(queue.shutdown().await.unwrap(), 1);
		assert_eq!(sink.len().await, 1);
	}

	#[tokio::test]
	async fn try_enqueue_reports_full_queue() {
		let notifier = notifier(1);
		let sink = Arc::new(MemoryDelivery::new());
		let queue = ReportQueue::spawn(notifier.clone(), sink.clone());

		// the worker cannot drain until this task yields
		let first = notifier.report("E1", "m", MetadataStore::new(), Severity::Error);
		let second = notifier.report("E2", "m", MetadataStore::new(), Severity::Error);
		queue.try_enqueue(first).unwrap();
		assert!(matches!(queue.try_enqueue(second), Err(NotifyError::QueueFull)));

		assert_eq!(queue.shutdown().await.unwrap(), 1);
		assert_eq!(sink.len().await, 1);
	}

	#[tokio::test]
	async fn enqueue_fails_once_worker_is_gone() {
		let notifier = notifier(1);
		let (sender, receiver) = mpsc::channel(1);
		drop(receiver);
		let queue = ReportQueue {
			sender,
			worker: tokio::spawn(async { 0 }),
		};

		let report = notifier.report("E", "m", MetadataStore::new(), Severity::Error);
		assert!(matches!(queue.try_enqueue(report.clone()), Err(NotifyError::QueueClosed)));
		assert!(matches!(queue.enqueue(report).await, Err(NotifyError::QueueClosed)));
		assert_eq!(queue.shutdown().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn delivery_failures_do_not_stop_worker() {
		let notifier = notifier(4);
		let queue = ReportQueue::spawn(notifier.clone(), Arc::new(MemoryDelivery::rejecting()));

		for _ in 0..2 {
			let report = notifier.report("E", "m", MetadataStore::new(), Severity::Error);
			queue.enqueue(report).await.unwrap();
		}

		assert_eq!(queue.shutdown().await.unwrap(), 0);
	}
}
