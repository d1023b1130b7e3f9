// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery sinks for serialized payloads.
//!
//! Transport (HTTP, retries, persistence) lives behind [`Delivery`]; this crate
//! only ships sinks that log or collect payloads.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{NotifyError, Result};
use crate::secret::REDACTED;

const API_KEY: &str = "apiKey";

/// Destination for rendered crash payloads.
#[async_trait]
pub trait Delivery: Send + Sync {
	async fn deliver(&self, payload: Map<String, Value>) -> Result<()>;
}

/// Writes each payload to the log instead of sending it anywhere. The API
/// key is masked before logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl Delivery for LogDelivery {
	async fn deliver(&self, mut payload: Map<String, Value>) -> Result<()> {
		if let Some(api_key) = payload.get_mut(API_KEY) {
			*api_key = Value::from(REDACTED);
		}
		let error_class = text(&payload, "errorClass");
		let severity = text(&payload, "severity");
		let body = serde_json::to_string(&payload)?;
		info!(
			error_class,
			severity,
			bytes = body.len(),
			payload = %body,
			"crash payload"
		);
		Ok(())
	}
}

fn text<'a>(payload: &'a Map<String, Value>, key: &str) -> &'a str {
	payload.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Keeps payloads in memory, optionally refusing everything.
#[derive(Debug, Default)]
pub struct MemoryDelivery {
	payloads: Mutex<Vec<Map<String, Value>>>,
	reject: bool,
}

impl MemoryDelivery {
	pub fn new() -> Self {
		Self::default()
	}

	/// A sink whose every delivery fails.
	pub fn rejecting() -> Self {
		Self {
			payloads: Mutex::new(Vec::new()),
			reject: true,
		}
	}

	pub async fn payloads(&self) -> Vec<Map<String, Value>> {
		self.payloads.lock().await.clone()
	}

	pub async fn len(&self) -> usize {
		self.payloads.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.payloads.lock().await.is_empty()
	}
}

#[async_trait]
impl Delivery for MemoryDelivery {
	async fn deliver(&self, payload: Map<String, Value>) -> Result<()> {
		if self.reject {
			return Err(NotifyError::Delivery("sink rejects all payloads".to_string()));
		}
		self.payloads.lock().await.push(payload);
		Ok(())
	}
}
