use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub queue: Queue,
	#[serde(default)]
	pub resubmit: Resubmit,
	#[serde(default)]
	pub submitter: Submitter,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Admission limits of the indexing queue shared with the write path.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Queue {
	/// Pending tasks beyond this count are rejected as "queue full".
	pub max_pending: i64,
}
impl Default for Queue {
	fn default() -> Self {
		Self { max_pending: 10_000 }
	}
}

/// Cadence and bounds of the failed submission recovery loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Resubmit {
	/// Time between cycle starts.
	pub interval_ms: u64,
	/// Delay before the first cycle. Zero fires immediately.
	pub initial_delay_ms: u64,
	pub submit_timeout_ms: u64,
	pub store_timeout_ms: u64,
	pub shutdown_grace_ms: u64,
	/// Upper bound on records resubmitted concurrently within one cycle.
	pub max_in_flight: usize,
}
impl Resubmit {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	pub fn initial_delay(&self) -> Duration {
		Duration::from_millis(self.initial_delay_ms)
	}

	pub fn submit_timeout(&self) -> Duration {
		Duration::from_millis(self.submit_timeout_ms)
	}

	pub fn store_timeout(&self) -> Duration {
		Duration::from_millis(self.store_timeout_ms)
	}

	pub fn shutdown_grace(&self) -> Duration {
		Duration::from_millis(self.shutdown_grace_ms)
	}
}
impl Default for Resubmit {
	fn default() -> Self {
		Self {
			interval_ms: 60_000,
			initial_delay_ms: 0,
			submit_timeout_ms: 5_000,
			store_timeout_ms: 5_000,
			shutdown_grace_ms: 10_000,
			max_in_flight: 4,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitterKind {
	#[default]
	Queue,
	Http,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Submitter {
	pub kind: SubmitterKind,
	pub http: Option<HttpSubmitterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSubmitterConfig {
	pub api_base: String,
	#[serde(default = "default_submit_path")]
	pub path: String,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_http_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_submit_path() -> String {
	"/index/tasks".to_string()
}

fn default_http_timeout_ms() -> u64 {
	5_000
}
