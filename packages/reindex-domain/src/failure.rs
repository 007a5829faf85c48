use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result};

/// The kind of indexing operation that could not be admitted to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureAction {
	CreateFailure,
	UpdateFailure,
	DeleteFailure,
}
impl FailureAction {
	pub const ALL: [Self; 3] = [Self::CreateFailure, Self::UpdateFailure, Self::DeleteFailure];

	/// Stable code persisted in the failure table.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::CreateFailure => "CREATE_FAILURE",
			Self::UpdateFailure => "UPDATE_FAILURE",
			Self::DeleteFailure => "DELETE_FAILURE",
		}
	}

	/// The request that repairs the index for this failure.
	pub fn request(self) -> IndexRequest {
		match self {
			Self::CreateFailure | Self::UpdateFailure => IndexRequest::Index,
			Self::DeleteFailure => IndexRequest::Deindex,
		}
	}
}
impl fmt::Display for FailureAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for FailureAction {
	type Err = Error;

	fn from_str(code: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|action| action.as_str() == code)
			.ok_or_else(|| Error::UnknownAction { code: code.to_string() })
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexRequest {
	Index,
	Deindex,
}
impl IndexRequest {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Index => "index",
			Self::Deindex => "deindex",
		}
	}
}
impl fmt::Display for IndexRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Result of one attempt to admit an index request.
///
/// Only [`SubmissionOutcome::Accepted`] means the queue took the task. Anything else leaves the
/// failure record in place for the next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
	Accepted,
	Rejected { reason: String },
	Indeterminate { reason: String },
}
impl SubmissionOutcome {
	pub fn rejected(reason: impl Into<String>) -> Self {
		Self::Rejected { reason: reason.into() }
	}

	pub fn indeterminate(reason: impl Into<String>) -> Self {
		Self::Indeterminate { reason: reason.into() }
	}

	pub fn is_accepted(&self) -> bool {
		matches!(self, Self::Accepted)
	}
}

/// Durable evidence that an index request for `identifier` was never admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
	pub identifier: String,
	pub action: FailureAction,
	pub occurred_at: OffsetDateTime,
	pub description: String,
}
impl FailureRecord {
	pub fn new(
		identifier: impl Into<String>,
		action: FailureAction,
		occurred_at: OffsetDateTime,
		description: impl Into<String>,
	) -> Result<Self> {
		let identifier = identifier.into();

		if identifier.trim().is_empty() {
			return Err(Error::EmptyIdentifier);
		}

		Ok(Self { identifier, action, occurred_at, description: description.into() })
	}

	pub fn request(&self) -> IndexRequest {
		self.action.request()
	}

	/// Current time at the microsecond precision the failure table stores.
	pub fn now_utc() -> OffsetDateTime {
		let now = OffsetDateTime::now_utc();
		let micros = now.nanosecond() / 1_000 * 1_000;

		now.replace_nanosecond(micros).unwrap_or(now)
	}

	/// Whether `other` describes the same failure occurrence, not just the same identifier.
	pub fn same_occurrence(&self, other: &Self) -> bool {
		self.identifier == other.identifier
			&& self.action == other.action
			&& self.occurred_at == other.occurred_at
	}
}
