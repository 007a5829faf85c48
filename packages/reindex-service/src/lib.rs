pub mod pg;
pub mod reporter;
pub mod resubmit;
pub mod scheduler;
pub mod submitter;

mod error;

pub use error::{Error, Result};
pub use pg::{PgFailureStore, PgQueueSubmitter};
pub use reporter::FailureReporter;
pub use resubmit::{CycleReport, ResubmitSettings, ResubmitTask};
pub use scheduler::{Scheduler, SchedulerHandle, ShutdownOutcome};
pub use submitter::HttpSubmitter;

use std::{future::Future, pin::Pin, time::Duration};

use reindex_domain::{FailureRecord, IndexRequest, SubmissionOutcome};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable mapping from identifier to its outstanding [`FailureRecord`].
///
/// Every operation is a single-key atomic statement against the backing medium. Implementations
/// must tolerate concurrent callers from the write path and the resubmission loop.
pub trait FailureStore
where
	Self: Send + Sync,
{
	/// Inserts the record or overwrites the one already stored for its identifier.
	fn add<'a>(&'a self, record: &'a FailureRecord) -> BoxFuture<'a, Result<()>>;

	fn get<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<FailureRecord>>>;

	/// Returns whether a record existed. Removing an absent identifier is not an error.
	fn remove<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<bool>>;

	/// Removes the stored record only while it is still the same occurrence as `record`.
	fn remove_matching<'a>(&'a self, record: &'a FailureRecord) -> BoxFuture<'a, Result<bool>>;

	/// A point-in-time copy of all records, never a live view.
	fn list_all(&self) -> BoxFuture<'_, Result<Vec<FailureRecord>>>;

	fn count(&self) -> BoxFuture<'_, Result<u64>>;
}

/// Admission entry point of the indexing pipeline, shared with the regular write path.
pub trait IndexSubmitter
where
	Self: Send + Sync,
{
	/// An `Err` is a transient failure and is handled like an indeterminate outcome.
	fn submit<'a>(
		&'a self,
		identifier: &'a str,
		request: IndexRequest,
	) -> BoxFuture<'a, Result<SubmissionOutcome>>;
}

/// Error describing why `outcome` did not admit the request, if it did not.
pub fn outcome_error(identifier: &str, outcome: &SubmissionOutcome) -> Option<Error> {
	match outcome {
		SubmissionOutcome::Accepted => None,
		SubmissionOutcome::Rejected { reason } => Some(Error::SubmissionRejected {
			identifier: identifier.to_string(),
			reason: reason.clone(),
		}),
		SubmissionOutcome::Indeterminate { reason } => Some(Error::SubmissionIndeterminate {
			identifier: identifier.to_string(),
			reason: reason.clone(),
		}),
	}
}

pub(crate) async fn store_call<T, F>(timeout: Duration, label: &str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match tokio::time::timeout(timeout, fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::Storage {
			message: format!("Failure store {label} timed out after {}ms.", timeout.as_millis()),
		}),
	}
}
