use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle};

use reindex_domain::{FailureAction, FailureRecord, sanitize};

use crate::FailureStore;

/// Write-path hook that records index submissions the queue did not admit.
///
/// Nothing here returns an error to the caller. The primary write has already succeeded, so a
/// failure to persist the record is logged and otherwise dropped.
#[derive(Clone)]
pub struct FailureReporter {
	store: Arc<dyn FailureStore>,
	store_timeout: Duration,
}
impl FailureReporter {
	pub fn new(store: Arc<dyn FailureStore>, store_timeout: Duration) -> Self {
		Self { store, store_timeout }
	}

	/// Returns whether the failure was persisted.
	pub async fn report_submission_failure(
		&self,
		identifier: &str,
		action: FailureAction,
		description: &str,
	) -> bool {
		let description = sanitize::sanitize_description(description);
		let record =
			match FailureRecord::new(identifier, action, FailureRecord::now_utc(), description) {
				Ok(record) => record,
				Err(err) => {
					tracing::error!(error = %err, %action, "Dropping index submission failure.");

					return false;
				},
			};
		let added = crate::store_call(self.store_timeout, "add", self.store.add(&record)).await;

		match added {
			Ok(()) => {
				tracing::info!(
					identifier = %record.identifier,
					action = %record.action,
					"Recorded index submission failure."
				);

				true
			},
			Err(err) => {
				tracing::error!(
					error = %err,
					identifier = %record.identifier,
					action = %record.action,
					"Failed to record index submission failure."
				);

				false
			},
		}
	}

	/// Records the failure on the current tokio runtime without waiting for it.
	///
	/// Returns `None` when called outside a runtime; the failure is logged and dropped.
	pub fn report_detached(
		&self,
		identifier: impl Into<String>,
		action: FailureAction,
		description: impl Into<String>,
	) -> Option<JoinHandle<bool>> {
		let identifier = identifier.into();
		let description = description.into();
		let handle = match Handle::try_current() {
			Ok(handle) => handle,
			Err(err) => {
				tracing::error!(
					error = %err,
					identifier = %identifier,
					%action,
					"No runtime to record index submission failure."
				);

				return None;
			},
		};
		let reporter = self.clone();

		Some(handle.spawn(async move {
			reporter.report_submission_failure(&identifier, action, &description).await
		}))
	}
}
