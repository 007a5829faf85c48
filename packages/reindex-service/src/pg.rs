use std::sync::Arc;

use reindex_domain::{FailureRecord, IndexRequest, SubmissionOutcome};
use reindex_storage::{
	db::Db,
	failures,
	queue::{self, Admission},
};

use crate::{BoxFuture, Error, FailureStore, IndexSubmitter, Result};

/// [`FailureStore`] backed by the `index_failures` table.
#[derive(Clone)]
pub struct PgFailureStore {
	db: Arc<Db>,
}
impl PgFailureStore {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}
impl FailureStore for PgFailureStore {
	fn add<'a>(&'a self, record: &'a FailureRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(failures::upsert_failure(&self.db.pool, record).await?) })
	}

	fn get<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<FailureRecord>>> {
		Box::pin(async move { Ok(failures::fetch_failure(&self.db.pool, identifier).await?) })
	}

	fn remove<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(failures::delete_failure(&self.db.pool, identifier).await?) })
	}

	fn remove_matching<'a>(&'a self, record: &'a FailureRecord) -> BoxFuture<'a, Result<bool>> {
		Box::pin(
			async move { Ok(failures::delete_failure_matching(&self.db.pool, record).await?) },
		)
	}

	fn list_all(&self) -> BoxFuture<'_, Result<Vec<FailureRecord>>> {
		Box::pin(async move { Ok(failures::list_failures(&self.db.pool).await?) })
	}

	fn count(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move {
			let count = failures::count_failures(&self.db.pool).await?;

			u64::try_from(count)
				.map_err(|_| Error::Storage { message: format!("Negative failure count {count}.") })
		})
	}
}

/// [`IndexSubmitter`] that writes straight into the `indexing_queue` table.
///
/// This is the same admission path the write path uses, so recovery sees identical capacity
/// limits.
#[derive(Clone)]
pub struct PgQueueSubmitter {
	db: Arc<Db>,
	max_pending: i64,
}
impl PgQueueSubmitter {
	pub fn new(db: Arc<Db>, max_pending: i64) -> Self {
		Self { db, max_pending }
	}
}
impl IndexSubmitter for PgQueueSubmitter {
	fn submit<'a>(
		&'a self,
		identifier: &'a str,
		request: IndexRequest,
	) -> BoxFuture<'a, Result<SubmissionOutcome>> {
		Box::pin(async move {
			match queue::enqueue(&self.db.pool, identifier, request, self.max_pending).await {
				Ok(Admission::Queued { task_id }) => {
					tracing::debug!(identifier, %request, %task_id, "Index task queued.");

					Ok(SubmissionOutcome::Accepted)
				},
				Ok(Admission::Full) => Ok(SubmissionOutcome::rejected(format!(
					"Indexing queue is full ({} pending).",
					self.max_pending
				))),
				Err(reindex_storage::Error::InvalidArgument(message)) =>
					Ok(SubmissionOutcome::rejected(message)),
				// The insert may or may not have committed.
				Err(err) => Ok(SubmissionOutcome::indeterminate(err.to_string())),
			}
		})
	}
}
