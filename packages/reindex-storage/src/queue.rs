use sqlx::PgExecutor;
use uuid::Uuid;

use reindex_domain::IndexRequest;

use crate::{Error, Result, models};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
	Queued { task_id: Uuid },
	Full,
}

/// Admits an index task unless `max_pending` tasks are already waiting.
///
/// The capacity check and the insert run as one statement.
pub async fn enqueue<'e, E>(
	executor: E,
	identifier: &str,
	request: IndexRequest,
	max_pending: i64,
) -> Result<Admission>
where
	E: PgExecutor<'e>,
{
	if identifier.trim().is_empty() {
		return Err(Error::InvalidArgument("identifier must be non-empty.".to_string()));
	}

	let task_id = Uuid::new_v4();
	let inserted: Option<Uuid> = sqlx::query_scalar(
		"\
INSERT INTO indexing_queue (task_id, identifier, op, status)
SELECT $1, $2, $3, 'PENDING'
WHERE (SELECT count(*) FROM indexing_queue WHERE status IN ('PENDING','FAILED')) < $4
RETURNING task_id",
	)
	.bind(task_id)
	.bind(identifier)
	.bind(models::queue_op(request))
	.bind(max_pending)
	.fetch_optional(executor)
	.await?;

	Ok(match inserted {
		Some(task_id) => Admission::Queued { task_id },
		None => Admission::Full,
	})
}
