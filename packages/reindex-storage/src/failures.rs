use sqlx::PgExecutor;

use reindex_domain::FailureRecord;

use crate::{Result, models::IndexFailureRow};

/// Inserts the record, or overwrites the existing record for the same identifier.
pub async fn upsert_failure<'e, E>(executor: E, record: &FailureRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO index_failures (identifier, action, occurred_at, description, updated_at)
VALUES ($1, $2, $3, $4, now())
ON CONFLICT (identifier) DO UPDATE
SET
	action = EXCLUDED.action,
	occurred_at = EXCLUDED.occurred_at,
	description = EXCLUDED.description,
	updated_at = now()",
	)
	.bind(record.identifier.as_str())
	.bind(record.action.as_str())
	.bind(record.occurred_at)
	.bind(record.description.as_str())
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_failure<'e, E>(executor: E, identifier: &str) -> Result<Option<FailureRecord>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, IndexFailureRow>(
		"\
SELECT identifier, action, occurred_at, description, updated_at
FROM index_failures
WHERE identifier = $1",
	)
	.bind(identifier)
	.fetch_optional(executor)
	.await?;

	row.map(FailureRecord::try_from).transpose()
}

/// Returns whether a row was deleted. Deleting an absent identifier is not an error.
pub async fn delete_failure<'e, E>(executor: E, identifier: &str) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM index_failures WHERE identifier = $1")
		.bind(identifier)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

/// Deletes the row only while it still describes the same failure occurrence as `record`.
pub async fn delete_failure_matching<'e, E>(executor: E, record: &FailureRecord) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
DELETE FROM index_failures
WHERE identifier = $1 AND action = $2 AND occurred_at = $3",
	)
	.bind(record.identifier.as_str())
	.bind(record.action.as_str())
	.bind(record.occurred_at)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Point-in-time copy of every outstanding failure.
pub async fn list_failures<'e, E>(executor: E) -> Result<Vec<FailureRecord>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, IndexFailureRow>(
		"\
SELECT identifier, action, occurred_at, description, updated_at
FROM index_failures",
	)
	.fetch_all(executor)
	.await?;

	rows.into_iter().map(FailureRecord::try_from).collect()
}

pub async fn count_failures<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM index_failures")
		.fetch_one(executor)
		.await?;

	Ok(count)
}
