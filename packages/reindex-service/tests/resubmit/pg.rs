use std::sync::Arc;

use sqlx::PgPool;

use reindex_config::Postgres;
use reindex_domain::{FailureAction, IndexRequest, SubmissionOutcome};
use reindex_service::{
	FailureReporter, FailureStore, IndexSubmitter, PgFailureStore, PgQueueSubmitter, ResubmitTask,
};
use reindex_storage::db::Db;
use reindex_testkit::TestDatabase;

use crate::resubmit::{record, settings};

#[derive(sqlx::FromRow)]
struct QueueRow {
	op: String,
}

async fn open_tasks(pool: &PgPool, identifier: &str) -> Vec<QueueRow> {
	sqlx::query_as::<_, QueueRow>(
		"\
SELECT op
FROM indexing_queue
WHERE identifier = $1 AND status IN ('PENDING','FAILED')
ORDER BY created_at ASC",
	)
	.bind(identifier)
	.fetch_all(pool)
	.await
	.expect("Failed to read indexing queue.")
}

async fn connect(test_db: &TestDatabase) -> Arc<Db> {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 4 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	Arc::new(db)
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set REINDEX_PG_DSN to run."]
async fn recovered_failures_land_in_the_indexing_queue() {
	let Some(base_dsn) = reindex_testkit::env_dsn() else {
		eprintln!(
			"Skipping recovered_failures_land_in_the_indexing_queue; set REINDEX_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let store = Arc::new(PgFailureStore::new(db.clone()));
	let reporter = FailureReporter::new(store.clone(), settings().store_timeout);

	assert!(
		reporter
			.report_submission_failure("doc-1", FailureAction::CreateFailure, "queue full")
			.await
	);
	assert!(
		reporter
			.report_submission_failure("doc-2", FailureAction::DeleteFailure, "queue full")
			.await
	);

	let submitter = Arc::new(PgQueueSubmitter::new(db.clone(), 100));
	let report = ResubmitTask::new(store.clone(), submitter, settings()).run_cycle().await;

	assert_eq!(report.removed, 2);
	assert_eq!(store.count().await.expect("Failed to count failures."), 0);

	let doc_1 = open_tasks(&db.pool, "doc-1").await;
	let doc_2 = open_tasks(&db.pool, "doc-2").await;

	assert_eq!(doc_1.len(), 1);
	assert_eq!(doc_1[0].op, "INDEX");
	assert_eq!(doc_2.len(), 1);
	assert_eq!(doc_2[0].op, "DEINDEX");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set REINDEX_PG_DSN to run."]
async fn full_queue_keeps_failures_in_place() {
	let Some(base_dsn) = reindex_testkit::env_dsn() else {
		eprintln!("Skipping full_queue_keeps_failures_in_place; set REINDEX_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let store = Arc::new(PgFailureStore::new(db.clone()));
	let submitter = PgQueueSubmitter::new(db.clone(), 1);

	assert_eq!(
		submitter.submit("doc-0", IndexRequest::Index).await.expect("Submit failed."),
		SubmissionOutcome::Accepted
	);

	let pending = record("doc-1", FailureAction::UpdateFailure, "queue full");

	store.add(&pending).await.expect("Failed to add failure.");

	let report =
		ResubmitTask::new(store.clone(), Arc::new(submitter), settings()).run_cycle().await;

	assert_eq!(report.rejected, 1);
	assert_eq!(store.list_all().await.expect("Failed to list failures."), vec![pending]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
