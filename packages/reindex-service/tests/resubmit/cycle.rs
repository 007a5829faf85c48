use std::{
	sync::{Arc, atomic::Ordering},
	time::Duration,
};

use time::Duration as TimeDuration;

use crate::resubmit::{
	self, MemoryFailureStore, Script, ScriptedSubmitter, SlowSubmitter, record,
};
use reindex_domain::{FailureAction, FailureRecord, IndexRequest, SubmissionOutcome};
use reindex_service::{
	BoxFuture, CycleReport, IndexSubmitter, ResubmitSettings, ResubmitTask, Result,
};

/// Accepts every request after writing `inject` into the store, as a concurrent reporter would.
struct InterleavingSubmitter {
	store: Arc<MemoryFailureStore>,
	inject: FailureRecord,
}
impl IndexSubmitter for InterleavingSubmitter {
	fn submit<'a>(
		&'a self,
		_identifier: &'a str,
		_request: IndexRequest,
	) -> BoxFuture<'a, Result<SubmissionOutcome>> {
		self.store.insert(self.inject.clone());

		Box::pin(async move { Ok(SubmissionOutcome::Accepted) })
	}
}

#[tokio::test]
async fn accepted_records_are_removed() {
	let store = MemoryFailureStore::with_records([
		record("doc-1", FailureAction::CreateFailure, "queue full"),
		record("doc-2", FailureAction::DeleteFailure, "queue full"),
	]);
	let submitter = ScriptedSubmitter::always(SubmissionOutcome::Accepted);
	let task = resubmit::task(store.clone(), submitter.clone());
	let report = task.run_cycle().await;

	assert_eq!(report.scanned, 2);
	assert_eq!(report.accepted, 2);
	assert_eq!(report.removed, 2);
	assert_eq!(report.retained(), 0);
	assert!(store.snapshot().is_empty());
	assert_eq!(
		submitter.calls(),
		vec![
			("doc-1".to_string(), IndexRequest::Index),
			("doc-2".to_string(), IndexRequest::Deindex),
		]
	);
}

#[tokio::test]
async fn rejected_records_stay_unchanged() {
	let store = MemoryFailureStore::with_records([
		record("doc-1", FailureAction::CreateFailure, "queue full"),
		record("doc-2", FailureAction::UpdateFailure, "queue full"),
	]);
	let before = store.snapshot();
	let submitter = ScriptedSubmitter::always(SubmissionOutcome::rejected("queue full"));
	let report = resubmit::task(store.clone(), submitter.clone()).run_cycle().await;

	assert_eq!(report.rejected, 2);
	assert_eq!(report.removed, 0);
	assert_eq!(store.snapshot(), before);
	assert_eq!(submitter.calls().len(), 2);
}

#[tokio::test]
async fn mixed_outcomes_only_remove_admitted_records() {
	let store = MemoryFailureStore::with_records([
		record("doc-1", FailureAction::CreateFailure, "queue full"),
		record("doc-2", FailureAction::UpdateFailure, "queue full"),
		record("doc-3", FailureAction::DeleteFailure, "queue full"),
		record("doc-4", FailureAction::CreateFailure, "queue full"),
	]);
	let submitter = ScriptedSubmitter::with_scripts(
		Script::Outcome(SubmissionOutcome::Accepted),
		[
			("doc-2", Script::Outcome(SubmissionOutcome::rejected("queue full"))),
			("doc-3", Script::Error),
			("doc-4", Script::Outcome(SubmissionOutcome::indeterminate("connection reset"))),
		],
	);
	let report = resubmit::task(store.clone(), submitter.clone()).run_cycle().await;

	assert_eq!(
		report,
		CycleReport {
			scanned: 4,
			accepted: 1,
			removed: 1,
			rejected: 1,
			indeterminate: 1,
			failed: 1,
			..Default::default()
		}
	);
	assert_eq!(store.identifiers(), vec!["doc-2", "doc-3", "doc-4"]);
	assert_eq!(submitter.calls().len(), 4);
}

#[tokio::test]
async fn empty_store_submits_nothing() {
	let store = MemoryFailureStore::with_records([]);
	let submitter = ScriptedSubmitter::always(SubmissionOutcome::Accepted);
	let report = resubmit::task(store.clone(), submitter.clone()).run_cycle().await;

	assert_eq!(report, CycleReport::default());
	assert!(submitter.calls().is_empty());
}

#[tokio::test]
async fn snapshot_failure_aborts_the_cycle() {
	let store = MemoryFailureStore::with_records([record(
		"doc-1",
		FailureAction::CreateFailure,
		"queue full",
	)]);

	store.fail_list.store(true, Ordering::SeqCst);

	let submitter = ScriptedSubmitter::always(SubmissionOutcome::Accepted);
	let report = resubmit::task(store.clone(), submitter.clone()).run_cycle().await;

	assert!(report.aborted);
	assert_eq!(report.scanned, 0);
	assert!(submitter.calls().is_empty());
	assert_eq!(store.identifiers(), vec!["doc-1"]);
}

#[tokio::test]
async fn hanging_submission_counts_as_indeterminate() {
	let store = MemoryFailureStore::with_records([
		record("doc-1", FailureAction::CreateFailure, "queue full"),
		record("doc-2", FailureAction::CreateFailure, "queue full"),
	]);
	let submitter = ScriptedSubmitter::with_scripts(
		Script::Outcome(SubmissionOutcome::Accepted),
		[("doc-1", Script::Hang)],
	);
	let report = resubmit::task(store.clone(), submitter).run_cycle().await;

	assert_eq!(report.indeterminate, 1);
	assert_eq!(report.removed, 1);
	assert_eq!(store.identifiers(), vec!["doc-1"]);
}

#[tokio::test]
async fn removal_failure_keeps_record_for_next_cycle() {
	let store = MemoryFailureStore::with_records([record(
		"doc-1",
		FailureAction::UpdateFailure,
		"queue full",
	)]);

	store.fail_remove.store(true, Ordering::SeqCst);

	let submitter = ScriptedSubmitter::always(SubmissionOutcome::Accepted);
	let task = resubmit::task(store.clone(), submitter.clone());
	let first = task.run_cycle().await;

	assert_eq!(first.failed, 1);
	assert_eq!(store.identifiers(), vec!["doc-1"]);

	store.fail_remove.store(false, Ordering::SeqCst);

	let second = task.run_cycle().await;

	assert_eq!(second.removed, 1);
	assert!(store.snapshot().is_empty());
	assert_eq!(submitter.calls().len(), 2);
}

#[tokio::test]
async fn failure_reported_during_submission_survives_removal() {
	let stale = record("doc-1", FailureAction::CreateFailure, "queue full");
	let mut fresh = record("doc-1", FailureAction::DeleteFailure, "queue full again");

	fresh.occurred_at += TimeDuration::seconds(30);

	let store = MemoryFailureStore::with_records([stale]);
	let submitter = Arc::new(InterleavingSubmitter { store: store.clone(), inject: fresh.clone() });
	let report = resubmit::task(store.clone(), submitter).run_cycle().await;

	assert_eq!(report.accepted, 1);
	assert_eq!(report.superseded, 1);
	assert_eq!(report.removed, 0);
	assert_eq!(store.snapshot(), vec![fresh]);
}

#[tokio::test]
async fn records_added_mid_cycle_wait_for_the_next_cycle() {
	let late = record("doc-9", FailureAction::CreateFailure, "queue full");
	let store = MemoryFailureStore::with_records([record(
		"doc-1",
		FailureAction::CreateFailure,
		"queue full",
	)]);
	let submitter = Arc::new(InterleavingSubmitter { store: store.clone(), inject: late.clone() });
	let task = resubmit::task(store.clone(), submitter);
	let first = task.run_cycle().await;

	assert_eq!(first.scanned, 1);
	assert_eq!(store.snapshot(), vec![late]);

	let second = task.run_cycle().await;

	assert_eq!(second.scanned, 1);
	assert_eq!(second.removed, 1);
}

#[tokio::test]
async fn in_flight_submissions_are_bounded() {
	let store = MemoryFailureStore::with_records((0..10).map(|idx| {
		record(&format!("doc-{idx}"), FailureAction::CreateFailure, "queue full")
	}));
	let submitter = SlowSubmitter::new(Duration::from_millis(40));
	let settings = ResubmitSettings {
		submit_timeout: Duration::from_secs(5),
		store_timeout: Duration::from_secs(5),
		max_in_flight: 3,
	};
	let task = ResubmitTask::new(store.clone(), submitter.clone(), settings);
	let report = task.run_cycle().await;

	assert_eq!(report.removed, 10);
	assert_eq!(submitter.calls.load(Ordering::SeqCst), 10);
	assert!(submitter.peak.load(Ordering::SeqCst) <= 3);
	assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn overlapping_cycle_is_skipped() {
	let store = MemoryFailureStore::with_records([record(
		"doc-1",
		FailureAction::CreateFailure,
		"queue full",
	)]);
	let submitter = SlowSubmitter::new(Duration::from_millis(300));
	let settings = ResubmitSettings {
		submit_timeout: Duration::from_secs(5),
		store_timeout: Duration::from_secs(5),
		max_in_flight: 1,
	};
	let task = Arc::new(ResubmitTask::new(store.clone(), submitter.clone(), settings));
	let running = tokio::spawn({
		let task = task.clone();

		async move { task.run_cycle().await }
	});

	tokio::time::sleep(Duration::from_millis(50)).await;

	let overlapping = task.run_cycle().await;

	assert!(overlapping.skipped);
	assert_eq!(overlapping.scanned, 0);

	let first = running.await.expect("Cycle task panicked.");

	assert_eq!(first.removed, 1);
	assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_record_outlives_accepted_neighbour() {
	let store = MemoryFailureStore::with_records([
		record("doc-3", FailureAction::UpdateFailure, "queue full"),
		record("doc-4", FailureAction::CreateFailure, "queue full"),
	]);
	let submitter = ScriptedSubmitter::with_scripts(
		Script::Outcome(SubmissionOutcome::Accepted),
		[("doc-3", Script::Outcome(SubmissionOutcome::rejected("queue full")))],
	);
	let report = resubmit::task(store.clone(), submitter).run_cycle().await;

	assert_eq!(report.removed, 1);
	assert_eq!(report.retained(), 1);
	assert_eq!(store.identifiers(), vec!["doc-3"]);
}

#[tokio::test]
async fn repeated_rejections_never_drain_the_store() {
	let store = MemoryFailureStore::with_records([
		record("doc-1", FailureAction::CreateFailure, "queue full"),
		record("doc-2", FailureAction::DeleteFailure, "queue full"),
		record("doc-3", FailureAction::UpdateFailure, "queue full"),
	]);
	let before = store.snapshot();
	let submitter = ScriptedSubmitter::always(SubmissionOutcome::indeterminate("unreachable"));
	let task = resubmit::task(store.clone(), submitter.clone());

	for _ in 0..3 {
		assert_eq!(task.run_cycle().await.indeterminate, 3);
	}

	assert_eq!(store.snapshot(), before);
	assert_eq!(submitter.calls().len(), 9);
}
