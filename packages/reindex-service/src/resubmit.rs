use std::{sync::Arc, time::Duration};

use tokio::{
	sync::{Mutex, Semaphore},
	task::JoinSet,
	time,
};

use reindex_domain::{FailureRecord, SubmissionOutcome};

use crate::{FailureStore, IndexSubmitter};

#[derive(Debug, Clone)]
pub struct ResubmitSettings {
	pub submit_timeout: Duration,
	pub store_timeout: Duration,
	pub max_in_flight: usize,
}
impl From<&reindex_config::Resubmit> for ResubmitSettings {
	fn from(cfg: &reindex_config::Resubmit) -> Self {
		Self {
			submit_timeout: cfg.submit_timeout(),
			store_timeout: cfg.store_timeout(),
			max_in_flight: cfg.max_in_flight,
		}
	}
}
impl Default for ResubmitSettings {
	fn default() -> Self {
		Self::from(&reindex_config::Resubmit::default())
	}
}

/// Tally of one resubmission cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
	/// Records in the snapshot.
	pub scanned: usize,
	/// Records whose request the queue admitted.
	pub accepted: usize,
	/// Accepted records deleted from the store.
	pub removed: usize,
	/// Accepted records already removed or re-reported by the time of deletion.
	pub superseded: usize,
	pub rejected: usize,
	pub indeterminate: usize,
	/// Records that hit a submitter or store error.
	pub failed: usize,
	/// Another cycle of the same task was still running.
	pub skipped: bool,
	/// The snapshot could not be read; nothing was attempted.
	pub aborted: bool,
}
impl CycleReport {
	fn skipped() -> Self {
		Self { skipped: true, ..Default::default() }
	}

	fn aborted() -> Self {
		Self { aborted: true, ..Default::default() }
	}

	/// Records that remain for the next cycle.
	pub fn retained(&self) -> usize {
		self.rejected + self.indeterminate + self.failed
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordResult {
	Removed,
	Superseded,
	Rejected,
	Indeterminate,
	Failed,
}

/// One pass over all outstanding failure records.
///
/// A record is deleted only after the submitter reports [`SubmissionOutcome::Accepted`] for it.
/// Each record is handled independently: an error on one never stops the others.
pub struct ResubmitTask {
	store: Arc<dyn FailureStore>,
	submitter: Arc<dyn IndexSubmitter>,
	settings: ResubmitSettings,
	cycle_lock: Mutex<()>,
}
impl ResubmitTask {
	pub fn new(
		store: Arc<dyn FailureStore>,
		submitter: Arc<dyn IndexSubmitter>,
		settings: ResubmitSettings,
	) -> Self {
		Self { store, submitter, settings, cycle_lock: Mutex::new(()) }
	}

	pub async fn run_cycle(&self) -> CycleReport {
		let Ok(_guard) = self.cycle_lock.try_lock() else {
			tracing::debug!("Resubmission cycle already running. Skipping.");

			return CycleReport::skipped();
		};
		let snapshot =
			crate::store_call(self.settings.store_timeout, "list_all", self.store.list_all()).await;
		let records = match snapshot {
			Ok(records) => records,
			Err(err) => {
				tracing::error!(error = %err, "Failed to read index failures. Cycle aborted.");

				return CycleReport::aborted();
			},
		};

		if records.is_empty() {
			return CycleReport::default();
		}

		let mut report = CycleReport { scanned: records.len(), ..Default::default() };
		let permits = Arc::new(Semaphore::new(self.settings.max_in_flight.max(1)));
		let mut in_flight = JoinSet::new();

		for record in records {
			let Ok(permit) = permits.clone().acquire_owned().await else {
				break;
			};
			let store = self.store.clone();
			let submitter = self.submitter.clone();
			let settings = self.settings.clone();

			in_flight.spawn(async move {
				let result =
					resubmit_record(store.as_ref(), submitter.as_ref(), &settings, &record).await;

				drop(permit);

				result
			});
		}

		while let Some(joined) = in_flight.join_next().await {
			match joined {
				Ok(result) => tally(&mut report, result),
				Err(err) => {
					tracing::error!(error = %err, "Resubmission task for a record panicked.");

					report.failed += 1;
				},
			}
		}

		match crate::store_call(self.settings.store_timeout, "count", self.store.count()).await {
			Ok(outstanding) => tracing::info!(
				scanned = report.scanned,
				removed = report.removed,
				retained = report.retained(),
				outstanding,
				"Resubmission cycle finished."
			),
			Err(err) => tracing::info!(
				scanned = report.scanned,
				removed = report.removed,
				retained = report.retained(),
				count_error = %err,
				"Resubmission cycle finished."
			),
		}

		report
	}
}

fn tally(report: &mut CycleReport, result: RecordResult) {
	match result {
		RecordResult::Removed => {
			report.accepted += 1;
			report.removed += 1;
		},
		RecordResult::Superseded => {
			report.accepted += 1;
			report.superseded += 1;
		},
		RecordResult::Rejected => report.rejected += 1,
		RecordResult::Indeterminate => report.indeterminate += 1,
		RecordResult::Failed => report.failed += 1,
	}
}

async fn resubmit_record(
	store: &dyn FailureStore,
	submitter: &dyn IndexSubmitter,
	settings: &ResubmitSettings,
	record: &FailureRecord,
) -> RecordResult {
	let identifier = record.identifier.as_str();
	let request = record.request();
	let outcome =
		match time::timeout(settings.submit_timeout, submitter.submit(identifier, request)).await {
			Ok(Ok(outcome)) => outcome,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, identifier, %request, "Index resubmission failed.");

				return RecordResult::Failed;
			},
			Err(_) => SubmissionOutcome::indeterminate(format!(
				"No admission response within {}ms.",
				settings.submit_timeout.as_millis()
			)),
		};

	if let Some(err) = crate::outcome_error(identifier, &outcome) {
		tracing::warn!(error = %err, %request, "Index resubmission not admitted. Keeping record.");

		return match outcome {
			SubmissionOutcome::Rejected { .. } => RecordResult::Rejected,
			_ => RecordResult::Indeterminate,
		};
	}

	let removed =
		crate::store_call(settings.store_timeout, "remove", store.remove_matching(record)).await;

	match removed {
		Ok(true) => {
			tracing::info!(identifier, %request, "Index resubmission admitted. Record removed.");

			RecordResult::Removed
		},
		Ok(false) => {
			tracing::info!(
				identifier,
				%request,
				"Index resubmission admitted. Record was already replaced or removed."
			);

			RecordResult::Superseded
		},
		Err(err) => {
			tracing::error!(
				error = %err,
				identifier,
				"Failed to remove resubmitted index failure. It will be submitted again."
			);

			RecordResult::Failed
		},
	}
}
