use std::{sync::Arc, time::Duration};

use tokio::{
	sync::{Notify, watch},
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};

use crate::{Error, ResubmitTask, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
	/// The loop stopped after any in-flight cycle finished.
	Drained,
	/// The grace period ran out and the loop was aborted.
	TimedOut,
}

/// Fires a [`ResubmitTask`] on a fixed cadence from a single background task.
///
/// Cycles are awaited inline, so two cycles of one schedule never overlap. Ticks missed while a
/// cycle runs are skipped rather than replayed.
pub struct Scheduler {
	task: Arc<ResubmitTask>,
	interval: Duration,
	initial_delay: Duration,
}
impl Scheduler {
	pub fn new(task: Arc<ResubmitTask>, interval: Duration, initial_delay: Duration) -> Self {
		Self { task, interval, initial_delay }
	}

	pub fn from_config(task: Arc<ResubmitTask>, cfg: &reindex_config::Resubmit) -> Self {
		Self::new(task, cfg.interval(), cfg.initial_delay())
	}

	/// Spawns the schedule on the current tokio runtime.
	pub fn start(self) -> Result<SchedulerHandle> {
		if self.interval.is_zero() {
			return Err(Error::Configuration {
				message: "Resubmission interval must be greater than zero.".to_string(),
			});
		}

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let trigger = Arc::new(Notify::new());
		let join = tokio::spawn(run_schedule(
			self.task,
			self.interval,
			self.initial_delay,
			shutdown_rx,
			trigger.clone(),
		));

		tracing::info!(
			interval_ms = self.interval.as_millis() as u64,
			initial_delay_ms = self.initial_delay.as_millis() as u64,
			"Resubmission scheduler started."
		);

		Ok(SchedulerHandle { join, shutdown_tx, trigger })
	}
}

pub struct SchedulerHandle {
	join: JoinHandle<()>,
	shutdown_tx: watch::Sender<bool>,
	trigger: Arc<Notify>,
}
impl SchedulerHandle {
	/// Requests an extra cycle as soon as the current one, if any, finishes.
	pub fn trigger(&self) {
		self.trigger.notify_one();
	}

	pub fn is_running(&self) -> bool {
		!self.join.is_finished()
	}

	/// Stops new cycles and waits up to `grace` for an in-flight cycle to finish.
	pub async fn shutdown(self, grace: Duration) -> ShutdownOutcome {
		tracing::info!("Resubmission scheduler shutting down.");

		let _ = self.shutdown_tx.send(true);
		let mut join = self.join;

		match time::timeout(grace, &mut join).await {
			Ok(Ok(())) => ShutdownOutcome::Drained,
			Ok(Err(err)) => {
				tracing::error!(error = %err, "Resubmission scheduler task failed.");

				ShutdownOutcome::Drained
			},
			Err(_) => {
				tracing::warn!(
					grace_ms = grace.as_millis() as u64,
					"Resubmission cycle did not finish within the grace period. Aborting."
				);

				join.abort();

				ShutdownOutcome::TimedOut
			},
		}
	}
}

async fn run_schedule(
	task: Arc<ResubmitTask>,
	interval: Duration,
	initial_delay: Duration,
	mut shutdown_rx: watch::Receiver<bool>,
	trigger: Arc<Notify>,
) {
	let mut ticker = time::interval_at(Instant::now() + initial_delay, interval);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

	loop {
		if *shutdown_rx.borrow() {
			break;
		}

		tokio::select! {
			biased;

			changed = shutdown_rx.changed() => {
				if changed.is_err() {
					break;
				}

				continue;
			},
			_ = ticker.tick() => {},
			_ = trigger.notified() => {},
		}

		let report = task.run_cycle().await;

		if report.aborted {
			tracing::warn!("Resubmission cycle aborted. Retrying on the next tick.");
		}
	}

	tracing::info!("Resubmission scheduler stopped.");
}
