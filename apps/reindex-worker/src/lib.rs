use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use reindex_config::{Config, SubmitterKind};
use reindex_service::{
	HttpSubmitter, IndexSubmitter, PgFailureStore, PgQueueSubmitter, ResubmitSettings,
	ResubmitTask, Scheduler, ShutdownOutcome,
};
use reindex_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = reindex_cli::VERSION,
	rename_all = "kebab",
	styles = reindex_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Run a single resubmission cycle and exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = reindex_config::load(&args.config)?;

	init_tracing(&config)?;

	tracing::info!(version = reindex_cli::VERSION, "Reindex worker starting.");

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let db = Arc::new(db);
	let store = Arc::new(PgFailureStore::new(db.clone()));
	let submitter = build_submitter(&config, db)?;
	let task = Arc::new(ResubmitTask::new(
		store,
		submitter,
		ResubmitSettings::from(&config.resubmit),
	));

	if args.once {
		let report = task.run_cycle().await;

		tracing::info!(?report, "Single resubmission cycle finished.");

		if report.aborted {
			return Err(eyre::eyre!("Resubmission cycle aborted; failure store unavailable."));
		}

		return Ok(());
	}

	let handle = Scheduler::from_config(task, &config.resubmit).start()?;

	tokio::signal::ctrl_c().await?;

	match handle.shutdown(config.resubmit.shutdown_grace()).await {
		ShutdownOutcome::Drained => tracing::info!("Reindex worker stopped."),
		ShutdownOutcome::TimedOut => tracing::warn!("Reindex worker stopped mid-cycle."),
	}

	Ok(())
}

/// The submitter the write path admits index requests through.
pub fn build_submitter(
	config: &Config,
	db: Arc<Db>,
) -> color_eyre::Result<Arc<dyn IndexSubmitter>> {
	match config.submitter.kind {
		SubmitterKind::Queue => Ok(Arc::new(PgQueueSubmitter::new(db, config.queue.max_pending))),
		SubmitterKind::Http => {
			let http = config.submitter.http.as_ref().ok_or_else(|| {
				eyre::eyre!("submitter.http is required when submitter.kind is \"http\".")
			})?;

			Ok(Arc::new(HttpSubmitter::new(http)?))
		},
	}
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
