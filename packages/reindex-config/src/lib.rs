mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, HttpSubmitterConfig, Postgres, Queue, Resubmit, Service, Storage, Submitter,
	SubmitterKind,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.queue.max_pending <= 0 {
		return Err(Error::Validation {
			message: "queue.max_pending must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("resubmit.interval_ms", cfg.resubmit.interval_ms),
		("resubmit.submit_timeout_ms", cfg.resubmit.submit_timeout_ms),
		("resubmit.store_timeout_ms", cfg.resubmit.store_timeout_ms),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.resubmit.max_in_flight == 0 {
		return Err(Error::Validation {
			message: "resubmit.max_in_flight must be greater than zero.".to_string(),
		});
	}
	if cfg.submitter.kind == SubmitterKind::Http {
		let Some(http) = cfg.submitter.http.as_ref() else {
			return Err(Error::Validation {
				message: "submitter.http must be set when submitter.kind is http.".to_string(),
			});
		};

		if http.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: "submitter.http.api_base must be non-empty.".to_string(),
			});
		}
		if http.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "submitter.http.timeout_ms must be greater than zero.".to_string(),
			});
		}
		if http.default_headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: "submitter.http.default_headers values must be strings.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if let Some(http) = cfg.submitter.http.as_mut() {
		if http.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			http.api_key = None;
		}

		http.api_base = http.api_base.trim_end_matches('/').to_string();
	}
}
