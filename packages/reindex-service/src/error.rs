pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Submission for {identifier} rejected: {reason}")]
	SubmissionRejected { identifier: String, reason: String },
	#[error("Submission for {identifier} indeterminate: {reason}")]
	SubmissionIndeterminate { identifier: String, reason: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Invalid record: {message}")]
	InvalidRecord { message: String },
}
impl From<reindex_storage::Error> for Error {
	fn from(err: reindex_storage::Error) -> Self {
		match err {
			reindex_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			reindex_storage::Error::Corrupt(message) => Self::Storage { message },
			reindex_storage::Error::InvalidArgument(message) => Self::InvalidRecord { message },
		}
	}
}

impl From<reindex_domain::Error> for Error {
	fn from(err: reindex_domain::Error) -> Self {
		Self::InvalidRecord { message: err.to_string() }
	}
}
