#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Corrupt row: {0}")]
	Corrupt(String),
}
impl From<reindex_domain::Error> for Error {
	fn from(err: reindex_domain::Error) -> Self {
		Self::Corrupt(err.to_string())
	}
}
