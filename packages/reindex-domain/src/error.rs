pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failure record identifier must be non-empty.")]
	EmptyIdentifier,
	#[error("Unknown failure action code: {code}.")]
	UnknownAction { code: String },
}
