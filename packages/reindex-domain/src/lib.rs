pub mod failure;
pub mod sanitize;

mod error;

pub use error::{Error, Result};
pub use failure::{FailureAction, FailureRecord, IndexRequest, SubmissionOutcome};
