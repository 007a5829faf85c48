use time::OffsetDateTime;

use reindex_domain::{FailureRecord, IndexRequest};

use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
pub struct IndexFailureRow {
	pub identifier: String,
	pub action: String,
	pub occurred_at: OffsetDateTime,
	pub description: String,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<IndexFailureRow> for FailureRecord {
	type Error = Error;

	fn try_from(row: IndexFailureRow) -> Result<Self> {
		let action = row.action.parse()?;

		Ok(FailureRecord::new(row.identifier, action, row.occurred_at, row.description)?)
	}
}

/// Queue operation code for an index request.
pub fn queue_op(request: IndexRequest) -> &'static str {
	match request {
		IndexRequest::Index => "INDEX",
		IndexRequest::Deindex => "DEINDEX",
	}
}
