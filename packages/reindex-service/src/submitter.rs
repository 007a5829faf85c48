use std::time::Duration;

use reqwest::{
	Client, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

use reindex_config::HttpSubmitterConfig;
use reindex_domain::{IndexRequest, SubmissionOutcome};

use crate::{BoxFuture, Error, IndexSubmitter, Result};

/// [`IndexSubmitter`] for an indexing queue that admits tasks over HTTP.
pub struct HttpSubmitter {
	client: Client,
	url: String,
	headers: HeaderMap,
}
impl HttpSubmitter {
	pub fn new(cfg: &HttpSubmitterConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()
			.map_err(|err| Error::Configuration { message: err.to_string() })?;
		let headers = request_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;

		Ok(Self { client, url: format!("{}{}", cfg.api_base, cfg.path), headers })
	}
}
impl IndexSubmitter for HttpSubmitter {
	fn submit<'a>(
		&'a self,
		identifier: &'a str,
		request: IndexRequest,
	) -> BoxFuture<'a, Result<SubmissionOutcome>> {
		Box::pin(async move {
			let body = serde_json::json!({ "identifier": identifier, "op": request });
			let res = self
				.client
				.post(self.url.as_str())
				.headers(self.headers.clone())
				.json(&body)
				.send()
				.await;

			Ok(match res {
				Ok(res) => classify_status(res.status()),
				Err(err) => SubmissionOutcome::indeterminate(err.to_string()),
			})
		})
	}
}

fn request_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let invalid = |message: String| Error::Configuration { message };
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		let value = format!("Bearer {api_key}").parse().map_err(|_| {
			invalid("submitter.http.api_key is not a valid header value.".to_string())
		})?;

		headers.insert(AUTHORIZATION, value);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(invalid("Default header values must be strings.".to_string()));
		};
		let name = HeaderName::from_bytes(key.as_bytes())
			.map_err(|err| invalid(format!("Invalid header name {key:?}: {err}.")))?;
		let value = raw.parse().map_err(|_| invalid(format!("Invalid value for header {key:?}.")))?;

		headers.insert(name, value);
	}

	Ok(headers)
}

fn classify_status(status: StatusCode) -> SubmissionOutcome {
	if status.is_success() {
		return SubmissionOutcome::Accepted;
	}

	let reason = format!("Indexing queue responded with {status}.");

	match status {
		StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT =>
			SubmissionOutcome::indeterminate(reason),
		_ => SubmissionOutcome::rejected(reason),
	}
}
