use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use annot_search::{BoxFuture, Error, IndexClient, IndexHit, IndexResponse, Result, SearchQuery};

/// Elasticsearch-compatible search endpoint for one index.
#[derive(Debug, Clone)]
pub struct ElasticsearchIndex {
	client: Client,
	search_url: String,
}
impl ElasticsearchIndex {
	pub fn new(cfg: &annot_config::Index) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()
			.map_err(|err| Error::Index { message: format!("Failed to build HTTP client: {err}.") })?;
		let search_url = format!("{}/{}/_search", cfg.url.trim_end_matches('/'), cfg.name);

		Ok(Self { client, search_url })
	}

	pub fn search_url(&self) -> &str {
		&self.search_url
	}

	async fn search(&self, query: &SearchQuery) -> Result<IndexResponse> {
		let res = self
			.client
			.post(&self.search_url)
			.json(&query.to_body())
			.send()
			.await
			.map_err(map_reqwest_error)?;
		let status = res.status();

		if !status.is_success() {
			let body = res.text().await.unwrap_or_default();

			tracing::warn!(%status, body = %body, "Index rejected search request.");

			return Err(Error::Index { message: format!("Index returned {status}.") });
		}

		let json: Value = res.json().await.map_err(map_reqwest_error)?;

		parse_search_response(json)
	}
}
impl IndexClient for ElasticsearchIndex {
	fn execute<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<IndexResponse>> {
		Box::pin(self.search(query))
	}
}

/// Maps a transport failure onto the search error taxonomy.
pub fn map_reqwest_error(err: reqwest::Error) -> Error {
	if err.is_timeout() {
		Error::Timeout { message: err.to_string() }
	} else if err.is_decode() {
		Error::InvalidResponse { message: err.to_string() }
	} else {
		Error::Index { message: err.to_string() }
	}
}

/// Reads IDs, the total and raw aggregations from a search response body.
///
/// `hits.total` may be a bare integer or an object with a `value` field.
pub fn parse_search_response(json: Value) -> Result<IndexResponse> {
	let hits = json.get("hits").ok_or_else(|| invalid("Search response is missing hits."))?;
	let total = match hits.get("total") {
		Some(Value::Number(total)) => total.as_u64(),
		Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
		_ => None,
	}
	.ok_or_else(|| invalid("Search response has no usable hits.total."))?;
	let raw_hits = hits
		.get("hits")
		.and_then(Value::as_array)
		.ok_or_else(|| invalid("Search response is missing hits.hits array."))?;
	let mut out = Vec::with_capacity(raw_hits.len());

	for hit in raw_hits {
		let id = hit
			.get("_id")
			.and_then(Value::as_str)
			.ok_or_else(|| invalid("Search hit is missing a string _id."))?;

		out.push(IndexHit { id: id.to_string() });
	}

	let aggregations = json.get("aggregations").filter(|value| !value.is_null()).cloned();

	Ok(IndexResponse { total, hits: out, aggregations })
}

fn invalid(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}
