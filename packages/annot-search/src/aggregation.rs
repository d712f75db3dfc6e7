use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AGGREGATION_SIZE, ParameterBag, SearchQuery, TermsAggregation};

/// One parsed bucket: the exact field value and how many documents carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationBucket {
	pub label: String,
	pub count: u64,
}

/// A bucketed aggregation request and the parser for its result.
pub trait Aggregation
where
	Self: Send + Sync,
{
	/// Key under which the aggregation is requested and reported.
	fn name(&self) -> &str;

	fn attach(&self, query: &mut SearchQuery, params: &ParameterBag);

	/// Parses this aggregation out of the raw `aggregations` section of an index response.
	/// A missing or malformed section yields no buckets.
	fn parse_result(&self, raw: &Value) -> Vec<AggregationBucket>;
}

/// Most common tags.
#[derive(Debug, Clone, Copy)]
pub struct TagsAggregation {
	limit: u32,
}
impl TagsAggregation {
	pub fn new(limit: u32) -> Self {
		Self { limit }
	}
}
impl Default for TagsAggregation {
	fn default() -> Self {
		Self::new(AGGREGATION_SIZE)
	}
}
impl Aggregation for TagsAggregation {
	fn name(&self) -> &str {
		"tags"
	}

	fn attach(&self, query: &mut SearchQuery, _: &ParameterBag) {
		query.aggregate(
			self.name(),
			TermsAggregation { field: "tags_raw".to_string(), size: self.limit },
		);
	}

	fn parse_result(&self, raw: &Value) -> Vec<AggregationBucket> {
		parse_terms_buckets(raw, self.name())
	}
}

/// Most active users.
#[derive(Debug, Clone, Copy)]
pub struct UsersAggregation {
	limit: u32,
}
impl UsersAggregation {
	pub fn new(limit: u32) -> Self {
		Self { limit }
	}
}
impl Default for UsersAggregation {
	fn default() -> Self {
		Self::new(AGGREGATION_SIZE)
	}
}
impl Aggregation for UsersAggregation {
	fn name(&self) -> &str {
		"users"
	}

	fn attach(&self, query: &mut SearchQuery, _: &ParameterBag) {
		query.aggregate(
			self.name(),
			TermsAggregation { field: "user_raw".to_string(), size: self.limit },
		);
	}

	fn parse_result(&self, raw: &Value) -> Vec<AggregationBucket> {
		parse_terms_buckets(raw, self.name())
	}
}

fn parse_terms_buckets(raw: &Value, name: &str) -> Vec<AggregationBucket> {
	let Some(buckets) = raw.get(name).and_then(|agg| agg.get("buckets")).and_then(Value::as_array)
	else {
		return Vec::new();
	};
	let mut out = Vec::with_capacity(buckets.len());

	for bucket in buckets {
		let label = match bucket.get("key") {
			Some(Value::String(key)) => key.clone(),
			Some(Value::Null) | None => {
				tracing::warn!(aggregation = name, "Skipping aggregation bucket without a key.");

				continue;
			},
			Some(other) => other.to_string(),
		};
		let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);

		out.push(AggregationBucket { label, count });
	}

	out
}
