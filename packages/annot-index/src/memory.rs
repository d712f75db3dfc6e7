mod eval;

use std::{collections::BTreeMap, sync::Mutex};

use serde_json::{Map, Value};

use self::eval::SortKey;
use annot_search::{
	BoxFuture, Error, IndexClient, IndexHit, IndexResponse, Result, SearchQuery, SortOrder,
};

/// Page size the index uses when a query carries no window.
const DEFAULT_PAGE_SIZE: u64 = 10;

/// Index that evaluates built queries against a fixed set of JSON documents.
///
/// Every document must carry a string `id`. Executed queries are recorded in order.
pub struct MemoryIndex {
	docs: Vec<Value>,
	executed: Mutex<Vec<SearchQuery>>,
}
impl MemoryIndex {
	pub fn new(docs: impl IntoIterator<Item = Value>) -> Result<Self> {
		let docs = docs.into_iter().collect::<Vec<_>>();

		for (position, doc) in docs.iter().enumerate() {
			if doc.get("id").and_then(Value::as_str).is_none() {
				return Err(Error::InvalidResponse {
					message: format!("Document at position {position} has no string id."),
				});
			}
		}

		Ok(Self { docs, executed: Mutex::new(Vec::new()) })
	}

	/// Parses a JSON array of documents.
	pub fn from_json(raw: &str) -> Result<Self> {
		let docs: Vec<Value> = serde_json::from_str(raw).map_err(|err| Error::InvalidResponse {
			message: format!("Documents must be a JSON array of objects: {err}."),
		})?;

		Self::new(docs)
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	/// Queries executed so far, oldest first.
	pub fn executed(&self) -> Vec<SearchQuery> {
		self.executed.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Evaluates `query` without recording it.
	///
	/// `total` and aggregations cover every match; `search_after` and the window only shape the
	/// returned hits.
	pub fn search(&self, query: &SearchQuery) -> IndexResponse {
		let mut matched =
			self.docs.iter().filter(|doc| eval::matches_query(doc, query)).collect::<Vec<_>>();
		let total = matched.len() as u64;
		let aggregations = aggregate(&matched, query);

		if let Some(sort) = query.sort() {
			let order = sort.order;
			let mut keyed = matched
				.into_iter()
				.map(|doc| (eval::sort_key(doc, &sort.field), doc))
				.collect::<Vec<_>>();

			keyed.sort_by(|(a, _), (b, _)| eval::compare_keys(a.as_ref(), b.as_ref(), order));

			let cursor = query.search_after().and_then(|raw| cursor_key(raw, &sort.field));

			if let Some(cursor) = cursor {
				keyed.retain(|(key, _)| after_cursor(key.as_ref(), &cursor, order));
			}

			matched = keyed.into_iter().map(|(_, doc)| doc).collect();
		}

		let (from, size) = match query.window() {
			Some(window) => (window.from, window.size),
			None => (0, DEFAULT_PAGE_SIZE),
		};
		let hits = matched
			.into_iter()
			.skip(usize::try_from(from).unwrap_or(usize::MAX))
			.take(usize::try_from(size).unwrap_or(usize::MAX))
			.filter_map(|doc| doc.get("id").and_then(Value::as_str))
			.map(|id| IndexHit { id: id.to_string() })
			.collect();

		IndexResponse { total, hits, aggregations }
	}
}
impl IndexClient for MemoryIndex {
	fn execute<'a>(
		&'a self,
		query: &'a SearchQuery,
	) -> BoxFuture<'a, Result<IndexResponse>> {
		Box::pin(async move {
			self.executed.lock().unwrap_or_else(|err| err.into_inner()).push(query.clone());

			Ok(self.search(query))
		})
	}
}
impl std::fmt::Debug for MemoryIndex {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryIndex").field("docs", &self.docs.len()).finish_non_exhaustive()
	}
}

fn cursor_key(raw: &Value, field: &str) -> Option<SortKey> {
	let date = matches!(field, "created" | "updated");

	SortKey::from_value(raw, date)
}

// Documents without a sort value sort last, so they always follow any cursor.
fn after_cursor(key: Option<&SortKey>, cursor: &SortKey, order: SortOrder) -> bool {
	match key {
		Some(key) => match order {
			SortOrder::Asc => key > cursor,
			SortOrder::Desc => key < cursor,
		},
		None => true,
	}
}

fn aggregate(matched: &[&Value], query: &SearchQuery) -> Option<Value> {
	if query.aggregations().is_empty() {
		return None;
	}

	let mut out = Map::new();

	for (name, aggregation) in query.aggregations() {
		let mut counts: BTreeMap<String, u64> = BTreeMap::new();

		for doc in matched {
			let mut labels = eval::values_at(doc, &aggregation.field)
				.into_iter()
				.filter_map(eval::bucket_label)
				.collect::<Vec<_>>();

			labels.sort();
			labels.dedup();

			for label in labels {
				*counts.entry(label).or_default() += 1;
			}
		}

		let mut buckets = counts.into_iter().collect::<Vec<_>>();

		buckets.sort_by(|(a_key, a_count), (b_key, b_count)| {
			b_count.cmp(a_count).then_with(|| a_key.cmp(b_key))
		});
		buckets.truncate(aggregation.size as usize);

		let buckets = buckets
			.into_iter()
			.map(|(key, count)| serde_json::json!({ "key": key, "doc_count": count }))
			.collect::<Vec<_>>();

		out.insert(name.clone(), serde_json::json!({ "buckets": buckets }));
	}

	Some(Value::Object(out))
}
