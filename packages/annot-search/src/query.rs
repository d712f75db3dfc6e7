use serde_json::{Map, Value};

/// Every sort is issued with this unmapped type so that sorting by a field some documents lack
/// behaves as if the field held an empty boolean instead of failing the whole query.
pub const SORT_UNMAPPED_TYPE: &str = "boolean";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
	And,
	Or,
}
impl MatchOperator {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::And => "and",
			Self::Or => "or",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	Desc,
}
impl SortOrder {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"asc" => Some(Self::Asc),
			"desc" => Some(Self::Desc),
			_ => None,
		}
	}
}

/// A single query clause. Rendered to the index's JSON query dialect by [`Clause::to_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
	/// Exact value on a non-analysed field.
	Term { field: String, value: Value },
	/// Exact match on any of `values`.
	Terms { field: String, values: Vec<String> },
	/// Field is present and non-empty.
	Exists { field: String },
	/// Analysed match. `operator` of `None` leaves the engine default (OR across terms).
	Match { field: String, query: String, operator: Option<MatchOperator> },
	/// Free-text query scored across several fields.
	SimpleQueryString { query: String, fields: Vec<String> },
	/// `*` matches any sequence, `?` any single character.
	Wildcard { field: String, pattern: String },
	Bool(BoolClause),
}
impl Clause {
	pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Term { field: field.into(), value: value.into() }
	}

	pub fn terms<I, S>(field: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::Terms { field: field.into(), values: values.into_iter().map(Into::into).collect() }
	}

	pub fn exists(field: impl Into<String>) -> Self {
		Self::Exists { field: field.into() }
	}

	pub fn matches(
		field: impl Into<String>,
		query: impl Into<String>,
		operator: Option<MatchOperator>,
	) -> Self {
		Self::Match { field: field.into(), query: query.into(), operator }
	}

	pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
		Self::Wildcard { field: field.into(), pattern: pattern.into() }
	}

	/// At least one of `clauses` must match.
	pub fn any_of(clauses: impl IntoIterator<Item = Clause>) -> Self {
		Self::Bool(BoolClause { should: clauses.into_iter().collect(), ..BoolClause::default() })
	}

	/// Every one of `clauses` must match.
	pub fn all_of(clauses: impl IntoIterator<Item = Clause>) -> Self {
		Self::Bool(BoolClause { must: clauses.into_iter().collect(), ..BoolClause::default() })
	}

	/// None of `clauses` may match.
	pub fn none_of(clauses: impl IntoIterator<Item = Clause>) -> Self {
		Self::Bool(BoolClause { must_not: clauses.into_iter().collect(), ..BoolClause::default() })
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::Term { field, value } => serde_json::json!({ "term": { field: value } }),
			Self::Terms { field, values } => serde_json::json!({ "terms": { field: values } }),
			Self::Exists { field } => serde_json::json!({ "exists": { "field": field } }),
			Self::Match { field, query, operator: None } => {
				serde_json::json!({ "match": { field: query } })
			},
			Self::Match { field, query, operator: Some(operator) } => {
				serde_json::json!({
					"match": { field: { "query": query, "operator": operator.as_str() } }
				})
			},
			Self::SimpleQueryString { query, fields } => {
				serde_json::json!({ "simple_query_string": { "query": query, "fields": fields } })
			},
			Self::Wildcard { field, pattern } => {
				serde_json::json!({ "wildcard": { field: pattern } })
			},
			Self::Bool(clause) => serde_json::json!({ "bool": clause.to_value() }),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolClause {
	pub must: Vec<Clause>,
	pub filter: Vec<Clause>,
	pub should: Vec<Clause>,
	pub must_not: Vec<Clause>,
}
impl BoolClause {
	pub fn is_empty(&self) -> bool {
		self.must.is_empty()
			&& self.filter.is_empty()
			&& self.should.is_empty()
			&& self.must_not.is_empty()
	}

	fn to_value(&self) -> Value {
		let mut out = Map::new();

		for (name, clauses) in [
			("filter", &self.filter),
			("must", &self.must),
			("should", &self.should),
			("must_not", &self.must_not),
		] {
			if !clauses.is_empty() {
				let rendered = clauses.iter().map(Clause::to_value).collect();

				out.insert(name.to_string(), Value::Array(rendered));
			}
		}

		Value::Object(out)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
	pub field: String,
	pub order: SortOrder,
}

/// Result window `[from, from + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub from: u64,
	pub size: u64,
}
impl Window {
	pub fn end(self) -> u64 {
		self.from.saturating_add(self.size)
	}
}

/// Top-N buckets keyed by the exact value of `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsAggregation {
	pub field: String,
	pub size: u32,
}

/// In-progress structured query.
///
/// Clauses can only be added, never removed, so every modifier in a chain refines what the
/// previous ones built. Sort, search-after and the result window are single slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
	filter: Vec<Clause>,
	must: Vec<Clause>,
	must_not: Vec<Clause>,
	sort: Option<Sort>,
	search_after: Option<Value>,
	window: Option<Window>,
	aggregations: Vec<(String, TermsAggregation)>,
}
impl SearchQuery {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a non-scoring required clause.
	pub fn filter(&mut self, clause: Clause) {
		self.filter.push(clause);
	}

	/// Adds a scoring required clause.
	pub fn query(&mut self, clause: Clause) {
		self.must.push(clause);
	}

	/// Excludes every document matching `clause`.
	pub fn exclude(&mut self, clause: Clause) {
		self.must_not.push(clause);
	}

	pub fn set_sort(&mut self, field: impl Into<String>, order: SortOrder) {
		self.sort = Some(Sort { field: field.into(), order });
	}

	pub fn set_search_after(&mut self, value: Value) {
		self.search_after = Some(value);
	}

	pub fn set_window(&mut self, from: u64, size: u64) {
		self.window = Some(Window { from, size });
	}

	/// Registers a terms aggregation. A later registration under the same name replaces the
	/// earlier one.
	pub fn aggregate(&mut self, name: impl Into<String>, aggregation: TermsAggregation) {
		let name = name.into();

		self.aggregations.retain(|(existing, _)| existing != &name);
		self.aggregations.push((name, aggregation));
	}

	pub fn filters(&self) -> &[Clause] {
		&self.filter
	}

	pub fn musts(&self) -> &[Clause] {
		&self.must
	}

	pub fn exclusions(&self) -> &[Clause] {
		&self.must_not
	}

	pub fn sort(&self) -> Option<&Sort> {
		self.sort.as_ref()
	}

	pub fn search_after(&self) -> Option<&Value> {
		self.search_after.as_ref()
	}

	pub fn window(&self) -> Option<Window> {
		self.window
	}

	pub fn aggregations(&self) -> &[(String, TermsAggregation)] {
		&self.aggregations
	}

	/// True when no clause restricts the document set.
	pub fn is_match_all(&self) -> bool {
		self.filter.is_empty() && self.must.is_empty() && self.must_not.is_empty()
	}

	pub fn query_value(&self) -> Value {
		if self.is_match_all() {
			return serde_json::json!({ "match_all": {} });
		}

		let clause = BoolClause {
			must: self.must.clone(),
			filter: self.filter.clone(),
			should: Vec::new(),
			must_not: self.must_not.clone(),
		};

		serde_json::json!({ "bool": clause.to_value() })
	}

	/// Full request body. Document sources are never requested; callers only need IDs.
	pub fn to_body(&self) -> Value {
		let mut body = Map::new();

		body.insert("query".to_string(), self.query_value());
		body.insert("_source".to_string(), Value::Bool(false));

		if let Some(window) = self.window {
			body.insert("from".to_string(), Value::from(window.from));
			body.insert("size".to_string(), Value::from(window.size));
		}
		if let Some(sort) = &self.sort {
			body.insert(
				"sort".to_string(),
				serde_json::json!([{
					sort.field.as_str(): {
						"order": sort.order.as_str(),
						"unmapped_type": SORT_UNMAPPED_TYPE,
					}
				}]),
			);
		}
		if let Some(search_after) = &self.search_after {
			body.insert("search_after".to_string(), Value::Array(vec![search_after.clone()]));
		}
		if !self.aggregations.is_empty() {
			let mut aggs = Map::new();

			for (name, aggregation) in &self.aggregations {
				aggs.insert(
					name.clone(),
					serde_json::json!({
						"terms": { "field": aggregation.field, "size": aggregation.size }
					}),
				);
			}

			body.insert("aggs".to_string(), Value::Object(aggs));
		}

		Value::Object(body)
	}
}
