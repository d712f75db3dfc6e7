use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use serde_json::Value;

use crate::{
	Aggregation, AggregationBucket, AnyMatcher, AuthFilter, DeletedFilter, GroupAuthFilter,
	GroupFilter, IndexClient, IndexResponse, Instrumentation, KeyValueMatcher, Limiter, Modifier,
	ParameterBag, RepliesMatcher, Result, SearchContext, SearchLimits, SearchQuery, Sorter,
	SuppressionFilter, TagsMatcher, TopLevelOnlyFilter, UriFilter, UriWildcardFilter, UserFilter,
};

/// Outcome of one [`Search::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
	total: u64,
	annotation_ids: Vec<String>,
	reply_ids: Vec<String>,
	aggregations: BTreeMap<String, Vec<AggregationBucket>>,
}
impl SearchResult {
	pub fn new(
		total: u64,
		annotation_ids: Vec<String>,
		reply_ids: Vec<String>,
		aggregations: BTreeMap<String, Vec<AggregationBucket>>,
	) -> Self {
		Self { total, annotation_ids, reply_ids, aggregations }
	}

	/// Total number of matching top-level documents, independent of pagination.
	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn annotation_ids(&self) -> &[String] {
		&self.annotation_ids
	}

	/// Replies to [`SearchResult::annotation_ids`]. Empty unless separate-replies mode is on.
	pub fn reply_ids(&self) -> &[String] {
		&self.reply_ids
	}

	pub fn aggregations(&self) -> &BTreeMap<String, Vec<AggregationBucket>> {
		&self.aggregations
	}
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
	/// Return top-level annotations and their replies as two lists.
	pub separate_replies: bool,
	pub limits: SearchLimits,
	pub instrumentation: Option<Instrumentation>,
}

/// Ordered modifier chain plus aggregations over one index.
///
/// One instance serves one request. The catch-all [`KeyValueMatcher`] lives in its own trailing
/// slot, so nothing appended through [`Search::append_modifier`] can run after it.
pub struct Search {
	index: Arc<dyn IndexClient>,
	separate_replies: bool,
	limits: SearchLimits,
	instrumentation: Option<Instrumentation>,
	modifiers: Vec<Box<dyn Modifier>>,
	catch_all: Option<KeyValueMatcher>,
	aggregations: Vec<Box<dyn Aggregation>>,
}
impl Search {
	pub fn new(index: Arc<dyn IndexClient>, ctx: &SearchContext, options: SearchOptions) -> Self {
		let SearchOptions { separate_replies, limits, instrumentation } = options;
		let modifiers: Vec<Box<dyn Modifier>> = vec![
			Box::new(Sorter),
			Box::new(Limiter::new(limits)),
			Box::new(DeletedFilter),
			Box::new(AuthFilter::new(ctx.userid.clone())),
			Box::new(UriFilter::new(ctx.uris.clone())),
			Box::new(UriWildcardFilter::new(ctx.uris.clone())),
			Box::new(GroupFilter),
			Box::new(GroupAuthFilter::new(ctx.groups.clone(), ctx.userid.clone())),
			Box::new(UserFilter),
			Box::new(SuppressionFilter::new(ctx.groups.clone(), ctx.userid.clone())),
			Box::new(AnyMatcher),
			Box::new(TagsMatcher),
		];

		Self {
			index,
			separate_replies,
			limits,
			instrumentation,
			modifiers,
			catch_all: Some(KeyValueMatcher),
			aggregations: Vec::new(),
		}
	}

	/// Drops every filter, matcher and aggregation except the sort.
	pub fn clear(&mut self) {
		self.modifiers = vec![Box::new(Sorter)];
		self.catch_all = None;
		self.aggregations.clear();
	}

	/// Adds a modifier at the front of the chain.
	pub fn append_modifier<M>(&mut self, modifier: M)
	where
		M: Modifier + 'static,
	{
		self.modifiers.insert(0, Box::new(modifier));
	}

	pub fn append_aggregation<A>(&mut self, aggregation: A)
	where
		A: Aggregation + 'static,
	{
		self.aggregations.push(Box::new(aggregation));
	}

	pub fn separate_replies(&self) -> bool {
		self.separate_replies
	}

	/// Builds the primary annotations query without executing it.
	pub fn build_query(&self, params: &mut ParameterBag) -> SearchQuery {
		let leading = self.separate_replies.then_some(&TopLevelOnlyFilter as &dyn Modifier);

		self.build(leading, &self.aggregations, params)
	}

	pub async fn run(&self, mut params: ParameterBag) -> Result<SearchResult> {
		let (total, annotation_ids, aggregations) = self.search_annotations(&mut params).await?;
		let reply_ids = if self.separate_replies {
			self.search_replies(&annotation_ids).await?
		} else {
			Vec::new()
		};

		Ok(SearchResult::new(total, annotation_ids, reply_ids, aggregations))
	}

	fn build(
		&self,
		leading: Option<&dyn Modifier>,
		aggregations: &[Box<dyn Aggregation>],
		params: &mut ParameterBag,
	) -> SearchQuery {
		let mut query = SearchQuery::new();

		if let Some(modifier) = leading {
			modifier.modify(&mut query, params);
		}

		for modifier in &self.modifiers {
			modifier.modify(&mut query, params);
		}

		match &self.catch_all {
			Some(catch_all) => catch_all.modify(&mut query, params),
			None if !params.is_empty() => {
				tracing::debug!(
					keys = ?params.remaining_keys(),
					"Parameters left unmatched by a cleared modifier chain."
				);
			},
			None => {},
		}

		for aggregation in aggregations {
			aggregation.attach(&mut query, params);
		}

		query
	}

	async fn execute(&self, query: &SearchQuery) -> Result<IndexResponse> {
		match &self.instrumentation {
			Some(instrumentation) => instrumentation.instrument(self.index.execute(query)).await,
			None => self.index.execute(query).await,
		}
	}

	async fn search_annotations(
		&self,
		params: &mut ParameterBag,
	) -> Result<(u64, Vec<String>, BTreeMap<String, Vec<AggregationBucket>>)> {
		let query = self.build_query(params);

		tracing::debug!(query = %query.to_body(), "Executing annotations query.");

		let response = self.execute(&query).await?;
		let aggregations = self.parse_aggregation_results(response.aggregations.as_ref());
		let annotation_ids = response.hits.into_iter().map(|hit| hit.id).collect();

		Ok((response.total, annotation_ids, aggregations))
	}

	async fn search_replies(&self, annotation_ids: &[String]) -> Result<Vec<String>> {
		// Replies are fetched in one page sized by the replies limit, never by the caller's
		// pagination, and without aggregations.
		let matcher = RepliesMatcher::new(annotation_ids.to_vec());
		let mut params: ParameterBag =
			[("limit", self.limits.replies_limit.to_string())].into_iter().collect();
		let query = self.build(Some(&matcher as &dyn Modifier), &[], &mut params);

		tracing::debug!(query = %query.to_body(), "Executing replies query.");

		let response = self.execute(&query).await?;

		if (response.hits.len() as u64) < response.total {
			tracing::warn!(
				returned = response.hits.len(),
				total = response.total,
				"Reply count exceeded the page size of the replies query. Replies are not paginated, so the surplus is dropped."
			);
		}

		Ok(response.hits.into_iter().map(|hit| hit.id).collect())
	}

	fn parse_aggregation_results(
		&self,
		raw: Option<&Value>,
	) -> BTreeMap<String, Vec<AggregationBucket>> {
		let Some(raw) = raw.filter(|raw| raw.as_object().is_some_and(|map| !map.is_empty())) else {
			return BTreeMap::new();
		};

		self.aggregations
			.iter()
			.map(|aggregation| (aggregation.name().to_string(), aggregation.parse_result(raw)))
			.collect()
	}
}
