use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use annot_index::MemoryIndex;
use annot_search::{
	AggregationBucket, BoxFuture, Clause, IndexClient, IndexResponse, Instrumentation,
	ParameterBag, Search, SearchContext, SearchLimits, SearchOptions, SearchQuery, SortOrder,
	StaticGroups, StaticUris, TagsAggregation, UsersAggregation, Window,
};
use annot_testkit::{FailingIndex, RecordingStats};

const ALICE: &str = "acct:alice@example.com";
const BOB: &str = "acct:bob@example.com";

fn doc(id: &str, fields: Value) -> Value {
	let mut doc = json!({ "id": id, "shared": true, "group": "__world__" });

	if let (Some(target), Value::Object(fields)) = (doc.as_object_mut(), fields) {
		target.extend(fields);
	}

	doc
}

fn groups() -> StaticGroups {
	StaticGroups::new(["__world__"])
		.with_member(ALICE, ["private"])
		.with_creator(ALICE, ["private"])
}

fn context(userid: Option<&str>) -> SearchContext {
	SearchContext::new(userid.map(str::to_string), Arc::new(groups()))
}

fn search_over(index: Arc<dyn IndexClient>, userid: Option<&str>, separate: bool) -> Search {
	let options = SearchOptions { separate_replies: separate, ..SearchOptions::default() };

	Search::new(index, &context(userid), options)
}

fn params(pairs: &[(&str, &str)]) -> ParameterBag {
	pairs.iter().copied().collect()
}

fn memory(docs: Vec<Value>) -> Arc<MemoryIndex> {
	Arc::new(MemoryIndex::new(docs).expect("Fixture documents must have ids."))
}

fn threaded_docs() -> Vec<Value> {
	vec![
		doc("a", json!({ "updated": "2020-01-03T00:00:00+00:00" })),
		doc("b", json!({ "updated": "2020-01-02T00:00:00+00:00" })),
		doc("c", json!({ "updated": "2020-01-01T00:00:00+00:00" })),
		doc("r1", json!({ "references": ["a"], "updated": "2020-02-01T00:00:00+00:00" })),
		doc("r2", json!({ "references": ["a", "b"], "updated": "2020-02-02T00:00:00+00:00" })),
		doc("r3", json!({ "references": ["c"], "updated": "2020-02-03T00:00:00+00:00" })),
		doc("other", json!({ "references": ["zzz"] })),
	]
}

#[test]
fn no_params_adds_only_authorization_clauses() {
	let search = search_over(memory(Vec::new()), None, false);
	let query = search.build_query(&mut ParameterBag::new());

	assert!(query.musts().is_empty());
	assert_eq!(
		query.filters(),
		&[
			Clause::term("shared", true),
			Clause::terms("group", ["__world__"]),
			Clause::any_of([
				Clause::none_of([Clause::term("nipsa", true)]),
				Clause::exists("thread_ids"),
			]),
		]
	);
	assert_eq!(query.exclusions(), &[Clause::exists("deleted")]);
	assert_eq!(query.window(), Some(Window { from: 0, size: 20 }));
	assert_eq!(
		query.sort().map(|sort| (sort.field.as_str(), sort.order)),
		Some(("updated", SortOrder::Desc))
	);
}

#[test]
fn catch_all_adds_one_clause_per_leftover_value() {
	let search = search_over(memory(Vec::new()), None, false);
	let query = search.build_query(&mut params(&[("foo", "bar")]));
	let leftovers = |query: &SearchQuery| {
		query
			.filters()
			.iter()
			.filter(|clause| matches!(clause, Clause::Match { .. }))
			.cloned()
			.collect::<Vec<_>>()
	};

	assert_eq!(leftovers(&query), vec![Clause::matches("foo", "bar", None)]);

	let query = search.build_query(&mut params(&[("foo", "bar"), ("foo", "baz")]));

	assert_eq!(
		leftovers(&query),
		vec![Clause::matches("foo", "bar", None), Clause::matches("foo", "baz", None)]
	);
}

#[test]
fn recognised_keys_never_reach_the_catch_all() {
	let search = search_over(memory(Vec::new()), None, false);
	let mut bag = params(&[
		("tag", "a"),
		("user", "Bob"),
		("limit", "5"),
		("sort", "created"),
		("any", "text"),
		("uri", "http://example.com"),
		("group", "__world__"),
	]);
	let query = search.build_query(&mut bag);

	assert!(bag.is_empty());
	assert!(!query.filters().iter().any(|clause| matches!(clause, Clause::Match { .. })));
	assert_eq!(query.window(), Some(Window { from: 0, size: 5 }));
}

#[tokio::test]
async fn separate_replies_issue_a_second_query_for_primary_ids() {
	let index = memory(threaded_docs());
	let search = search_over(index.clone(), None, true);
	let result = search
		.run(params(&[("limit", "3"), ("offset", "0")]))
		.await
		.expect("Search failed.");

	assert_eq!(result.total(), 3);
	assert_eq!(result.annotation_ids(), ["a", "b", "c"]);

	let mut replies = result.reply_ids().to_vec();

	replies.sort();

	assert_eq!(replies, ["r1", "r2", "r3"]);

	let executed = index.executed();

	assert_eq!(executed.len(), 2);

	let (primary, secondary) = (&executed[0], &executed[1]);

	assert_eq!(
		secondary.musts(),
		&[Clause::all_of([Clause::terms("references", ["a", "b", "c"])])]
	);
	assert_eq!(secondary.filters(), primary.filters());
	assert_eq!(secondary.exclusions(), &[Clause::exists("deleted")]);
	assert_eq!(
		primary.exclusions(),
		&[Clause::exists("references"), Clause::exists("deleted")]
	);
	assert_eq!(secondary.window(), Some(Window { from: 0, size: 200 }));
}

#[tokio::test]
async fn replies_ignore_aggregations_and_caller_pagination() {
	let index = memory(threaded_docs());
	let mut search = search_over(index.clone(), None, true);

	search.append_aggregation(TagsAggregation::default());

	search.run(params(&[("offset", "1"), ("limit", "1")])).await.expect("Search failed.");

	let executed = index.executed();

	assert_eq!(executed[0].aggregations().len(), 1);
	assert!(executed[1].aggregations().is_empty());
	assert_eq!(executed[1].window(), Some(Window { from: 0, size: 200 }));
}

#[tokio::test]
async fn reply_overflow_truncates_without_failing() {
	let index = memory(threaded_docs());
	let limits = SearchLimits { replies_limit: 1, ..SearchLimits::default() };
	let options = SearchOptions { separate_replies: true, limits, instrumentation: None };
	let search = Search::new(index, &context(None), options);
	let result = search.run(ParameterBag::new()).await.expect("Overflow must not fail.");

	assert_eq!(result.annotation_ids().len(), 3);
	assert_eq!(result.reply_ids().len(), 1);
}

#[tokio::test]
async fn replies_are_empty_unless_requested() {
	let search = search_over(memory(threaded_docs()), None, false);
	let result = search.run(ParameterBag::new()).await.expect("Search failed.");

	assert_eq!(result.total(), 7);
	assert!(result.reply_ids().is_empty());
}

#[tokio::test]
async fn cleared_pipeline_runs_a_sort_only_query() {
	let index = memory(vec![
		doc("shared", json!({})),
		doc("private", json!({ "shared": false })),
		doc("deleted", json!({ "deleted": true })),
	]);
	let mut search = search_over(index.clone(), None, false);

	search.append_aggregation(TagsAggregation::default());
	search.clear();

	let result = search.run(params(&[("foo", "bar")])).await.expect("Search failed.");
	let executed = index.executed();
	let query = &executed[0];

	assert!(query.is_match_all());
	assert!(query.aggregations().is_empty());
	assert_eq!(query.window(), None);
	assert_eq!(query.sort().map(|sort| sort.field.as_str()), Some("updated"));
	assert_eq!(result.total(), 3);
	assert!(result.aggregations().is_empty());
}

#[test]
fn appended_modifiers_run_first_and_newest_first() {
	let order = Arc::new(Mutex::new(Vec::new()));
	let mut search = search_over(memory(Vec::new()), None, false);
	let first = order.clone();
	let second = order.clone();

	search.append_modifier(move |query: &mut SearchQuery, params: &mut ParameterBag| {
		first.lock().expect("lock").push("first");

		if let Some(value) = params.pop("custom") {
			query.filter(Clause::term("custom_raw", value));
		}
	});
	search.append_modifier(move |_: &mut SearchQuery, params: &mut ParameterBag| {
		second.lock().expect("lock").push("second");
		// Runs ahead of the sorter, so the caller's sort never lands.
		params.pop("sort");
	});

	let query = search.build_query(&mut params(&[("custom", "x"), ("sort", "created")]));

	assert_eq!(*order.lock().expect("lock"), vec!["second", "first"]);
	assert_eq!(query.sort().map(|sort| sort.field.as_str()), Some("updated"));
	assert!(query.filters().contains(&Clause::term("custom_raw", "x")));
	assert!(!query.filters().iter().any(|clause| matches!(clause, Clause::Match { .. })));
}

#[tokio::test]
async fn aggregations_are_parsed_per_name() {
	let index = memory(vec![
		doc("1", json!({ "tags": ["rust", "search"], "user": ALICE })),
		doc("2", json!({ "tags": ["rust"], "user": BOB })),
		doc("3", json!({ "tags": ["go"], "user": BOB })),
	]);
	let mut search = search_over(index, None, false);

	search.append_aggregation(TagsAggregation::new(2));
	search.append_aggregation(UsersAggregation::default());

	let result = search.run(ParameterBag::new()).await.expect("Search failed.");
	let bucket = |label: &str, count| AggregationBucket { label: label.to_string(), count };

	assert_eq!(result.aggregations()["tags"], vec![bucket("rust", 2), bucket("go", 1)]);
	assert_eq!(result.aggregations()["users"], vec![bucket(BOB, 2), bucket(ALICE, 1)]);
}

struct EmptyAggregations;
impl IndexClient for EmptyAggregations {
	fn execute<'a>(
		&'a self,
		_: &'a SearchQuery,
	) -> BoxFuture<'a, annot_search::Result<IndexResponse>> {
		Box::pin(async {
			Ok(IndexResponse { total: 0, hits: Vec::new(), aggregations: Some(json!({})) })
		})
	}
}

#[tokio::test]
async fn empty_aggregation_section_yields_empty_map() {
	let mut search = search_over(Arc::new(EmptyAggregations), None, false);

	search.append_aggregation(TagsAggregation::default());

	let result = search.run(ParameterBag::new()).await.expect("Search failed.");

	assert!(result.aggregations().is_empty());
}

#[tokio::test]
async fn anonymous_readers_see_shared_documents_only() {
	let docs = vec![
		doc("public", json!({ "user": BOB })),
		doc("draft", json!({ "user": ALICE, "shared": false })),
		doc("private-group", json!({ "user": ALICE, "group": "private" })),
		doc("gone", json!({ "user": BOB, "deleted": true })),
	];
	let anonymous = search_over(memory(docs.clone()), None, false);
	let alice = search_over(memory(docs), Some(ALICE), false);

	let result = anonymous.run(ParameterBag::new()).await.expect("Search failed.");

	assert_eq!(result.annotation_ids(), ["public"]);

	let result = alice.run(ParameterBag::new()).await.expect("Search failed.");
	let mut ids = result.annotation_ids().to_vec();

	ids.sort();

	assert_eq!(ids, ["draft", "private-group", "public"]);
}

#[tokio::test]
async fn unreadable_group_yields_no_results() {
	let docs = vec![doc("secret", json!({ "group": "private" }))];
	let search = search_over(memory(docs), Some(BOB), false);
	let result =
		search.run(params(&[("group", "private")])).await.expect("Misuse is not an error.");

	assert_eq!(result.total(), 0);
	assert!(result.annotation_ids().is_empty());
}

#[tokio::test]
async fn suppressed_documents_stay_visible_to_author_and_group_creator() {
	let docs = vec![
		doc("flagged", json!({ "user": BOB, "nipsa": true })),
		doc("flagged-private", json!({ "user": BOB, "nipsa": true, "group": "private" })),
		doc("flagged-thread", json!({ "user": BOB, "nipsa": true, "thread_ids": ["t"] })),
		doc("clean", json!({ "user": BOB })),
	];
	let sorted_ids = |ids: &[String]| {
		let mut ids = ids.to_vec();

		ids.sort();

		ids
	};

	let anonymous = search_over(memory(docs.clone()), None, false);
	let result = anonymous.run(ParameterBag::new()).await.expect("Search failed.");

	assert_eq!(sorted_ids(result.annotation_ids()), ["clean", "flagged-thread"]);

	let author = Search::new(
		memory(docs.clone()),
		&SearchContext::new(
			Some(BOB.to_string()),
			Arc::new(StaticGroups::new(["__world__", "private"])),
		),
		SearchOptions::default(),
	);
	let result = author.run(ParameterBag::new()).await.expect("Search failed.");

	assert_eq!(
		sorted_ids(result.annotation_ids()),
		["clean", "flagged", "flagged-private", "flagged-thread"]
	);

	let creator = search_over(memory(docs), Some(ALICE), false);
	let result = creator.run(ParameterBag::new()).await.expect("Search failed.");

	assert_eq!(
		sorted_ids(result.annotation_ids()),
		["clean", "flagged-private", "flagged-thread"]
	);
}

#[tokio::test]
async fn uri_filters_match_normalized_and_equivalent_scopes() {
	let docs = vec![
		doc("page", json!({ "target": [{ "scope": ["httpx://example.com/page"] }] })),
		doc("mirror", json!({ "target": [{ "scope": ["httpx://mirror.example.org/page"] }] })),
		doc("pdf", json!({ "target": [{ "scope": ["urn:x-pdf:abc"] }] })),
	];
	let uris = StaticUris::new()
		.with_equivalents(["https://example.com/page", "http://mirror.example.org/page"]);
	let ctx = SearchContext::new(None, Arc::new(groups())).with_uri_expander(Arc::new(uris));
	let search = Search::new(memory(docs), &ctx, SearchOptions::default());

	let result = search
		.run(params(&[("uri", "https://EXAMPLE.com/page/#frag")]))
		.await
		.expect("Search failed.");

	assert_eq!(result.annotation_ids(), ["page"]);

	let result = search
		.run(params(&[("url", "https://example.com/page")]))
		.await
		.expect("Search failed.");
	let mut ids = result.annotation_ids().to_vec();

	ids.sort();

	assert_eq!(ids, ["mirror", "page"]);

	let result =
		search.run(params(&[("wildcard_uri", "urn:x-pdf:*")])).await.expect("Search failed.");

	assert_eq!(result.annotation_ids(), ["pdf"]);
}

#[test]
fn host_wildcards_are_rejected_before_the_chain_runs() {
	let limits = SearchLimits::default();

	for raw in ["http:*.com/", "https:*/page", " http://*.example.com/"] {
		let err = annot_search::validate_params(&params(&[("wildcard_uri", raw)]), &limits)
			.expect_err("Host wildcard must be rejected.");

		assert!(err.to_string().contains("wildcard_uri"), "Unexpected error: {err}");
	}

	assert!(
		annot_search::validate_params(&params(&[("wildcard_uri", "http://example.com/*")]), &limits)
			.is_ok()
	);
}

#[tokio::test]
async fn text_tag_and_user_matchers_narrow_results() {
	let docs = vec![
		doc("1", json!({ "user": BOB, "tags": ["machine learning"], "text": "Neural nets" })),
		doc("2", json!({ "user": ALICE, "tags": ["machine"], "text": "Lathe" })),
	];
	let search = search_over(memory(docs), None, false);

	let result = search
		.run(params(&[("tag", "machine learning")]))
		.await
		.expect("Search failed.");

	assert_eq!(result.annotation_ids(), ["1"]);

	let result = search
		.run(params(&[("user", "ACCT:ALICE@EXAMPLE.COM")]))
		.await
		.expect("Search failed.");

	assert_eq!(result.annotation_ids(), ["2"]);

	let result = search.run(params(&[("any", "lathe")])).await.expect("Search failed.");

	assert_eq!(result.annotation_ids(), ["2"]);
}

#[tokio::test]
async fn instrumentation_counts_each_execution() {
	let stats = Arc::new(RecordingStats::new());
	let options = SearchOptions {
		separate_replies: true,
		instrumentation: Some(Instrumentation::new(stats.clone(), "search.query")),
		..SearchOptions::default()
	};
	let search = Search::new(memory(threaded_docs()), &context(None), options);

	search.run(ParameterBag::new()).await.expect("Search failed.");

	assert_eq!(stats.counters(), ["search.query.success", "search.query.success"]);
	assert_eq!(stats.timings().len(), 2);
	assert!(stats.timings().iter().all(|(key, _)| key == "search.query"));
}

#[tokio::test]
async fn execution_failures_propagate_after_being_counted() {
	for (index, counter) in [
		(FailingIndex::timeout(), "search.query.timeout"),
		(FailingIndex::unavailable(), "search.query.error"),
	] {
		let index = Arc::new(index);
		let stats = Arc::new(RecordingStats::new());
		let options = SearchOptions {
			separate_replies: true,
			instrumentation: Some(Instrumentation::new(stats.clone(), "search.query")),
			..SearchOptions::default()
		};
		let search = Search::new(index.clone(), &context(None), options);
		let err = search.run(ParameterBag::new()).await.expect_err("Execution must fail.");

		assert_eq!(err.is_timeout(), counter.ends_with("timeout"));
		assert_eq!(stats.counters(), [counter]);
		assert_eq!(stats.timings().len(), 1);
		assert_eq!(index.calls(), 1, "Replies must not be fetched after a failed primary query.");
	}
}
