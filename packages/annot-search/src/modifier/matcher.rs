use std::collections::HashSet;

use crate::{Clause, MatchOperator, ParameterBag, SearchQuery, modifier::Modifier};

/// Fields searched by the `any` parameter.
pub const ANY_FIELDS: [&str; 4] = ["quote", "tags", "text", "uri.parts"];

/// Free-text query across [`ANY_FIELDS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyMatcher;
impl Modifier for AnyMatcher {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let terms = params.pop_all("any");

		if terms.is_empty() {
			return;
		}

		query.query(Clause::SimpleQueryString {
			query: terms.join(" "),
			fields: ANY_FIELDS.iter().map(|field| field.to_string()).collect(),
		});
	}
}

/// Requires every tag given as `tag` or `tags`. Each tag must match in full.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagsMatcher;
impl Modifier for TagsMatcher {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let mut requested = params.pop_all("tag");

		requested.extend(params.pop_all("tags"));

		let mut seen = HashSet::new();
		let matchers = requested
			.into_iter()
			.filter(|tag| seen.insert(tag.clone()))
			.map(|tag| Clause::matches("tags", tag, Some(MatchOperator::And)))
			.collect::<Vec<_>>();

		if matchers.is_empty() {
			return;
		}

		query.query(Clause::all_of(matchers));
	}
}

/// Catch-all: one exact-match clause per leftover key/value pair.
///
/// Repeated values for one key produce independent clauses, so `user=a&user=b` requires both.
/// Drains the bag; it must be the last modifier a query sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueMatcher;
impl Modifier for KeyValueMatcher {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		for (key, value) in params.drain() {
			query.filter(Clause::matches(key, value, None));
		}
	}
}

/// Replies to any of the given annotations.
#[derive(Debug, Clone, Default)]
pub struct RepliesMatcher {
	annotation_ids: Vec<String>,
}
impl RepliesMatcher {
	pub fn new(annotation_ids: Vec<String>) -> Self {
		Self { annotation_ids }
	}
}
impl Modifier for RepliesMatcher {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		query.query(Clause::all_of([Clause::terms("references", self.annotation_ids.clone())]));
	}
}
