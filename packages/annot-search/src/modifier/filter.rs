use std::sync::Arc;

use crate::{
	Clause, GroupService, ParameterBag, SearchQuery, UriExpander, modifier::Modifier,
	uri::{normalize_uri, wildcard_pattern},
};

const SCOPE_FIELD: &str = "target.scope";

/// Excludes soft-deleted documents. Documents are only ever marked deleted in the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletedFilter;
impl Modifier for DeletedFilter {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		query.exclude(Clause::exists("deleted"));
	}
}

/// Only shared documents, or the requesting user's own documents.
#[derive(Debug, Clone, Default)]
pub struct AuthFilter {
	userid: Option<String>,
}
impl AuthFilter {
	pub fn new(userid: Option<String>) -> Self {
		Self { userid }
	}
}
impl Modifier for AuthFilter {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		match &self.userid {
			None => query.filter(Clause::term("shared", true)),
			Some(userid) => query.filter(Clause::any_of([
				Clause::term("shared", true),
				Clause::term("user_raw", userid.as_str()),
			])),
		}
	}
}

/// Only documents created by users of one authority.
#[derive(Debug, Clone)]
pub struct AuthorityFilter {
	authority: String,
}
impl AuthorityFilter {
	pub fn new(authority: impl Into<String>) -> Self {
		Self { authority: authority.into() }
	}
}
impl Modifier for AuthorityFilter {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		query.filter(Clause::term("authority", self.authority.as_str()));
	}
}

/// Exact scope match against `uri` / `url` and every URI equivalent to them.
#[derive(Clone)]
pub struct UriFilter {
	uris: Arc<dyn UriExpander>,
}
impl UriFilter {
	pub fn new(uris: Arc<dyn UriExpander>) -> Self {
		Self { uris }
	}
}
impl Modifier for UriFilter {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let mut requested = params.pop_all("uri");

		requested.extend(params.pop_all("url"));

		if requested.is_empty() {
			return;
		}

		let scopes = expand_and_normalize(self.uris.as_ref(), &requested);

		query.filter(Clause::terms(SCOPE_FIELD, scopes));
	}
}

/// Wildcard scope match against `wildcard_uri`.
///
/// Values are expected to have passed [`crate::wildcard_uri_is_valid`] upstream.
#[derive(Clone)]
pub struct UriWildcardFilter {
	uris: Arc<dyn UriExpander>,
}
impl UriWildcardFilter {
	pub fn new(uris: Arc<dyn UriExpander>) -> Self {
		Self { uris }
	}
}
impl Modifier for UriWildcardFilter {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let requested = params.pop_all("wildcard_uri");

		if requested.is_empty() {
			return;
		}

		let patterns = expand_and_normalize(self.uris.as_ref(), &requested)
			.iter()
			.map(|uri| Clause::wildcard(SCOPE_FIELD, wildcard_pattern(uri)))
			.collect::<Vec<_>>();

		query.filter(Clause::any_of(patterns));
	}
}

/// Narrows to the `group` parameter when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFilter;
impl Modifier for GroupFilter {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		if let Some(group) = params.pop("group") {
			query.filter(Clause::term("group", group));
		}
	}
}

/// Restricts to the groups the requester may read, whatever `group` asked for.
#[derive(Clone)]
pub struct GroupAuthFilter {
	groups: Arc<dyn GroupService>,
	userid: Option<String>,
}
impl GroupAuthFilter {
	pub fn new(groups: Arc<dyn GroupService>, userid: Option<String>) -> Self {
		Self { groups, userid }
	}
}
impl Modifier for GroupAuthFilter {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		let readable = self.groups.groupids_readable_by(self.userid.as_deref());

		query.filter(Clause::terms("group", readable));
	}
}

/// Only documents by the given users. User IDs compare case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter;
impl Modifier for UserFilter {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let users = params.pop_all("user");

		if users.is_empty() {
			return;
		}

		query.filter(Clause::terms("user", users.iter().map(|user| user.to_lowercase())));
	}
}

/// Hides moderated ("NIPSA") documents from general search.
///
/// A document passes if it is not flagged, if it has reply threads, if it belongs to the
/// requester, or if it sits in a group the requester created.
#[derive(Clone)]
pub struct SuppressionFilter {
	groups: Arc<dyn GroupService>,
	userid: Option<String>,
}
impl SuppressionFilter {
	pub fn new(groups: Arc<dyn GroupService>, userid: Option<String>) -> Self {
		Self { groups, userid }
	}
}
impl Modifier for SuppressionFilter {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		let mut should = vec![
			Clause::none_of([Clause::term("nipsa", true)]),
			Clause::exists("thread_ids"),
		];

		if let Some(userid) = &self.userid {
			should.push(Clause::term("user", userid.to_lowercase()));

			let created = self.groups.groupids_created_by(userid);

			if !created.is_empty() {
				should.push(Clause::terms("group", created));
			}
		}

		query.filter(Clause::any_of(should));
	}
}

/// Drops replies so only top-level annotations match.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopLevelOnlyFilter;
impl Modifier for TopLevelOnlyFilter {
	fn modify(&self, query: &mut SearchQuery, _: &mut ParameterBag) {
		query.exclude(Clause::exists("references"));
	}
}

fn expand_and_normalize(expander: &dyn UriExpander, requested: &[String]) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for uri in requested {
		for expanded in expander.expand(uri) {
			let normalized = normalize_uri(&expanded);

			if !out.contains(&normalized) {
				out.push(normalized);
			}
		}
	}

	out
}
