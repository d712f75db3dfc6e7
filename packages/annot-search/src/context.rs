use std::{collections::HashMap, sync::Arc};

/// Group-membership lookup. Implementations are read-only from the search core's point of view
/// and may cache as they see fit.
pub trait GroupService
where
	Self: Send + Sync,
{
	/// Groups whose annotations `userid` may read. `None` is the anonymous reader.
	fn groupids_readable_by(&self, userid: Option<&str>) -> Vec<String>;

	/// Groups created by `userid`.
	fn groupids_created_by(&self, userid: &str) -> Vec<String>;
}

/// URI-equivalence lookup.
pub trait UriExpander
where
	Self: Send + Sync,
{
	/// Every URI known to identify the same resource as `uri`, including `uri` itself.
	fn expand(&self, uri: &str) -> Vec<String>;
}

/// Expander that knows no equivalences.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityUriExpander;
impl UriExpander for IdentityUriExpander {
	fn expand(&self, uri: &str) -> Vec<String> {
		vec![uri.to_string()]
	}
}

/// Fixed group memberships.
///
/// Every reader can read the world groups; members additionally read their own groups.
#[derive(Debug, Clone, Default)]
pub struct StaticGroups {
	world: Vec<String>,
	members: HashMap<String, Vec<String>>,
	creators: HashMap<String, Vec<String>>,
}
impl StaticGroups {
	pub fn new<I, S>(world: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { world: world.into_iter().map(Into::into).collect(), ..Self::default() }
	}

	pub fn with_member<I, S>(mut self, userid: &str, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.members
			.entry(userid.to_string())
			.or_default()
			.extend(groups.into_iter().map(Into::into));

		self
	}

	pub fn with_creator<I, S>(mut self, userid: &str, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.creators
			.entry(userid.to_string())
			.or_default()
			.extend(groups.into_iter().map(Into::into));

		self
	}
}
impl GroupService for StaticGroups {
	fn groupids_readable_by(&self, userid: Option<&str>) -> Vec<String> {
		let mut readable = self.world.clone();

		if let Some(groups) = userid.and_then(|userid| self.members.get(userid)) {
			readable.extend(groups.iter().filter(|group| !self.world.contains(*group)).cloned());
		}

		readable
	}

	fn groupids_created_by(&self, userid: &str) -> Vec<String> {
		self.creators.get(userid).cloned().unwrap_or_default()
	}
}

/// Fixed URI equivalence classes.
#[derive(Debug, Clone, Default)]
pub struct StaticUris {
	classes: Vec<Vec<String>>,
}
impl StaticUris {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares every URI in `uris` equivalent to every other.
	pub fn with_equivalents<I, S>(mut self, uris: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.classes.push(uris.into_iter().map(Into::into).collect());

		self
	}
}
impl UriExpander for StaticUris {
	fn expand(&self, uri: &str) -> Vec<String> {
		self.classes
			.iter()
			.find(|class| class.iter().any(|member| member == uri))
			.cloned()
			.unwrap_or_else(|| vec![uri.to_string()])
	}
}

/// Per-request authorization context.
#[derive(Clone)]
pub struct SearchContext {
	pub userid: Option<String>,
	pub groups: Arc<dyn GroupService>,
	pub uris: Arc<dyn UriExpander>,
}
impl SearchContext {
	pub fn new(userid: Option<String>, groups: Arc<dyn GroupService>) -> Self {
		Self { userid, groups, uris: Arc::new(IdentityUriExpander) }
	}

	pub fn with_uri_expander(mut self, uris: Arc<dyn UriExpander>) -> Self {
		self.uris = uris;

		self
	}
}
impl std::fmt::Debug for SearchContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SearchContext").field("userid", &self.userid).finish_non_exhaustive()
	}
}
