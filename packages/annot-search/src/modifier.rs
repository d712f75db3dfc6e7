mod filter;
mod matcher;
mod paging;

pub use filter::{
	AuthFilter, AuthorityFilter, DeletedFilter, GroupAuthFilter, GroupFilter, SuppressionFilter,
	TopLevelOnlyFilter, UriFilter, UriWildcardFilter, UserFilter,
};
pub use matcher::{ANY_FIELDS, AnyMatcher, KeyValueMatcher, RepliesMatcher, TagsMatcher};
pub use paging::{Limiter, Sorter, parse_date_millis};

use crate::{ParameterBag, SearchQuery};

/// One step of query construction.
///
/// A modifier refines `query` and may consume the parameters it understands from `params`.
/// It must never loosen what earlier modifiers built; [`SearchQuery`] only offers additive
/// operations for clauses.
pub trait Modifier
where
	Self: Send + Sync,
{
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag);
}
impl<F> Modifier for F
where
	F: Fn(&mut SearchQuery, &mut ParameterBag) + Send + Sync,
{
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		self(query, params)
	}
}
