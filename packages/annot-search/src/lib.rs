pub mod aggregation;
pub mod context;
pub mod index;
pub mod instrument;
pub mod limits;
pub mod modifier;
pub mod params;
pub mod pipeline;
pub mod query;
pub mod uri;
pub mod validate;

mod error;

pub use aggregation::{Aggregation, AggregationBucket, TagsAggregation, UsersAggregation};
pub use context::{
	GroupService, IdentityUriExpander, SearchContext, StaticGroups, StaticUris, UriExpander,
};
pub use error::{Error, Result};
pub use index::{BoxFuture, IndexClient, IndexHit, IndexResponse};
pub use instrument::{Instrumentation, QueryTimer, Stats, TracingStats};
pub use limits::{
	AGGREGATION_SIZE, LIMIT_DEFAULT, LIMIT_MAX, MAX_RESULT_WINDOW, OFFSET_MAX, REPLIES_LIMIT,
	SearchLimits,
};
pub use modifier::{
	ANY_FIELDS, AnyMatcher, AuthFilter, AuthorityFilter, DeletedFilter, GroupAuthFilter,
	GroupFilter, KeyValueMatcher, Limiter, Modifier, RepliesMatcher, Sorter, SuppressionFilter,
	TagsMatcher, TopLevelOnlyFilter, UriFilter, UriWildcardFilter, UserFilter, parse_date_millis,
};
pub use params::ParameterBag;
pub use pipeline::{Search, SearchOptions, SearchResult};
pub use query::{
	BoolClause, Clause, MatchOperator, SORT_UNMAPPED_TYPE, SearchQuery, Sort, SortOrder,
	TermsAggregation, Window,
};
pub use uri::{normalize_uri, wildcard_pattern, wildcard_uri_is_valid};
pub use validate::validate_params;
