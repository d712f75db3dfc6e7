use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, SearchQuery};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes built queries against the document index.
///
/// Implementations report an exceeded deadline as [`crate::Error::Timeout`] and every other
/// failure as [`crate::Error::Index`] or [`crate::Error::InvalidResponse`]. No timeout is
/// imposed by the search core itself.
pub trait IndexClient
where
	Self: Send + Sync,
{
	fn execute<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<IndexResponse>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
	/// Total number of matching documents, independent of the result window.
	pub total: u64,
	pub hits: Vec<IndexHit>,
	/// Raw `aggregations` section, keyed by aggregation name.
	pub aggregations: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHit {
	pub id: String,
}
