use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	pub search: Search,
	#[serde(default)]
	pub instrumentation: Instrumentation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	/// Base URL of the Elasticsearch-compatible cluster, without a trailing slash.
	pub url: String,
	/// Index (or alias) holding annotation documents.
	pub name: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub limit_default: u64,
	pub limit_max: u64,
	/// Upper bound enforced by parameter validation, not by the limiter.
	pub offset_max: u64,
	pub replies_limit: u64,
	pub aggregation_size: u32,
	#[serde(default)]
	pub separate_replies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instrumentation {
	pub enabled: bool,
	#[serde(default = "default_instrumentation_prefix")]
	pub prefix: String,
}
impl Default for Instrumentation {
	fn default() -> Self {
		Self { enabled: false, prefix: default_instrumentation_prefix() }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_instrumentation_prefix() -> String {
	"search.query".to_string()
}
