use std::{
	future::Future,
	sync::Arc,
	time::{Duration, Instant},
};

use crate::{Error, Result};

/// Counter and timer sink.
pub trait Stats
where
	Self: Send + Sync,
{
	fn incr(&self, key: &str);

	fn timing(&self, key: &str, elapsed: Duration);
}

/// Emits every metric as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStats;
impl Stats for TracingStats {
	fn incr(&self, key: &str) {
		tracing::info!(metric = key, "Counter incremented.");
	}

	fn timing(&self, key: &str, elapsed: Duration) {
		tracing::info!(
			metric = key,
			elapsed_ms = elapsed.as_secs_f64() * 1_000.0,
			"Timer recorded."
		);
	}
}

/// Stats sink plus the key prefix for query execution metrics.
#[derive(Clone)]
pub struct Instrumentation {
	sink: Arc<dyn Stats>,
	prefix: String,
}
impl Instrumentation {
	pub fn new(sink: Arc<dyn Stats>, prefix: impl Into<String>) -> Self {
		Self { sink, prefix: prefix.into() }
	}

	pub fn tracing(prefix: impl Into<String>) -> Self {
		Self::new(Arc::new(TracingStats), prefix)
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Runs `fut` inside a [`QueryTimer`] scope.
	pub async fn instrument<T, F>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let mut timer = QueryTimer::start(self);
		let result = fut.await;

		timer.record(&result);

		result
	}
}
impl std::fmt::Debug for Instrumentation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Instrumentation").field("prefix", &self.prefix).finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
	Success,
	Timeout,
	Error,
}
impl Outcome {
	fn suffix(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Timeout => "timeout",
			Self::Error => "error",
		}
	}
}

/// Scoped execution timer.
///
/// Dropping the timer emits exactly one outcome counter and the duration. A scope that ends
/// without [`QueryTimer::record`] (cancellation or panic) counts as an error.
pub struct QueryTimer<'a> {
	stats: &'a Instrumentation,
	started: Instant,
	outcome: Option<Outcome>,
}
impl<'a> QueryTimer<'a> {
	pub fn start(stats: &'a Instrumentation) -> Self {
		Self { stats, started: Instant::now(), outcome: None }
	}

	pub fn record<T>(&mut self, result: &Result<T>) {
		self.outcome = Some(match result {
			Ok(_) => Outcome::Success,
			Err(Error::Timeout { .. }) => Outcome::Timeout,
			Err(_) => Outcome::Error,
		});
	}
}
impl Drop for QueryTimer<'_> {
	fn drop(&mut self) {
		let outcome = self.outcome.take().unwrap_or(Outcome::Error);
		let prefix = self.stats.prefix.as_str();

		self.stats.sink.incr(&format!("{prefix}.{}", outcome.suffix()));
		self.stats.sink.timing(prefix, self.started.elapsed());
	}
}
