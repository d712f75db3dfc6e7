use std::{
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use annot_search::{BoxFuture, IndexClient, IndexResponse, SearchQuery, Stats};

/// Stats sink that keeps every metric for later assertions.
#[derive(Debug, Default)]
pub struct RecordingStats {
	counters: Mutex<Vec<String>>,
	timings: Mutex<Vec<(String, Duration)>>,
}
impl RecordingStats {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn counters(&self) -> Vec<String> {
		self.counters.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn timings(&self) -> Vec<(String, Duration)> {
		self.timings.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// How many times `key` was incremented.
	pub fn count(&self, key: &str) -> usize {
		self.counters().iter().filter(|counter| *counter == key).count()
	}
}
impl Stats for RecordingStats {
	fn incr(&self, key: &str) {
		self.counters.lock().unwrap_or_else(|err| err.into_inner()).push(key.to_string());
	}

	fn timing(&self, key: &str, elapsed: Duration) {
		let mut timings = self.timings.lock().unwrap_or_else(|err| err.into_inner());

		timings.push((key.to_string(), elapsed));
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
	Timeout,
	Unavailable,
}

/// Index whose every execution fails.
#[derive(Debug)]
pub struct FailingIndex {
	failure: Failure,
	calls: AtomicUsize,
}
impl FailingIndex {
	/// Fails with [`annot_search::Error::Timeout`].
	pub fn timeout() -> Self {
		Self { failure: Failure::Timeout, calls: AtomicUsize::new(0) }
	}

	/// Fails with [`annot_search::Error::Index`].
	pub fn unavailable() -> Self {
		Self { failure: Failure::Unavailable, calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl IndexClient for FailingIndex {
	fn execute<'a>(
		&'a self,
		_: &'a SearchQuery,
	) -> BoxFuture<'a, annot_search::Result<IndexResponse>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Err(match self.failure {
				Failure::Timeout => annot_search::Error::Timeout {
					message: "Simulated deadline exceeded.".to_string(),
				},
				Failure::Unavailable => annot_search::Error::Index {
					message: "Simulated index outage.".to_string(),
				},
			})
		})
	}
}
