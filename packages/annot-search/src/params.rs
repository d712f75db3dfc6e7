use std::{collections::BTreeSet, mem};

/// Ordered, multi-valued request parameters.
///
/// Modifiers consume the keys they recognise with [`ParameterBag::pop`] or
/// [`ParameterBag::pop_all`]; whatever is left when the chain reaches the catch-all matcher is
/// turned into exact-match clauses. The bag is threaded through the whole chain by `&mut`, so a
/// key popped by one modifier is invisible to every later one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBag {
	entries: Vec<(String, String)>,
}
impl ParameterBag {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses an `application/x-www-form-urlencoded` query string. Repeated keys keep every
	/// value in order.
	pub fn from_query(query: &str) -> Self {
		let query = query.strip_prefix('?').unwrap_or(query);

		url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.entries.push((key.into(), value.into()));
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, value)| value.as_str())
	}

	pub fn get_all(&self, key: &str) -> Vec<&str> {
		self.entries.iter().filter(|(k, _)| k == key).map(|(_, value)| value.as_str()).collect()
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.iter().any(|(k, _)| k == key)
	}

	/// Removes every value stored under `key` and returns the first one.
	pub fn pop(&mut self, key: &str) -> Option<String> {
		self.pop_all(key).into_iter().next()
	}

	/// Removes every value stored under `key`, in insertion order.
	pub fn pop_all(&mut self, key: &str) -> Vec<String> {
		if !self.contains_key(key) {
			return Vec::new();
		}

		let (taken, kept): (Vec<_>, Vec<_>) =
			mem::take(&mut self.entries).into_iter().partition(|(k, _)| k == key);

		self.entries = kept;

		taken.into_iter().map(|(_, value)| value).collect()
	}

	pub fn remaining_keys(&self) -> BTreeSet<String> {
		self.entries.iter().map(|(key, _)| key.clone()).collect()
	}

	/// Removes and yields every remaining pair in insertion order.
	pub fn drain(&mut self) -> impl Iterator<Item = (String, String)> + '_ {
		self.entries.drain(..)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
	}

	/// Number of stored values, counting repeated keys once per value.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for ParameterBag
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut bag = Self::new();

		bag.extend(iter);

		bag
	}
}
impl<K, V> Extend<(K, V)> for ParameterBag
where
	K: Into<String>,
	V: Into<String>,
{
	fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
		for (key, value) in iter {
			self.insert(key, value);
		}
	}
}
