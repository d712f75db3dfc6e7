use std::{cmp::Ordering, collections::BTreeSet};

use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use annot_search::{BoolClause, Clause, MatchOperator, SearchQuery, SortOrder, parse_date_millis};

const DATE_FIELDS: [&str; 2] = ["created", "updated"];

/// Every scalar reachable through the dotted `path`. Arrays are flattened at each level.
///
/// A `_raw` or `.parts` field the document does not store falls back to its base field, which
/// mirrors how the index derives those sub-fields at ingest time.
pub(crate) fn values_at<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
	let direct = walk(doc, path);

	if !direct.is_empty() {
		return direct;
	}

	match path.strip_suffix("_raw").or_else(|| path.strip_suffix(".parts")) {
		Some(base) => walk(doc, base),
		None => direct,
	}
}

pub(crate) fn matches_query(doc: &Value, query: &SearchQuery) -> bool {
	query.filters().iter().all(|clause| matches_clause(doc, clause))
		&& query.musts().iter().all(|clause| matches_clause(doc, clause))
		&& !query.exclusions().iter().any(|clause| matches_clause(doc, clause))
}

pub(crate) fn matches_clause(doc: &Value, clause: &Clause) -> bool {
	match clause {
		Clause::Term { field, value } => {
			let exact = field.ends_with("_raw");

			values_at(doc, field).into_iter().any(|found| scalar_eq(found, value, exact))
		},
		Clause::Terms { field, values } => {
			let exact = field.ends_with("_raw");

			values_at(doc, field).into_iter().any(|found| {
				values.iter().any(|wanted| scalar_eq(found, &Value::String(wanted.clone()), exact))
			})
		},
		Clause::Exists { field } => !values_at(doc, field).is_empty(),
		Clause::Match { field, query, operator } => {
			let wanted = tokens(query);
			let have = field_tokens(doc, field);

			if wanted.is_empty() {
				return false;
			}

			match operator {
				Some(MatchOperator::And) => wanted.iter().all(|token| have.contains(token)),
				Some(MatchOperator::Or) | None => wanted.iter().any(|token| have.contains(token)),
			}
		},
		Clause::SimpleQueryString { query, fields } => {
			let wanted = tokens(query);

			fields.iter().any(|field| {
				let have = field_tokens(doc, field);

				wanted.iter().any(|token| have.contains(token))
			})
		},
		Clause::Wildcard { field, pattern } => values_at(doc, field)
			.into_iter()
			.filter_map(Value::as_str)
			.any(|found| glob_match(pattern, found)),
		Clause::Bool(clause) => matches_bool(doc, clause),
	}
}

/// Sort key of `doc` under `field`. Date fields compare as epoch milliseconds.
pub(crate) fn sort_key(doc: &Value, field: &str) -> Option<SortKey> {
	let value = values_at(doc, field).into_iter().next()?;

	SortKey::from_value(value, DATE_FIELDS.contains(&field))
}

/// Orders two optional keys the way the index does: present values by `order`, missing values
/// last in either direction.
pub(crate) fn compare_keys(
	a: Option<&SortKey>,
	b: Option<&SortKey>,
	order: SortOrder,
) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => match order {
			SortOrder::Asc => a.cmp(b),
			SortOrder::Desc => b.cmp(a),
		},
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SortKey {
	Bool(bool),
	Number(f64),
	Text(String),
}
impl SortKey {
	pub(crate) fn from_value(value: &Value, date: bool) -> Option<Self> {
		match value {
			Value::Bool(flag) => Some(Self::Bool(*flag)),
			Value::Number(number) => number.as_f64().map(Self::Number),
			Value::String(text) if date => parse_date_millis(text).map(Self::Number),
			Value::String(text) => Some(Self::Text(text.clone())),
			_ => None,
		}
	}

	fn rank(&self) -> u8 {
		match self {
			Self::Bool(_) => 0,
			Self::Number(_) => 1,
			Self::Text(_) => 2,
		}
	}
}
impl Eq for SortKey {}
impl PartialOrd for SortKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for SortKey {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Self::Bool(a), Self::Bool(b)) => a.cmp(b),
			(Self::Number(a), Self::Number(b)) => a.total_cmp(b),
			(Self::Text(a), Self::Text(b)) => a.cmp(b),
			_ => self.rank().cmp(&other.rank()),
		}
	}
}

/// Bucket label for a terms aggregation. Keyword buckets are always keyed by string.
pub(crate) fn bucket_label(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
		_ => None,
	}
}

fn walk<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
	let mut current = vec![doc];

	for segment in path.split('.') {
		let mut next = Vec::new();

		for value in current {
			match value.get(segment) {
				Some(Value::Array(items)) => next.extend(items.iter()),
				Some(found) => next.push(found),
				None => {},
			}
		}

		current = next;
	}

	current.into_iter().filter(|value| !value.is_null()).collect()
}

fn matches_bool(doc: &Value, clause: &BoolClause) -> bool {
	clause.must.iter().all(|inner| matches_clause(doc, inner))
		&& clause.filter.iter().all(|inner| matches_clause(doc, inner))
		&& !clause.must_not.iter().any(|inner| matches_clause(doc, inner))
		&& (clause.should.is_empty()
			|| clause.should.iter().any(|inner| matches_clause(doc, inner)))
}

// Fields other than `_raw` copies are indexed through a lowercase normaliser.
fn scalar_eq(found: &Value, wanted: &Value, exact: bool) -> bool {
	match (found, wanted) {
		(Value::String(a), Value::String(b)) if !exact => a.to_lowercase() == b.to_lowercase(),
		(Value::Bool(a), Value::String(b)) | (Value::String(b), Value::Bool(a)) => {
			b.parse::<bool>().is_ok_and(|b| b == *a)
		},
		_ => found == wanted,
	}
}

fn tokens(text: &str) -> BTreeSet<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

fn field_tokens(doc: &Value, field: &str) -> BTreeSet<String> {
	values_at(doc, field).into_iter().filter_map(Value::as_str).flat_map(tokens).collect()
}

/// Index wildcard dialect: `*` any sequence, `?` one character, `\` escapes the next one.
fn glob_match(pattern: &str, text: &str) -> bool {
	let pattern = compile(pattern);
	let text: Vec<char> = text.chars().collect();
	// Classic two-pointer wildcard match with single-star backtracking.
	let (mut p, mut t) = (0, 0);
	let mut backtrack: Option<(usize, usize)> = None;

	while t < text.len() {
		match pattern.get(p) {
			Some(Token::Any) => {
				backtrack = Some((p, t));
				p += 1;
			},
			Some(Token::One) => {
				p += 1;
				t += 1;
			},
			Some(Token::Char(ch)) if *ch == text[t] => {
				p += 1;
				t += 1;
			},
			_ => match backtrack {
				Some((star, matched)) => {
					p = star + 1;
					t = matched + 1;
					backtrack = Some((star, matched + 1));
				},
				None => return false,
			},
		}
	}

	pattern[p..].iter().all(|token| *token == Token::Any)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
	Any,
	One,
	Char(char),
}

fn compile(pattern: &str) -> Vec<Token> {
	let mut out = Vec::with_capacity(pattern.len());
	let mut chars = pattern.chars();

	while let Some(ch) = chars.next() {
		out.push(match ch {
			'*' => Token::Any,
			'?' => Token::One,
			'\\' => Token::Char(chars.next().unwrap_or('\\')),
			other => Token::Char(other),
		});
	}

	out
}
