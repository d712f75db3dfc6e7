use std::num::IntErrorKind;

use serde_json::Value;
use time::{
	Date, Month, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
	macros::format_description,
};

use crate::{ParameterBag, SearchLimits, SearchQuery, SortOrder, modifier::Modifier};

const DEFAULT_SORT: &str = "updated";
const DATE_SORT_FIELDS: [&str; 2] = ["updated", "created"];
/// Numbers below this are read as a year, not as epoch milliseconds.
const EPOCH_MILLIS_FLOOR: f64 = 9_999.0;

/// Single-field sort plus optional `search_after` cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sorter;
impl Modifier for Sorter {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let sort_by = params
			.pop("sort")
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_SORT.to_string());
		// Sorting must use the non-analysed copy of the user field.
		let field = if sort_by == "user" { "user_raw".to_string() } else { sort_by };
		let order = match params.pop("order") {
			Some(raw) => SortOrder::parse(&raw).unwrap_or_else(|| {
				tracing::debug!(order = %raw, "Ignoring unknown sort order.");

				SortOrder::Desc
			}),
			None => SortOrder::Desc,
		};

		if let Some(raw) = params.pop("search_after").filter(|value| !value.is_empty()) {
			if DATE_SORT_FIELDS.contains(&field.as_str()) {
				match parse_date_millis(&raw) {
					Some(millis) => query.set_search_after(Value::from(millis)),
					None => {
						tracing::warn!(search_after = %raw, "Dropping unparseable search_after date.")
					},
				}
			} else {
				query.set_search_after(Value::String(raw));
			}
		}

		query.set_sort(field, order);
	}
}

/// Result window from `offset` and `limit`.
///
/// Malformed or negative values fall back to the defaults; `limit` is capped at the configured
/// maximum. `offset` is not capped here; [`crate::validate_params`] bounds it before the chain
/// runs.
#[derive(Debug, Clone, Copy)]
pub struct Limiter {
	limits: SearchLimits,
}
impl Limiter {
	pub fn new(limits: SearchLimits) -> Self {
		Self { limits }
	}

	pub fn parse_offset(&self, raw: Option<&str>) -> u64 {
		match raw.and_then(parse_integer) {
			Some(value) if value >= 0 => value as u64,
			_ => 0,
		}
	}

	pub fn parse_limit(&self, raw: Option<&str>) -> u64 {
		let limit_max = self.limits.limit_max;

		match raw.and_then(parse_integer) {
			Some(value) if value >= 0 => (value as u64).min(limit_max),
			_ => self.limits.limit_default.min(limit_max),
		}
	}
}
impl Default for Limiter {
	fn default() -> Self {
		Self::new(SearchLimits::default())
	}
}
impl Modifier for Limiter {
	fn modify(&self, query: &mut SearchQuery, params: &mut ParameterBag) {
		let offset = self.parse_offset(params.pop("offset").as_deref());
		let limit = self.parse_limit(params.pop("limit").as_deref());

		query.set_window(offset, limit);
	}
}

/// Integer parse that tolerates surrounding whitespace and saturates out-of-range digit strings
/// instead of rejecting them.
fn parse_integer(raw: &str) -> Option<i64> {
	match raw.trim().parse::<i64>() {
		Ok(value) => Some(value),
		Err(err) if *err.kind() == IntErrorKind::PosOverflow => Some(i64::MAX),
		Err(err) if *err.kind() == IntErrorKind::NegOverflow => Some(i64::MIN),
		Err(_) => None,
	}
}

/// Converts a `search_after` date to milliseconds since the Unix epoch.
///
/// Accepts epoch milliseconds, RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` and `YYYY-MM-DD` (both read
/// as UTC), and a bare year. Returns `None` for anything else.
pub fn parse_date_millis(raw: &str) -> Option<f64> {
	let raw = raw.trim();

	if let Ok(number) = raw.parse::<f64>() {
		if number.is_finite() && number >= EPOCH_MILLIS_FLOOR {
			return Some(number);
		}

		let year = raw.parse::<i32>().ok().filter(|year| (1..=9_999).contains(year))?;
		let date = Date::from_calendar_date(year, Month::January, 1).ok()?;

		return Some(to_millis(date.midnight().assume_utc()));
	}
	if let Ok(datetime) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(to_millis(datetime));
	}
	if let Ok(datetime) = PrimitiveDateTime::parse(
		raw,
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
	) {
		return Some(to_millis(datetime.assume_utc()));
	}
	if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
		return Some(to_millis(date.midnight().assume_utc()));
	}

	None
}

fn to_millis(datetime: OffsetDateTime) -> f64 {
	datetime.unix_timestamp_nanos() as f64 / 1_000_000.0
}
