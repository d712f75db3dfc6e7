use crate::{
	Error, ParameterBag, Result, SearchLimits, SortOrder, parse_date_millis, wildcard_uri_is_valid,
};

const SORT_FIELDS: [&str; 5] = ["created", "updated", "group", "id", "user"];
const DATE_SORT_FIELDS: [&str; 2] = ["created", "updated"];

/// Strict check of caller-supplied parameters, for front ends that want to reject bad input
/// instead of relying on the pipeline's silent fallbacks.
///
/// This is the layer that enforces `offset <= offset_max`; the pipeline itself never caps the
/// offset.
pub fn validate_params(params: &ParameterBag, limits: &SearchLimits) -> Result<()> {
	let sort = params.get("sort").unwrap_or("updated");

	if !SORT_FIELDS.contains(&sort) {
		return Err(invalid(format!("sort must be one of {}.", SORT_FIELDS.join(", "))));
	}
	if let Some(order) = params.get("order")
		&& SortOrder::parse(order).is_none()
	{
		return Err(invalid("order must be one of asc, desc.".to_string()));
	}
	if let Some(limit) = params.get("limit") {
		check_range("limit", limit, limits.limit_max)?;
	}
	if let Some(offset) = params.get("offset") {
		check_range("offset", offset, limits.offset_max)?;
	}

	for uri in params.get_all("wildcard_uri") {
		if !wildcard_uri_is_valid(uri) {
			return Err(invalid(format!(
				"wildcard_uri '{uri}' must have a scheme, contain * or _, and keep wildcards out of the host."
			)));
		}
	}

	if let Some(search_after) = params.get("search_after")
		&& DATE_SORT_FIELDS.contains(&sort)
		&& parse_date_millis(search_after).is_none()
	{
		return Err(invalid(
			"search_after must be a parsable date or milliseconds since the epoch.".to_string(),
		));
	}

	Ok(())
}

fn check_range(name: &str, raw: &str, max: u64) -> Result<()> {
	match raw.trim().parse::<u64>() {
		Ok(value) if value <= max => Ok(()),
		_ => Err(invalid(format!("{name} must be an integer between 0 and {max}."))),
	}
}

fn invalid(message: String) -> Error {
	Error::InvalidRequest { message }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn check(params: &[(&str, &str)]) -> Result<()> {
		let params: ParameterBag = params.iter().copied().collect();

		validate_params(&params, &SearchLimits::default())
	}

	#[test]
	fn accepts_defaults_and_unknown_keys() {
		assert!(check(&[]).is_ok());
		assert!(check(&[("foo", "bar"), ("limit", "200"), ("offset", "9800")]).is_ok());
	}

	#[test]
	fn rejects_out_of_range_pagination() {
		assert!(check(&[("limit", "201")]).is_err());
		assert!(check(&[("offset", "9801")]).is_err());
		assert!(check(&[("offset", "-1")]).is_err());
		assert!(check(&[("limit", "ten")]).is_err());
	}

	#[test]
	fn rejects_unknown_sort_and_order() {
		assert!(check(&[("sort", "text")]).is_err());
		assert!(check(&[("order", "up")]).is_err());
		assert!(check(&[("sort", "user"), ("order", "ASC")]).is_ok());
	}

	#[test]
	fn rejects_invalid_wildcards() {
		assert!(check(&[("wildcard_uri", "http://foo.com/*")]).is_ok());

		let err = check(&[("wildcard_uri", "http://foo.com/*"), ("wildcard_uri", "file://*")])
			.expect_err("second wildcard is invalid");

		assert!(err.to_string().contains("file://*"), "Unexpected error: {err}");
	}

	#[test]
	fn search_after_must_parse_for_date_sorts() {
		assert!(check(&[("search_after", "yesterday")]).is_err());
		assert!(check(&[("search_after", "2018-01-01")]).is_ok());
		assert!(check(&[("sort", "id"), ("search_after", "yesterday")]).is_ok());
	}
}
