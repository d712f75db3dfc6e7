use url::Url;

const WILDCARDS: [char; 2] = ['*', '_'];

/// Canonical form of a document URI as stored in the index's scope field.
///
/// Scheme and host are lower-cased, `http` and `https` fold into `httpx`, default ports and
/// fragments are dropped, query pairs are sorted and a trailing `/` is removed. Strings that are
/// not hierarchical URLs (`urn:`, `doi:`, ...) are only trimmed.
pub fn normalize_uri(raw: &str) -> String {
	let trimmed = raw.trim();
	let Ok(mut url) = Url::parse(trimmed) else {
		return trimmed.to_string();
	};

	if url.cannot_be_a_base() {
		return trimmed.to_string();
	}

	url.set_fragment(None);

	let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

	if pairs.is_empty() {
		url.set_query(None);
	} else {
		pairs.sort();
		url.query_pairs_mut().clear().extend_pairs(pairs);
	}

	let path = url.path().trim_end_matches('/').to_string();

	if !path.is_empty() {
		url.set_path(&path);
	}

	let mut normalized = url.to_string();

	if url.path() == "/" && url.query().is_none() {
		normalized.pop();
	}

	match url.scheme() {
		"http" | "https" => format!("httpx{}", &normalized[url.scheme().len()..]),
		_ => normalized,
	}
}

/// Whether `raw` is an acceptable wildcard URI.
///
/// The string must contain `*` or `_`, must parse with a scheme, and neither wildcard may appear
/// in the authority component. Patterns anchored at the host keep the index's left-to-right
/// term matching from scanning the whole scope field.
///
/// The authority is checked on the parsed URL so spellings the parser accepts without `//`
/// (`http:*.com/x`) are covered too. `file://` URLs lose their host during parsing, so the raw
/// text is checked as well.
pub fn wildcard_uri_is_valid(raw: &str) -> bool {
	if !raw.contains(WILDCARDS) {
		return false;
	}

	let Ok(url) = Url::parse(raw) else {
		return false;
	};
	let parsed_authority =
		[url.host_str().unwrap_or_default(), url.username(), url.password().unwrap_or_default()];

	if parsed_authority.iter().any(|part| part.contains(WILDCARDS)) {
		return false;
	}

	let rest = raw.get(url.scheme().len() + 1..).unwrap_or_default();

	if let Some(hierarchical) = rest.strip_prefix("//") {
		let authority = hierarchical.split(['/', '?', '#']).next().unwrap_or_default();

		if authority.contains(WILDCARDS) {
			return false;
		}
	}

	true
}

/// Converts the public wildcard dialect (`*` any sequence, `_` any single character) into the
/// index dialect (`*` and `?`), escaping characters the index would otherwise interpret.
pub fn wildcard_pattern(uri: &str) -> String {
	let mut pattern = String::with_capacity(uri.len());

	for ch in uri.chars() {
		match ch {
			'\\' => pattern.push_str("\\\\"),
			'?' => pattern.push_str("\\?"),
			'_' => pattern.push('?'),
			other => pattern.push(other),
		}
	}

	pattern
}
