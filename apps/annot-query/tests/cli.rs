use std::{env, fs, path::PathBuf};

use clap::Parser;
use serde_json::{Value, json};

use annot_config::{Config, Index, Instrumentation, Search, Service};
use annot_query::{AggregationKind, Args};

fn test_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		index: Index {
			url: "http://127.0.0.1:9".to_string(),
			name: "annotations".to_string(),
			timeout_ms: 1_000,
		},
		search: Search {
			limit_default: 20,
			limit_max: 200,
			offset_max: 9_800,
			replies_limit: 200,
			aggregation_size: 10,
			separate_replies: false,
		},
		instrumentation: Instrumentation { enabled: false, prefix: "search.query".to_string() },
	}
}

fn write_docs(name: &str, docs: Value) -> PathBuf {
	let path = env::temp_dir().join(format!("annot-query-{}-{name}.json", std::process::id()));

	fs::write(&path, docs.to_string()).expect("Failed to write document fixture.");

	path
}

fn parse(extra: &[&str]) -> Args {
	let mut argv = vec!["annot-query", "-c", "config.toml"];

	argv.extend_from_slice(extra);

	Args::try_parse_from(argv).expect("Failed to parse arguments.")
}

#[test]
fn parses_repeatable_flags() {
	let args = parse(&[
		"--param",
		"tag=a",
		"-p",
		"uri=http://x.com/?a=b",
		"--readable-group",
		"g1",
		"--aggregate",
		"tags",
		"--aggregate",
		"users",
		"--separate-replies",
		"--dry-run",
	]);

	assert_eq!(
		args.params,
		vec![
			("tag".to_string(), "a".to_string()),
			("uri".to_string(), "http://x.com/?a=b".to_string())
		]
	);
	assert_eq!(args.readable_groups, vec!["g1"]);
	assert_eq!(args.aggregations, vec![AggregationKind::Tags, AggregationKind::Users]);
	assert!(args.separate_replies);
	assert!(args.dry_run);
}

#[test]
fn rejects_params_without_separator() {
	assert!(Args::try_parse_from(["annot-query", "-c", "c.toml", "--param", "novalue"]).is_err());
	assert!(Args::try_parse_from(["annot-query", "-c", "c.toml", "--param", "=x"]).is_err());
}

#[test]
fn query_string_precedes_params() {
	let args = parse(&["--query", "tag=a&tag=b", "--param", "tag=c"]);
	let params = annot_query::build_params(&args);

	assert_eq!(params.get_all("tag"), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn dry_run_renders_primary_query() {
	let args = parse(&["--param", "group=abc", "--separate-replies", "--dry-run"]);
	let body = annot_query::execute(&args, &test_config()).await.expect("Dry run failed.");

	assert_eq!(body["_source"], false);
	assert_eq!(body["size"], 20);

	let must_not = body["query"]["bool"]["must_not"].as_array().expect("must_not section");

	assert!(must_not.contains(&json!({ "exists": { "field": "references" } })));
	assert!(must_not.contains(&json!({ "exists": { "field": "deleted" } })));
}

#[tokio::test]
async fn invalid_params_are_rejected_before_searching() {
	let args = parse(&["--param", "limit=500", "--dry-run"]);
	let err = annot_query::execute(&args, &test_config()).await.expect_err("limit exceeds max");

	assert!(err.to_string().contains("limit"), "Unexpected error: {err}");
}

#[tokio::test]
async fn searches_document_fixture() {
	let path = write_docs(
		"fixture",
		json!([
			{ "id": "a", "shared": true, "group": "__world__", "tags": ["rust"], "updated": "2020-01-02T00:00:00+00:00" },
			{ "id": "b", "shared": true, "group": "__world__", "tags": ["go"], "updated": "2020-01-01T00:00:00+00:00" },
			{ "id": "c", "shared": true, "group": "__world__", "references": ["a"], "updated": "2020-01-03T00:00:00+00:00" },
			{ "id": "d", "shared": false, "group": "__world__", "tags": ["rust"] },
		]),
	);
	let docs = path.to_string_lossy().into_owned();
	let args = parse(&["--docs", &docs, "--separate-replies", "--aggregate", "tags"]);
	let output = annot_query::execute(&args, &test_config()).await.expect("Search failed.");

	fs::remove_file(&path).ok();

	assert_eq!(output["total"], 2);
	assert_eq!(output["annotation_ids"], json!(["a", "b"]));
	assert_eq!(output["reply_ids"], json!(["c"]));
	assert_eq!(
		output["aggregations"]["tags"],
		json!([{ "label": "go", "count": 1 }, { "label": "rust", "count": 1 }])
	);
}
