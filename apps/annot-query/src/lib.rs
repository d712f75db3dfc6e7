use std::{fs, path::PathBuf, sync::Arc};

use clap::{Parser, ValueEnum};
use color_eyre::eyre;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use annot_config::Config;
use annot_index::{ElasticsearchIndex, MemoryIndex};
use annot_search::{
	IndexClient, Instrumentation, ParameterBag, Search, SearchContext, SearchLimits, SearchOptions,
	StaticGroups, TagsAggregation, UsersAggregation,
};

/// Group readable by everyone when no `--readable-group` is given.
pub const WORLD_GROUP: &str = "__world__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AggregationKind {
	Tags,
	Users,
}

/// Builds and runs one annotation search.
#[derive(Debug, Parser)]
#[command(
	version = annot_cli::VERSION,
	rename_all = "kebab",
	styles = annot_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// URL-encoded query string, e.g. `tag=foo&user=acct:bob@example.com`.
	#[arg(long, value_name = "QUERY")]
	pub query: Option<String>,
	/// Extra parameter, appended after `--query`. Repeatable.
	#[arg(long = "param", short = 'p', value_name = "KEY=VALUE", value_parser = parse_param)]
	pub params: Vec<(String, String)>,
	/// Requesting user. Anonymous when omitted.
	#[arg(long, value_name = "USERID")]
	pub user: Option<String>,
	#[arg(long = "readable-group", value_name = "GROUP")]
	pub readable_groups: Vec<String>,
	#[arg(long = "created-group", value_name = "GROUP")]
	pub created_groups: Vec<String>,
	#[arg(long)]
	pub separate_replies: bool,
	#[arg(long = "aggregate", value_enum, value_name = "KIND")]
	pub aggregations: Vec<AggregationKind>,
	/// JSON array of documents to search instead of the configured index.
	#[arg(long, value_name = "FILE")]
	pub docs: Option<PathBuf>,
	/// Print the primary query body without executing it.
	#[arg(long)]
	pub dry_run: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = annot_config::load(&args.config)?;

	init_tracing(&config)?;

	let output = execute(&args, &config).await?;

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

/// Validates the request, then either renders the primary query or runs the search.
pub async fn execute(args: &Args, config: &Config) -> color_eyre::Result<Value> {
	let mut params = build_params(args);
	let limits = SearchLimits::from(&config.search);

	annot_search::validate_params(&params, &limits)?;

	let index = open_index(args, config)?;
	let search = build_search(args, config, index);

	if args.dry_run {
		return Ok(search.build_query(&mut params).to_body());
	}

	let result = search.run(params).await?;

	tracing::info!(
		total = result.total(),
		annotations = result.annotation_ids().len(),
		replies = result.reply_ids().len(),
		"Search finished."
	);

	Ok(serde_json::to_value(&result)?)
}

/// `--query` pairs first, then every `--param`, in order.
pub fn build_params(args: &Args) -> ParameterBag {
	let mut params = args.query.as_deref().map(ParameterBag::from_query).unwrap_or_default();

	params.extend(args.params.iter().cloned());

	params
}

pub fn build_search(args: &Args, config: &Config, index: Arc<dyn IndexClient>) -> Search {
	let readable = if args.readable_groups.is_empty() {
		vec![WORLD_GROUP.to_string()]
	} else {
		args.readable_groups.clone()
	};
	let mut groups = StaticGroups::new(readable);

	if let Some(userid) = &args.user {
		groups = groups.with_creator(userid, args.created_groups.iter().cloned());
	}

	let ctx = SearchContext::new(args.user.clone(), Arc::new(groups));
	let instrumentation = config
		.instrumentation
		.enabled
		.then(|| Instrumentation::tracing(config.instrumentation.prefix.clone()));
	let options = SearchOptions {
		separate_replies: args.separate_replies || config.search.separate_replies,
		limits: SearchLimits::from(&config.search),
		instrumentation,
	};
	let mut search = Search::new(index, &ctx, options);

	for kind in &args.aggregations {
		match kind {
			AggregationKind::Tags => {
				search.append_aggregation(TagsAggregation::new(config.search.aggregation_size))
			},
			AggregationKind::Users => {
				search.append_aggregation(UsersAggregation::new(config.search.aggregation_size))
			},
		}
	}

	search
}

fn open_index(args: &Args, config: &Config) -> color_eyre::Result<Arc<dyn IndexClient>> {
	match &args.docs {
		Some(path) => {
			let raw = fs::read_to_string(path)
				.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", path.display()))?;
			let index = MemoryIndex::from_json(&raw)?;

			tracing::debug!(docs = index.len(), path = %path.display(), "Loaded document fixture.");

			Ok(Arc::new(index))
		},
		None => Ok(Arc::new(ElasticsearchIndex::new(&config.index)?)),
	}
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
	let (key, value) =
		raw.split_once('=').ok_or_else(|| format!("Expected KEY=VALUE, got `{raw}`."))?;

	if key.is_empty() {
		return Err(format!("Parameter key must be non-empty in `{raw}`."));
	}

	Ok((key.to_string(), value.to_string()))
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}
