use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = annot_query::Args::parse();

	annot_query::run(args).await
}
