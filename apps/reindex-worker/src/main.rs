use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = reindex_worker::Args::parse();

	reindex_worker::run(args).await
}
