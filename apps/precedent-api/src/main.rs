use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = precedent_api::Args::parse();

	precedent_api::run(args).await
}
