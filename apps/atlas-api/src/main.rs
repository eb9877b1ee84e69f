use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = atlas_api::Args::parse();
	atlas_api::run(args).await
}
