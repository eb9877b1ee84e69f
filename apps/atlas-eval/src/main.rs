use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = atlas_eval::Args::parse();
	atlas_eval::run(args).await
}
