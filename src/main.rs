use clap::Parser;
use sensor_dataset::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await?;
    Ok(())
}
