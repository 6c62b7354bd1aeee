use anyhow::Result;
use leadflow::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
