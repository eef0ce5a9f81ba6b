use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    navtask_cli::cli::run().await
}
