use anyhow::Context;
use registry_transfer::cli::{Args, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse_args();
    let runner = Runner::new(&args).context("failed to initialize")?;

    // Residual failed jobs are reported, not fatal; only configuration and
    // preset errors make the process exit non-zero.
    runner.run().await.context("transfer run failed")?;
    Ok(())
}
