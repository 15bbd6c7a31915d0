//! `poststage sweep` - delete every expired post once and report.
//!
//! Goes through the running server's `/api/cleanup` when one is up.

use anyhow::Result;

use poststage::app::connect;
use poststage::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    let access = connect(config).await?;
    let summary = access.sweep().await?;

    println!("Deleted {} expired post(s)", summary.deleted);

    if summary.failed > 0 {
        anyhow::bail!("Sweep finished with {} failure(s); see the log", summary.failed);
    }
    Ok(())
}
