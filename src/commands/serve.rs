//! `poststage serve`

use anyhow::Result;

use poststage::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    poststage::server::serve(config).await
}
