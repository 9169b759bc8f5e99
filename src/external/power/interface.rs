use anyhow::Result;
use async_trait::async_trait;

/// A trait allowing to power the machine off
#[async_trait]
pub trait PowerController: Send + 'static {
    /// Short description of the mechanism, used in log messages
    fn describe(&self) -> String;

    async fn power_off(&mut self) -> Result<()>;
}
