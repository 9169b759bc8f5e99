use super::PowerController;
use anyhow::Result;
use async_trait::async_trait;

/// A [PowerController] which only logs, for trying settings out.
pub struct DryRunPowerController;

#[async_trait]
impl PowerController for DryRunPowerController {
    fn describe(&self) -> String {
        "dry run".to_owned()
    }

    async fn power_off(&mut self) -> Result<()> {
        log::warn!("Dry run, the machine would be powered off now");
        Ok(())
    }
}
