use super::PowerController;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

/// A program and its arguments, as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandStrings {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A [PowerController] running a configured command, e.g. `shutdown -h now`.
pub struct CommandPowerController {
    command: CommandStrings,
}

impl CommandPowerController {
    pub fn new(command: CommandStrings) -> CommandPowerController {
        CommandPowerController { command }
    }
}

#[async_trait]
impl PowerController for CommandPowerController {
    fn describe(&self) -> String {
        format!("{} {}", self.command.command, self.command.args.join(" "))
            .trim_end()
            .to_owned()
    }

    async fn power_off(&mut self) -> Result<()> {
        let status = Command::new(&self.command.command)
            .args(&self.command.args)
            .status()
            .await
            .with_context(|| format!("Couldn't run {}", self.command.command))?;
        if !status.success() {
            bail!("{} exited with {}", self.describe(), status);
        }
        Ok(())
    }
}
