use super::PowerController;
use anyhow::{Context, Result};
use async_trait::async_trait;
use logind_zbus::manager::ManagerProxy;

/// A [PowerController] asking systemd-logind to power the machine off.
///
/// The call is made non-interactively, so it fails instead of prompting when
/// polkit would require authentication.
pub struct LogindPowerController {
    proxy: ManagerProxy<'static>,
}

impl LogindPowerController {
    pub async fn new(connection: zbus::Connection) -> Result<LogindPowerController> {
        let proxy = ManagerProxy::new(&connection)
            .await
            .context("Couldn't create logind manager proxy")?;
        Ok(LogindPowerController { proxy })
    }

    /// Connect to the system bus and create the controller on it.
    pub async fn connect() -> Result<LogindPowerController> {
        log::info!("Creating a new connection to the system bus");
        let connection = zbus::Connection::system()
            .await
            .context("Couldn't connect to the system bus")?;
        Self::new(connection).await
    }
}

#[async_trait]
impl PowerController for LogindPowerController {
    fn describe(&self) -> String {
        "logind PowerOff".to_owned()
    }

    async fn power_off(&mut self) -> Result<()> {
        Ok(self.proxy.power_off(false).await?)
    }
}
