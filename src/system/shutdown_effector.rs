use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::{
    armaf::{spawn_server, ActorPort, Server},
    external::power::PowerController,
};

/// Request to power the machine off after the grace delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerOff;

pub type ShutdownPort = ActorPort<PowerOff, (), anyhow::Error>;

/// Server powering the machine off, at most once over its lifetime.
///
/// A [PowerOff] request first waits out the grace delay, which can't be
/// interrupted, and then invokes the [PowerController]. Failures are reported
/// but not retried, later requests are ignored.
pub struct ShutdownEffector<P: PowerController> {
    controller: P,
    grace_delay: Duration,
    executed: bool,
}

impl<P: PowerController> ShutdownEffector<P> {
    pub fn new(controller: P, grace_delay: Duration) -> ShutdownEffector<P> {
        ShutdownEffector {
            controller,
            grace_delay,
            executed: false,
        }
    }

    pub async fn spawn(self) -> Result<ShutdownPort> {
        spawn_server(self).await
    }
}

#[async_trait]
impl<P: PowerController> Server<PowerOff, ()> for ShutdownEffector<P> {
    fn get_name(&self) -> String {
        "ShutdownEffector".to_owned()
    }

    async fn initialize(&mut self) -> Result<()> {
        log::debug!(
            "Shutdown via {} with {:?} grace delay",
            self.controller.describe(),
            self.grace_delay
        );
        Ok(())
    }

    async fn handle_message(&mut self, _: PowerOff) -> Result<()> {
        if self.executed {
            log::warn!("Shutdown already executed, ignoring repeated request");
            return Ok(());
        }
        self.executed = true;
        log::warn!("Initiating shutdown in {:?}...", self.grace_delay);
        tokio::time::sleep(self.grace_delay).await;
        log::warn!("Powering off via {}", self.controller.describe());
        self.controller
            .power_off()
            .await
            .context("Couldn't power the machine off")
    }
}
