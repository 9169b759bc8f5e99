use super::idle_monitor::{IdleMonitor, MonitorError, MonitorState};
use crate::external::utilization::UtilizationReader;

/// Owner of the single monitor a user session may have running.
///
/// Starting a monitor while the previous one is still running is refused,
/// a finished one is replaced.
pub struct MonitorSession<R: UtilizationReader> {
    active: Option<IdleMonitor<R>>,
}

impl<R: UtilizationReader> MonitorSession<R> {
    pub fn new() -> MonitorSession<R> {
        MonitorSession { active: None }
    }

    pub fn start(&mut self, mut monitor: IdleMonitor<R>) -> Result<(), MonitorError> {
        if self.state() == MonitorState::Running {
            log::warn!("A monitor is already running, refusing to start another one");
            return Err(MonitorError::AlreadyStarted);
        }
        monitor.start()?;
        self.active = Some(monitor);
        Ok(())
    }

    /// Stop the active monitor, if there's any.
    pub fn stop(&mut self) {
        if let Some(monitor) = self.active.as_mut() {
            monitor.stop();
        }
    }

    pub fn state(&self) -> MonitorState {
        self.active
            .as_ref()
            .map_or(MonitorState::NotStarted, |monitor| monitor.state())
    }

    /// Wait until the active monitor finishes. Cancel-safe.
    pub async fn wait(&mut self) -> MonitorState {
        match self.active.as_mut() {
            Some(monitor) => monitor.join().await,
            None => MonitorState::NotStarted,
        }
    }
}
