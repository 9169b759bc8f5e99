//! Detection of a sustained idle period and the shutdown that follows it.

use std::time::Duration;

use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time::Instant};

use crate::{
    armaf::{Handle, HandleChild},
    external::utilization::UtilizationReader,
    system::{
        sampler::{Resource, Sampler},
        shutdown_effector::{PowerOff, ShutdownPort},
    },
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonitorError {
    #[error("monitor has already been started")]
    AlreadyStarted,

    #[error("invalid monitor configuration: {0}")]
    InvalidConfiguration(String),
}

/// Validated settings of an [IdleMonitor].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    interval: Duration,
    threshold: f64,
    consecutive_required: u32,
    resource: Resource,
}

impl MonitorConfig {
    pub fn new(
        interval: Duration,
        threshold: f64,
        consecutive_required: u32,
        resource: Resource,
    ) -> Result<MonitorConfig, MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidConfiguration(
                "interval must be longer than zero".to_owned(),
            ));
        }
        if !(0.0..=100.0).contains(&threshold) {
            return Err(MonitorError::InvalidConfiguration(format!(
                "threshold {} is not a percentage between 0 and 100",
                threshold
            )));
        }
        if consecutive_required < 1 {
            return Err(MonitorError::InvalidConfiguration(
                "at least one consecutive idle sample has to be required".to_owned(),
            ));
        }
        Ok(MonitorConfig {
            interval,
            threshold,
            consecutive_required,
            resource,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn consecutive_required(&self) -> u32 {
        self.consecutive_required
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    NotStarted,
    Running,
    /// Cancellation was observed by the sampling loop. Terminal.
    Stopped,
    /// Shutdown was requested. Terminal.
    Triggered,
}

/// Counter of consecutive idle samples.
///
/// A sample is idle when it's strictly below the threshold, any other
/// successful sample resets the streak. Failed samples are never passed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakCounter {
    threshold: f64,
    required: u32,
    streak: u32,
}

impl StreakCounter {
    pub fn new(threshold: f64, required: u32) -> StreakCounter {
        StreakCounter {
            threshold,
            required,
            streak: 0,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Record a successful reading. Returns whether the streak has reached
    /// the required length.
    pub fn observe(&mut self, reading: f64) -> bool {
        if reading < self.threshold {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }
        self.streak >= self.required
    }
}

/// Watches the utilization of a resource and requests a shutdown once it has
/// been idle for the configured number of consecutive samples.
///
/// The sampling runs in its own task, started by [IdleMonitor::start]. A
/// monitor runs at most once: after it stops or triggers, a new one has to be
/// created. Dropping a running monitor cancels it like [IdleMonitor::stop].
pub struct IdleMonitor<R: UtilizationReader> {
    config: MonitorConfig,
    unstarted: Option<MonitorLoop<R>>,
    state: watch::Receiver<MonitorState>,
    handle: Option<Handle>,
    task: Option<JoinHandle<MonitorState>>,
}

impl<R: UtilizationReader> IdleMonitor<R> {
    pub fn new(config: MonitorConfig, reader: R, shutdown: ShutdownPort) -> IdleMonitor<R> {
        let (state_sender, state) = watch::channel(MonitorState::NotStarted);
        IdleMonitor {
            config,
            unstarted: Some(MonitorLoop {
                config,
                sampler: Sampler::new(config.resource(), reader),
                streak: StreakCounter::new(config.threshold(), config.consecutive_required()),
                shutdown,
                state_sender,
                handle_child: None,
            }),
            state,
            handle: None,
            task: None,
        }
    }

    /// Start sampling in a new task. Has to be called within a Tokio runtime.
    ///
    /// Fails with [MonitorError::AlreadyStarted] on every call but the first,
    /// without affecting the running loop.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        let mut monitor_loop = self.unstarted.take().ok_or(MonitorError::AlreadyStarted)?;
        let (handle, handle_child) = Handle::new();
        monitor_loop.handle_child = Some(handle_child);
        monitor_loop.state_sender.send_replace(MonitorState::Running);
        log::info!(
            "Monitoring {} every {:?}, shutting down after {} consecutive samples below {:.2}%",
            self.config.resource(),
            self.config.interval(),
            self.config.consecutive_required(),
            self.config.threshold()
        );
        self.task = Some(tokio::spawn(monitor_loop.run()));
        self.handle = Some(handle);
        Ok(())
    }

    /// Request the sampling loop to stop.
    ///
    /// The loop notices at the start of its next tick, a sample or shutdown
    /// already in progress is not interrupted. Calling this on a monitor which
    /// isn't running, or calling it again, does nothing.
    pub fn stop(&mut self) {
        // Dropping the handle is what signals the loop
        let handle = self.handle.take();
        match (handle, self.state()) {
            (Some(_), MonitorState::Running) => {
                log::info!("Stopping {} monitoring", self.config.resource())
            }
            _ => log::debug!("Monitor isn't running, nothing to stop"),
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Wait for the sampling loop to finish and return the state it ended in.
    ///
    /// Returns the current state right away when the monitor hasn't been
    /// started or has already been joined. Cancel-safe.
    pub async fn join(&mut self) -> MonitorState {
        if let Some(task) = self.task.as_mut() {
            let result = task.await;
            self.task = None;
            match result {
                Ok(state) => return state,
                Err(e) => log::error!("Monitoring task failed: {}", e),
            }
        }
        self.state()
    }
}

struct MonitorLoop<R: UtilizationReader> {
    config: MonitorConfig,
    sampler: Sampler<R>,
    streak: StreakCounter,
    shutdown: ShutdownPort,
    state_sender: watch::Sender<MonitorState>,
    handle_child: Option<HandleChild>,
}

impl<R: UtilizationReader> MonitorLoop<R> {
    async fn run(mut self) -> MonitorState {
        let final_state = match self.handle_child.take() {
            Some(mut handle_child) => self.sample_until_done(&mut handle_child).await,
            None => MonitorState::Stopped,
        };
        self.state_sender.send_replace(final_state);
        final_state
    }

    async fn sample_until_done(&mut self, handle_child: &mut HandleChild) -> MonitorState {
        let resource = self.sampler.resource();
        loop {
            let tick_start = Instant::now();
            if handle_child.is_terminated() {
                log::info!("Monitoring stopped");
                return MonitorState::Stopped;
            }

            match self.sampler.sample().await {
                Err(e) => log::error!("Couldn't sample {} utilization: {}", resource, e),
                Ok(reading) => {
                    let reached = self.streak.observe(reading);
                    log::info!(
                        "{} utilization {:.2}% ({}/{} idle)",
                        resource,
                        reading,
                        self.streak.streak(),
                        self.config.consecutive_required()
                    );
                    if reached {
                        // The sample may have been in flight when stop() came
                        if handle_child.is_terminated() {
                            log::info!("Monitoring stopped before shutdown was requested");
                            return MonitorState::Stopped;
                        }
                        self.request_shutdown().await;
                        return MonitorState::Triggered;
                    }
                }
            }

            // A slow tick isn't made up for by shorter ones
            let remaining = self.config.interval().saturating_sub(tick_start.elapsed());
            if !remaining.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => {}
                    _ = handle_child.should_terminate() => {}
                }
            }
        }
    }

    async fn request_shutdown(&mut self) {
        log::warn!(
            "{} was idle for {} consecutive samples, requesting shutdown",
            self.sampler.resource(),
            self.streak.streak()
        );
        if let Err(e) = self.shutdown.tell(PowerOff).await {
            log::error!("Couldn't request shutdown: {}", e);
        }
    }
}
