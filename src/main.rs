#![warn(missing_docs)]

//! Powers a Linux machine off after its processor or memory utilization has
//! stayed below a threshold for a number of consecutive samples.

mod armaf;
mod config;
mod control;
mod external;
mod system;

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use tokio::signal;

use config::{Args, PowerOffMethod, Settings, ShutdownSettings};
use control::{
    idle_monitor::{IdleMonitor, MonitorState},
    session::MonitorSession,
};
use external::{
    power::{
        command::CommandPowerController, dry_run::DryRunPowerController,
        logind::LogindPowerController,
    },
    utilization::sysinfo_reader::SysinfoReader,
};
use system::shutdown_effector::{ShutdownEffector, ShutdownPort};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = init_logging(args.verbose)?;
    let settings = Settings::load(&args).context("Invalid configuration")?;
    log::debug!("Running with {:?}", settings);

    let shutdown_port = spawn_shutdown_effector(&settings.shutdown).await?;
    let reader = SysinfoReader::new().context("Can't read utilization on this system")?;
    let mut session = MonitorSession::new();
    session.start(IdleMonitor::new(
        settings.monitor,
        reader,
        shutdown_port.clone(),
    ))?;

    let termination = wait_for_termination_signal();
    tokio::pin!(termination);
    let finished = tokio::select! {
        state = session.wait() => Some(state),
        _ = &mut termination => None,
    };
    let final_state = match finished {
        Some(state) => state,
        None => {
            session.stop();
            session.wait().await
        }
    };

    if final_state == MonitorState::Triggered {
        // Returns once the effector has gone through the grace delay and
        // powered off
        shutdown_port.await_shutdown().await;
    } else {
        log::info!("Exiting without shutting down");
    }
    Ok(())
}

fn init_logging(verbose: bool) -> Result<LoggerHandle> {
    let default_spec = if verbose { "debug" } else { "info" };
    let handle = Logger::try_with_env_or_str(default_spec)?
        .format(flexi_logger::detailed_format)
        .start()
        .context("Couldn't start logger")?;
    log_panics::init();
    Ok(handle)
}

async fn spawn_shutdown_effector(settings: &ShutdownSettings) -> Result<ShutdownPort> {
    let grace_delay = settings.grace_delay;
    match &settings.method {
        PowerOffMethod::Logind => {
            let controller = LogindPowerController::connect().await?;
            ShutdownEffector::new(controller, grace_delay).spawn().await
        }
        PowerOffMethod::Command(command) => {
            let controller = CommandPowerController::new(command.clone());
            ShutdownEffector::new(controller, grace_delay).spawn().await
        }
        PowerOffMethod::DryRun => {
            ShutdownEffector::new(DryRunPowerController, grace_delay)
                .spawn()
                .await
        }
    }
}

async fn wait_for_termination_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Couldn't listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Couldn't listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl-C"),
        _ = terminate => log::info!("Received SIGTERM"),
    }
}
