//! Server abstraction on top of [super::ports]

use super::ActorPort;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Structured request handling for server-like actors, which only receive
/// requests on their [ActorPort]s and respond to them.
///
/// Servers run in Tokio tasks and go through three phases:
///
/// 1. `initialize`: [spawn_server] doesn't return until it finishes. An error
///    here is returned from [spawn_server] and the task ends.
/// 2. `handle_message`: invoked once per request, in arrival order.
/// 3. `tear_down`: entered after every [ActorPort] is dropped and the mailbox
///    is drained.
#[async_trait]
pub trait Server<P, R>: Send + 'static {
    /// Returns the name of the Server, which is used in logging messages
    fn get_name(&self) -> String;

    /// Handle a request sent to the [ActorPort] of the server.
    async fn handle_message(&mut self, payload: P) -> Result<R>;

    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Errors from teardown are only logged.
    async fn tear_down(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Starts a task for the given [Server] and returns the port to it once
/// initialization has succeeded.
pub async fn spawn_server<P, R>(
    mut server: impl Server<P, R>,
) -> Result<ActorPort<P, R, anyhow::Error>>
where
    P: Send + 'static,
    R: Send + 'static,
{
    let name = server.get_name();
    log::debug!("{} spawning", name);
    let (port, mut rx) = ActorPort::make();
    let (initialization_sender, initialization_receiver) = oneshot::channel::<Result<()>>();
    tokio::spawn(async move {
        let name = server.get_name();
        let init_result = server.initialize().await;
        let had_init_error = init_result.is_err();
        if initialization_sender.send(init_result).is_err() {
            log::error!("{} spawner went away during initialization", name);
            return;
        }
        if had_init_error {
            return;
        }
        log::info!("{} initialized successfully", name);
        while let Some(req) = rx.recv().await {
            let res = server.handle_message(req.payload).await;
            if let Err(e) = &res {
                log::error!("{} message handler returned error: {:#}", name, e);
            }
            if req.response_sender.send(res).is_err() {
                log::debug!("{} response not delivered, requester isn't waiting", name);
            }
        }
        log::debug!("{} stopping", name);
        if let Err(e) = server.tear_down().await {
            log::error!("{} failed to tear down: {}", name, e);
        }
        log::debug!("{} stopped", name);
    });

    match initialization_receiver.await {
        Ok(Ok(_)) => Ok(port),
        Ok(Err(e)) => {
            log::error!("Error initializing {}: {}", name, e);
            Err(e)
        }
        Err(e) => Err(anyhow!(e)),
    }
}
