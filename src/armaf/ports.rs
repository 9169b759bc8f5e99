//! Basic primitives for talking to Tokio tasks through channels.

use std::{fmt::Debug, result::Result};
use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TryRecvError},
    oneshot, watch,
};

type ResponseReceiver<R, E> = oneshot::Receiver<Result<R, E>>;

/// A request sent to an actor.
///
/// Carries the payload and the [oneshot] channel on which the actor reports
/// the result of handling it.
pub struct Request<P, R, E> {
    pub payload: P,
    pub response_sender: oneshot::Sender<Result<R, E>>,
}

impl<P, R, E> Request<P, R, E> {
    /// Creates a new [Request] with the given payload. The matching
    /// [ResponseReceiver] is returned next to it.
    pub fn new(payload: P) -> (Request<P, R, E>, ResponseReceiver<R, E>) {
        let (response_sender, response_receiver) = oneshot::channel();
        let request = Request {
            payload,
            response_sender,
        };
        (request, response_receiver)
    }

    /// Sends a response on the [Request]'s [oneshot] channel.
    ///
    /// Fails when the requester is no longer waiting, which is normal for
    /// requests sent with [ActorPort::tell].
    #[cfg(test)]
    pub fn respond(self, response: Result<R, E>) -> Result<(), Result<R, E>> {
        self.response_sender.send(response)
    }
}

/// An error occuring during the exchange of messages with an actor.
#[derive(Debug, Error, Clone)]
pub enum ActorRequestError<E: Debug> {
    #[error("error when sending message to actor")]
    Send,

    // Only produced by ActorPort::request
    #[error("error while awaiting request response channel")]
    #[cfg_attr(not(test), allow(dead_code))]
    Recv,

    #[error("internal actor error: {0:?}")]
    #[cfg_attr(not(test), allow(dead_code))]
    Actor(E),
}

/// The sending side of an actor's mailbox.
///
/// Ports are clone-able, an actor has to be prepared to receive requests from
/// several owners. An actor terminates once every port to it is dropped, it
/// should not expect a dedicated stop message.
#[derive(Debug)]
pub struct ActorPort<P, R, E: Debug> {
    message_sender: mpsc::Sender<Request<P, R, E>>,
    shutdown_receiver: watch::Receiver<()>,
}

// Derived Clone would require E: Clone and anyhow::Error isn't.
impl<P, R, E: Debug> Clone for ActorPort<P, R, E> {
    fn clone(&self) -> Self {
        Self {
            message_sender: self.message_sender.clone(),
            shutdown_receiver: self.shutdown_receiver.clone(),
        }
    }
}

impl<P, R, E: Debug> ActorPort<P, R, E> {
    /// Creates a port and the [ActorReceiver] which should be moved into the
    /// actor's task.
    pub fn make() -> (ActorPort<P, R, E>, ActorReceiver<P, R, E>) {
        let (req_tx, req_rx) = mpsc::channel::<Request<P, R, E>>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        (
            ActorPort {
                message_sender: req_tx,
                shutdown_receiver: shutdown_rx,
            },
            ActorReceiver {
                request_receiver: req_rx,
                _shutdown_notifier: shutdown_tx,
            },
        )
    }

    /// Sends a request and waits for the actor's response.
    #[cfg(test)]
    pub async fn request(&self, payload: P) -> Result<R, ActorRequestError<E>> {
        let (req, rx) = Request::new(payload);
        if self.message_sender.send(req).await.is_err() {
            return Err(ActorRequestError::Send);
        }
        match rx.await {
            Err(_) => Err(ActorRequestError::Recv),
            Ok(Ok(response)) => Ok(response),
            Ok(Err(actor_error)) => Err(ActorRequestError::Actor(actor_error)),
        }
    }

    /// Enqueues a request without waiting for it to be handled.
    ///
    /// Returns once the request is in the actor's mailbox. The outcome of the
    /// request is only visible in the actor's own log.
    pub async fn tell(&self, payload: P) -> Result<(), ActorRequestError<E>> {
        let (req, _) = Request::new(payload);
        self.message_sender
            .send(req)
            .await
            .map_err(|_| ActorRequestError::Send)
    }

    /// Await actor termination
    ///
    /// Drops this port's message sender and waits until all the other clones
    /// of this port are gone and the actor has dropped its [ActorReceiver].
    /// Requests already in the mailbox are still handled.
    pub async fn await_shutdown(self) {
        drop(self.message_sender);
        let mut shutdown_receiver = self.shutdown_receiver;
        let result = shutdown_receiver.changed().await;
        assert!(result.is_err());
    }
}

/// The receiving side of an [ActorPort].
///
/// Dropping it signals termination to [ActorPort::await_shutdown], so it must
/// be the last thing an actor drops.
#[derive(Debug)]
pub struct ActorReceiver<P, R, E: Debug> {
    pub request_receiver: mpsc::Receiver<Request<P, R, E>>,
    _shutdown_notifier: watch::Sender<()>,
}

impl<P, R, E: Debug> ActorReceiver<P, R, E> {
    /// Same semantics as [mpsc::Receiver::recv].
    pub async fn recv(&mut self) -> Option<Request<P, R, E>> {
        self.request_receiver.recv().await
    }

    /// Same semantics as [mpsc::Receiver::try_recv].
    pub fn try_recv(&mut self) -> Result<Request<P, R, E>, TryRecvError> {
        self.request_receiver.try_recv()
    }
}

/// A close-once termination signal with single-parent semantics.
///
/// Dropping the [Handle] (or calling [Handle::await_shutdown]) closes the
/// channel which the [HandleChild] watches. Since closing happens on drop,
/// it can happen at most once.
pub struct Handle(ActorPort<(), (), ()>);

impl Handle {
    /// Create a new Handle and the child side which the supervised task keeps.
    pub fn new() -> (Handle, HandleChild) {
        let (port, receiver) = ActorPort::make();
        (Handle(port), HandleChild(receiver))
    }

    /// Signal termination and wait until the child side is dropped.
    #[cfg(test)]
    pub async fn await_shutdown(self) {
        self.0.await_shutdown().await
    }
}

/// The side of the handle belonging to the supervised task.
///
/// Dropping it tells the parent that the task has finished.
pub struct HandleChild(ActorReceiver<(), (), ()>);

impl HandleChild {
    /// Wait until the parent [Handle] is dropped or its
    /// [await_shutdown](`Handle::await_shutdown`) method is called.
    ///
    /// Never returns otherwise, use it inside a [tokio::select!] block.
    pub async fn should_terminate(&mut self) {
        let res = self.0.recv().await;
        assert!(res.is_none());
    }

    /// Non-blocking variant of [Self::should_terminate].
    pub fn is_terminated(&mut self) -> bool {
        matches!(self.0.try_recv(), Err(TryRecvError::Disconnected))
    }
}
