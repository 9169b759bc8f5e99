use super::ports;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

#[tokio::test]
async fn test_request_response() {
    let (request, receiver): (ports::Request<(), bool, ()>, _) = ports::Request::new(());
    assert_eq!(request.payload, ());
    request
        .respond(Ok(true))
        .expect("Channel failure when sending response");
    let response = receiver
        .await
        .expect("Channel failure when receiving response");
    assert_eq!(response, Ok(true));
}

#[tokio::test]
async fn test_actor_port() {
    let termination_flag = make_flag();
    let (port, _) = spawn_two_increments_one_error(termination_flag.clone());
    assert_eq!(port.request(TestActorMessage::Increment).await.unwrap(), 0);
    assert_eq!(port.request(TestActorMessage::Increment).await.unwrap(), 1);
    let error = port
        .request(TestActorMessage::Increment)
        .await
        .expect_err("Expected an error from actor");
    if let ports::ActorRequestError::Actor(e) = error {
        assert_eq!(e.to_string(), "Saturated");
    } else {
        panic!("An error from Actor is not translated correctly");
    }
    assert!(!termination_flag.load(Ordering::Acquire));
    port.await_shutdown().await;
    assert!(termination_flag.load(Ordering::Acquire));
}

#[tokio::test]
async fn test_request_errors() {
    let (port, _) = spawn_two_increments_one_error(make_flag());
    let recv_error = port
        .request(TestActorMessage::Terminate)
        .await
        .expect_err("Actor should close the oneshot channel when terminating");
    assert!(matches!(recv_error, ports::ActorRequestError::Recv));
    let send_error = port
        .request(TestActorMessage::Increment)
        .await
        .expect_err("Actor request channel is still sendable after actor termination");
    assert!(matches!(send_error, ports::ActorRequestError::Send));

    // Hangs forever if the shutdown notifier isn't dropped with the actor
    port.await_shutdown().await;
}

#[tokio::test]
async fn test_tell_is_handled_before_shutdown() {
    let (port, handled) = spawn_two_increments_one_error(make_flag());
    port.tell(TestActorMessage::Increment).await.unwrap();
    port.tell(TestActorMessage::Increment).await.unwrap();
    port.await_shutdown().await;
    assert_eq!(handled.load(Ordering::Acquire), 2);
}

#[tokio::test]
async fn test_tell_after_termination() {
    let (port, _) = spawn_two_increments_one_error(make_flag());
    let _ = port.request(TestActorMessage::Terminate).await;
    assert!(matches!(
        port.tell(TestActorMessage::Increment).await,
        Err(ports::ActorRequestError::Send)
    ));
}

enum TestActorMessage {
    Increment,
    // Actors should terminate on their own, only used to test error handling.
    Terminate,
}

fn spawn_two_increments_one_error(
    termination_flag: Arc<AtomicBool>,
) -> (
    ports::ActorPort<TestActorMessage, usize, std::io::Error>,
    Arc<AtomicUsize>,
) {
    let handled = Arc::new(AtomicUsize::new(0));
    let task_handled = handled.clone();
    let (port, mut rx) = ports::ActorPort::make();
    tokio::spawn(async move {
        let mut count = 0;
        while let Some(req) = rx.recv().await {
            match req.payload {
                TestActorMessage::Increment => {
                    task_handled.fetch_add(1, Ordering::AcqRel);
                    let response = if count < 2 {
                        count += 1;
                        Ok(count - 1)
                    } else {
                        Err(std::io::Error::new(std::io::ErrorKind::Other, "Saturated"))
                    };
                    // Requests sent with tell have nobody waiting for the response
                    let _ = req.respond(response);
                }
                TestActorMessage::Terminate => return,
            }
        }
        termination_flag.store(true, Ordering::Release);
    });
    (port, handled)
}

#[tokio::test]
async fn test_handle_drop() {
    let flag = make_flag();
    let handle = spawn_handle_tester(flag.clone());
    assert!(!flag.load(Ordering::Acquire));
    drop(handle);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(flag.load(Ordering::Acquire));
}

#[tokio::test]
async fn test_handle_await() {
    let flag = make_flag();
    let handle = spawn_handle_tester(flag.clone());
    assert!(!flag.load(Ordering::Acquire));
    handle.await_shutdown().await;
    assert!(flag.load(Ordering::Acquire));
}

#[tokio::test]
async fn test_handle_is_terminated() {
    let (handle, mut child) = ports::Handle::new();
    assert!(!child.is_terminated());
    assert!(!child.is_terminated());
    drop(handle);
    assert!(child.is_terminated());
    assert!(child.is_terminated());
}

fn spawn_handle_tester(termination_flag: Arc<AtomicBool>) -> ports::Handle {
    let (handle, mut handle_child) = ports::Handle::new();
    tokio::spawn(async move {
        handle_child.should_terminate().await;
        termination_flag.store(true, Ordering::Release);
    });
    handle
}

fn make_flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}
