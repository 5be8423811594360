//! Inbound dispatch and listener registry tests for the socket hub

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use socket_hub::hub::{ConnectionState, HubError, SocketHub};
use socket_hub::protocol::CLOSE_GOING_AWAY;
use socket_hub::MockConnector;
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;

type Log = Arc<Mutex<Vec<String>>>;

async fn connected() -> (SocketHub, MockConnector) {
    let connector = MockConnector::immediate();
    let hub = SocketHub::new(connector.clone());
    assert_ok!(assert_ok!(hub.connect("mock://dispatch")).wait().await);
    (hub, connector)
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/// Poll until `check` holds; inbound frames are handled on the reader task
async fn eventually<F: Fn() -> bool>(check: F) {
    timeout(Duration::from_secs(2), async {
        while !check() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_inbound_message_dispatched_by_type_in_order() {
    let (hub, connector) = connected().await;
    let calls = log();

    let a = Arc::clone(&calls);
    hub.on("chat:message", move |payload| record(&a, format!("A:{}", payload["text"])));
    let b = Arc::clone(&calls);
    hub.on("chat:message", move |payload| record(&b, format!("B:{}", payload["text"])));
    let other = Arc::clone(&calls);
    hub.on("cart:update", move |_| record(&other, "cart"));

    assert!(connector.push_message("chat:message", json!({ "text": "hello" })));

    eventually(|| calls.lock().unwrap().len() == 2).await;
    assert_eq!(*calls.lock().unwrap(), vec!["A:\"hello\"", "B:\"hello\""]);
    assert_eq!(hub.stats().messages_received, 1);
}

#[tokio::test]
async fn test_connect_listeners_run_in_registration_order() {
    let hub = SocketHub::new(MockConnector::immediate());
    let calls = log();

    let a = Arc::clone(&calls);
    hub.on_connect(move |_| record(&a, "A"));
    let b = Arc::clone(&calls);
    hub.on_connect(move |_| record(&b, "B"));

    assert_ok!(assert_ok!(hub.connect("mock://order")).wait().await);
    assert_eq!(*calls.lock().unwrap(), vec!["A", "B"]);
}

#[tokio::test]
async fn test_unsubscribed_handler_is_not_invoked() {
    let (hub, connector) = connected().await;
    let calls = log();

    let a = Arc::clone(&calls);
    let first = hub.on("listing:update", move |_| record(&a, "A"));
    let b = Arc::clone(&calls);
    hub.on("listing:update", move |_| record(&b, "B"));

    assert!(first.unsubscribe());
    assert_eq!(hub.listener_count("listing:update"), 1);

    connector.push_message("listing:update", json!({ "isbn": "9780262033848" }));
    eventually(|| !calls.lock().unwrap().is_empty()).await;

    connector.push_message("listing:update", json!({ "isbn": "9780262033848" }));
    eventually(|| calls.lock().unwrap().len() == 2).await;

    assert_eq!(*calls.lock().unwrap(), vec!["B", "B"]);
}

#[tokio::test]
async fn test_unsubscribed_lifecycle_handlers_are_not_invoked() {
    let hub = SocketHub::new(MockConnector::immediate());
    let calls = log();

    let a = Arc::clone(&calls);
    let connect_sub = hub.on_connect(move |_| record(&a, "connect"));
    let b = Arc::clone(&calls);
    let disconnect_sub = hub.on_disconnect(move |_| record(&b, "disconnect"));
    let c = Arc::clone(&calls);
    hub.on_connect(move |_| record(&c, "connect-kept"));

    assert!(connect_sub.unsubscribe());
    assert!(disconnect_sub.unsubscribe());

    assert_ok!(assert_ok!(hub.connect("mock://x")).wait().await);
    hub.disconnect();

    assert_eq!(*calls.lock().unwrap(), vec!["connect-kept"]);
}

#[tokio::test]
async fn test_registries_survive_reconnect() {
    let (hub, connector) = connected().await;
    let calls = log();

    let a = Arc::clone(&calls);
    hub.on("chat:typing", move |payload| record(&a, payload.to_string()));

    hub.disconnect();
    assert_ok!(assert_ok!(hub.connect("mock://dispatch")).wait().await);

    connector.push_message("chat:typing", json!(true));
    eventually(|| calls.lock().unwrap().len() == 1).await;
    assert_eq!(*calls.lock().unwrap(), vec!["true"]);
}

#[tokio::test]
async fn test_message_without_payload_delivers_null() {
    let (hub, connector) = connected().await;
    let payloads = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&payloads);
    hub.on("ping", move |payload| sink.lock().unwrap().push(payload.clone()));

    connector.push_frame(r#"{"type":"ping"}"#);
    eventually(|| payloads.lock().unwrap().len() == 1).await;
    assert_eq!(payloads.lock().unwrap()[0], Value::Null);
}

#[tokio::test]
async fn test_malformed_frame_reaches_error_listeners() {
    let (hub, connector) = connected().await;
    let errors = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&errors);
    hub.on_error(move |err| sink.lock().unwrap().push(err.clone()));

    connector.push_frame("{not json");
    eventually(|| errors.lock().unwrap().len() == 1).await;

    assert!(matches!(errors.lock().unwrap()[0], HubError::MalformedFrame(_)));
    assert!(hub.is_connected());
    assert_eq!(hub.stats().dispatch_errors, 1);
    assert_eq!(hub.stats().messages_received, 0);
}

#[tokio::test]
async fn test_transport_error_is_forwarded() {
    let (hub, connector) = connected().await;
    let errors = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&errors);
    hub.on_error(move |err| sink.lock().unwrap().push(err.clone()));

    connector.push_error("buffer overflow");
    eventually(|| errors.lock().unwrap().len() == 1).await;

    assert_eq!(
        errors.lock().unwrap()[0],
        HubError::Transport("buffer overflow".to_string())
    );
    assert!(hub.is_connected());
}

#[tokio::test]
async fn test_remote_close_notifies_disconnect_listeners() {
    let (hub, connector) = connected().await;
    let reasons = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&reasons);
    hub.on_disconnect(move |reason| sink.lock().unwrap().push(reason.clone()));

    assert!(connector.close_remote(Some(CLOSE_GOING_AWAY), "server going away"));
    eventually(|| reasons.lock().unwrap().len() == 1).await;

    {
        let reasons = reasons.lock().unwrap();
        assert!(!reasons[0].initiated_locally);
        assert_eq!(reasons[0].code, Some(CLOSE_GOING_AWAY));
        assert_eq!(reasons[0].message, "server going away");
    }
    assert_eq!(hub.state(), ConnectionState::Closed);

    // A local disconnect afterwards has nothing left to close
    hub.disconnect();
    sleep(Duration::from_millis(20)).await;
    assert_eq!(reasons.lock().unwrap().len(), 1);

    assert_ok!(assert_ok!(hub.connect("mock://dispatch")).wait().await);
    assert!(hub.is_connected());
}

#[tokio::test]
async fn test_handler_subscribing_during_dispatch_waits_for_next_message() {
    let (hub, connector) = connected().await;
    let calls = log();

    let hub_in_handler = hub.clone();
    let outer = Arc::clone(&calls);
    hub.on("chat:message", move |_| {
        record(&outer, "outer");
        let inner = Arc::clone(&outer);
        hub_in_handler.on("chat:message", move |_| record(&inner, "inner"));
    });

    connector.push_message("chat:message", json!(1));
    eventually(|| calls.lock().unwrap().len() == 1).await;

    connector.push_message("chat:message", json!(2));
    eventually(|| calls.lock().unwrap().len() == 3).await;

    assert_eq!(*calls.lock().unwrap(), vec!["outer", "outer", "inner"]);
}
