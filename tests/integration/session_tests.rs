use super::*;
use argus_cart::session::{AccountLocks, BrowserSessionManager};
use argus_cart::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_unreachable_endpoint_is_fatal_connection_error() {
    let mut config = get_test_config().browser;
    // Nothing listens on port 1
    config.debug_port = 1;

    let result = BrowserSessionManager::connect(&config).await;
    match result {
        Err(AppError::Connection { endpoint, .. }) => {
            assert!(endpoint.contains("127.0.0.1:1"));
        }
        other => panic!("expected Connection error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_endpoint_without_websocket_url_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Browser": "Chrome/120.0",
            "Protocol-Version": "1.3"
        })))
        .mount(&server)
        .await;

    let mut config = get_test_config().browser;
    let address = server.address();
    config.debug_host = address.ip().to_string();
    config.debug_port = address.port();

    let result = BrowserSessionManager::connect(&config).await;
    match result {
        Err(AppError::Connection { message, .. }) => {
            assert!(message.contains("webSocketDebuggerUrl"));
        }
        other => panic!("expected Connection error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_second_call_waits_for_first_session_to_release() {
    let locks = AccountLocks::new();
    let events: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let locks = locks.clone();
        let events = Arc::clone(&events);
        tokio::spawn(async move {
            let _guard = locks.acquire("acc-test").await;
            events.lock().await.push("first-acquired");
            // Artificial in-session delay
            tokio::time::sleep(Duration::from_millis(100)).await;
            events.lock().await.push("first-released");
        })
    };

    // Give the first call a head start on the lock
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = {
        let locks = locks.clone();
        let events = Arc::clone(&events);
        tokio::spawn(async move {
            let _guard = locks.acquire("acc-test").await;
            events.lock().await.push("second-acquired");
        })
    };

    first.await.unwrap();
    second.await.unwrap();

    // The second call must not start its session until the first releases
    let events = events.lock().await;
    assert_eq!(
        *events,
        vec!["first-acquired", "first-released", "second-acquired"]
    );
}

#[tokio::test]
async fn test_sessions_for_distinct_accounts_interleave() {
    let locks = AccountLocks::new();

    let _guard_a = locks.acquire("acc-a").await;
    let other =
        tokio::time::timeout(Duration::from_millis(100), locks.acquire("acc-b")).await;
    assert!(other.is_ok(), "a different account must not be blocked");
}

#[tokio::test]
async fn test_cookie_jar_roundtrips_through_account_fixture() {
    // The jar is an ordered list; injection order follows jar order
    let account = create_test_account();
    assert_eq!(account.cookies.len(), 2);
    assert_eq!(account.cookies[0].name, "session_id");
    assert_eq!(account.cookies[1].name, "csrf_token");
}
