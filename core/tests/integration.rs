//! User lifecycle against the live mock server.
//!
//! Starts the mock server on a random port, then drives the real
//! `UreqTransport` over plain HTTP. Validates request building, credentials,
//! response decoding and error mapping end to end.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::json;
use talentlms::{Client, ClientConfig, Error, Operation, Params, UserLookup};

const API_KEY: &str = "KEY123";

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, API_KEY).await
        })
        .unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr, key: &str) -> Client {
    let config = ClientConfig::new(addr.to_string(), key)
        .unwrap()
        .with_tls(false)
        .with_timeout(Duration::from_secs(5));
    Client::from_config(config)
}

fn signup_params() -> Params {
    Params::new()
        .with("first_name", "John")
        .with("last_name", "Smith")
        .with("email", "jsmith@example.com")
        .with("login", "jsmith")
        .with("password", "Secret123")
        .with("custom_fields", json!({"custom_field_1": "Company LLC"}))
}

#[test]
fn user_lifecycle() {
    let addr = start_server();
    let client = client_for(addr, API_KEY);

    // Step 1: list, should be empty.
    let users = client.users(&Params::new()).unwrap();
    assert_eq!(users, json!([]));

    // Step 2: create a user.
    let created = client.user_signup(&signup_params()).unwrap();
    assert_eq!(created["login"], "jsmith");
    assert_eq!(created["custom_field_1"], "Company LLC");
    let id = created["id"].as_u64().unwrap();

    // Step 3: same email again.
    let err = client.user_signup(&signup_params()).unwrap_err();
    assert!(matches!(err, Error::UserAlreadyExists(_)), "{err:?}");
    assert_eq!(err.service().unwrap().status, 400);

    // Step 4: look up by email, then by id.
    let fetched = client
        .find_user(&UserLookup::parse("jsmith@example.com"))
        .unwrap();
    assert_eq!(fetched["id"], id);
    let fetched = client.find_user(&UserLookup::Id(id)).unwrap();
    assert_eq!(fetched["email"], "jsmith@example.com");

    // Step 5: wrong password, then a login link.
    let err = client
        .user_login(&Params::new().with("login", "jsmith").with("password", "nope"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidLogin(_)), "{err:?}");

    let login = client
        .user_login(&Params::new().with("login", "jsmith").with("password", "Secret123"))
        .unwrap();
    assert_eq!(login["user_id"], id.to_string());
    assert!(login["login_key"].as_str().unwrap().contains("autologin"));

    // Step 6: deactivate.
    let status = client
        .user_set_status(&Params::new().with("user_id", id).with("status", "inactive"))
        .unwrap();
    assert_eq!(status["status"], "inactive");

    // Step 7: list, one user, in order.
    let users = client.users(&Params::new()).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["status"], "inactive");

    // Step 8: delete.
    let deleted = client
        .delete_user(&Params::new().with("user_id", id))
        .unwrap();
    assert_eq!(deleted["message"], "Operation completed successfully");

    // Step 9: lookup after delete.
    let err = client.find_user(&UserLookup::Id(id)).unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)), "{err:?}");
}

#[test]
fn site_info_and_rate_limit() {
    let addr = start_server();
    let client = client_for(addr, API_KEY);

    let info = client.site_info(&Params::new()).unwrap();
    assert_eq!(info["total_users"], "0");

    let limit = client.call_named("rate_limit", &Params::new()).unwrap();
    assert_eq!(limit["limit"], "2000");
}

#[test]
fn wrong_key_is_access_denied() {
    let addr = start_server();
    let client = client_for(addr, "WRONG");

    let err = client.users(&Params::new()).unwrap_err();
    assert!(matches!(err, Error::AccessDenied(_)), "{err:?}");
}

#[test]
fn unknown_action_is_invalid_request() {
    let addr = start_server();
    let client = client_for(addr, API_KEY);

    let op = Operation::get("nosuchaction");
    let err = client.call(&op, &Params::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)), "{err:?}");
}

#[test]
fn refused_connection_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr, API_KEY);

    let err = client.users(&Params::new()).unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");
}

#[test]
fn stalled_server_times_out_as_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        // Accept and hold the connection without ever answering.
        let (_stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_secs(5));
    });

    let config = ClientConfig::new(addr.to_string(), API_KEY)
        .unwrap()
        .with_tls(false)
        .with_timeout(Duration::from_millis(300));
    let client = Client::from_config(config);

    let started = std::time::Instant::now();
    let err = client.site_info(&Params::new()).unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
}
