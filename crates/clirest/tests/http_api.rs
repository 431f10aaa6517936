use std::net::SocketAddr;
use std::sync::Arc;

use clirest::{build_router, commands};
use clirest_core::{CommandDescriptor, Group, Outcome, Registry};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn spawn_app(registry: Registry, prefix: &str) -> SocketAddr {
    let app = build_router(&Arc::new(registry), prefix);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn default_app() -> SocketAddr {
    spawn_app(commands::registry().expect("registry"), "/api").await
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(body) = body {
        req.push_str("Content-Type: application/json\r\n");
        req.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
    } else {
        req.push_str("\r\n");
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, body.to_string())
}

async fn get_json(addr: SocketAddr, path: &str) -> (u16, Value) {
    let (status, body) = send_raw(addr, "GET", path, None).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

async fn post_json(addr: SocketAddr, path: &str, body: &str) -> (u16, Value) {
    let (status, body) = send_raw(addr, "POST", path, Some(body)).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

fn message(json: &Value) -> &str {
    json.get("message").and_then(Value::as_str).expect("message field")
}

fn error(json: &Value) -> &str {
    json.get("error").and_then(Value::as_str).expect("error field")
}

#[tokio::test]
async fn greet_get_success() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api/greet?name=John&age=30").await;
    assert_eq!(status, 200);
    let msg = message(&json);
    assert!(msg.contains("Hello, John. You are 30 years old."));
    assert!(msg.contains("Your burth street is unknown"));
    assert!(msg.contains("You are from California: False"));
}

#[tokio::test]
async fn greet_missing_required_option() {
    let addr = default_app().await;

    let (status, json) = get_json(addr, "/api/greet").await;
    assert_eq!(status, 400);
    assert_eq!(error(&json), "Missing required option: --name");

    let (status, json) = post_json(addr, "/api/greet", "{}").await;
    assert_eq!(status, 400);
    assert_eq!(error(&json), "Missing required option: --name");
}

#[tokio::test]
async fn greet_post_success() {
    let addr = default_app().await;
    let (status, json) = post_json(addr, "/api/greet", r#"{"name": "John", "age": 30}"#).await;
    assert_eq!(status, 200);
    assert!(message(&json).contains("Hello, John. You are 30 years old."));
}

#[tokio::test]
async fn greet_short_options() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api/greet?n=Jane&s=Maple&age=25").await;
    assert_eq!(status, 200);
    assert!(message(&json)
        .contains("Hello, Jane. You are 25 years old. Your burth street is Maple."));
}

#[tokio::test]
async fn greet_flag_in_query() {
    let addr = default_app().await;

    let (_, json) = get_json(addr, "/api/greet?name=John&age=30&cc=Yeah").await;
    assert!(message(&json).contains("You are from California: True"));

    let (_, json) = get_json(addr, "/api/greet?name=John&cc").await;
    assert!(message(&json).contains("You are from California: True"));

    let (_, json) = get_json(addr, "/api/greet?name=John&age=30").await;
    assert!(message(&json).contains("You are from California: False"));
}

#[tokio::test]
async fn greet_flag_in_body() {
    let addr = default_app().await;

    let (_, json) = post_json(addr, "/api/greet", r#"{"name": "John", "age": 30, "cc": true}"#).await;
    assert!(message(&json).contains("You are from California: True"));

    let (_, json) = post_json(addr, "/api/greet", r#"{"name": "John", "cc": false}"#).await;
    assert!(message(&json).contains("You are from California: False"));
}

#[tokio::test]
async fn greet_choice_validation() {
    let addr = default_app().await;

    let (status, json) = get_json(addr, "/api/greet?name=John&verbose=NOPE").await;
    assert_eq!(status, 400);
    assert_eq!(
        error(&json),
        "Invalid value for --verbose. Choose from [DEBUG, INFO, WARNING, ERROR, CRITICAL]."
    );

    let (status, json) = get_json(addr, "/api/greet?name=John&age=30&verbose=DEBUG").await;
    assert_eq!(status, 200);
    assert!(message(&json).contains("Verbose: DEBUG"));
}

#[tokio::test]
async fn greet_invalid_integer() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api/greet?name=John&age=old").await;
    assert_eq!(status, 400);
    assert_eq!(error(&json), "Invalid value for --age. 'old' is not a valid integer.");
}

#[tokio::test]
async fn get_and_post_agree() {
    let addr = default_app().await;
    let (_, from_get) = get_json(addr, "/api/greet?n=Ann&age=41&v=ERROR&cc=1").await;
    let (_, from_post) = post_json(
        addr,
        "/api/greet",
        r#"{"name": "Ann", "age": 41, "verbose": "ERROR", "cc": true}"#,
    )
    .await;
    assert_eq!(from_get, from_post);
}

#[tokio::test]
async fn unparsable_body_is_empty() {
    let addr = default_app().await;
    let (status, json) = post_json(addr, "/api/greet", "name=John").await;
    assert_eq!(status, 400);
    assert_eq!(error(&json), "Missing required option: --name");

    let (status, body) = send_raw(addr, "POST", "/api/greet", None).await;
    assert_eq!(status, 400);
    assert!(body.contains("Missing required option: --name"));
}

#[tokio::test]
async fn send_email_success() {
    let addr = default_app().await;
    let (status, json) = post_json(addr, "/api/send-email", r#"{"email": "test@example.com"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(message(&json), "Email sent to test@example.com");
}

#[tokio::test]
async fn send_email_invalid_address() {
    let addr = default_app().await;
    let (status, json) = post_json(addr, "/api/send-email", r#"{"email": "test"}"#).await;
    assert_eq!(status, 500);
    assert!(error(&json).contains("is not a valid email address"));
    assert!(error(&json).starts_with("Exception: "));
}

#[tokio::test]
async fn exception_text_fails() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api/exception-text").await;
    assert_eq!(status, 500);
    assert_eq!(error(&json), "Exception: This is an exception");
}

#[tokio::test]
async fn echo_returns_captured_output() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api/echo?text=hi&repeat=2").await;
    assert_eq!(status, 200);
    assert_eq!(message(&json), "hi\nhi");
}

#[tokio::test]
async fn echo_rejects_huge_repeat() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api/echo?text=xxxxxxxxxx&repeat=20000000").await;
    assert_eq!(status, 500);
    assert!(error(&json).contains("repeat must be between 0 and 100"));
}

#[tokio::test]
async fn index_lists_commands() {
    let addr = default_app().await;
    let (status, json) = get_json(addr, "/api").await;
    assert_eq!(status, 200);
    let names: Vec<&str> = json["commands"]
        .as_array()
        .expect("commands array")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["greet", "send-email", "exception-text", "echo"]);
}

#[tokio::test]
async fn unknown_routes() {
    let addr = default_app().await;
    let (status, _) = send_raw(addr, "GET", "/api/mail", None).await;
    assert_eq!(status, 404);
    let (status, _) = send_raw(addr, "GET", "/api/nope", None).await;
    assert_eq!(status, 404);
    let (status, _) = send_raw(addr, "DELETE", "/api/greet", None).await;
    assert_eq!(status, 405);
}

#[tokio::test]
async fn custom_commands_and_prefix() {
    let root = Group::new("cli")
        .command(CommandDescriptor::new("list", |_| Ok(Outcome::from(serde_json::json!([1, 2])))))
        .command(CommandDescriptor::new("crash", |_| -> anyhow::Result<Outcome> {
            panic!("handler blew up")
        }));
    let addr = spawn_app(Registry::new(root).expect("registry"), "/v1").await;

    let (status, json) = get_json(addr, "/v1/list").await;
    assert_eq!(status, 200);
    assert_eq!(error(&json), "Unsupported return type from command");

    let (status, json) = post_json(addr, "/v1/crash", "{}").await;
    assert_eq!(status, 500);
    assert_eq!(error(&json), "Exception: handler blew up");

    let (status, _) = send_raw(addr, "GET", "/api/list", None).await;
    assert_eq!(status, 404);
}
