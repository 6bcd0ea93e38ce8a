//! Local backend tests against an in-process HTTP stub
//!
//! The stub speaks just enough HTTP/1.1 to answer `/api/tags` and
//! `/api/generate`, closing the connection after every response.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use idea_council::backend::{
    BackendFactory, BackendKind, BackendSettings, CompletionRequest, ModelBackend, OllamaBackend,
    OllamaConfig,
};
use idea_council::error::{Error, ErrorCode};

/// Canned response for one route
#[derive(Clone)]
struct Route {
    status: u16,
    body: String,
}

struct StubServer {
    base_url: String,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    async fn start(tags: Route, generate: Route) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let seen = bodies.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let (path, body) = read_request(&mut stream).await;
                let route = if path.ends_with("/api/tags") {
                    tags.clone()
                } else if path.ends_with("/api/generate") {
                    seen.lock().push(body);
                    generate.clone()
                } else {
                    Route { status: 404, body: "{}".to_string() }
                };

                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    route.status,
                    route.body.len(),
                    route.body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            bodies,
        }
    }

    fn config(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.base_url.clone(),
            model: "llama3.1".to_string(),
            timeout_secs: 5,
        }
    }

    fn generate_bodies(&self) -> Vec<serde_json::Value> {
        self.bodies
            .lock()
            .iter()
            .map(|b| serde_json::from_str(b).unwrap())
            .collect()
    }
}

/// Read one request; returns the request path and body
async fn read_request(stream: &mut tokio::net::TcpStream) -> (String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return (String::new(), String::new());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    (path, body)
}

fn ok(body: &str) -> Route {
    Route { status: 200, body: body.to_string() }
}

const TAGS: &str = r#"{"models": [{"name": "llama3.1:latest"}, {"name": "mistral:7b"}]}"#;

#[tokio::test]
async fn test_available_models() {
    let server = StubServer::start(ok(TAGS), ok("{}")).await;
    let backend = OllamaBackend::new(server.config()).unwrap();

    let models = backend.available_models().await.unwrap();
    assert_eq!(models, vec!["llama3.1:latest", "mistral:7b"]);

    let health = backend.health_check().await.unwrap();
    assert!(health.operational);
}

#[tokio::test]
async fn test_generate_sends_non_streaming_request() {
    let server = StubServer::start(
        ok(TAGS),
        ok(r#"{"model": "llama3.1", "response": "{\"score\": 0.7}", "done": true}"#),
    )
    .await;
    let backend = OllamaBackend::new(server.config()).unwrap();

    let response = backend
        .complete(&CompletionRequest::structured("Rate this", r#"{"score": 0.5}"#))
        .await
        .unwrap();
    assert_eq!(response.text, r#"{"score": 0.7}"#);
    assert_eq!(response.model, "llama3.1");

    let bodies = server.generate_bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "llama3.1");
    assert_eq!(bodies[0]["stream"], false);
    assert!(bodies[0]["prompt"].as_str().unwrap().contains("Rate this"));
}

#[tokio::test]
async fn test_generate_status_error() {
    let server = StubServer::start(
        ok(TAGS),
        Route { status: 500, body: r#"{"error": "model crashed"}"#.to_string() },
    )
    .await;
    let backend = OllamaBackend::new(server.config()).unwrap();

    let err = backend
        .complete(&CompletionRequest::text("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BackendStatus { status: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_generate_malformed_body() {
    let server = StubServer::start(ok(TAGS), ok("not json")).await;
    let backend = OllamaBackend::new(server.config()).unwrap();

    let err = backend
        .complete(&CompletionRequest::text("hello"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ParseFailed);
}

#[tokio::test]
async fn test_connect_healthy_server() {
    let server = StubServer::start(ok(TAGS), ok(r#"{"response": "fine"}"#)).await;
    let settings = BackendSettings {
        kind: BackendKind::Local,
        local: server.config(),
        ..Default::default()
    };

    let backend = BackendFactory::connect(&settings).await.unwrap();
    assert_eq!(backend.name(), "local");

    let response = backend
        .complete(&CompletionRequest::text("hello"))
        .await
        .unwrap();
    assert_eq!(response.text, "fine");
}

#[tokio::test]
async fn test_connect_failing_server_is_unavailable() {
    let server = StubServer::start(
        Route { status: 503, body: "{}".to_string() },
        ok("{}"),
    )
    .await;
    let settings = BackendSettings {
        kind: BackendKind::Local,
        local: server.config(),
        ..Default::default()
    };

    let err = BackendFactory::connect(&settings).await.err().unwrap();
    assert_eq!(err.code(), ErrorCode::BackendUnavailable);
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_connect_unreachable_server() {
    let settings = BackendSettings {
        kind: BackendKind::Local,
        local: OllamaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        },
        ..Default::default()
    };

    let err = BackendFactory::connect(&settings).await.err().unwrap();
    assert_eq!(err.code(), ErrorCode::BackendUnavailable);
}
