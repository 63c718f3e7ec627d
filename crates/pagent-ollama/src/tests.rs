//! Client tests against a one-shot local HTTP responder

use futures::TryStreamExt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::{OllamaClient, OllamaConfig};
use pagent_core::{Error, GenerationConfig, LLMProvider};

/// Serve exactly one HTTP exchange, handing back the raw request
async fn serve_once(
    status_line: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            content_type,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        tx.send(request).ok();
    });

    (format!("http://{}", addr), rx)
}

/// Read headers plus a Content-Length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

fn client_for(base_url: &str) -> OllamaClient {
    let mut config = OllamaConfig::new(base_url, "llama3");
    config.request_timeout = Duration::from_secs(5);
    config.health_timeout = Duration::from_secs(2);
    OllamaClient::new(config).unwrap()
}

#[tokio::test]
async fn test_generate_returns_response_text() {
    let (url, request) = serve_once(
        "200 OK",
        "application/json",
        r#"{"model":"llama3","response":"Paris.","done":true}"#.to_string(),
    )
    .await;

    let client = client_for(&url);
    let config = GenerationConfig::for_model("llama3").with_system_prompt("Answer briefly.");
    let answer = client.generate("Capital of France?", &config).await.unwrap();
    assert_eq!(answer, "Paris.");

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /api/generate"));
    assert!(request.contains(r#""prompt":"Capital of France?""#));
    assert!(request.contains(r#""system":"Answer briefly.""#));
    assert!(request.contains(r#""stream":false"#));
}

#[tokio::test]
async fn test_generate_missing_response_is_empty() {
    let (url, _request) = serve_once("200 OK", "application/json", r#"{"done":true}"#.to_string()).await;

    let client = client_for(&url);
    let answer = client
        .generate("Hi", &GenerationConfig::for_model("llama3"))
        .await
        .unwrap();
    assert_eq!(answer, "");
}

#[tokio::test]
async fn test_generate_http_error() {
    let (url, _request) = serve_once(
        "500 Internal Server Error",
        "application/json",
        r#"{"error":"model not found"}"#.to_string(),
    )
    .await;

    let client = client_for(&url);
    let err = client
        .generate("Hi", &GenerationConfig::for_model("llama3"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LLMProvider(ref msg) if msg.contains("500")));
}

#[tokio::test]
async fn test_generate_stream() {
    let body = [
        r#"{"response":"The ","done":false}"#,
        r#"{"response":"answer","done":false}"#,
        r#"not json"#,
        r#"{"response":"","done":true}"#,
    ]
    .join("\n")
        + "\n";
    let (url, request) = serve_once("200 OK", "application/x-ndjson", body).await;

    let client = client_for(&url);
    let stream = client
        .generate_stream("Q", &GenerationConfig::for_model("llama3"))
        .await
        .unwrap();
    let fragments: Vec<String> = stream.try_collect().await.unwrap();
    assert_eq!(fragments.concat(), "The answer");

    let request = request.await.unwrap();
    assert!(request.contains(r#""stream":true"#));
}

#[tokio::test]
async fn test_health_success() {
    let (url, request) = serve_once("200 OK", "application/json", r#"{"models":[]}"#.to_string()).await;

    let client = client_for(&url);
    assert!(client.health().await);
    assert!(request.await.unwrap().starts_with("GET /api/tags"));
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}", addr));
    assert!(!client.health().await);

    let err = client
        .generate("Hi", &GenerationConfig::for_model("llama3"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(!err.is_validation());
}

#[tokio::test]
async fn test_generation_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = client_for(&format!("http://{}", addr));
    let mut config = GenerationConfig::for_model("llama3");
    config.timeout = Duration::from_millis(200);
    let err = client.generate("Hi", &config).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}
