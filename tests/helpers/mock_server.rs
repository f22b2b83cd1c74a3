//! A simple HTTP/1.1 mock server with canned routes for facade tests.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub struct MockHttpServer {
    listener: TcpListener,
    port: u16,
}

impl MockHttpServer {
    /// Create a new mock server bound to a random port.
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    /// Get the base URL for this server.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Start the server in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.listener.accept().await {
                    Ok((stream, _)) => {
                        tokio::spawn(handle_connection(stream));
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

/// Read one request (headers plus declared body), route on the path, respond,
/// close.
async fn handle_connection(mut stream: TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    // Read until the header block is complete.
    let header_end = loop {
        let n = match timeout(Duration::from_secs(5), stream.read(&mut chunk)).await {
            Ok(Ok(0)) | Err(_) => return,
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return;
        }
    };

    let header_text = match std::str::from_utf8(&buf[..header_end]) {
        Ok(s) => s.to_string(),
        Err(_) => return,
    };

    // Drain the request body if Content-Length was declared.
    let content_length = header_text
        .lines()
        .find(|line| line.to_lowercase().starts_with("content-length:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = match timeout(Duration::from_secs(5), stream.read(&mut chunk)).await {
            Ok(Ok(0)) | Err(_) => return,
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return,
        };
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = header_text
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let response = route(&path, &header_text).await;
    let _ = stream.write_all(&response).await;
    let _ = stream.flush().await;
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn route(path: &str, header_text: &str) -> Vec<u8> {
    match path {
        "/json" => canned_response(
            "200 OK",
            "application/json",
            br#"{"name":"alice","balance":42}"#,
        ),
        "/invalid-json" => canned_response("200 OK", "application/json", b"not json {"),
        "/wrong-shape" => canned_response(
            "200 OK",
            "application/json",
            br#"{"name":"alice","balance":"lots"}"#,
        ),
        "/status/404" => canned_response("404 Not Found", "text/plain", b"missing"),
        "/status/500" => canned_response("500 Internal Server Error", "text/plain", b"boom"),
        "/echo-headers" => {
            let headers: BTreeMap<String, String> = header_text
                .lines()
                .skip(1)
                .filter_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    Some((name.trim().to_lowercase(), value.trim().to_string()))
                })
                .collect();
            let body = serde_json::to_vec(&headers).unwrap();
            canned_response("200 OK", "application/json", &body)
        }
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canned_response("200 OK", "text/plain", b"finally")
        }
        _ => canned_response("200 OK", "text/plain", b"Hello"),
    }
}

fn canned_response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}
