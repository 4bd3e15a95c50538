//! Blocking HTTP client
//!
//! Wraps an async `reqwest::Client` with a private current-thread tokio
//! runtime so callers can stay synchronous.

use reqwest::StatusCode;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Response status plus the fully read body
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Errors raised while building the client or performing a request
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to start HTTP runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Synchronous facade over `reqwest`
pub struct BlockingClient {
    client: reqwest::Client,
    runtime: Runtime,
}

impl BlockingClient {
    /// Create a client with a request timeout and User-Agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, HttpError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, runtime })
    }

    /// Issue a GET request and read the whole body.
    ///
    /// Non-success statuses are returned, not raised; callers decide.
    pub fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError> {
        self.get_with_query(url, &[], headers)
    }

    /// GET with query parameters appended to `url`
    pub fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        self.runtime.block_on(async {
            let mut request = self.client.get(url);
            if !query.is_empty() {
                request = request.query(query);
            }
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;

            debug!("GET {} -> {} ({} bytes)", url, status, body.len());

            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}

/// Spawn a one-shot HTTP server on localhost that answers the first request
/// with `response` verbatim. Returns the base URL.
#[cfg(test)]
pub(crate) fn serve_once(response: Vec<u8>) -> String {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(&response);
            let _ = stream.flush();
        }
    });

    format!("http://{}", addr)
}

/// Build a raw HTTP/1.1 response
#[cfg(test)]
pub(crate) fn http_response(status_line: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_line,
        content_type,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_status_and_body() {
        let url = serve_once(http_response("200 OK", "text/plain", b"hello"));
        let client = BlockingClient::new(Duration::from_secs(5), "test-agent").unwrap();

        let response = client.get(&url, &[]).unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "hello");
    }

    #[test]
    fn test_get_does_not_raise_on_error_status() {
        let url = serve_once(http_response("500 Internal Server Error", "text/plain", b""));
        let client = BlockingClient::new(Duration::from_secs(5), "test-agent").unwrap();

        let response = client.get(&url, &[]).unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_connection_refused_is_error() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = BlockingClient::new(Duration::from_secs(2), "test-agent").unwrap();

        let result = client.get(&format!("http://127.0.0.1:{}", port), &[]);
        assert!(matches!(result, Err(HttpError::Request(_))));
    }
}
