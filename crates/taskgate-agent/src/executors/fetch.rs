//! Bounded GET requests for the network executors.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use tracing::debug;

use taskgate_core::TaskError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A successful response body, decoded as UTF-8.
#[derive(Debug)]
pub(super) struct Fetched {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Fetched {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| t.trim_start().to_ascii_lowercase().starts_with("application/json"))
    }
}

/// GET `url`, reading at most `limit` bytes of body.
///
/// Error messages name the host and status only. The body is never echoed.
pub(super) async fn get(
    client: &Client,
    url: &str,
    headers: &BTreeMap<String, String>,
    limit: u64,
) -> Result<Fetched, TaskError> {
    let url = Url::parse(url).map_err(|e| TaskError::ExecutionFailure(format!("invalid URL ({e})")))?;
    let host = url.host_str().unwrap_or_default().to_string();

    let mut request_headers = HeaderMap::new();
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TaskError::ExecutionFailure(format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| TaskError::ExecutionFailure(format!("invalid value for header '{name}'")))?;
        request_headers.insert(header, value);
    }

    let mut response = client
        .get(url)
        .headers(request_headers)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| transport_error(&host, &e))?;

    let status = response.status();
    if status.is_server_error() {
        return Err(TaskError::TransientTransportError(format!(
            "{host} returned HTTP {}",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(TaskError::ExecutionFailure(format!(
            "{host} returned HTTP {}",
            status.as_u16()
        )));
    }

    if let Some(size) = response.content_length() {
        if size > limit {
            return Err(TaskError::SizeLimitExceeded { size, limit });
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // Content-Length may be absent or wrong, so count as we read.
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(&host, &e))? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > limit {
            return Err(TaskError::SizeLimitExceeded {
                size: body.len() as u64,
                limit,
            });
        }
    }

    let body = String::from_utf8(body)
        .map_err(|_| TaskError::MalformedData(format!("response from {host} is not UTF-8 text")))?;

    debug!(host = %host, status = status.as_u16(), bytes = body.len(), "Fetched");
    Ok(Fetched {
        status: status.as_u16(),
        content_type,
        body,
    })
}

fn transport_error(host: &str, err: &reqwest::Error) -> TaskError {
    let reason = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "could not connect"
    } else {
        "failed"
    };
    TaskError::TransientTransportError(format!("request to {host} {reason}"))
}

#[cfg(test)]
pub(super) mod testing {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one request with a canned response. The handle yields the raw
    /// request head.
    pub async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            // The client may hang up early once it sees an oversized length.
            let _ = socket.write_all(response.as_bytes()).await;
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    /// An address nothing is listening on.
    pub async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }
}
