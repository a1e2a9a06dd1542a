//! HTTP client for the taskgate server.

use reqwest::StatusCode;
use tracing::debug;

/// Raw reply from the server.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// HTTP client for the taskgate REST endpoints.
pub struct GatewayClient {
    inner: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a new client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run a natural-language task.
    pub async fn run(&self, task: &str) -> Result<Reply, reqwest::Error> {
        let url = self.url("/run");
        debug!(url = %url, "POST request");
        let response = self.inner.post(&url).query(&[("task", task)]).send().await?;
        Self::reply(response).await
    }

    /// Read a file from the server's sandbox.
    pub async fn read(&self, path: &str) -> Result<Reply, reqwest::Error> {
        let url = self.url("/read");
        debug!(url = %url, "GET request");
        let response = self.inner.get(&url).query(&[("path", path)]).send().await?;
        Self::reply(response).await
    }

    /// GET an endpoint without parameters.
    pub async fn get(&self, path: &str) -> Result<Reply, reqwest::Error> {
        let url = self.url(path);
        debug!(url = %url, "GET request");
        let response = self.inner.get(&url).send().await?;
        Self::reply(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn reply(response: reqwest::Response) -> Result<Reply, reqwest::Error> {
        let status = response.status();
        let body = response.text().await?;
        Ok(Reply { status, body })
    }
}
