//! Runtime API client
//!
//! Handles communication with the Lambda Runtime API:
//! - Fetching the next invocation
//! - Posting invocation responses and errors
//! - Reporting initialization failures

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

pub const RUNTIME_API_VERSION: &str = "2018-06-01";

const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const DEADLINE_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
const FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";
const TRACE_ID_HEADER: &str = "Lambda-Runtime-Trace-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// One event delivered by the runtime
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    /// Deadline in milliseconds since the Unix epoch
    pub deadline_ms: Option<u64>,
    pub function_arn: Option<String>,
    pub trace_id: Option<String>,
    pub payload: Vec<u8>,
}

/// Error body understood by the Runtime API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeError {
    pub error_type: String,
    pub error_message: String,
}

impl RuntimeError {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }
}

/// Trait for Runtime API operations
#[async_trait]
pub trait RuntimeApi: Send + Sync {
    /// Blocks until the next invocation is available
    async fn next_invocation(&self) -> Result<Invocation>;

    /// Posts the response of an invocation
    ///
    /// # Arguments
    /// * `request_id` - The invocation's request id
    /// * `body` - Response payload returned to the invoker
    async fn send_response(&self, request_id: &str, body: &JsonValue) -> Result<()>;

    /// Posts an invocation error
    async fn send_error(&self, request_id: &str, error: &RuntimeError) -> Result<()>;

    /// Reports a failure that prevents the runtime from starting
    async fn send_init_error(&self, error: &RuntimeError) -> Result<()>;
}

/// HTTP implementation of RuntimeApi
pub struct HttpRuntimeApi {
    client: Client,
    base_url: String,
}

impl HttpRuntimeApi {
    /// Creates a new Runtime API client
    ///
    /// # Arguments
    /// * `runtime_api` - Value of AWS_LAMBDA_RUNTIME_API (e.g., "127.0.0.1:9001")
    pub fn new(runtime_api: &str) -> Self {
        let runtime_api = runtime_api.trim_end_matches('/');
        let base_url = if runtime_api.starts_with("http://") || runtime_api.starts_with("https://")
        {
            format!("{}/{}", runtime_api, RUNTIME_API_VERSION)
        } else {
            format!("http://{}/{}", runtime_api, RUNTIME_API_VERSION)
        };

        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post_error(&self, url: &str, error: &RuntimeError) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(ERROR_TYPE_HEADER, &error.error_type)
            .json(error)
            .send()
            .await
            .context("Failed to send error to runtime API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Runtime API rejected error report ({}): {}", status, body);
        }

        Ok(())
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl RuntimeApi for HttpRuntimeApi {
    async fn next_invocation(&self) -> Result<Invocation> {
        let url = format!("{}/runtime/invocation/next", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch next invocation")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Failed to fetch next invocation ({}): {}", status, body);
        }

        let headers = response.headers().clone();
        let request_id = header(&headers, REQUEST_ID_HEADER)
            .with_context(|| format!("Invocation has no {} header", REQUEST_ID_HEADER))?;

        let payload = response
            .bytes()
            .await
            .context("Failed to read invocation payload")?
            .to_vec();

        debug!(
            "Received invocation {} ({} bytes)",
            request_id,
            payload.len()
        );

        Ok(Invocation {
            request_id,
            deadline_ms: header(&headers, DEADLINE_HEADER).and_then(|v| v.parse().ok()),
            function_arn: header(&headers, FUNCTION_ARN_HEADER),
            trace_id: header(&headers, TRACE_ID_HEADER),
            payload,
        })
    }

    async fn send_response(&self, request_id: &str, body: &JsonValue) -> Result<()> {
        let url = format!(
            "{}/runtime/invocation/{}/response",
            self.base_url, request_id
        );

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Failed to send invocation response")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Runtime API rejected response ({}): {}", status, body);
        }

        Ok(())
    }

    async fn send_error(&self, request_id: &str, error: &RuntimeError) -> Result<()> {
        let url = format!("{}/runtime/invocation/{}/error", self.base_url, request_id);
        self.post_error(&url, error).await
    }

    async fn send_init_error(&self, error: &RuntimeError) -> Result<()> {
        let url = format!("{}/runtime/init/error", self.base_url);
        self.post_error(&url, error).await
    }
}
