//! AWS JSON 1.1 protocol client
//!
//! Glue, CodeCommit and CodePipeline all speak the same protocol: a signed
//! `POST /` with the operation named in `X-Amz-Target` and a JSON body.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::AwsConfig;
use crate::credentials::Credentials;
use crate::error::{ClientError, Result};
use crate::signing::{self, SignableRequest, SigningScope};

pub const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Signed client for one AWS JSON service
#[derive(Debug, Clone)]
pub struct AwsJsonClient {
    http: Client,
    endpoint: Url,
    /// Signing name, e.g. "glue"
    service: &'static str,
    /// Target prefix, e.g. "AWSGlue"
    target_prefix: &'static str,
    region: String,
    credentials: Credentials,
}

/// Error body returned by JSON protocol services
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl AwsJsonClient {
    /// Creates a client for a service using the shared configuration
    ///
    /// # Arguments
    /// * `config` - Region, credentials and optional endpoint override
    /// * `service` - Signing name and endpoint prefix (e.g. "glue")
    /// * `target_prefix` - Operation prefix for `X-Amz-Target` (e.g. "AWSGlue")
    pub fn new(
        config: &AwsConfig,
        service: &'static str,
        target_prefix: &'static str,
    ) -> Result<Self> {
        Self::with_client(config, service, target_prefix, Client::new())
    }

    /// Creates a client with a custom HTTP client
    pub fn with_client(
        config: &AwsConfig,
        service: &'static str,
        target_prefix: &'static str,
        http: Client,
    ) -> Result<Self> {
        let endpoint = config.endpoint_for(service);
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if endpoint.host_str().is_none() {
            return Err(ClientError::InvalidEndpoint(format!(
                "{} has no host",
                endpoint
            )));
        }

        Ok(Self {
            http,
            endpoint,
            service,
            target_prefix,
            region: config.region.clone(),
            credentials: config.credentials.clone(),
        })
    }

    /// Get the endpoint this client sends requests to
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Invokes an operation and deserializes the response
    ///
    /// An empty success body is read as `{}`.
    pub async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)
            .map_err(|e| ClientError::ParseError(format!("Failed to encode request: {}", e)))?;
        let target = format!("{}.{}", self.target_prefix, operation);
        let now = chrono::Utc::now();

        let mut headers = vec![
            ("content-type".to_string(), JSON_CONTENT_TYPE.to_string()),
            ("host".to_string(), self.host_header()),
            ("x-amz-date".to_string(), signing::amz_date(now)),
            ("x-amz-target".to_string(), target.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let authorization = signing::authorization(
            &self.credentials,
            SigningScope {
                region: &self.region,
                service: self.service,
            },
            SignableRequest {
                method: "POST",
                path: self.endpoint.path(),
                query: "",
                headers: &headers,
                payload: &body,
            },
            now,
        );

        debug!("Calling {} at {}", target, self.endpoint);

        let mut http_request = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(AUTHORIZATION, authorization);
        for (name, value) in headers
            .iter()
            .filter(|(name, _)| name != "host" && name != "content-type")
        {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        let response = http_request.body(body).send().await?;

        self.handle_response(response).await
    }

    /// Host header value as the HTTP client will send it
    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Handle a service response and deserialize JSON
    ///
    /// Error statuses are turned into [`ClientError::ServiceError`] with the
    /// AWS error code taken from the body (`__type`) or the
    /// `x-amzn-ErrorType` header.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let header_code = response
                .headers()
                .get("x-amzn-errortype")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

            let code = body
                .kind
                .or(header_code)
                .map(|raw| error_code(&raw).to_string())
                .unwrap_or_else(|| "UnknownError".to_string());
            let message = body.message.unwrap_or(text);

            return Err(ClientError::service_error(
                self.service,
                status.as_u16(),
                code,
                message,
            ));
        }

        let bytes = response.bytes().await?;
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(bytes)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Strips namespace and suffix from an AWS error type
///
/// `com.amazonaws.codecommit#CommitDoesNotExistException` and
/// `CommitDoesNotExistException:http://...` both become
/// `CommitDoesNotExistException`.
fn error_code(raw: &str) -> &str {
    let code = raw.rsplit('#').next().unwrap_or(raw);
    code.split(':').next().unwrap_or(code)
}
