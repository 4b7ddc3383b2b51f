//! Test helpers: a fake AWS JSON endpoint on an ephemeral port

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::AwsConfig;
use crate::credentials::Credentials;

type Responder = Arc<dyn Fn(&str, &Value) -> (StatusCode, String) + Send + Sync>;

/// A request as the fake endpoint received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: String,
    pub content_type: String,
    pub authorization: String,
    pub security_token: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeState {
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Responder,
}

pub struct FakeAws {
    pub url: String,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeAws {
    /// Starts a fake endpoint answering with JSON bodies
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        Self::start_raw(move |target, body| {
            let (status, value) = respond(target, body);
            (status, value.to_string())
        })
        .await
    }

    /// Starts a fake endpoint answering with raw bodies
    pub async fn start_raw<F>(respond: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let state = FakeState {
            recorded: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(respond),
        };
        let recorded = Arc::clone(&state.recorded);

        let app = Router::new().route("/", post(handle)).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            recorded,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }
}

async fn handle(State(state): State<FakeState>, headers: HeaderMap, body: Bytes) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let target = header("x-amz-target").unwrap_or_default();

    state.recorded.lock().unwrap().push(RecordedRequest {
        target: target.clone(),
        content_type: header("content-type").unwrap_or_default(),
        authorization: header("authorization").unwrap_or_default(),
        security_token: header("x-amz-security-token"),
        body: body.clone(),
    });

    let (status, text) = (state.respond)(&target, &body);
    (status, [(CONTENT_TYPE, "application/x-amz-json-1.1")], text).into_response()
}

pub fn test_config(endpoint: &str) -> AwsConfig {
    AwsConfig {
        region: "us-east-1".to_string(),
        endpoint_url: Some(endpoint.to_string()),
        credentials: Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            Some("session-token".to_string()),
        ),
    }
}
