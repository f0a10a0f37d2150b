//! GraphQL-shaped request/response handling over a string-in, string-out
//! service handle.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use derive_more::Display;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransportErrorKind {
    #[display("encode")]
    Encode,
    #[display("network")]
    Network,
    #[display("status")]
    Status,
    #[display("invalid_json")]
    InvalidJson,
    #[display("service")]
    Service,
    #[display("missing_data")]
    MissingData,
    #[display("decode")]
    Decode,
}

/// Failure talking to the remote service.
///
/// Only this module builds these; diagnostic fields are filled in where the
/// failure happened and are never parsed back out elsewhere.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub cause: Option<String>,
    pub raw_response: Option<String>,
}

impl TransportError {
    fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            raw_response: None,
        }
    }

    fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    fn with_raw(mut self, raw: &str) -> Self {
        self.raw_response = Some(raw.to_string());
        self
    }

    #[must_use]
    pub fn network(cause: impl fmt::Display) -> Self {
        Self::new(TransportErrorKind::Network, "request failed").with_cause(cause)
    }
}

/// The one capability the rest of the crate needs from the remote service.
#[async_trait]
pub trait ServiceHandle: Send + Sync {
    /// Send a serialized request envelope and return the raw response body.
    async fn query(&self, body: String) -> Result<String, TransportError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    #[must_use]
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Interpret a raw `{data?, errors?}` envelope.
pub fn parse_response(raw: &str) -> Result<Value, TransportError> {
    let envelope: Value = serde_json::from_str(raw).map_err(|err| {
        TransportError::new(TransportErrorKind::InvalidJson, "invalid JSON")
            .with_cause(err)
            .with_raw(raw)
    })?;

    if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|err| match err.get("message").and_then(Value::as_str) {
                    Some(message) => message.to_string(),
                    None => err.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TransportError::new(TransportErrorKind::Service, message).with_raw(raw));
        }
    }

    match envelope.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(TransportError::new(TransportErrorKind::MissingData, "missing data").with_raw(raw)),
    }
}

#[derive(Clone)]
pub struct Transport {
    handle: Arc<dyn ServiceHandle>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

impl Transport {
    #[must_use]
    pub fn new(handle: Arc<dyn ServiceHandle>) -> Self {
        Self { handle }
    }

    /// Send a request and return the untyped `data` payload.
    pub async fn send(&self, request: &GraphQlRequest) -> Result<Value, TransportError> {
        let body = serde_json::to_string(request).map_err(|err| {
            TransportError::new(TransportErrorKind::Encode, "could not encode request").with_cause(err)
        })?;
        debug!(operation = ?request.operation_name, "sending request");
        let raw = self.handle.query(body).await?;
        trace!(%raw, "got response");
        parse_response(&raw)
    }

    /// Send a request and decode `data` into the caller's expected shape.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: &GraphQlRequest,
    ) -> Result<T, TransportError> {
        let data = self.send(request).await?;
        serde_json::from_value(data.clone()).map_err(|err| {
            TransportError::new(TransportErrorKind::Decode, "unexpected response shape")
                .with_cause(err)
                .with_raw(&data.to_string())
        })
    }
}

/// Talks to a GraphQL endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpServiceHandle {
    client: Client,
    endpoint: String,
}

impl HttpServiceHandle {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::network)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ServiceHandle for HttpServiceHandle {
    async fn query(&self, body: String) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(TransportError::network)?;
        let status = response.status();
        let text = response.text().await.map_err(TransportError::network)?;
        if !status.is_success() {
            return Err(
                TransportError::new(TransportErrorKind::Status, format!("service returned {status}"))
                    .with_raw(&text),
            );
        }
        Ok(text)
    }
}
