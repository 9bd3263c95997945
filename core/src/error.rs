//! Error types for the transport.
//!
//! # Design
//! `NetworkError` is the closed set of failures a caller can observe. Every
//! other error type in this module is a cause that ends up inside one of its
//! variants (`DecodeError` in `DecodingFailed`, `EncodeError` in
//! `BodyParsingFailed`) or is classified into one (`ExecuteError`).
//!
//! `StatusCode` keeps the response bytes that were already read so a caller
//! can promote it into `RequestFailedWithMessage`. The transport itself never
//! performs that promotion.

use serde_json::Value;
use thiserror::Error;

/// Failures delivered by `NetworkService`.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The composed URL could not be parsed or is not an http(s) URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body could not be encoded to a JSON object.
    #[error("failed to encode request body: {0}")]
    BodyParsingFailed(#[source] EncodeError),

    /// The request never produced a response.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// A failure enriched by the caller with the raw response body.
    #[error("request failed: {cause}")]
    RequestFailedWithMessage {
        cause: Box<NetworkError>,
        body: Option<Vec<u8>>,
    },

    /// The response did not carry a well-formed HTTP envelope.
    #[error("invalid HTTP response")]
    InvalidResponse,

    /// The response body could not be decoded into the requested type.
    #[error("failed to decode response: {0}")]
    DecodingFailed(#[from] DecodeError),

    /// The server answered with a status outside 200..=299.
    #[error("unexpected HTTP status {code}")]
    StatusCode { code: u16, body: Vec<u8> },

    /// The device is not connected to a network.
    #[error("no internet connection")]
    NoInternetConnection,
}

impl NetworkError {
    /// The HTTP status behind this error, looking through caller enrichment.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetworkError::StatusCode { code, .. } => Some(*code),
            NetworkError::RequestFailedWithMessage { cause, .. } => cause.status_code(),
            _ => None,
        }
    }

    /// Promote a `StatusCode` failure into `RequestFailedWithMessage`
    /// carrying the response body. Any other error is returned unchanged.
    pub fn with_response_message(self) -> NetworkError {
        match self {
            NetworkError::StatusCode { code, body } => {
                let message_body = (!body.is_empty()).then(|| body.clone());
                NetworkError::RequestFailedWithMessage {
                    cause: Box::new(NetworkError::StatusCode { code, body }),
                    body: message_body,
                }
            }
            other => other,
        }
    }

    /// Server-provided message from an enriched failure.
    ///
    /// A JSON object body yields its `message` or `error` string field; any
    /// other non-empty body is returned as lossy UTF-8.
    pub fn server_message(&self) -> Option<String> {
        let NetworkError::RequestFailedWithMessage {
            body: Some(body), ..
        } = self
        else {
            return None;
        };
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
            for key in ["message", "error"] {
                if let Some(Value::String(text)) = map.get(key) {
                    return Some(text.clone());
                }
            }
        }
        let text = String::from_utf8_lossy(body).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// Why a JSON value could not be turned into a typed value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("malformed JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// A key is missing, has the wrong type, or a nested decode failed.
    #[error("{0}")]
    Field(#[source] serde_json::Error),

    #[error("expected a JSON object, found {found}")]
    ExpectedObject { found: &'static str },

    #[error("expected a JSON array, found {found}")]
    ExpectedArray { found: &'static str },

    /// An array element failed; decoding stopped there.
    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

/// Why a request body could not be rendered as a JSON object.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("request body must encode to a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// Raw failure reported by an `HttpExecutor` before classification.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The host has no usable network.
    #[error("network unreachable: {0}")]
    NotConnected(String),

    /// Bytes came back but they were not an HTTP response.
    #[error("malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Transport(String),
}

/// Errors raised while configuring a `NetworkService`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("no tokio runtime available; pass a runtime handle to the builder")]
    NoRuntime,

    #[error("failed to start main context: {0}")]
    MainContext(#[source] std::io::Error),
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
