//! Execution of a single HTTP round-trip.
//!
//! # Design
//! `HttpExecutor` is the only place that touches the network. It is blocking;
//! `NetworkService` runs it on tokio's blocking pool. Non-2xx statuses are
//! ordinary responses here, status interpretation belongs to the transport.

use std::io;

use crate::error::ExecuteError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP request and returns whatever the server answered.
pub trait HttpExecutor: Send + Sync + 'static {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecuteError>;
}

/// `HttpExecutor` backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    /// An agent that returns 4xx/5xx responses as data instead of `Err`.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecuteError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref();

        let outcome = match (request.method, body) {
            (HttpMethod::Get, None) => with_headers(self.agent.get(url), headers).call(),
            (HttpMethod::Get, Some(bytes)) => with_headers(self.agent.get(url), headers)
                .force_send_body()
                .send(bytes),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(url), headers).call(),
            (HttpMethod::Delete, Some(bytes)) => with_headers(self.agent.delete(url), headers)
                .force_send_body()
                .send(bytes),
            (HttpMethod::Post, Some(bytes)) => {
                with_headers(self.agent.post(url), headers).send(bytes)
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(bytes)) => {
                with_headers(self.agent.put(url), headers).send(bytes)
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), headers).send_empty(),
            (HttpMethod::Patch, Some(bytes)) => {
                with_headers(self.agent.patch(url), headers).send(bytes)
            }
            (HttpMethod::Patch, None) => with_headers(self.agent.patch(url), headers).send_empty(),
        };

        let mut response = outcome.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |builder, (name, value)| {
            builder.header(name.as_str(), value.as_str())
        })
}

fn classify(err: ureq::Error) -> ExecuteError {
    match err {
        ureq::Error::Io(io_err) if is_offline(&io_err) => {
            ExecuteError::NotConnected(io_err.to_string())
        }
        ureq::Error::Protocol(proto) => ExecuteError::MalformedResponse(proto.to_string()),
        other => ExecuteError::Transport(other.to_string()),
    }
}

/// Whether an I/O error means the host has no network at all, as opposed to
/// a particular server being unreachable.
pub(crate) fn is_offline(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NetworkDown | io::ErrorKind::NetworkUnreachable | io::ErrorKind::NotConnected
    )
}
