//! The network transport.
//!
//! # Design
//! `NetworkService` is an explicitly constructed value; clone it into every
//! consumer. It holds no per-call state: each call composes the URL, injects
//! headers, encodes the body, runs the `HttpExecutor` on tokio's blocking
//! pool, classifies the outcome, decodes the payload and queues the
//! completion on the `MainContext`.
//!
//! The decode path is chosen by the entry point, never by the payload:
//! `request`/`fetch` decode a JSON object into `T: Decodable`,
//! `request_array`/`fetch_array` decode a JSON array into
//! `A: ArrayDecodable`. The `fetch*` forms are bridges over the callback forms
//! through a `oneshot` channel, so each call resumes exactly once.

use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::credentials::{CredentialSource, StaticCredential};
use crate::error::{ConfigError, DecodeError, EncodeError, ExecuteError, NetworkError};
use crate::executor::{HttpExecutor, UreqExecutor};
use crate::http::{set_header, HttpRequest, HttpResponse};
use crate::json::{decode_array, decode_object, parse_body, ArrayDecodable, Decodable};
use crate::main_context::MainContext;
use crate::request::Request;

type Decoder<T> = fn(Value) -> Result<T, DecodeError>;

/// HTTP transport producing typed results or typed errors.
#[derive(Clone)]
pub struct NetworkService {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    executor: Arc<dyn HttpExecutor>,
    main: MainContext,
    runtime: Handle,
}

/// Handle to the platform task running one request.
///
/// Dropping it does not cancel the request.
#[derive(Debug)]
pub struct RequestTask {
    handle: JoinHandle<()>,
}

impl RequestTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task if it has not started executing yet. A request already
    /// on the wire runs to completion.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the network operation to finish. The completion may still be
    /// queued on the main context when this returns.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "request task did not complete");
        }
    }
}

/// Builder for `NetworkService`.
pub struct NetworkServiceBuilder {
    base_url: String,
    credentials: Option<Arc<dyn CredentialSource>>,
    executor: Option<Arc<dyn HttpExecutor>>,
    main: Option<MainContext>,
    runtime: Option<Handle>,
}

impl NetworkServiceBuilder {
    pub fn credentials<C: CredentialSource + 'static>(mut self, credentials: C) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    pub fn executor<E: HttpExecutor>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn main_context(mut self, main: MainContext) -> Self {
        self.main = Some(main);
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Missing parts default to no credentials, a `UreqExecutor`, a new main
    /// context named `main` and the ambient tokio runtime.
    pub fn build(self) -> Result<NetworkService, ConfigError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        let main = match self.main {
            Some(main) => main,
            None => MainContext::spawn("main").map_err(ConfigError::MainContext)?,
        };
        Ok(NetworkService {
            inner: Arc::new(Inner {
                base_url: self.base_url.trim_end_matches('/').to_string(),
                credentials: self.credentials.unwrap_or_else(|| {
                    Arc::new(StaticCredential::none()) as Arc<dyn CredentialSource>
                }),
                executor: self
                    .executor
                    .unwrap_or_else(|| Arc::new(UreqExecutor::new()) as Arc<dyn HttpExecutor>),
                main,
                runtime,
            }),
        })
    }
}

impl NetworkService {
    pub fn builder(base_url: impl Into<String>) -> NetworkServiceBuilder {
        NetworkServiceBuilder {
            base_url: base_url.into(),
            credentials: None,
            executor: None,
            main: None,
            runtime: None,
        }
    }

    /// Build with defaults from `config`; the API key becomes a static
    /// credential.
    pub fn from_config(config: &TransportConfig) -> Result<Self, ConfigError> {
        let credentials = match &config.api_key {
            Some(key) => StaticCredential::new(key.clone()),
            None => StaticCredential::none(),
        };
        Self::builder(config.base_url.clone())
            .credentials(credentials)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn main_context(&self) -> &MainContext {
        &self.inner.main
    }

    /// Send `request` and decode a JSON object response into `T`.
    ///
    /// `completion` runs exactly once. An invalid URL is reported on the
    /// calling thread before this returns; every other outcome is delivered
    /// on the main context. Returns `None` when no network operation was
    /// started.
    pub fn request<T, F>(&self, request: Request, completion: F) -> Option<RequestTask>
    where
        T: Decodable + Send + 'static,
        F: FnOnce(Result<T, NetworkError>) + Send + 'static,
    {
        self.dispatch(request, decode_object::<T>, completion)
    }

    /// Send `request` and decode a top-level JSON array response into `A`,
    /// usually `ArrayOf<T>`. Delivery rules are those of `request`.
    pub fn request_array<A, F>(&self, request: Request, completion: F) -> Option<RequestTask>
    where
        A: ArrayDecodable + Send + 'static,
        F: FnOnce(Result<A, NetworkError>) + Send + 'static,
    {
        self.dispatch(request, decode_array::<A>, completion)
    }

    /// Suspending form of `request`.
    pub async fn fetch<T>(&self, request: Request) -> Result<T, NetworkError>
    where
        T: Decodable + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<T, NetworkError>>();
        self.request(request, move |result| {
            let _ = tx.send(result);
        });
        settle(rx).await
    }

    /// Suspending form of `request_array`.
    pub async fn fetch_array<A>(&self, request: Request) -> Result<A, NetworkError>
    where
        A: ArrayDecodable + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<A, NetworkError>>();
        self.request_array(request, move |result| {
            let _ = tx.send(result);
        });
        settle(rx).await
    }

    fn dispatch<T, F>(
        &self,
        request: Request,
        decode: Decoder<T>,
        completion: F,
    ) -> Option<RequestTask>
    where
        T: Send + 'static,
        F: FnOnce(Result<T, NetworkError>) + Send + 'static,
    {
        let url = match self.compose_url(request.target()) {
            Ok(url) => url,
            Err(err) => {
                warn!(path = request.target(), error = %err, "rejecting request");
                completion(Err(err));
                return None;
            }
        };

        let outbound = match self.prepare(&request, url) {
            Ok(outbound) => outbound,
            Err(err) => {
                warn!(path = request.target(), error = %err, "rejecting request");
                self.inner.main.dispatch(move || completion(Err(err)));
                return None;
            }
        };

        debug!(method = %outbound.method, url = %outbound.url, "dispatching request");
        let executor = Arc::clone(&self.inner.executor);
        let main = self.inner.main.clone();
        let handle = self.inner.runtime.spawn_blocking(move || {
            let result = executor
                .execute(&outbound)
                .map_err(classify_failure)
                .and_then(|response| interpret(response, decode));
            if let Err(err) = &result {
                warn!(
                    method = %outbound.method,
                    url = %outbound.url,
                    error = %err,
                    "request failed"
                );
            }
            main.dispatch(move || completion(result));
        });
        Some(RequestTask { handle })
    }

    /// Join `target` onto the base URL unless it is already absolute, then
    /// check that the result is a usable http(s) URL.
    fn compose_url(&self, target: &str) -> Result<Url, NetworkError> {
        let raw = if has_scheme(target) {
            target.to_string()
        } else if target.is_empty() || target.starts_with('/') {
            format!("{}{target}", self.inner.base_url)
        } else {
            format!("{}/{target}", self.inner.base_url)
        };
        let url = Url::parse(&raw).map_err(|_| NetworkError::InvalidUrl(raw.clone()))?;
        let usable = matches!(url.scheme(), "http" | "https") && url.has_host();
        if usable {
            Ok(url)
        } else {
            Err(NetworkError::InvalidUrl(raw))
        }
    }

    /// Build the outbound request: caller headers, forced JSON content type,
    /// credential headers, encoded body.
    fn prepare(&self, request: &Request, url: Url) -> Result<HttpRequest, NetworkError> {
        let mut headers = request.headers().to_vec();
        set_header(&mut headers, "Content-Type", "application/json".to_string());
        if let Some(key) = self.inner.credentials.api_key() {
            set_header(&mut headers, "apikey", key.clone());
            set_header(&mut headers, "Authorization", format!("Bearer {key}"));
        }

        let body = match request.encodable_body() {
            Some(body) => {
                let object = body.encode().map_err(NetworkError::BodyParsingFailed)?;
                let bytes = serde_json::to_vec(&object)
                    .map_err(|err| NetworkError::BodyParsingFailed(EncodeError::Serialize(err)))?;
                Some(bytes)
            }
            None => None,
        };

        Ok(HttpRequest {
            method: request.method(),
            url: url.into(),
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for NetworkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkService")
            .field("base_url", &self.inner.base_url)
            .field("main", &self.inner.main)
            .finish_non_exhaustive()
    }
}

/// Whether `target` starts with `scheme://`. A `://` that appears after a
/// path or query character belongs to a relative target.
fn has_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

async fn settle<T>(rx: oneshot::Receiver<Result<T, NetworkError>>) -> Result<T, NetworkError> {
    rx.await.unwrap_or_else(|_| {
        Err(NetworkError::RequestFailed(
            "completion dropped before delivery".to_string(),
        ))
    })
}

fn classify_failure(err: ExecuteError) -> NetworkError {
    match err {
        ExecuteError::NotConnected(_) => NetworkError::NoInternetConnection,
        ExecuteError::MalformedResponse(_) => NetworkError::InvalidResponse,
        ExecuteError::Transport(cause) => NetworkError::RequestFailed(cause),
    }
}

/// Check the envelope and status, then decode the body with `decode`.
fn interpret<T>(response: HttpResponse, decode: Decoder<T>) -> Result<T, NetworkError> {
    if !(100..=599).contains(&response.status) {
        return Err(NetworkError::InvalidResponse);
    }
    debug!(status = response.status, bytes = response.body.len(), "response received");
    if !(200..=299).contains(&response.status) {
        return Err(NetworkError::StatusCode {
            code: response.status,
            body: response.body,
        });
    }
    let value = parse_body(&response.body)?;
    Ok(decode(value)?)
}
