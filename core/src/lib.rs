//! Generic JSON-over-HTTP transport.
//!
//! # Overview
//! Serializes typed request bodies, executes requests against a REST backend,
//! classifies transport and HTTP failures, and decodes responses into typed
//! results. Object and top-level array payloads share one decoding contract.
//!
//! # Design
//! - `NetworkService` is constructed explicitly and passed to consumers; it
//!   keeps no state between calls except the credential source it reads.
//! - Callers pick the decode path up front: `request`/`fetch` for objects,
//!   `request_array`/`fetch_array` for arrays (usually `ArrayOf<T>`).
//! - Completions are always delivered on one `MainContext` thread. The
//!   `fetch*` forms bridge the callback forms through a one-shot channel.
//! - The network itself sits behind `HttpExecutor`; `UreqExecutor` is the
//!   default, tests substitute canned executors.

pub mod array;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod http;
pub mod json;
pub mod main_context;
pub mod request;
pub mod service;
pub mod types;

pub use array::ArrayOf;
pub use client::{ActivityClient, Endpoint};
pub use config::TransportConfig;
pub use credentials::{CredentialSource, SessionCredential, StaticCredential};
pub use error::{ConfigError, DecodeError, EncodeError, ExecuteError, NetworkError};
pub use executor::{HttpExecutor, UreqExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use json::{ArrayDecodable, Decodable, Encodable, JsonObject};
pub use main_context::MainContext;
pub use request::Request;
pub use service::{NetworkService, NetworkServiceBuilder, RequestTask};
pub use types::{Activity, ActivityPatch, NewActivity};
