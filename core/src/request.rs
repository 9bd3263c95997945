//! Request descriptor.
//!
//! A `Request` names what to call: method, target, caller headers and an
//! optional body. It does not know the base URL or the credentials; the
//! transport composes those at send time.

use std::fmt;
use std::sync::Arc;

use crate::http::HttpMethod;
use crate::json::Encodable;

/// Description of a single call, created per call site.
#[derive(Clone)]
pub struct Request {
    method: HttpMethod,
    target: String,
    headers: Vec<(String, String)>,
    body: Option<Arc<dyn Encodable + Send + Sync>>,
}

impl Request {
    /// `target` is either a path relative to the transport's base URL or an
    /// absolute URL, which is used as-is.
    pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, target)
    }

    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, target)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Encodable + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn encodable_body(&self) -> Option<&(dyn Encodable + Send + Sync)> {
        self.body.as_deref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}
