//! Transport behaviour against canned executors.
//!
//! # Design
//! A `StubExecutor` records every outbound `HttpRequest` and answers with a
//! scripted result, so these tests can assert what went over the wire, or
//! that nothing did, without a server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use tokio::runtime::{Builder, Runtime};
use transport_core::{
    ArrayOf, DecodeError, ExecuteError, HttpExecutor, HttpMethod, HttpRequest, HttpResponse,
    MainContext, NetworkError, NetworkService, Request, SessionCredential, StaticCredential,
};

const BASE_URL: &str = "https://api.example.com/";

type Script = dyn Fn(&HttpRequest, u64) -> Result<HttpResponse, ExecuteError> + Send + Sync;

#[derive(Clone)]
struct StubExecutor {
    seen: Arc<Mutex<Vec<HttpRequest>>>,
    calls: Arc<AtomicU64>,
    script: Arc<Script>,
}

impl StubExecutor {
    fn new<F>(script: F) -> Self
    where
        F: Fn(&HttpRequest, u64) -> Result<HttpResponse, ExecuteError> + Send + Sync + 'static,
    {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicU64::new(0)),
            script: Arc::new(script),
        }
    }

    fn replying(status: u16, body: &'static str) -> Self {
        Self::new(move |_, _| Ok(reply(status, body)))
    }

    fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl HttpExecutor for StubExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecuteError> {
        self.seen.lock().unwrap().push(request.clone());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(request, call)
    }
}

fn reply(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Trail {
    id: u64,
    title: String,
}

#[derive(Debug, PartialEq, Deserialize)]
struct Item {
    id: u64,
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("refuses to serialize"))
    }
}

struct Harness {
    runtime: Runtime,
    main: MainContext,
}

impl Harness {
    fn new() -> Self {
        Self {
            runtime: Runtime::new().unwrap(),
            main: MainContext::spawn("main").unwrap(),
        }
    }

    fn service(&self, executor: StubExecutor) -> NetworkService {
        self.service_with(BASE_URL, executor, StaticCredential::none())
    }

    fn service_with<C>(
        &self,
        base_url: &str,
        executor: StubExecutor,
        credentials: C,
    ) -> NetworkService
    where
        C: transport_core::CredentialSource + 'static,
    {
        NetworkService::builder(base_url)
            .executor(executor)
            .credentials(credentials)
            .main_context(self.main.clone())
            .runtime(self.runtime.handle().clone())
            .build()
            .unwrap()
    }
}

/// Completion outcome plus whether it ran on the main context.
fn await_completion<T>(
    rx: &mpsc::Receiver<(Result<T, NetworkError>, bool)>,
) -> (Result<T, NetworkError>, bool) {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("completion was not delivered")
}

#[test]
fn object_response_is_decoded_on_main_context() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"{"id":5,"title":"Hike"}"#);
    let service = harness.service(executor.clone());

    let (tx, rx) = mpsc::channel();
    let main = harness.main.clone();
    let task = service.request::<Trail, _>(Request::get("/trails/5"), move |result| {
        tx.send((result, main.is_current())).unwrap();
    });
    assert!(task.is_some());

    let (result, on_main) = await_completion(&rx);
    assert!(on_main);
    assert_eq!(
        result.unwrap(),
        Trail {
            id: 5,
            title: "Hike".to_string()
        }
    );
    let seen = executor.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, HttpMethod::Get);
    assert_eq!(seen[0].url, "https://api.example.com/trails/5");
    assert!(seen[0].body.is_none());
}

#[test]
fn array_response_is_decoded_in_order() {
    let harness = Harness::new();
    let service = harness.service(StubExecutor::replying(200, r#"[{"id":1},{"id":2}]"#));

    let (tx, rx) = mpsc::channel();
    let main = harness.main.clone();
    service.request_array::<ArrayOf<Item>, _>(Request::get("/items"), move |result| {
        tx.send((result, main.is_current())).unwrap();
    });

    let (result, on_main) = await_completion(&rx);
    assert!(on_main);
    assert_eq!(result.unwrap().into_vec(), vec![Item { id: 1 }, Item { id: 2 }]);
}

#[test]
fn failing_element_fails_the_whole_array() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"[{"id":1},{"id":"two"},{"id":3}]"#);
    let service = harness.service(executor);

    let result = harness
        .runtime
        .block_on(service.fetch_array::<ArrayOf<Item>>(Request::get("/items")));
    match result {
        Err(NetworkError::DecodingFailed(DecodeError::Element { index, .. })) => {
            assert_eq!(index, 1)
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_url_is_reported_synchronously_without_network() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, "{}");
    let service = harness.service_with("not a url", executor.clone(), StaticCredential::none());

    let caller = thread::current().id();
    let delivered = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&delivered);
    let task = service.request::<Item, _>(Request::get("/items"), move |result| {
        *slot.lock().unwrap() = Some((result, thread::current().id()));
    });

    assert!(task.is_none());
    let (result, delivered_on) = delivered
        .lock()
        .unwrap()
        .take()
        .expect("not delivered synchronously");
    assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));
    assert_eq!(delivered_on, caller);
    assert!(executor.seen().is_empty());
}

#[test]
fn non_http_scheme_is_an_invalid_url() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, "{}");
    let service = harness.service(executor.clone());

    let result = harness
        .runtime
        .block_on(service.fetch::<Item>(Request::get("ftp://files.example.com/item")));
    assert!(matches!(
        result,
        Err(NetworkError::InvalidUrl(url)) if url == "ftp://files.example.com/item"
    ));
    assert!(executor.seen().is_empty());
}

#[test]
fn body_encoding_failure_issues_no_network_call() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, "{}");
    let service = harness.service(executor.clone());

    let (tx, rx) = mpsc::channel();
    let main = harness.main.clone();
    let request = Request::post("/items").body(Unencodable);
    let task = service.request::<Item, _>(request, move |result| {
        tx.send((result, main.is_current())).unwrap();
    });

    assert!(task.is_none());
    let (result, on_main) = await_completion(&rx);
    assert!(on_main);
    assert!(matches!(result, Err(NetworkError::BodyParsingFailed(_))));
    assert!(executor.seen().is_empty());
}

#[test]
fn non_object_body_is_a_body_parsing_failure() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, "{}");
    let service = harness.service(executor.clone());

    let result = harness
        .runtime
        .block_on(service.fetch::<Item>(Request::post("/items").body(vec![1, 2, 3])));
    assert!(matches!(result, Err(NetworkError::BodyParsingFailed(_))));
    assert!(executor.seen().is_empty());
}

#[test]
fn body_is_serialized_as_json() {
    let harness = Harness::new();
    let executor = StubExecutor::new(|request, _| {
        let body = request.body.clone().unwrap_or_default();
        Ok(HttpResponse {
            status: 201,
            headers: Vec::new(),
            body,
        })
    });
    let service = harness.service(executor.clone());
    let trail = Trail {
        id: 9,
        title: "Ridge".to_string(),
    };

    let echoed = harness
        .runtime
        .block_on(service.fetch::<Trail>(Request::post("/trails").body(trail.clone())))
        .unwrap();
    assert_eq!(echoed, trail);
    let seen = executor.seen();
    let sent: serde_json::Value = serde_json::from_slice(seen[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(sent, serde_json::json!({"id": 9, "title": "Ridge"}));
}

#[test]
fn status_404_is_a_status_error_not_a_decoding_error() {
    let harness = Harness::new();
    let service = harness.service(StubExecutor::replying(404, r#"{"error":"not found"}"#));

    let result = harness.runtime.block_on(service.fetch::<Trail>(Request::get("/trails/1")));
    match result {
        Err(NetworkError::StatusCode { code, .. }) => assert_eq!(code, 404),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn no_credential_means_no_auth_headers() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"{"id":1}"#);
    let service = harness.service(executor.clone());

    let request = Request::get("/items/1").header("Content-Type", "text/plain");
    harness.runtime.block_on(service.fetch::<Item>(request)).unwrap();

    let seen = executor.seen();
    assert_eq!(seen[0].header("apikey"), None);
    assert_eq!(seen[0].header("authorization"), None);
    assert_eq!(seen[0].header("content-type"), Some("application/json"));
    assert_eq!(
        seen[0].headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("content-type")).count(),
        1
    );
}

#[test]
fn credential_is_injected_as_apikey_and_bearer() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"{"id":1}"#);
    let session = SessionCredential::new();
    let service = harness.service_with(BASE_URL, executor.clone(), session.clone());

    harness
        .runtime
        .block_on(service.fetch::<Item>(Request::get("/items/1")))
        .unwrap();
    session.set("secret-key");
    harness
        .runtime
        .block_on(service.fetch::<Item>(Request::get("/items/1").header("X-Trace", "t1")))
        .unwrap();

    let seen = executor.seen();
    assert_eq!(seen[0].header("apikey"), None);
    assert_eq!(seen[1].header("apikey"), Some("secret-key"));
    assert_eq!(seen[1].header("authorization"), Some("Bearer secret-key"));
    assert_eq!(seen[1].header("x-trace"), Some("t1"));
}

#[test]
fn not_connected_is_no_internet_connection() {
    let harness = Harness::new();
    let executor = StubExecutor::new(|_, _| Err(ExecuteError::NotConnected("offline".to_string())));
    let service = harness.service(executor);

    let result = harness.runtime.block_on(service.fetch::<Item>(Request::get("/items/1")));
    assert!(matches!(result, Err(NetworkError::NoInternetConnection)));
}

#[test]
fn other_transport_failures_keep_their_cause() {
    let harness = Harness::new();
    let executor =
        StubExecutor::new(|_, _| Err(ExecuteError::Transport("connection refused".to_string())));
    let service = harness.service(executor);

    let result = harness.runtime.block_on(service.fetch::<Item>(Request::get("/items/1")));
    assert!(matches!(
        result,
        Err(NetworkError::RequestFailed(cause)) if cause == "connection refused"
    ));
}

#[test]
fn malformed_envelope_is_invalid_response() {
    let harness = Harness::new();
    let executor =
        StubExecutor::new(|_, _| Err(ExecuteError::MalformedResponse("garbage".to_string())));
    let service = harness.service(executor);

    let result = harness.runtime.block_on(service.fetch::<Item>(Request::get("/items/1")));
    assert!(matches!(result, Err(NetworkError::InvalidResponse)));
}

#[test]
fn repeated_fetches_are_independent() {
    let harness = Harness::new();
    let executor = StubExecutor::new(|_, call| Ok(reply(200, &format!(r#"{{"id":{call}}}"#))));
    let service = harness.service(executor.clone());

    let next = || service.fetch::<Item>(Request::get("/items/next"));
    let first = harness.runtime.block_on(next()).unwrap();
    let second = harness.runtime.block_on(next()).unwrap();

    assert_eq!(first, Item { id: 0 });
    assert_eq!(second, Item { id: 1 });
    assert_eq!(executor.seen().len(), 2);
}

#[test]
fn absolute_targets_bypass_the_base_url() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"{"id":1}"#);
    let service = harness.service(executor.clone());

    harness
        .runtime
        .block_on(service.fetch::<Item>(Request::get("http://other.example.com/x")))
        .unwrap();
    harness
        .runtime
        .block_on(service.fetch::<Item>(Request::get("relative")))
        .unwrap();

    let seen = executor.seen();
    assert_eq!(seen[0].url, "http://other.example.com/x");
    assert_eq!(seen[1].url, "https://api.example.com/relative");
}

#[test]
fn relative_target_with_url_in_query_is_joined_onto_base() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"{"id":1}"#);
    let service = harness.service(executor.clone());

    let request = Request::get("/oauth/callback?redirect=https://app.example.com/home");
    let item = harness.runtime.block_on(service.fetch::<Item>(request)).unwrap();

    assert_eq!(item, Item { id: 1 });
    let seen = executor.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].url,
        "https://api.example.com/oauth/callback?redirect=https://app.example.com/home"
    );
}

#[test]
fn blank_credential_sends_no_auth_headers() {
    let harness = Harness::new();
    let executor = StubExecutor::replying(200, r#"{"id":1}"#);
    let service = harness.service_with(BASE_URL, executor.clone(), StaticCredential::new("  "));

    harness
        .runtime
        .block_on(service.fetch::<Item>(Request::get("/items/1")))
        .unwrap();

    let seen = executor.seen();
    assert_eq!(seen[0].header("apikey"), None);
    assert_eq!(seen[0].header("authorization"), None);
}

#[test]
fn request_task_finishes_and_joins() {
    let harness = Harness::new();
    let service = harness.service(StubExecutor::replying(200, r#"{"id":3}"#));

    let (tx, rx) = mpsc::channel();
    let main = harness.main.clone();
    let task = service
        .request::<Item, _>(Request::get("/items/3"), move |result| {
            tx.send((result, main.is_current())).unwrap();
        })
        .expect("request was not started");

    let (result, on_main) = await_completion(&rx);
    assert!(on_main);
    assert_eq!(result.unwrap(), Item { id: 3 });

    for _ in 0..500 {
        if task.is_finished() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(task.is_finished());
    harness.runtime.block_on(task.join());
}

#[test]
fn aborted_queued_request_never_completes() {
    // One blocking thread, so the second request queues behind the first.
    let harness = Harness {
        runtime: Builder::new_multi_thread()
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap(),
        main: MainContext::spawn("main").unwrap(),
    };
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let release_rx = Mutex::new(release_rx);
    let executor = StubExecutor::new(move |_, call| {
        if call == 0 {
            started_tx.lock().unwrap().send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
        }
        Ok(reply(200, &format!(r#"{{"id":{call}}}"#)))
    });
    let service = harness.service(executor.clone());

    let (first_tx, first_rx) = mpsc::channel();
    let first = service
        .request::<Item, _>(Request::get("/items/slow"), move |result| {
            first_tx.send(result).unwrap();
        })
        .expect("request was not started");
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let (second_tx, second_rx) = mpsc::channel::<Result<Item, NetworkError>>();
    let second = service
        .request::<Item, _>(Request::get("/items/queued"), move |result| {
            second_tx.send(result).unwrap();
        })
        .expect("request was not started");
    assert!(!second.is_finished());
    second.abort();
    release_tx.send(()).unwrap();

    let first_result = first_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first_result.unwrap(), Item { id: 0 });
    harness.runtime.block_on(first.join());
    assert!(matches!(
        second_rx.recv_timeout(Duration::from_secs(5)),
        Err(RecvTimeoutError::Disconnected)
    ));
    assert_eq!(executor.seen().len(), 1);
}
