//! Integration tests for the interceptor chain with scripted transports.

use std::collections::{HashMap, VecDeque};
use std::future::{self, Future};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, ready};
use weft::interceptors::{
    Authorization, AuthorizationConfig, TokenCache, TokenRefresh, TransientRetry,
};
use weft::{
    AttemptContext, BoxError, Chain, Error, Flow, Interceptor, Method, Request, Response, Result,
    Transport,
};

fn request(path: &str) -> Request {
    let url = url::Url::parse("https://api.example.com")
        .and_then(|base| base.join(path))
        .expect("url");
    Request::builder(Method::Get, url).build()
}

/// Answers with scripted responses, then 200 once the script runs out.
#[derive(Debug, Clone, Default)]
struct Scripted {
    responses: Arc<Mutex<VecDeque<Response>>>,
    seen: Arc<Mutex<Vec<Request>>>,
}

impl Scripted {
    fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self::responses(
            statuses
                .into_iter()
                .map(|status| Response::with_status(status, format!("status {status}"))),
        )
    }

    fn responses(responses: impl IntoIterator<Item = Response>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().expect("lock").len()
    }

    fn seen(&self) -> Vec<Request> {
        self.seen.lock().expect("lock").clone()
    }
}

impl Transport for Scripted {
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        self.seen.lock().expect("lock").push(request);
        let response = self
            .responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Response::with_status(200, "status 200"));
        future::ready(Ok(response))
    }
}

/// Answers 200 when the request carries the `fresh` credential, 401 otherwise.
#[derive(Clone)]
struct Guarded {
    credential: fn(&Request) -> Option<String>,
    seen: Arc<Mutex<Vec<Request>>>,
}

impl Guarded {
    fn new(credential: fn(&Request) -> Option<String>) -> Self {
        Self {
            credential,
            seen: Arc::default(),
        }
    }

    fn credentials(&self) -> Vec<Option<String>> {
        self.seen
            .lock()
            .expect("lock")
            .iter()
            .map(self.credential)
            .collect()
    }
}

impl Transport for Guarded {
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        let accepted = (self.credential)(&request).as_deref() == Some("fresh");
        self.seen.lock().expect("lock").push(request);
        let response = if accepted {
            Response::with_status(200, "welcome")
        } else {
            Response::with_status(401, "unauthorized")
        };
        future::ready(Ok(response))
    }
}

/// Always answers 503.
fn always_unavailable() -> Scripted {
    Scripted::new(std::iter::repeat_n(503, 64))
}

/// Signals a retry on every response, without a cause.
struct AlwaysRetry;

impl Interceptor for AlwaysRetry {
    fn observe<'a>(
        &'a self,
        _ctx: &'a AttemptContext,
        _request: &'a Request,
        _response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        ready(Flow::retry()).boxed()
    }
}

/// Signals a retry on the first `failures` attempts.
struct RetryFirst(u32);

impl Interceptor for RetryFirst {
    fn observe<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        _request: &'a Request,
        response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        let flow = if ctx.attempt() <= self.0 {
            Flow::retry()
        } else {
            Flow::Continue(response)
        };
        ready(flow).boxed()
    }
}

/// Records the attempt number seen by the pre-flight hook.
#[derive(Default)]
struct RecordAttempts(Arc<Mutex<Vec<u32>>>);

impl Interceptor for RecordAttempts {
    fn prepare<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        request: Request,
    ) -> BoxFuture<'a, Flow<Request>> {
        self.0.lock().expect("lock").push(ctx.attempt());
        ready(Flow::Continue(request)).boxed()
    }
}

/// Fails every call before or after the transport.
enum Reject {
    Before,
    After,
}

impl Interceptor for Reject {
    fn prepare<'a>(
        &'a self,
        _ctx: &'a AttemptContext,
        request: Request,
    ) -> BoxFuture<'a, Flow<Request>> {
        let flow = match self {
            Self::Before => Flow::Fail(Error::interceptor("reject", "denied before sending")),
            Self::After => Flow::Continue(request),
        };
        ready(flow).boxed()
    }

    fn observe<'a>(
        &'a self,
        _ctx: &'a AttemptContext,
        _request: &'a Request,
        _response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        ready(Flow::Fail(Error::interceptor("reject", "denied after sending"))).boxed()
    }
}

fn counting_refresher(
    cache: TokenCache,
    refreshes: Arc<AtomicU32>,
) -> impl Fn() -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync {
    move || {
        let cache = cache.clone();
        let refreshes = Arc::clone(&refreshes);
        async move {
            refreshes.fetch_add(1, Ordering::SeqCst);
            cache.set("fresh");
            Ok(())
        }
        .boxed()
    }
}

/// A transient failure followed by a success is retried once.
#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let transport = Scripted::new([503, 200]);
    let chain = Chain::builder(transport.clone())
        .with(TransientRetry::new())
        .max_retries(3)
        .build();

    let response = chain.send(request("/items")).await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(transport.calls(), 2);
}

/// Two server errors in a row are absorbed by the retry budget.
#[tokio::test(start_paused = true)]
async fn test_server_errors_then_success() {
    let transport = Scripted::responses([
        Response::with_status(500, "boom"),
        Response::with_status(500, "boom"),
        Response::with_status(200, "success"),
    ]);
    let chain = Chain::builder(transport.clone())
        .with(TransientRetry::new())
        .max_retries(3)
        .build();

    let response = chain.send(request("/items")).await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().expect("utf-8"), "success");
    assert_eq!(transport.calls(), 3);
}

/// Persistent failure exhausts the budget and surfaces the last cause.
#[tokio::test(start_paused = true)]
async fn test_persistent_failure_exhausts_budget() {
    let transport = always_unavailable();
    let chain = Chain::builder(transport.clone())
        .with(TransientRetry::new())
        .max_retries(2)
        .build();

    let err = chain
        .send(request("/items"))
        .await
        .expect_err("expected exhaustion");

    assert_eq!(err.status(), Some(503));
    assert_eq!(transport.calls(), 3);
}

/// A rejected credential is refreshed once and the next attempt carries the
/// new token.
#[tokio::test]
async fn test_credential_refresh_then_success() {
    let transport = Scripted::new([401, 200]);
    let cache = TokenCache::with_token("expired");
    let refreshes = Arc::new(AtomicU32::new(0));
    let chain = Chain::builder(transport.clone())
        .with(TokenRefresh::new(
            cache.clone(),
            counting_refresher(cache, Arc::clone(&refreshes)),
        ))
        .max_retries(1)
        .build();

    let response = chain.send(request("/me")).await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    let seen = transport.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].header("Authorization"), Some("Bearer expired"));
    assert_eq!(seen[1].header("Authorization"), Some("Bearer fresh"));
}

/// Refresh then authorization: the replayed attempt carries only the new
/// credential, wherever it is placed.
async fn assert_refreshed_credential_replaces_old(
    config: AuthorizationConfig,
    credential: fn(&Request) -> Option<String>,
) {
    let transport = Guarded::new(credential);
    let cache = TokenCache::with_token("expired");
    let refreshes = Arc::new(AtomicU32::new(0));
    let chain = Chain::builder(transport.clone())
        .with(
            TokenRefresh::new(
                cache.clone(),
                counting_refresher(cache.clone(), Arc::clone(&refreshes)),
            )
            .without_header(),
        )
        .with(Authorization::with_config(cache, config))
        .max_retries(3)
        .build();

    let response = chain.send(request("/me")).await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.credentials(),
        vec![Some("expired".to_string()), Some("fresh".to_string())]
    );
}

#[tokio::test]
async fn test_refreshed_credential_in_header() {
    assert_refreshed_credential_replaces_old(AuthorizationConfig::default(), |request| {
        request
            .header("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
    .await;
}

#[tokio::test]
async fn test_refreshed_credential_in_query() {
    assert_refreshed_credential_replaces_old(
        AuthorizationConfig::empty().query_parameter("access_token"),
        |request| {
            let values: Vec<_> = request
                .query_pairs()
                .into_iter()
                .filter(|(name, _)| name == "access_token")
                .map(|(_, value)| value)
                .collect();
            values.join(",").into()
        },
    )
    .await;
}

#[tokio::test]
async fn test_refreshed_credential_in_form_body() {
    assert_refreshed_credential_replaces_old(
        AuthorizationConfig::empty().body_parameter("access_token"),
        |request| {
            let body = request.body()?;
            let values: Vec<_> = url::form_urlencoded::parse(body)
                .filter(|(name, _)| name == "access_token")
                .map(|(_, value)| value.into_owned())
                .collect();
            Some(values.join(","))
        },
    )
    .await;
}

/// A failed refresh ends the call without another attempt.
#[tokio::test]
async fn test_credential_refresh_failure_is_terminal() {
    let transport = Scripted::new([401, 200]);
    let refresher = || async { Err::<(), _>(std::io::Error::other("invalid grant")) };
    let chain = Chain::builder(transport.clone())
        .with(TokenRefresh::new(|| Some("expired".to_string()), refresher))
        .max_retries(3)
        .build();

    let err = chain.send(request("/me")).await.expect_err("expected failure");

    assert!(err.is_credential_refresh(), "Expected refresh error, got: {err}");
    assert_eq!(transport.calls(), 1);
}

/// An always-retrying chain performs exactly `max_retries + 1` round trips.
#[tokio::test]
async fn test_attempts_are_bounded() {
    for max_retries in 0..=4 {
        let transport = Scripted::default();
        let chain = Chain::builder(transport.clone())
            .with(AlwaysRetry)
            .max_retries(max_retries)
            .build();

        let err = chain.send(request("/")).await.expect_err("expected exhaustion");

        assert_exhausted(&err, max_retries + 1);
        assert_eq!(transport.calls(), max_retries as usize + 1);
    }
}

fn assert_exhausted(err: &Error, expected: u32) {
    match err {
        Error::RetriesExhausted { attempts } => assert_eq!(*attempts, expected),
        other => panic!("Expected exhaustion, got: {other}"),
    }
}

/// Retrying `k` times within the budget succeeds after `k + 1` round trips.
#[tokio::test]
async fn test_success_within_budget() {
    let max_retries = 4;
    for failures in 0..=max_retries {
        let transport = Scripted::default();
        let chain = Chain::builder(transport.clone())
            .with(RetryFirst(failures))
            .max_retries(max_retries)
            .build();

        let response = chain.send(request("/")).await.expect("response");

        assert_eq!(response.status(), 200);
        assert_eq!(transport.calls(), failures as usize + 1);
    }
}

/// Every attempt sees a strictly larger attempt number, starting at 1.
#[tokio::test]
async fn test_attempt_numbers_increase() {
    let recorder = RecordAttempts::default();
    let attempts = Arc::clone(&recorder.0);
    let chain = Chain::builder(Scripted::default())
        .with(recorder)
        .with(AlwaysRetry)
        .max_retries(2)
        .build();

    let _ = chain.send(request("/")).await;

    assert_eq!(*attempts.lock().expect("lock"), vec![1, 2, 3]);
}

/// A terminal failure before sending never reaches the transport.
#[tokio::test]
async fn test_terminal_failure_before_sending() {
    let transport = Scripted::default();
    let chain = Chain::builder(transport.clone())
        .with(Reject::Before)
        .with(TransientRetry::new())
        .build();

    let err = chain.send(request("/")).await.expect_err("expected failure");

    assert!(err.to_string().contains("denied before sending"));
    assert_eq!(transport.calls(), 0);
}

/// A terminal failure after sending is never retried.
#[tokio::test]
async fn test_terminal_failure_after_sending() {
    let transport = always_unavailable();
    let chain = Chain::builder(transport.clone())
        .with(Reject::After)
        .with(TransientRetry::new())
        .max_retries(3)
        .build();

    let err = chain.send(request("/")).await.expect_err("expected failure");

    assert!(err.to_string().contains("denied after sending"));
    assert_eq!(transport.calls(), 1);
}

/// Transport errors are terminal for the chain.
#[tokio::test]
async fn test_transport_error_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let transport = weft::transport_fn(move |_request| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err(Error::connection("connection reset")) }
    });
    let chain = Chain::builder(transport)
        .with(AlwaysRetry)
        .max_retries(3)
        .build();

    let err = chain.send(request("/")).await.expect_err("expected failure");

    assert!(err.is_connection(), "Expected connection error, got: {err}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Dropping the call while it waits between attempts stops it for good.
#[tokio::test(start_paused = true)]
async fn test_dropping_the_call_cancels_retries() {
    let transport = always_unavailable();
    let chain = Chain::builder(transport.clone())
        .with(TransientRetry::new().delay(Duration::from_secs(10)))
        .max_retries(5)
        .build();

    let result = tokio::time::timeout(Duration::from_secs(15), chain.send(request("/"))).await;
    assert!(result.is_err(), "Expected the call to time out");
    assert_eq!(transport.calls(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.calls(), 2);
}

/// Independent calls on one chain keep their own attempt counters.
#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    #[derive(Clone, Default)]
    struct PerPath(Arc<Mutex<HashMap<String, u32>>>);

    impl Transport for PerPath {
        fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
            let mut calls = self.0.lock().expect("lock");
            let count = calls.entry(request.url().path().to_string()).or_default();
            *count += 1;
            let status = if request.url().path() == "/flaky" && *count <= 2 {
                503
            } else {
                200
            };
            future::ready(Ok(Response::with_status(status, "")))
        }
    }

    let transport = PerPath::default();
    let chain = Chain::builder(transport.clone())
        .with(TransientRetry::new().without_delay())
        .max_retries(2)
        .build();

    let (flaky, stable) = tokio::join!(chain.send(request("/flaky")), chain.send(request("/stable")));

    assert_eq!(flaky.expect("flaky").status(), 200);
    assert_eq!(stable.expect("stable").status(), 200);

    let calls = transport.0.lock().expect("lock");
    assert_eq!(calls.get("/flaky"), Some(&3));
    assert_eq!(calls.get("/stable"), Some(&1));
}

/// A retry without a cause keeps the cause recorded by an earlier attempt.
#[tokio::test]
async fn test_last_recorded_cause_survives_silent_retry() {
    struct CauseOnce;

    impl Interceptor for CauseOnce {
        fn observe<'a>(
            &'a self,
            ctx: &'a AttemptContext,
            _request: &'a Request,
            _response: Response,
        ) -> BoxFuture<'a, Flow<Response>> {
            let flow = if ctx.is_first() {
                Flow::retry_because(Error::http(502, "bad gateway"))
            } else {
                Flow::retry()
            };
            ready(flow).boxed()
        }
    }

    let chain = Chain::builder(Scripted::default())
        .with(CauseOnce)
        .max_retries(2)
        .build();

    let err = chain.send(request("/")).await.expect_err("expected exhaustion");

    assert_eq!(err.status(), Some(502));
}

/// The chain can drive another chain as its transport.
#[tokio::test(start_paused = true)]
async fn test_chains_compose() {
    let transport = Scripted::new([503, 200]);
    let inner = Chain::builder(transport.clone())
        .with(TransientRetry::new())
        .max_retries(1)
        .build();
    let recorder = RecordAttempts::default();
    let attempts = Arc::clone(&recorder.0);
    let outer = Chain::builder(inner).with(recorder).build();

    let response = outer.send(request("/")).await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(transport.calls(), 2);
    assert_eq!(*attempts.lock().expect("lock"), vec![1]);
}
