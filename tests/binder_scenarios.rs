//! End-to-end state machine scenarios over a scripted transport.

mod common;

use common::{
    step_body, step_status, step_transport_failure, step_with_header, ScriptedTransport, Step,
};
use restbind::handlers::FailedAttempt;
use restbind::{
    BackoffPolicy, BinderBuilder, Error, InterfaceDescriptor, NeverRetryPolicy, RequestSpec,
    ResponseClass, RetryDecision, RetryPolicy, RetryState,
};
use std::sync::Arc;
use std::time::Duration;

trait Catalog {}
trait AsyncCatalog {}

fn client_with(transport: Arc<ScriptedTransport>) -> BinderBuilder {
    common::init_tracing();
    BinderBuilder::new()
        .interfaces(
            InterfaceDescriptor::of::<dyn Catalog>(),
            InterfaceDescriptor::of::<dyn AsyncCatalog>(),
        )
        .transport(transport)
}

fn fast_backoff(max_retries: u32) -> Arc<BackoffPolicy> {
    Arc::new(BackoffPolicy::new(
        max_retries,
        Duration::from_millis(1),
        Duration::from_millis(5),
    ))
}

// Scenario A: three 503s then a 200 with a 3-retry backoff policy yields the
// success value of the 4th response.
#[tokio::test]
async fn server_errors_retry_until_success() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        step_status(503),
        step_status(503),
        step_status(503),
        step_body(200, "fourth time lucky"),
    ]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, fast_backoff(3))
        .build()
        .unwrap();

    let (resp, stats) = client
        .invoke_with_stats(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_text(), "fourth time lucky");
    assert_eq!(stats.attempts, 4);
    assert_eq!(stats.retry_count, 3);
    assert_eq!(transport.request_count(), 4);
}

// Scenario B: a 404 is not transient; exactly one attempt, parsed detail.
#[tokio::test]
async fn client_errors_fail_after_one_attempt_with_parsed_detail() {
    let transport = Arc::new(ScriptedTransport::new(vec![step_body(
        404,
        r#"{"error":{"code":"container_not_found","message":"no container named x"}}"#,
    )]));
    let client = client_with(transport.clone()).build().unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/containers/x"))
        .await
        .unwrap_err();

    assert_eq!(transport.request_count(), 1);
    match err {
        Error::Classified {
            class,
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(class, ResponseClass::ClientError);
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("container_not_found"));
            assert_eq!(message, "no container named x");
        }
        other => panic!("expected Classified, got {other}"),
    }
}

// Scenario C: a 301 with a Location header is followed once; the second
// request targets the resolved location.
#[tokio::test]
async fn redirects_are_followed_once() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        step_with_header(301, "location", "/v2/items"),
        step_body(200, "moved"),
    ]));
    let client = client_with(transport.clone()).build().unwrap();

    let (resp, stats) = client
        .invoke_with_stats(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(stats.attempts, 2);
    assert_eq!(
        transport.request_urls(),
        vec![
            "http://svc.test/v1/items".to_string(),
            "http://svc.test/v2/items".to_string(),
        ]
    );
}

// A backoff retry earlier in the call must not consume the redirect budget:
// a 503 retried once, then a 301, still gets its redirect followed.
#[tokio::test]
async fn redirect_followed_after_earlier_server_error_retry() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        step_status(503),
        step_with_header(301, "location", "/v2/items"),
        step_body(200, "moved"),
    ]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, fast_backoff(2))
        .build()
        .unwrap();

    let (resp, stats) = client
        .invoke_with_stats(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(stats.attempts, 3);
    assert_eq!(
        transport.request_urls(),
        vec![
            "http://svc.test/v1/items".to_string(),
            "http://svc.test/v1/items".to_string(),
            "http://svc.test/v2/items".to_string(),
        ]
    );
}

#[tokio::test]
async fn redirect_without_location_fails_without_retry() {
    let transport = Arc::new(ScriptedTransport::new(vec![step_status(301)]));
    let client = client_with(transport.clone()).build().unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap_err();

    assert_eq!(transport.request_count(), 1);
    assert_eq!(err.class(), Some(ResponseClass::Redirection));
}

// An unconditionally-retrying policy must still terminate: the binder-level
// attempt ceiling cuts the loop and reports exhaustion.
#[tokio::test]
async fn binder_ceiling_terminates_unconditional_retry_policies() {
    struct AlwaysRetry;
    impl RetryPolicy for AlwaysRetry {
        fn should_retry(&self, _: &RetryState, _: &FailedAttempt<'_>) -> RetryDecision {
            RetryDecision::after(Duration::ZERO)
        }
    }

    let transport = Arc::new(ScriptedTransport::new(
        (0..4).map(|_| step_status(503)).collect::<Vec<Step>>(),
    ));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, Arc::new(AlwaysRetry))
        .max_attempts(4)
        .build()
        .unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap_err();

    assert_eq!(transport.request_count(), 4);
    match err {
        Error::RetryExhausted { attempts, source } => {
            assert_eq!(attempts, 4);
            assert_eq!(source.status(), Some(503));
        }
        other => panic!("expected RetryExhausted, got {other}"),
    }
}

// The policy's own ceiling also reports exhaustion, distinguishable from a
// definitive rejection.
#[tokio::test]
async fn policy_ceiling_yields_retry_exhausted() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        step_status(503),
        step_status(503),
        step_status(503),
    ]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, fast_backoff(2))
        .build()
        .unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap_err();

    assert_eq!(transport.request_count(), 3);
    match err {
        Error::RetryExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert_eq!(source.class(), Some(ResponseClass::ServerError));
        }
        other => panic!("expected RetryExhausted, got {other}"),
    }
}

// Transport-kind failures are transient by default and take the server-error
// retry path.
#[tokio::test]
async fn transport_failures_are_retried_like_server_errors() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        step_transport_failure("connection reset by peer"),
        step_body(200, "recovered"),
    ]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, fast_backoff(3))
        .build()
        .unwrap();

    let (resp, stats) = client
        .invoke_with_stats(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_text(), "recovered");
    assert_eq!(stats.attempts, 2);
}

#[tokio::test]
async fn transport_failure_surfaces_when_policy_declines() {
    let transport = Arc::new(ScriptedTransport::new(vec![step_transport_failure(
        "dns lookup failed",
    )]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, Arc::new(NeverRetryPolicy))
        .build()
        .unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap_err();

    assert_eq!(transport.request_count(), 1);
    assert!(matches!(err, Error::Transport(_)));
}

// An unparseable error body degrades to the generic wrap instead of turning
// the call into a parse failure.
#[tokio::test]
async fn unparseable_error_body_degrades_to_generic_detail() {
    let transport = Arc::new(ScriptedTransport::new(vec![step_body(
        500,
        "<html>bad gateway</html>",
    )]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, Arc::new(NeverRetryPolicy))
        .build()
        .unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap_err();

    match err {
        Error::Classified { code, message, .. } => {
            assert_eq!(code, None);
            assert!(message.contains("bad gateway"));
        }
        other => panic!("expected Classified, got {other}"),
    }
}

// Cancellation during the retry delay short-circuits to Done with a
// cancellation error, never into another attempt.
#[tokio::test(start_paused = true)]
async fn cancellation_during_delay_short_circuits() {
    let transport = Arc::new(ScriptedTransport::new(vec![step_status(503)]));
    let client = client_with(transport.clone())
        .retry_policy(
            ResponseClass::ServerError,
            Arc::new(BackoffPolicy::new(
                3,
                Duration::from_secs(60),
                Duration::from_secs(60),
            )),
        )
        .build()
        .unwrap();

    let (handle, fut) = client.invoke_cancellable(RequestSpec::get("http://svc.test/v1/items"));
    let (result, _) = tokio::join!(fut, async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(transport.request_count(), 1);
}

// Every attempt of one logical call carries the same correlation id.
#[tokio::test]
async fn correlation_id_is_stable_across_attempts() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        step_status(503),
        step_status(200),
    ]));
    let client = client_with(transport.clone())
        .retry_policy(ResponseClass::ServerError, fast_backoff(3))
        .build()
        .unwrap();

    let (_, stats) = client
        .invoke_with_stats(RequestSpec::get("http://svc.test/v1/items"))
        .await
        .unwrap();

    let first = transport.request_header(0, "x-restbind-request-id").unwrap();
    let second = transport.request_header(1, "x-restbind-request-id").unwrap();
    assert_eq!(first, second);
    assert_eq!(first, stats.client_request_id);
}

// A custom error handler override replaces the default for its class only.
#[tokio::test]
async fn per_class_handler_overrides_apply() {
    use restbind::{ErrorHandler, ErrorContext, ResponseOutcome};

    struct TeapotHandler;
    impl ErrorHandler for TeapotHandler {
        fn handle(&self, outcome: &ResponseOutcome) -> Error {
            Error::Classified {
                class: ResponseClass::ClientError,
                status: outcome.status,
                code: Some("teapot".to_string()),
                message: "short and stout".to_string(),
                context: ErrorContext::new().with_status_code(outcome.status),
            }
        }
    }

    let transport = Arc::new(ScriptedTransport::new(vec![step_status(418)]));
    let client = client_with(transport)
        .error_handler(ResponseClass::ClientError, Arc::new(TeapotHandler))
        .build()
        .unwrap();

    let err = client
        .invoke(RequestSpec::get("http://svc.test/v1/brew"))
        .await
        .unwrap_err();

    match err {
        Error::Classified { code, message, .. } => {
            assert_eq!(code.as_deref(), Some("teapot"));
            assert_eq!(message, "short and stout");
        }
        other => panic!("expected Classified, got {other}"),
    }
}
