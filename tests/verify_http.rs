#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use std::{net::TcpListener, time::Duration};
use url::Url;
use webpay_flow::pay::{Assertion, HttpVerifier, SessionVerifier, VerificationResult, VerifyError};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERIFY_PATH: &str = "/mozpay/auth/verify";

fn verifier(server: &MockServer, timeout: Duration) -> HttpVerifier {
    let url = Url::parse(&format!("{}{VERIFY_PATH}", server.uri())).unwrap();
    HttpVerifier::new(url, timeout).unwrap()
}

#[tokio::test]
async fn posts_assertion_as_form_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("assertion=abc.def-ghi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_pin": true,
            "pin_create": "/mozpay/pin/create"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("abc.def-ghi"))
        .await
        .unwrap();

    assert_eq!(result, VerificationResult::HasPin);
}

#[tokio::test]
async fn sends_crate_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .and(header("user-agent", webpay_flow::APP_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"has_pin": true})))
        .expect(1)
        .mount(&server)
        .await;

    let result = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("token"))
        .await;

    assert_eq!(result, Ok(VerificationResult::HasPin));
}

#[tokio::test]
async fn relative_pin_create_resolves_against_verify_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_pin": false,
            "pin_create": "/mozpay/pin/create"
        })))
        .mount(&server)
        .await;

    let result = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("token"))
        .await
        .unwrap();

    let expected = Url::parse(&format!("{}/mozpay/pin/create", server.uri())).unwrap();
    assert_eq!(result, VerificationResult::CreatePin { url: expected });
}

#[tokio::test]
async fn null_has_pin_redirects_to_pin_create() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_pin": null,
            "pin_create": "https://x/create"
        })))
        .mount(&server)
        .await;

    let result = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("token"))
        .await
        .unwrap();

    assert_eq!(
        result,
        VerificationResult::CreatePin {
            url: Url::parse("https://x/create").unwrap()
        }
    );
}

#[tokio::test]
async fn bad_request_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("  invalid assertion\n"))
        .mount(&server)
        .await;

    let err = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("token"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        VerifyError::Http {
            status: 400,
            message: "invalid assertion".to_string(),
        }
    );
}

#[tokio::test]
async fn long_error_bodies_are_truncated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("e".repeat(1000)))
        .mount(&server)
        .await;

    let err = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("token"))
        .await
        .unwrap_err();

    match err {
        VerifyError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message.chars().count(), 200);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = verifier(&server, Duration::from_secs(5))
        .verify(&Assertion::new("token"))
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"has_pin": true}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = verifier(&server, Duration::from_millis(100))
        .verify(&Assertion::new("token"))
        .await
        .unwrap_err();

    assert_eq!(err, VerifyError::Timeout);
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    // Bind an ephemeral port and release it so nothing is listening there.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{port}{VERIFY_PATH}")).unwrap();

    let err = HttpVerifier::new(url, Duration::from_secs(2))
        .unwrap()
        .verify(&Assertion::new("token"))
        .await
        .unwrap_err();

    assert!(matches!(err, VerifyError::Network(_)), "got {err:?}");
    assert!(err.to_string().starts_with("Unable to reach the server: "));
}
