//! Integration tests for the HTTP surface.
//!
//! Drives the full router with `tower::ServiceExt::oneshot` over the
//! in-memory store:
//! 1. Gateway endpoints verify signatures and acknowledge outcomes
//! 2. Source IP allow-lists answer 403, judged on the socket peer
//! 3. Payment endpoints create, refund and expose the audit trail

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use academy_payments::adapters::http::middleware::GatewayAllowList;
use academy_payments::adapters::http::{app_router, HttpLimits, PaymentsAppState, WebhookAppState};
use academy_payments::adapters::memory::InMemoryPaymentStore;
use academy_payments::application::ReconcileWebhookHandler;
use academy_payments::domain::foundation::AcademyId;
use academy_payments::domain::payment::Gateway;
use academy_payments::domain::webhook::SignatureVerifier;

// =============================================================================
// Test Infrastructure
// =============================================================================

const TAP_SECRET: &str = "tap_http_secret";
const EASYKASH_SECRET: &str = "easykash_http_secret";
const PAYMOB_SOURCE: &str = "41.33.1.1";
const PROXY: &str = "10.0.0.5";

struct TestApp {
    router: Router,
    store: Arc<InMemoryPaymentStore>,
}

fn test_app() -> TestApp {
    test_app_behind(Vec::new())
}

fn test_app_behind(trusted_proxies: Vec<IpAddr>) -> TestApp {
    let store = Arc::new(InMemoryPaymentStore::new());
    let reconcile = ReconcileWebhookHandler::new(store.clone(), store.clone())
        .with_verifier(Gateway::Tap, SignatureVerifier::new(Gateway::Tap, TAP_SECRET))
        .with_verifier(
            Gateway::EasyKash,
            SignatureVerifier::new(Gateway::EasyKash, EASYKASH_SECRET),
        );

    let mut allowed = HashMap::new();
    allowed.insert(Gateway::Paymob, vec![PAYMOB_SOURCE.parse().unwrap()]);

    let webhooks = WebhookAppState {
        reconcile: Arc::new(reconcile),
        events: store.clone(),
        allow_list: Arc::new(GatewayAllowList::new(allowed).with_trusted_proxies(trusted_proxies)),
    };
    let payments = PaymentsAppState {
        ledger: store.clone(),
        audit: store.clone(),
    };

    TestApp {
        router: app_router(webhooks, payments, HttpLimits::default()),
        store,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", "integration-test")
        .header("X-Forwarded-For", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sets the TCP peer the way `into_make_service_with_connect_info` does.
fn from_peer(mut request: Request<Body>, ip: &str) -> Request<Body> {
    let addr = SocketAddr::new(ip.parse().unwrap(), 44321);
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn paymob_unknown_payment() -> Value {
    json!({
        "type": "TRANSACTION",
        "obj": {
            "id": 777,
            "success": true,
            "pending": false,
            "is_refunded": false,
            "is_voided": false,
            "amount_cents": 5000,
            "currency": "EGP",
            "order": {"merchant_order_id": uuid_like()}
        }
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_payment(app: &TestApp, academy_id: AcademyId, gateway: &str) -> Value {
    let mut request = post_json(
        "/api/payments",
        &json!({
            "academy_id": academy_id.to_string(),
            "amount": "50.00",
            "currency": "SAR",
            "gateway": gateway,
            "code_prefix": "ASP"
        }),
    );
    request
        .headers_mut()
        .insert("X-User-Id", "student-42".parse().unwrap());

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

fn tap_charge(charge_id: &str, status: &str, payment_id: &str) -> Value {
    json!({
        "id": charge_id,
        "object": "charge",
        "status": status,
        "amount": 50,
        "currency": "SAR",
        "reference": {"gateway": "gw_9", "payment": "pay_9"},
        "transaction": {"created": "1705314652000"},
        "metadata": {"payment_id": payment_id}
    })
}

fn tap_request(payload: &Value) -> Request<Body> {
    let signature = SignatureVerifier::new(Gateway::Tap, TAP_SECRET)
        .sign(payload)
        .unwrap();
    let mut request = post_json("/api/webhooks/tap", payload);
    request
        .headers_mut()
        .insert("hashstring", signature.parse().unwrap());
    request
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app();
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn signed_tap_webhook_pays_payment_and_shows_in_audit_trail() {
    let app = test_app();
    let payment = create_payment(&app, AcademyId::new(), "tap").await;
    let payment_id = payment["id"].as_str().unwrap().to_string();
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["amount_minor"], 5000);
    assert!(payment["payment_code"].as_str().unwrap().starts_with("ASP-"));

    let payload = tap_charge("chg_http_1", "CAPTURED", &payment_id);
    let (status, ack) = send(&app.router, tap_request(&payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "success");
    assert_eq!(ack["payment_id"], payment_id.as_str());

    let (status, ack) = send(&app.router, tap_request(&payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ignored");

    let (status, trail) =
        send(&app.router, get(&format!("/api/payments/{}/audit", payment_id))).await;
    assert_eq!(status, StatusCode::OK);
    let entries = trail["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "created");
    assert_eq!(entries[0]["user_id"], "student-42");
    assert_eq!(entries[1]["action"], "status_changed");
    assert_eq!(entries[1]["status_to"], "paid");
    assert_eq!(entries[1]["amount"], "50.00");
    assert_eq!(entries[1]["ip_address"], "203.0.113.7");

    let (_, filtered) = send(
        &app.router,
        get(&format!("/api/payments/{}/audit?action=status_changed", payment_id)),
    )
    .await;
    assert_eq!(filtered["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn wrong_tap_signature_is_400_and_stores_nothing() {
    let app = test_app();
    let payload = tap_charge("chg_bad", "CAPTURED", &uuid_like());
    let mut request = post_json("/api/webhooks/tap", &payload);
    request
        .headers_mut()
        .insert("hashstring", "deadbeef".parse().unwrap());

    let (status, ack) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ack["status"], "error");
    assert_eq!(app.store.event_count().await, 0);
}

#[tokio::test]
async fn malformed_body_is_400() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/tap")
        .header("hashstring", "00")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, ack) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ack["status"], "error");
}

#[tokio::test]
async fn paymob_from_unlisted_source_is_403() {
    let app = test_app();
    let payload = json!({"type": "TRANSACTION", "obj": {"id": 1, "success": true}});

    let request = from_peer(post_json("/api/webhooks/paymob", &payload), "198.51.100.9");
    let (status, ack) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(ack["status"], "error");
    assert_eq!(app.store.event_count().await, 0);
}

#[tokio::test]
async fn forwarded_for_cannot_claim_a_listed_source() {
    let app = test_app();
    let mut request = from_peer(
        post_json("/api/webhooks/paymob", &paymob_unknown_payment()),
        "198.51.100.9",
    );
    request
        .headers_mut()
        .insert("X-Forwarded-For", PAYMOB_SOURCE.parse().unwrap());

    let (status, ack) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(ack["status"], "error");
    assert_eq!(app.store.event_count().await, 0);
}

#[tokio::test]
async fn trusted_proxy_forwards_the_listed_source() {
    let app = test_app_behind(vec![PROXY.parse().unwrap()]);
    let mut request = from_peer(
        post_json("/api/webhooks/paymob", &paymob_unknown_payment()),
        PROXY,
    );
    request
        .headers_mut()
        .insert("X-Forwarded-For", PAYMOB_SOURCE.parse().unwrap());

    let (status, ack) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["message"], "Payment not found");
    assert_eq!(app.store.event_count().await, 1);
}

#[tokio::test]
async fn paymob_from_listed_source_for_unknown_payment_is_acknowledged() {
    let app = test_app();
    let request = from_peer(
        post_json("/api/webhooks/paymob", &paymob_unknown_payment()),
        PAYMOB_SOURCE,
    );

    let (status, ack) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "error");
    assert_eq!(ack["message"], "Payment not found");

    let (status, listing) = send(&app.router, get("/api/webhooks/events/unresolved?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let events = listing["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_id"], "paymob_777_paid");
    assert_eq!(events[0]["error_message"], "Payment not found");
}

#[tokio::test]
async fn easykash_signature_travels_in_body() {
    let app = test_app();
    let payment = create_payment(&app, AcademyId::new(), "easykash").await;
    let reference = payment["reference_code"].as_str().unwrap().to_string();

    let mut payload = json!({
        "ProductCode": "EK-1",
        "Amount": "50.00",
        "currency": "SAR",
        "ProductType": "Direct Pay",
        "PaymentMethod": "Card",
        "status": "PAID",
        "easykashRef": "EK123",
        "customerReference": reference
    });
    let signature = SignatureVerifier::new(Gateway::EasyKash, EASYKASH_SECRET)
        .sign(&payload)
        .unwrap();
    payload["signatureHash"] = json!(signature);

    let (status, ack) = send(&app.router, post_json("/api/webhooks/easykash", &payload)).await;
    assert_eq!(status, StatusCode::OK, "{}", ack);
    assert_eq!(ack["status"], "success");
}

// =============================================================================
// Payments
// =============================================================================

#[tokio::test]
async fn refund_of_pending_payment_is_409() {
    let app = test_app();
    let payment = create_payment(&app, AcademyId::new(), "tap").await;
    let uri = format!("/api/payments/{}/refunds", payment["id"].as_str().unwrap());

    let (status, body) = send(&app.router, post_json(&uri, &json!({"amount_minor": 1000}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn attempt_is_logged_without_status_change() {
    let app = test_app();
    let payment = create_payment(&app, AcademyId::new(), "tap").await;
    let id = payment["id"].as_str().unwrap();

    let (status, entry) = send(
        &app.router,
        post_json(
            &format!("/api/payments/{}/attempts", id),
            &json!({"kind": "failed", "notes": "3DS timeout", "details": {"code": "TIMEOUT"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["action"], "attempt_failed");
    assert_eq!(entry["status_from"], "pending");
    assert!(entry["status_to"].is_null());
}

#[tokio::test]
async fn audit_of_unknown_payment_is_404() {
    let app = test_app();
    let (status, body) = send(&app.router, get(&format!("/api/payments/{}/audit", uuid_like()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "PAYMENT_NOT_FOUND");
}

#[tokio::test]
async fn unknown_audit_action_filter_is_400() {
    let app = test_app();
    let payment = create_payment(&app, AcademyId::new(), "tap").await;
    let uri = format!(
        "/api/payments/{}/audit?action=deleted",
        payment["id"].as_str().unwrap()
    );

    let (status, body) = send(&app.router, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn over_precise_amount_is_rejected() {
    let app = test_app();
    let (status, _) = send(
        &app.router,
        post_json(
            "/api/payments",
            &json!({
                "academy_id": AcademyId::new().to_string(),
                "amount": "50.005",
                "currency": "SAR",
                "gateway": "tap"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn uuid_like() -> String {
    AcademyId::new().to_string()
}
