use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use hpp_common::Money;
use hpp_engine::{
    db_types::{AuditEntry, Order, OrderId, OrderItem, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    AdminApi,
};
use log::debug;
use serde_json::{json, Value};

use super::{
    helpers::{admin_request, error_body, issue_token, sample_order},
    mocks::MockOrderStore,
};
use crate::{
    auth::Role,
    errors::{AuthError, ServerError},
    routes::{GetOrderRoute, PatchOrderRoute},
};

fn register(cfg: &mut ServiceConfig, store: MockOrderStore) {
    let api = AdminApi::new(store, EventProducers::default());
    cfg.service(GetOrderRoute::<MockOrderStore>::new())
        .service(PatchOrderRoute::<MockOrderStore>::new())
        .app_data(web::Data::new(api));
}

/// Unprivileged calls must be turned away before the store is consulted, so this mock has no expectations.
fn configure_untouched(cfg: &mut ServiceConfig) {
    register(cfg, MockOrderStore::new());
}

fn paid_order() -> Order {
    let mut order = sample_order("ord0001");
    order.status = OrderStatusType::Processing;
    order.payment_status = PaymentStatusType::Paid;
    order.version = 2;
    order
}

fn configure_paid_order(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|id| Ok((id.as_str() == "ord0001").then(paid_order)));
    store.expect_fetch_order_items().returning(|_| {
        Ok(vec![OrderItem { product_id: "sku-1".into(), quantity: 2, unit_price: Money::from_major(50) }])
    });
    store.expect_fetch_audit_log().returning(|id| {
        Ok(vec![AuditEntry {
            order_id: id.clone(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 5, 0).unwrap(),
            actor: "gateway".into(),
            note: "Gateway callback 'A' (authorised): payment_status pending -> paid, status pending -> processing"
                .into(),
        }])
    });
    store.expect_update_order().returning(|_, version, update, audit| {
        assert_eq!(audit.actor, "support@shop.example");
        let mut order = paid_order();
        order.status = update.status.unwrap_or(order.status);
        order.payment_status = update.payment_status.unwrap_or(order.payment_status);
        order.notes = update.notes.or(order.notes);
        order.version = version + 1;
        Ok(order)
    });
    register(cfg, store);
}

fn admin_token() -> String {
    issue_token("support@shop.example", vec![Role::Admin])
}

#[actix_web::test]
async fn no_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = admin_request(TestRequest::get().uri("/api/orders/ord0001"), "", configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, error_body(ServerError::AuthenticationError(AuthError::MissingToken)));
}

#[actix_web::test]
async fn tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = admin_token();
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    debug!("Calling /api/orders with invalid token {token}");
    let req = TestRequest::patch().uri("/api/orders/ord0001").set_json(json!({"status": "cancelled"}));
    let (status, _) = admin_request(req, &token, configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn bearer_tokens_are_accepted() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get()
        .uri("/api/orders/ord0001")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())));
    let (status, _) = admin_request(req, "", configure_paid_order).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unprivileged_callers_cannot_tell_if_orders_exist() {
    let _ = env_logger::try_init().ok();
    let token = issue_token("shopper", vec![Role::User]);
    let existing = TestRequest::patch().uri("/api/orders/ord0001").set_json(json!({"status": "cancelled"}));
    let (existing_status, existing_body) = admin_request(existing, &token, configure_untouched).await;
    let missing = TestRequest::patch().uri("/api/orders/nosuch").set_json(json!({"status": "cancelled"}));
    let (missing_status, missing_body) = admin_request(missing, &token, configure_untouched).await;
    assert_eq!(existing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(existing_body, missing_body);
    let (status, _) = admin_request(TestRequest::get().uri("/api/orders/nosuch"), &token, configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn order_detail() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        admin_request(TestRequest::get().uri("/api/orders/ord0001"), &admin_token(), configure_paid_order).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let detail: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["order"]["id"], "ord0001");
    assert_eq!(detail["buyer"]["name"], "Layla Haddad");
    assert_eq!(detail["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(detail["audit_log"][0]["actor"], "gateway");
}

#[actix_web::test]
async fn unknown_order_is_not_found_for_admins() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        admin_request(TestRequest::get().uri("/api/orders/nosuch"), &admin_token(), configure_paid_order).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancelling_a_paid_order_refunds_it() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch().uri("/api/orders/ord0001").set_json(json!({"status": "cancelled"}));
    let (status, body) = admin_request(req, &admin_token(), configure_paid_order).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id, OrderId::new("ord0001"));
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.payment_status, PaymentStatusType::Refunded);
    assert_eq!(order.version, 3);
}

#[actix_web::test]
async fn explicit_payment_status_wins() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri("/api/orders/ord0001")
        .set_json(json!({"status": "cancelled", "paymentStatus": "paid", "notes": "Refund handled offline"}));
    let (status, body) = admin_request(req, &admin_token(), configure_paid_order).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
    assert_eq!(order.notes.as_deref(), Some("Refund handled offline"));
}

#[actix_web::test]
async fn invalid_values_are_bad_requests() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch().uri("/api/orders/ord0001").set_json(json!({"status": "teleported"}));
    let (status, body) = admin_request(req, &admin_token(), configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("pending"), "Allowed values should be listed: {body}");
    let req = TestRequest::patch().uri("/api/orders/ord0001").set_json(json!({"total": "-1.00"}));
    let (status, _) = admin_request(req, &admin_token(), configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
