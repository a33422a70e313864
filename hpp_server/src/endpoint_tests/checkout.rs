use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use hpp_common::Secret;
use hpp_engine::{
    config::GatewayConfig,
    db_types::{NewOrder, Order, OrderStatusType, PaymentStatusType},
    CheckoutApi,
};
use serde_json::json;
use url::Url;

use super::{
    helpers::{gateway_config, public_request, sample_order},
    mocks::MockOrderStore,
};
use crate::{
    data_objects::{CheckoutResponse, PaymentResultResponse, ReturnOutcome},
    routes::{CheckoutRoute, PaymentResultRoute},
};

fn checkout_body() -> serde_json::Value {
    json!({
        "customer_id": "cust-1",
        "buyer": { "first_name": "Layla", "last_name": "Haddad", "email": "layla@example.com" },
        "items": [
            { "product_id": "sku-1", "quantity": 2, "unit_price": "45.00" },
            { "product_id": "sku-2", "quantity": 1, "unit_price": "10.00" }
        ],
        "tax": "5.00",
        "shipping": "10.00",
        "shipping_address": { "line1": "1 Main Road", "city": "Dubai", "country": "ae" }
    })
}

fn stored(order: NewOrder) -> Order {
    let mut stored = sample_order(order.id.as_str());
    stored.subtotal = order.subtotal;
    stored.tax = order.tax;
    stored.shipping = order.shipping;
    stored.total = order.total;
    stored.currency = order.currency;
    stored
}

fn register(cfg: &mut ServiceConfig, store: MockOrderStore, config: GatewayConfig) {
    let api = CheckoutApi::new(store, Arc::new(config));
    cfg.service(CheckoutRoute::<MockOrderStore>::new())
        .service(PaymentResultRoute::<MockOrderStore>::new())
        .app_data(web::Data::new(api));
}

fn configure_checkout(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_insert_order().times(1).returning(|order| Ok(stored(order)));
    store.expect_update_order().times(1).returning(|id, version, update, _| {
        let mut order = sample_order(id.as_str());
        order.gateway = update.gateway.unwrap_or_default();
        order.version = version + 1;
        Ok(order)
    });
    register(cfg, store, gateway_config());
}

fn configure_unconfigured_gateway(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_insert_order().times(1).returning(|order| Ok(stored(order)));
    store.expect_append_audit_note().times(1).returning(|_, _| Ok(()));
    let config = GatewayConfig { api_password: Secret::default(), ..gateway_config() };
    register(cfg, store, config);
}

fn configure_untouched(cfg: &mut ServiceConfig) {
    register(cfg, MockOrderStore::new(), gateway_config());
}

fn configure_result_pages(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|id| {
        if id.as_str() == "ord0001" {
            let mut order = sample_order("ord0001");
            order.status = OrderStatusType::Processing;
            order.payment_status = PaymentStatusType::Paid;
            Ok(Some(order))
        } else {
            Ok(None)
        }
    });
    register(cfg, store, gateway_config());
}

#[actix_web::test]
async fn checkout_returns_signed_redirect() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/checkout").set_json(checkout_body());
    let (status, body) = public_request(req, configure_checkout).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res: CheckoutResponse = serde_json::from_str(&body).unwrap();
    let url = Url::parse(&res.redirect_url).unwrap();
    assert_eq!(url.host_str(), Some("gateway.example"));
    let params = url.query_pairs().into_owned().collect::<Vec<_>>();
    assert_eq!(params.last().map(|(k, _)| k.as_str()), Some("ivp_signature"));
    let amount = params.iter().find(|(k, _)| k == "ivp_amount").map(|(_, v)| v.as_str());
    assert_eq!(amount, Some("115.00"));
}

#[actix_web::test]
async fn empty_cart_is_rejected_before_storage() {
    let _ = env_logger::try_init().ok();
    let mut body = checkout_body();
    body["items"] = json!([]);
    let req = TestRequest::post().uri("/checkout").set_json(body);
    let (status, body) = public_request(req, configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cart is empty"), "{body}");
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/checkout")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"items\": ");
    let (status, body) = public_request(req, configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("{\"error\":"), "{body}");
}

#[actix_web::test]
async fn missing_gateway_settings_are_named_but_not_echoed() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/checkout").set_json(checkout_body());
    let (status, body) = public_request(req, configure_unconfigured_gateway).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("HPP_GATEWAY_API_PASSWORD"), "{body}");
    assert!(!body.contains("k3y"), "{body}");
}

#[actix_web::test]
async fn result_page_reports_stored_status() {
    let _ = env_logger::try_init().ok();
    // The buyer landed on the "declined" page, but the callback already marked the order paid
    let req = TestRequest::get().uri("/payment/declined?order_id=ord0001");
    let (status, body) = public_request(req, configure_result_pages).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res: PaymentResultResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(res.outcome, ReturnOutcome::Declined);
    assert_eq!(res.payment_status, PaymentStatusType::Paid);
    assert_eq!(res.status, OrderStatusType::Processing);
}

#[actix_web::test]
async fn result_page_errors() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/payment/declined?order_id=nosuch");
    let (status, _) = public_request(req, configure_result_pages).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let req = TestRequest::get().uri("/payment/maybe?order_id=ord0001");
    let (status, _) = public_request(req, configure_result_pages).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::get().uri("/payment/success");
    let (status, _) = public_request(req, configure_result_pages).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
