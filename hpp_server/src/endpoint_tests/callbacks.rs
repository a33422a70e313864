use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use hpp_engine::{
    db_types::{OrderId, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    helpers::{sign, MerchantReference, SIGNATURE_FIELD},
    WebhookApi,
};
use url::form_urlencoded;

use super::{
    helpers::{gateway_config, public_request, sample_order},
    mocks::MockOrderStore,
};
use crate::{
    data_objects::CallbackResponse,
    routes::{GatewayCallbackGetRoute, GatewayCallbackPostRoute},
};

fn reference(id: &str) -> String {
    MerchantReference::for_order(&gateway_config().reference_prefix, &OrderId::new(id), Utc::now()).encode()
}

fn signed_form(id: &str, status: &str) -> String {
    let mut pairs = vec![
        ("ivp_cart".to_string(), reference(id)),
        ("tran_ref".to_string(), "T-1001".to_string()),
        ("tran_status".to_string(), status.to_string()),
        ("tran_authcode".to_string(), "A1B2".to_string()),
        ("tran_authmessage".to_string(), "Authorised".to_string()),
    ];
    let signature = sign(pairs.iter().map(|(k, v)| (k, v)), &gateway_config().signature_secret()).unwrap();
    pairs.push((SIGNATURE_FIELD.to_string(), signature));
    form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish()
}

fn register(cfg: &mut ServiceConfig, store: MockOrderStore) {
    let api = WebhookApi::new(store, Arc::new(gateway_config()), EventProducers::default());
    cfg.service(
        web::scope("/gateway")
            .service(GatewayCallbackPostRoute::<MockOrderStore>::new())
            .service(GatewayCallbackGetRoute::<MockOrderStore>::new()),
    )
    .app_data(web::Data::new(api));
}

/// A store that must never be touched.
fn configure_untouched(cfg: &mut ServiceConfig) {
    register(cfg, MockOrderStore::new());
}

fn configure_unknown_order(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|_| Ok(None));
    register(cfg, store);
}

fn configure_pending_order(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(sample_order(id.as_str()))));
    store.expect_update_order().times(1).returning(|id, version, update, _audit| {
        let mut order = sample_order(id.as_str());
        order.status = update.status.unwrap_or(order.status);
        order.payment_status = update.payment_status.unwrap_or(order.payment_status);
        order.gateway = update.gateway.unwrap_or_default();
        order.version = version + 1;
        Ok(order)
    });
    register(cfg, store);
}

fn form_post(body: String) -> TestRequest {
    TestRequest::post()
        .uri("/gateway/callback")
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
        .set_payload(body)
}

#[actix_web::test]
async fn missing_fields_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_request(form_post("tran_status=A".into()), configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("ivp_cart"), "{body}");
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("ord0001", "A").replace("tran_status=A", "tran_status=C");
    let (status, body) = public_request(form_post(form), configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("signature"), "{body}");
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, _) = public_request(form_post(signed_form("nosuch", "A")), configure_unknown_order).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn authorised_callback_marks_order_paid() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_request(form_post(signed_form("ord0001", "A")), configure_pending_order).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let res: CallbackResponse = serde_json::from_str(&body).unwrap();
    assert!(res.applied);
    assert_eq!(res.order_id, OrderId::new("ord0001"));
    assert_eq!(res.status, OrderStatusType::Processing);
    assert_eq!(res.payment_status, PaymentStatusType::Paid);
}

#[actix_web::test]
async fn get_and_post_are_handled_identically() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("ord0001", "A");
    let (post_status, post_body) = public_request(form_post(form.clone()), configure_pending_order).await;
    let get = TestRequest::get().uri(&format!("/gateway/callback?{form}"));
    let (get_status, get_body) = public_request(get, configure_pending_order).await;
    assert_eq!(post_status, StatusCode::OK);
    assert_eq!(get_status, post_status);
    assert_eq!(get_body, post_body);
}

#[actix_web::test]
async fn query_string_fills_in_missing_body_fields() {
    let _ = env_logger::try_init().ok();
    let form = signed_form("ord0001", "A");
    let (body, query) = form.split_once("&tran_ref=").map(|(b, q)| (b.to_string(), format!("tran_ref={q}"))).unwrap();
    let req = form_post(body).uri(&format!("/gateway/callback?{query}"));
    let (status, _) = public_request(req, configure_pending_order).await;
    assert_eq!(status, StatusCode::OK);
}
