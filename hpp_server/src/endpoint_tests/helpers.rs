use actix_web::{
    body::to_bytes,
    dev::ServiceResponse,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
    Error,
};
use chrono::{TimeZone, Utc};
use hpp_common::{Money, Secret};
use hpp_engine::{
    config::GatewayConfig,
    db_types::{Address, BuyerContact, GatewayMetadata, Order, OrderId, OrderStatusType, PaymentStatusType},
};
use log::debug;

use crate::{
    auth::{Role, TokenIssuer},
    config::AuthConfig,
    errors::ServerError,
    middleware::{JwtMiddlewareFactory, ACCESS_TOKEN_HEADER},
    server::{json_error_handler, query_error_handler},
};

// Only for issuing tokens in these tests. DO NOT re-use this secret anywhere.
const TEST_JWT_SECRET: &str = "endpoint-tests-secret-0123456789abcdef";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET).unwrap()
}

pub fn issue_token(sub: &str, roles: Vec<Role>) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(sub, roles, None).unwrap()
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        merchant_id: "12345".into(),
        api_key: Secret::new("k3y".into()),
        api_password: Secret::new("pa55".into()),
        gateway_url: "https://gateway.example/hpp".into(),
        public_base_url: "https://shop.example".into(),
        ..Default::default()
    }
}

/// Sends `req` to an app holding only the public routes registered by `configure`.
pub async fn public_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    response_parts(test::try_call_service(&service, req.to_request()).await).await
}

/// Sends `req` to the `/api` scope, behind the access token middleware. An empty `token` sends no token at all.
pub async fn admin_request(req: TestRequest, token: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = if token.is_empty() { req } else { req.insert_header((ACCESS_TOKEN_HEADER, token)) };
    let app = App::new()
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(web::scope("/api").wrap(JwtMiddlewareFactory::new(&get_auth_config())).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making admin request");
    response_parts(test::try_call_service(&service, req.to_request()).await).await
}

// Middleware rejections arrive as `Err`, handler errors as ordinary responses. Tests only care about what the
// client would see.
async fn response_parts(result: Result<ServiceResponse, Error>) -> (StatusCode, String) {
    let res = match result {
        Ok(res) => res.into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

pub fn error_body(err: ServerError) -> String {
    serde_json::json!({ "error": err.to_string() }).to_string()
}

pub fn sample_order(id: &str) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let address = Address {
        line1: "1 Main Road".into(),
        city: "Dubai".into(),
        country: "AE".into(),
        ..Default::default()
    };
    Order {
        id: OrderId::new(id),
        customer_id: Some("cust-1".into()),
        buyer: BuyerContact {
            first_name: "Layla".into(),
            last_name: "Haddad".into(),
            email: "layla@example.com".into(),
            phone: "+971500000000".into(),
        },
        subtotal: Money::from_minor(10_000),
        tax: Money::from_minor(500),
        shipping: Money::from_minor(1_000),
        total: Money::from_minor(11_500),
        currency: "AED".into(),
        status: OrderStatusType::Pending,
        payment_status: PaymentStatusType::Pending,
        payment_method: "telr".into(),
        shipping_address: address.clone(),
        billing_address: address,
        notes: None,
        gateway: GatewayMetadata::default(),
        version: 1,
        created_at,
        updated_at: created_at,
    }
}
