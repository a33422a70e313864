//! Request handler definitions
//!
//! Define each route and its handler here. Handlers only translate between HTTP and the engine APIs; anything more
//! involved belongs in `hpp_engine`.
//!
//! Every handler is async, and every engine call is awaited. Nothing here may block the worker thread, since each
//! worker processes its requests sequentially.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use hpp_engine::{
    db_types::OrderId,
    order_objects::{CallbackPayload, CheckoutRequest, ModifyOrderRequest},
    AdminApi,
    CheckoutApi,
    OrderManagement,
    WebhookApi,
};
use log::*;
use url::form_urlencoded;

use crate::{
    auth::{JwtClaims, Role},
    data_objects::{CallbackResponse, CheckoutResponse, PaymentResultQuery, PaymentResultResponse, ReturnOutcome},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $bound:path) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $bound:path where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl OrderManagement);
/// Route handler for the checkout endpoint
///
/// The storefront posts the buyer's cart and contact details here. A pending order is created and the response
/// carries the order id and the signed URL of the hosted payment page, which the storefront redirects the buyer to.
///
/// If the gateway credentials are incomplete, the order is still created but the call fails with a 500 naming the
/// missing settings.
pub async fn checkout<B: OrderManagement>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST checkout with {} items", request.items.len());
    let result = api.create_checkout(request).await.map_err(|e| {
        warn!("💻️ Checkout failed. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(CheckoutResponse::from(result)))
}

//----------------------------------------------   Gateway callbacks  -------------------------------------------
route!(gateway_callback_post => Post "/callback" impl OrderManagement);
/// Payment notifications from the gateway, delivered as a form-encoded body. Any query string pairs are merged in too.
pub async fn gateway_callback_post<B: OrderManagement>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST gateway callback");
    handle_callback(&req, &body, api.as_ref()).await
}

route!(gateway_callback_get => Get "/callback" impl OrderManagement);
/// Some gateways deliver the notification as a GET. It is handled exactly like the POST.
pub async fn gateway_callback_get<B: OrderManagement>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET gateway callback");
    handle_callback(&req, &body, api.as_ref()).await
}

async fn handle_callback<B: OrderManagement>(
    req: &HttpRequest,
    body: &[u8],
    api: &WebhookApi<B>,
) -> Result<HttpResponse, ServerError> {
    let payload = callback_payload(body, req.query_string());
    let result = api.process_callback(payload).await.map_err(|e| {
        warn!("💻️ Gateway callback was rejected. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(CallbackResponse::from(result)))
}

/// Body pairs take precedence over query string pairs with the same key.
fn callback_payload(body: &[u8], query: &str) -> CallbackPayload {
    let mut payload = CallbackPayload::from_pairs(form_urlencoded::parse(body).into_owned());
    payload.merge_missing(form_urlencoded::parse(query.as_bytes()).into_owned());
    payload
}

//----------------------------------------------   Result pages  ------------------------------------------------
route!(payment_result => Get "/payment/{outcome}" impl OrderManagement);
/// Where the gateway sends the buyer afterwards. Purely informational: the order is only ever read, and the reported
/// status is whatever is stored, regardless of which page the buyer landed on.
pub async fn payment_result<B: OrderManagement>(
    path: web::Path<String>,
    query: web::Query<PaymentResultQuery>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let outcome = path.into_inner();
    let outcome = ReturnOutcome::from_path(&outcome).ok_or_else(|| {
        ServerError::InvalidRequestPath(format!("{outcome} is not a payment result. Use success, cancelled or declined"))
    })?;
    let order_id = OrderId::new(query.into_inner().order_id);
    debug!("💻️ GET payment result page {outcome:?} for {order_id}");
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(PaymentResultResponse::new(outcome, &order)))
}

//----------------------------------------------   Admin  -------------------------------------------------------
route!(get_order => Get "/orders/{id}" impl OrderManagement where requires [Role::Admin]);
/// Full order detail for support staff: the order, its items, a buyer summary and the audit log.
pub async fn get_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<AdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::new(path.into_inner());
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let detail = api.fetch_order_detail(&order_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(patch_order => Patch "/orders/{id}" impl OrderManagement where requires [Role::Admin]);
/// Partial admin update. Only the fields present in the body are changed. Cancelling a paid order refunds it unless
/// the body sets the payment status explicitly.
pub async fn patch_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<ModifyOrderRequest>,
    api: web::Data<AdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::new(path.into_inner());
    info!("💻️ PATCH order {order_id} by {}", claims.sub);
    let order = api.update_order(&order_id, body.into_inner(), &claims.sub).await.map_err(|e| {
        warn!("💻️ Admin update of {order_id} failed. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(order))
}
