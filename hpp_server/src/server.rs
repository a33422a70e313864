use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, Service},
    error::{JsonPayloadError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    Error,
    HttpRequest,
    HttpServer,
};
use futures::{
    future::{ok, Either},
    FutureExt,
};
use hpp_engine::{
    events::{EventHandlers, EventHooks, EventProducers, OrderAnnulledEvent, OrderModifiedEvent, OrderPaidEvent},
    helpers::OrderLocks,
    AdminApi,
    CheckoutApi,
    SqliteDatabase,
    WebhookApi,
};
use log::*;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::{AuthError, ServerError, ServerError::AuthenticationError},
    helpers::get_remote_ip,
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        CheckoutRoute,
        GatewayCallbackGetRoute,
        GatewayCallbackPostRoute,
        GetOrderRoute,
        PatchOrderRoute,
        PaymentResultRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;
const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::open_or_create(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    info!("🗃️ Database at {} is ready", db.url());
    let missing = config.gateway.missing_settings();
    if !missing.is_empty() {
        warn!(
            "🪛️ The payment gateway is not fully configured (missing: {}). Checkouts will fail and callbacks will be \
             rejected until it is.",
            missing.join(", ")
        );
    }
    let handlers = create_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Hooks that record order lifecycle events in the log. Integrations that need to react to payments (fulfilment,
/// notifications) subscribe here.
pub fn create_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev: OrderPaidEvent| {
            async move {
                info!("📬️ Order {} has been paid ({} {})", ev.order.id, ev.order.total, ev.order.currency);
            }
            .boxed()
        })
        .on_order_annulled(|ev: OrderAnnulledEvent| {
            async move {
                info!("📬️ Order {} has been annulled. Status: {}", ev.order.id, ev.status);
            }
            .boxed()
        })
        .on_order_modified(|ev: OrderModifiedEvent| {
            async move {
                info!(
                    "📬️ Order {} was modified by {}. Status: {} -> {}. Payment: {} -> {}",
                    ev.new_order.id,
                    ev.actor,
                    ev.old_order.status,
                    ev.new_order.status,
                    ev.old_order.payment_status,
                    ev.new_order.payment_status
                );
            }
            .boxed()
        });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let gateway_config = Arc::new(config.gateway.clone());
    let options = ServerOptions::from_config(&config);
    // One set of locks for all workers, so writes to an order are serialised across the whole process
    let order_locks = Arc::new(OrderLocks::new());
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), Arc::clone(&gateway_config));
        let webhook_api = WebhookApi::new(db.clone(), Arc::clone(&gateway_config), producers.clone())
            .with_order_locks(Arc::clone(&order_locks));
        let admin_api = AdminApi::new(db.clone(), producers.clone()).with_order_locks(Arc::clone(&order_locks));
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("hpp::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(admin_api))
            .app_data(web::Data::new(options))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler));
        // Routes that require an admin access token
        let admin_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(&config.auth))
            .service(GetOrderRoute::<SqliteDatabase>::new())
            .service(PatchOrderRoute::<SqliteDatabase>::new());
        let whitelist = config.gateway_whitelist.clone();
        let gateway_scope = web::scope("/gateway")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
                let allowed = match (peer_ip, &whitelist) {
                    (_, None) => true,
                    (Some(ip), Some(whitelist)) => {
                        trace!("🪝️ Gateway callback from {ip}");
                        whitelist.contains(&ip)
                    },
                    (None, Some(_)) => {
                        warn!("🪝️ No IP address found in gateway callback request, denying access.");
                        false
                    },
                };
                if allowed {
                    Either::Left(srv.call(req))
                } else {
                    warn!("🪝️ Gateway callback from {peer_ip:?} is not on the whitelist. Denying access.");
                    Either::Right(ok(req.error_response(AuthenticationError(AuthError::ForbiddenPeer))))
                }
            })
            .service(GatewayCallbackPostRoute::<SqliteDatabase>::new())
            .service(GatewayCallbackGetRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(PaymentResultRoute::<SqliteDatabase>::new())
            .service(gateway_scope)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    ServerError::InvalidRequestBody(err.to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    ServerError::InvalidRequestBody(err.to_string()).into()
}
