use std::sync::Arc;

use cucumber::World;
use hpp_common::Secret;
use hpp_engine::{
    config::GatewayConfig,
    db_types::OrderId,
    events::EventProducers,
    order_objects::CallbackOutcome,
    AdminApi,
    CheckoutApi,
    SqliteDatabase,
    WebhookApi,
};
use log::*;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

#[derive(Default, Debug, World)]
pub struct PaymentWorld {
    pub system: Option<PaymentSystem>,
    pub order_id: Option<OrderId>,
    pub redirect_url: Option<String>,
    pub callback_outcome: Option<CallbackOutcome>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct PaymentSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub config: Arc<GatewayConfig>,
    pub checkout: CheckoutApi<SqliteDatabase>,
    pub webhook: WebhookApi<SqliteDatabase>,
    pub admin: AdminApi<SqliteDatabase>,
}

impl PaymentWorld {
    pub fn system(&self) -> &PaymentSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn order_id(&self) -> &OrderId {
        self.order_id.as_ref().expect("No order has been placed")
    }
}

impl PaymentSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let config = Arc::new(GatewayConfig {
            merchant_id: "10001".into(),
            api_key: Secret::new("cucumber-key".into()),
            api_password: Secret::new("cucumber-password".into()),
            public_base_url: "https://shop.example".into(),
            ..Default::default()
        });
        let checkout = CheckoutApi::new(db.clone(), Arc::clone(&config));
        let webhook = WebhookApi::new(db.clone(), Arc::clone(&config), EventProducers::default());
        let admin = AdminApi::new(db.clone(), EventProducers::default());
        Self { db_path: url, db, config, checkout, webhook, admin }
    }
}
