//! Hosted Payment Page Engine
//!
//! This library contains the core logic for taking payments through a third-party hosted payment page. The buyer is
//! redirected to the gateway with a signed request, and the gateway reports the result back asynchronously through a
//! signed callback.
//!
//! The library is divided into two main sections:
//! 1. Order storage ([`mod@db`]). SQLite is the supported backend. The data types used in the database are defined in
//!    the `db_types` module and are public.
//! 2. The public API ([`mod@hpp_api`]): checkout, gateway callbacks and admin order management.
//!
//! The engine also emits events when an order is paid, annulled or modified by an admin. See [`mod@events`].
mod db;

pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
mod hpp_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{OrderManagement, OrderStoreError, OrderUpdate};
pub use hpp_api::{
    admin_api::AdminApi,
    checkout_api::CheckoutApi,
    errors::{AdminApiError, CheckoutError, WebhookError},
    order_objects,
    webhook_api::WebhookApi,
};
