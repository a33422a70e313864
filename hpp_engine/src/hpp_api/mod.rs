//! # Hosted payment page API
//!
//! The `hpp_api` module exposes the programmatic API of the engine. Each API wraps a backend that implements
//! [`crate::OrderManagement`], so the same flows run against SQLite in production and an in-memory store in tests.
//!
//! * [`checkout_api`] creates orders and builds the signed redirect to the hosted payment page.
//! * [`webhook_api`] verifies gateway callbacks and applies them to orders.
//! * [`admin_api`] lets privileged users read and edit orders.
//!
//! # API usage
//!
//! ```rust,ignore
//! use hpp_engine::{config::GatewayConfig, CheckoutApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = CheckoutApi::new(db, Arc::new(GatewayConfig::new_from_env_or_default()));
//! let result = api.create_checkout(request).await?;
//! // send the buyer to result.redirect_url
//! ```
pub mod admin_api;
pub mod checkout_api;
pub mod errors;
pub mod order_objects;
pub mod webhook_api;
