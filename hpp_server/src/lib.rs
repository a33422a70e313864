//! # HPP server
//! This crate hosts the HTTP server for the hosted payment page gateway. It is responsible for:
//! * Accepting checkouts from the storefront and answering with a signed redirect to the hosted payment page.
//! * Receiving the gateway's payment notifications (`/gateway/callback`) and passing them to the engine.
//! * Serving the buyer-facing result pages the gateway redirects back to.
//! * Letting administrators inspect and correct orders under `/api`.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /checkout`: Create an order and get the payment redirect URL.
//! * `POST|GET /gateway/callback`: Gateway payment notifications.
//! * `GET /payment/{outcome}?order_id=`: Result pages.
//! * `GET|PATCH /api/orders/{id}`: Admin order detail and overrides. Requires an admin JWT.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
