//! #  Order store contracts.
//!
//! The payment APIs only ever talk to storage through [`OrderManagement`]. The SQLite backend in this crate is one
//! implementation; tests substitute mocks.
mod data_objects;
mod order_management;

pub use data_objects::OrderUpdate;
pub use order_management::{OrderManagement, OrderStoreError};
