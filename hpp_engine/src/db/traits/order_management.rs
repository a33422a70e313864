use thiserror::Error;

use crate::{
    db::traits::OrderUpdate,
    db_types::{AuditEntry, NewAuditEntry, NewOrder, Order, OrderId, OrderItem},
};

/// The persistence contract for the order aggregate.
///
/// Orders are created once, read by id, and changed only through [`OrderManagement::update_order`], which applies an
/// optimistic version check. Every update carries an audit note that is written in the same transaction.
/// Orders are never deleted.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order and its items in a single atomic transaction. The order starts as `pending`/`pending` at
    /// version 1.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// The order's line items, in the order they were placed.
    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError>;

    /// Applies `update` if, and only if, the stored version still equals `expected_version`. The version is
    /// incremented and `audit` is appended atomically with the change.
    ///
    /// Fails with [`OrderStoreError::VersionConflict`] if another writer got there first, in which case the caller
    /// should re-read the order and try again.
    async fn update_order(
        &self,
        id: &OrderId,
        expected_version: i64,
        update: OrderUpdate,
        audit: NewAuditEntry,
    ) -> Result<Order, OrderStoreError>;

    /// Appends a note to the order's audit log without touching the order itself.
    async fn append_audit_note(&self, id: &OrderId, audit: NewAuditEntry) -> Result<(), OrderStoreError>;

    /// The audit log for the order, oldest first.
    async fn fetch_audit_log(&self, id: &OrderId) -> Result<Vec<AuditEntry>, OrderStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: OrderId, expected: i64 },
    #[error("The requested order change would result in a no-op.")]
    EmptyUpdate,
    #[error("Stored order data could not be decoded. {0}")]
    DecodeError(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::DecodeError(e.to_string()),
            _ => Self::DatabaseError(e.to_string()),
        }
    }
}
