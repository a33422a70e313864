use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// The gateway confirmed payment for the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The order was cancelled, either by the gateway or by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

/// An admin changed the order outside the gateway flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModifiedEvent {
    pub actor: String,
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderModifiedEvent {
    pub fn new<S: Into<String>>(actor: S, old_order: Order, new_order: Order) -> Self {
        Self { actor: actor.into(), old_order, new_order }
    }
}
