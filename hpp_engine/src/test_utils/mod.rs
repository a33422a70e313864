//! Test helpers: a pinned clock, predictable order ids and an in-memory order store.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    db::traits::{OrderManagement, OrderStoreError, OrderUpdate},
    db_types::{AuditEntry, NewAuditEntry, NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentStatusType},
    helpers::{Clock, IdGenerator},
};

/// A clock that always reads the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid timestamp"))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Hands out `ord0001`, `ord0002`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> OrderId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        OrderId::new(format!("ord{n:04}"))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    audit: Vec<AuditEntry>,
}

/// An order store that lives in memory. Clones share the same state, mirroring how clones of a connection pool behave.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn order_count(&self) -> usize {
        self.state.lock().expect("poisoned lock").orders.len()
    }
}

impl OrderManagement for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut state = self.state.lock().expect("poisoned lock");
        if state.orders.contains_key(&order.id) {
            return Err(OrderStoreError::OrderAlreadyExists(order.id));
        }
        let stored = Order {
            id: order.id.clone(),
            customer_id: order.customer_id,
            buyer: order.buyer,
            subtotal: order.subtotal,
            tax: order.tax,
            shipping: order.shipping,
            total: order.total,
            currency: order.currency,
            status: OrderStatusType::Pending,
            payment_status: PaymentStatusType::Pending,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            notes: None,
            gateway: Default::default(),
            version: 1,
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        state.items.insert(order.id.clone(), order.items);
        state.orders.insert(order.id, stored.clone());
        Ok(stored)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        Ok(self.state.lock().expect("poisoned lock").orders.get(id).cloned())
    }

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError> {
        Ok(self.state.lock().expect("poisoned lock").items.get(id).cloned().unwrap_or_default())
    }

    async fn update_order(
        &self,
        id: &OrderId,
        expected_version: i64,
        update: OrderUpdate,
        audit: NewAuditEntry,
    ) -> Result<Order, OrderStoreError> {
        if update.is_empty() {
            return Err(OrderStoreError::EmptyUpdate);
        }
        let mut state = self.state.lock().expect("poisoned lock");
        let order = state.orders.get_mut(id).ok_or_else(|| OrderStoreError::OrderNotFound(id.clone()))?;
        if order.version != expected_version {
            return Err(OrderStoreError::VersionConflict { id: id.clone(), expected: expected_version });
        }
        let OrderUpdate {
            status,
            payment_status,
            payment_method,
            shipping_address,
            billing_address,
            notes,
            subtotal,
            tax,
            shipping,
            total,
            gateway,
        } = update;
        order.status = status.unwrap_or(order.status);
        order.payment_status = payment_status.unwrap_or(order.payment_status);
        if let Some(v) = payment_method {
            order.payment_method = v;
        }
        if let Some(v) = shipping_address {
            order.shipping_address = v;
        }
        if let Some(v) = billing_address {
            order.billing_address = v;
        }
        if notes.is_some() {
            order.notes = notes;
        }
        order.subtotal = subtotal.unwrap_or(order.subtotal);
        order.tax = tax.unwrap_or(order.tax);
        order.shipping = shipping.unwrap_or(order.shipping);
        order.total = total.unwrap_or(order.total);
        if let Some(v) = gateway {
            order.gateway = v;
        }
        order.version += 1;
        order.updated_at = audit.created_at;
        let result = order.clone();
        state.audit.push(AuditEntry {
            order_id: id.clone(),
            created_at: audit.created_at,
            actor: audit.actor,
            note: audit.note,
        });
        Ok(result)
    }

    async fn append_audit_note(&self, id: &OrderId, audit: NewAuditEntry) -> Result<(), OrderStoreError> {
        let mut state = self.state.lock().expect("poisoned lock");
        if !state.orders.contains_key(id) {
            return Err(OrderStoreError::OrderNotFound(id.clone()));
        }
        state.audit.push(AuditEntry {
            order_id: id.clone(),
            created_at: audit.created_at,
            actor: audit.actor,
            note: audit.note,
        });
        Ok(())
    }

    async fn fetch_audit_log(&self, id: &OrderId) -> Result<Vec<AuditEntry>, OrderStoreError> {
        let state = self.state.lock().expect("poisoned lock");
        Ok(state.audit.iter().filter(|e| &e.order_id == id).cloned().collect())
    }
}
