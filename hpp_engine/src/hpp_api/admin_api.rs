use std::{fmt::Debug, sync::Arc};

use hpp_common::Money;
use log::*;

use crate::{
    db::traits::{OrderManagement, OrderStoreError, OrderUpdate},
    db_types::{NewAuditEntry, Order, OrderId, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    helpers::{conflict_backoff, Clock, OrderLocks, SystemClock},
    hpp_api::{
        errors::AdminApiError,
        order_objects::{BuyerSummary, ModifyOrderRequest, OrderDetail},
    },
};

/// Retries after an optimistic-lock conflict before an admin edit is reported as a conflict.
pub const MAX_ADMIN_UPDATE_ATTEMPTS: usize = 5;

/// Privileged order management. Callers are expected to have been authenticated and authorised already; this API only
/// enforces the business rules of an admin edit.
pub struct AdminApi<B> {
    db: B,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
    locks: Arc<OrderLocks>,
}

impl<B> Debug for AdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminApi")
    }
}

impl<B> AdminApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, clock: Arc::new(SystemClock), producers, locks: Arc::new(OrderLocks::new()) }
    }

    /// Shares write serialisation with the webhook processor so admin edits queue behind in-flight callbacks.
    pub fn with_order_locks(mut self, locks: Arc<OrderLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<B> AdminApi<B>
where B: OrderManagement
{
    /// The order with its items, a buyer summary and the full audit trail.
    pub async fn fetch_order_detail(&self, id: &OrderId) -> Result<OrderDetail, AdminApiError> {
        let order = self.db.fetch_order(id).await?.ok_or_else(|| AdminApiError::OrderNotFound(id.clone()))?;
        let items = self.db.fetch_order_items(id).await?;
        let audit_log = self.db.fetch_audit_log(id).await?;
        let buyer = BuyerSummary::from(&order);
        Ok(OrderDetail { order, items, buyer, audit_log })
    }

    /// Applies an admin edit to the order.
    ///
    /// Enum values are validated before the order is read, so an invalid request never touches the store. Cancelling
    /// an order that has been paid without saying what should happen to the payment marks the payment as `refunded`.
    /// An explicit `payment_status` in the same request always wins.
    ///
    /// A request with no fields returns the current order unchanged.
    pub async fn update_order(
        &self,
        id: &OrderId,
        request: ModifyOrderRequest,
        actor: &str,
    ) -> Result<Order, AdminApiError> {
        let base = parse_request(request)?;
        if base.is_empty() {
            debug!("🛠️ Empty admin update for order [{id}]. Nothing to do.");
            return self.db.fetch_order(id).await?.ok_or_else(|| AdminApiError::OrderNotFound(id.clone()));
        }
        let _guard = self.locks.lock(id).await;
        for attempt in 1..=MAX_ADMIN_UPDATE_ATTEMPTS {
            let old_order = self.db.fetch_order(id).await?.ok_or_else(|| AdminApiError::OrderNotFound(id.clone()))?;
            let update = apply_cancellation_rule(&old_order, base.clone());
            let note = format!("Admin update by {actor}: {}", describe_update(&old_order, &update));
            let audit = NewAuditEntry::new(actor, note, self.clock.now());
            match self.db.update_order(id, old_order.version, update, audit).await {
                Ok(new_order) => {
                    info!("🛠️ Order [{id}] updated by {actor}");
                    self.producers.publish_order_modified(actor, &old_order, &new_order).await;
                    if new_order.status == OrderStatusType::Cancelled && old_order.status != OrderStatusType::Cancelled {
                        self.producers.publish_order_annulled(&new_order).await;
                    }
                    return Ok(new_order);
                },
                Err(OrderStoreError::VersionConflict { .. }) => {
                    debug!("🛠️ Order [{id}] changed during admin update (attempt {attempt}). Retrying.");
                    conflict_backoff(attempt).await;
                },
                Err(e) => return Err(e.into()),
            }
        }
        warn!("🛠️ Admin update of order [{id}] by {actor} lost {MAX_ADMIN_UPDATE_ATTEMPTS} races in a row");
        Err(AdminApiError::ConcurrencyConflict(id.clone()))
    }
}

fn parse_request(request: ModifyOrderRequest) -> Result<OrderUpdate, AdminApiError> {
    let status = request.status.as_deref().map(str::parse::<OrderStatusType>).transpose()?;
    let payment_status = request.payment_status.as_deref().map(str::parse::<PaymentStatusType>).transpose()?;
    let amounts = [
        ("subtotal", request.subtotal),
        ("tax", request.tax),
        ("shipping", request.shipping),
        ("total", request.total),
    ];
    if let Some((name, _)) = amounts.iter().find(|(_, v)| v.is_some_and(|m: Money| m.is_negative())) {
        return Err(AdminApiError::ValidationError(format!("{name} cannot be negative")));
    }
    Ok(OrderUpdate {
        status,
        payment_status,
        payment_method: request.payment_method,
        shipping_address: request.shipping_address,
        billing_address: request.billing_address,
        notes: request.notes,
        subtotal: request.subtotal,
        tax: request.tax,
        shipping: request.shipping,
        total: request.total,
        gateway: None,
    })
}

/// Cancelling a paid order implies the money goes back, unless the admin said otherwise.
fn apply_cancellation_rule(order: &Order, mut update: OrderUpdate) -> OrderUpdate {
    if update.status == Some(OrderStatusType::Cancelled) &&
        update.payment_status.is_none() &&
        order.payment_status == PaymentStatusType::Paid
    {
        update.payment_status = Some(PaymentStatusType::Refunded);
    }
    update
}

fn describe_update(order: &Order, update: &OrderUpdate) -> String {
    let mut parts = Vec::new();
    if let Some(s) = update.status {
        parts.push(format!("status {} -> {s}", order.status));
    }
    if let Some(p) = update.payment_status {
        parts.push(format!("payment_status {} -> {p}", order.payment_status));
    }
    for field in update.changed_fields() {
        if field != "status" && field != "payment_status" {
            parts.push(field.to_string());
        }
    }
    parts.join(", ")
}
