use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db::traits::{OrderStoreError, OrderUpdate},
    db_types::{Address, BuyerContact, GatewayMetadata, NewOrder, Order, OrderId, OrderItem},
};

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        fn decode_err<E: std::error::Error + Send + Sync + 'static>(column: &str, e: E) -> sqlx::Error {
            sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) }
        }
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;
        let buyer: Json<BuyerContact> = row.try_get("buyer")?;
        let shipping_address: Json<Address> = row.try_get("shipping_address")?;
        let billing_address: Json<Address> = row.try_get("billing_address")?;
        let gateway: Json<GatewayMetadata> = row.try_get("gateway")?;
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            buyer: buyer.0,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            shipping: row.try_get("shipping")?,
            total: row.try_get("total")?,
            currency: row.try_get("currency")?,
            status: status.parse().map_err(|e| decode_err("status", e))?,
            payment_status: payment_status.parse().map_err(|e| decode_err("payment_status", e))?,
            payment_method: row.try_get("payment_method")?,
            shipping_address: shipping_address.0,
            billing_address: billing_address.0,
            notes: row.try_get("notes")?,
            gateway: gateway.0,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// The order always starts out as `pending`/`pending`, whatever the caller had in mind.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    if order_exists(&order.id, conn).await? {
        return Err(OrderStoreError::OrderAlreadyExists(order.id));
    }
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                customer_id,
                buyer,
                subtotal,
                tax,
                shipping,
                total,
                currency,
                status,
                payment_status,
                payment_method,
                shipping_address,
                billing_address,
                gateway,
                version,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 'pending', $9, $10, $11, $12, 1, $13, $13)
            RETURNING *;
        "#,
    )
    .bind(order.id.as_str())
    .bind(order.customer_id)
    .bind(Json(&order.buyer))
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.shipping)
    .bind(order.total)
    .bind(order.currency)
    .bind(order.payment_method)
    .bind(Json(&order.shipping_address))
    .bind(Json(&order.billing_address))
    .bind(Json(GatewayMetadata::default()))
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for (position, item) in order.items.iter().enumerate() {
        insert_item(&inserted.id, position as i64, item, conn).await?;
    }
    debug!("📝️ Order [{}] inserted with {} items", inserted.id, order.items.len());
    Ok(inserted)
}

async fn insert_item(
    order_id: &OrderId,
    position: i64,
    item: &OrderItem,
    conn: &mut SqliteConnection,
) -> Result<(), OrderStoreError> {
    sqlx::query(
        "INSERT INTO order_items (order_id, position, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id.as_str())
    .bind(position)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_order_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn order_exists(id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE id = $1").bind(id.as_str()).fetch_one(conn).await?;
    Ok(count > 0)
}

pub async fn fetch_order_items(id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT product_id, quantity, unit_price FROM order_items WHERE order_id = $1 ORDER BY position ASC",
    )
    .bind(id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Applies the non-empty fields of `update` to the order, provided its version still equals `expected_version`.
///
/// Returns `None` if no row matched, i.e. the order does not exist or someone else has updated it in the meantime.
/// The caller decides which by checking [`order_exists`].
pub(crate) async fn update_order(
    id: &OrderId,
    expected_version: i64,
    update: OrderUpdate,
    updated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    if update.is_empty() {
        debug!("📝️ No fields to update for order {id}. Update request skipped.");
        return Err(OrderStoreError::EmptyUpdate);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET version = version + 1, updated_at = ");
    builder.push_bind(updated_at);
    builder.push(", ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(payment_status) = update.payment_status {
        set_clause.push("payment_status = ");
        set_clause.push_bind_unseparated(payment_status.to_string());
    }
    if let Some(payment_method) = update.payment_method {
        set_clause.push("payment_method = ");
        set_clause.push_bind_unseparated(payment_method);
    }
    if let Some(address) = update.shipping_address {
        set_clause.push("shipping_address = ");
        set_clause.push_bind_unseparated(Json(address));
    }
    if let Some(address) = update.billing_address {
        set_clause.push("billing_address = ");
        set_clause.push_bind_unseparated(Json(address));
    }
    if let Some(notes) = update.notes {
        set_clause.push("notes = ");
        set_clause.push_bind_unseparated(notes);
    }
    if let Some(subtotal) = update.subtotal {
        set_clause.push("subtotal = ");
        set_clause.push_bind_unseparated(subtotal);
    }
    if let Some(tax) = update.tax {
        set_clause.push("tax = ");
        set_clause.push_bind_unseparated(tax);
    }
    if let Some(shipping) = update.shipping {
        set_clause.push("shipping = ");
        set_clause.push_bind_unseparated(shipping);
    }
    if let Some(total) = update.total {
        set_clause.push("total = ");
        set_clause.push_bind_unseparated(total);
    }
    if let Some(gateway) = update.gateway {
        set_clause.push("gateway = ");
        set_clause.push_bind_unseparated(Json(gateway));
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str());
    builder.push(" AND version = ");
    builder.push_bind(expected_version);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    trace!("📝️ Result of update_order: {res:?}");
    Ok(res)
}
