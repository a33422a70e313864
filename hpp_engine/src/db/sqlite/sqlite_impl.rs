//! `SqliteDatabase` is a concrete implementation of the order store.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements [`OrderManagement`]. Multi-statement operations are
//! composed from the low-level functions in [`super::db`] inside a single transaction.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

use super::db::{audit, db_url, new_pool, orders};
use crate::{
    db::traits::{OrderManagement, OrderStoreError, OrderUpdate},
    db_types::{AuditEntry, NewAuditEntry, NewOrder, Order, OrderId, OrderItem},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] has been saved in the DB", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(id, &mut conn).await?;
        Ok(items)
    }

    async fn update_order(
        &self,
        id: &OrderId,
        expected_version: i64,
        update: OrderUpdate,
        audit: NewAuditEntry,
    ) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_order(id, expected_version, update, audit.created_at, &mut tx).await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let exists = orders::order_exists(id, &mut tx).await?;
                tx.rollback().await?;
                return if exists {
                    debug!("🗃️ Order [{id}] is no longer at version {expected_version}");
                    Err(OrderStoreError::VersionConflict { id: id.clone(), expected: expected_version })
                } else {
                    Err(OrderStoreError::OrderNotFound(id.clone()))
                };
            },
        };
        audit::append(id, audit, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order [{id}] updated to version {}", order.version);
        Ok(order)
    }

    async fn append_audit_note(&self, id: &OrderId, audit: NewAuditEntry) -> Result<(), OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::order_exists(id, &mut tx).await? {
            return Err(OrderStoreError::OrderNotFound(id.clone()));
        }
        audit::append(id, audit, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_audit_log(&self, id: &OrderId) -> Result<Vec<AuditEntry>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_for_order(id, &mut conn).await?;
        Ok(entries)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Creates the database file if it does not exist yet, then connects to it.
    pub async fn open_or_create(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        if !Sqlite::database_exists(url).await? {
            info!("🗃️ No database found at {url}. Creating a new one.");
            Sqlite::create_database(url).await?;
        }
        SqliteDatabase::new_with_url(url, max_connections).await
    }

    /// Brings the schema up to date. Migrations that have already been applied are skipped.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
