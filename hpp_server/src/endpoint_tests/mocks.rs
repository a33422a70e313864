use hpp_engine::{
    db_types::{AuditEntry, NewAuditEntry, NewOrder, Order, OrderId, OrderItem},
    OrderManagement,
    OrderStoreError,
    OrderUpdate,
};
use mockall::mock;

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError>;
        async fn update_order(
            &self,
            id: &OrderId,
            expected_version: i64,
            update: OrderUpdate,
            audit: NewAuditEntry,
        ) -> Result<Order, OrderStoreError>;
        async fn append_audit_note(&self, id: &OrderId, audit: NewAuditEntry) -> Result<(), OrderStoreError>;
        async fn fetch_audit_log(&self, id: &OrderId) -> Result<Vec<AuditEntry>, OrderStoreError>;
    }
}
