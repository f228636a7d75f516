//! 订单存储：create_order 工具的落库协作方

use async_trait::async_trait;
use rusqlite::params;
use tokio::sync::RwLock;

use crate::persistence::{Database, StoreError};
use crate::tools::Order;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// 保存订单，返回订单 id
    async fn save_order(&self, order: &Order) -> Result<i64, StoreError>;
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save_order(&self, order: &Order) -> Result<i64, StoreError> {
        let mut orders = self.orders.write().await;
        orders.push(order.clone());
        Ok(orders.len() as i64)
    }
}

#[derive(Clone)]
pub struct SqliteOrderStore {
    db: Database,
}

impl SqliteOrderStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        self.db
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?))
            .await
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn save_order(&self, order: &Order) -> Result<i64, StoreError> {
        let order = order.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO orders (drink, size, milk, syrup, sweetener, toppings, quantity, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        order.drink,
                        order.size,
                        order.milk,
                        order.syrup,
                        order.sweetener,
                        order.toppings,
                        order.quantity,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }
}
