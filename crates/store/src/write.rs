use rumshop_core::error::{Result, RumshopError};
use rumshop_core::model::order::NewOrder;

use crate::Store;

impl Store {
    /// Inserts one order and returns its generated id. The insert runs in its
    /// own transaction, which rolls back when dropped uncommitted.
    pub async fn insert_order(&self, order: &NewOrder) -> Result<i64> {
        self.ensure_schema().await?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| RumshopError::Store(format!("begin tx failed: {e}")))?;

        let id = sqlx::query_scalar::<sqlx::Any, i64>(
            "INSERT INTO orders (product, status, amount, timestamp_epoch)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(order.product.as_str())
        .bind(order.status.as_str())
        .bind(order.amount)
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RumshopError::Store(format!("insert order failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RumshopError::Store(format!("commit order failed: {e}")))?;

        tracing::debug!(order_id = id, status = %order.status, "order persisted");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rumshop_core::config::DatabaseConfig;
    use rumshop_core::model::order::OrderStatus;

    use crate::db::tests::{sqlite_config, unreachable_config};
    use crate::Store;

    use super::*;

    fn order(status: OrderStatus) -> NewOrder {
        NewOrder {
            product: "Tenis de corrida".to_string(),
            status,
            amount: 199.9,
            created_at: 1_770_000_000.25,
        }
    }

    #[tokio::test]
    async fn insert_returns_increasing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&sqlite_config(dir.path())).await.unwrap();

        let first = store.insert_order(&order(OrderStatus::Paid)).await.unwrap();
        let second = store.insert_order(&order(OrderStatus::Failed)).await.unwrap();
        assert!(second > first);

        let saved = store.get_order(first).await.unwrap().unwrap();
        assert_eq!(saved.id, first);
        assert_eq!(saved.product, "Tenis de corrida");
        assert_eq!(saved.status, OrderStatus::Paid);
        assert_eq!(saved.amount, 199.9);
        assert_eq!(saved.created_at, 1_770_000_000.25);
    }

    #[tokio::test]
    async fn insert_creates_schema_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect_lazy(&sqlite_config(dir.path())).unwrap();
        let id = store.insert_order(&order(OrderStatus::Paid)).await.unwrap();
        assert_eq!(store.count_orders(Some(OrderStatus::Paid)).await.unwrap(), 1);
        assert!(store.get_order(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn insert_retries_schema_once_database_is_available() {
        let dir = tempfile::tempdir().unwrap();
        let later = dir.path().join("later");
        let cfg = DatabaseConfig {
            acquire_timeout: Duration::from_millis(500),
            ..sqlite_config(&later)
        };
        let store = Store::connect_lazy(&cfg).unwrap();

        // The parent directory is missing, so SQLite cannot open the file.
        let err = store.insert_order(&order(OrderStatus::Paid)).await.unwrap_err();
        assert!(matches!(err, RumshopError::Store(_)));
        assert!(store.ensure_schema().await.is_err());

        std::fs::create_dir(&later).unwrap();
        let id = store.insert_order(&order(OrderStatus::Paid)).await.unwrap();
        assert!(store.get_order(id).await.unwrap().is_some());
        assert_eq!(store.count_orders(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_fails_when_database_is_unreachable() {
        let store = Store::connect_lazy(&unreachable_config()).unwrap();
        let err = store.insert_order(&order(OrderStatus::Paid)).await.unwrap_err();
        assert!(matches!(err, RumshopError::Store(_)));
    }
}
