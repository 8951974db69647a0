use std::str::FromStr;

use rumshop_core::error::{Result, RumshopError};
use rumshop_core::model::order::{Order, OrderStatus};
use sqlx::Row;
use sqlx::any::AnyRow;

use crate::Store;

impl Store {
    pub async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            "SELECT id, product, status, amount, timestamp_epoch FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| RumshopError::Store(format!("query order failed: {e}")))?;

        row.as_ref().map(row_to_order).transpose()
    }

    pub async fn count_orders(&self, status: Option<OrderStatus>) -> Result<i64> {
        self.ensure_schema().await?;

        let query = match status {
            Some(status) => {
                sqlx::query_scalar::<sqlx::Any, i64>("SELECT COUNT(*) FROM orders WHERE status = $1")
                    .bind(status.as_str())
            }
            None => sqlx::query_scalar::<sqlx::Any, i64>("SELECT COUNT(*) FROM orders"),
        };
        query
            .fetch_one(self.pool())
            .await
            .map_err(|e| RumshopError::Store(format!("count orders failed: {e}")))
    }
}

fn row_to_order(row: &AnyRow) -> Result<Order> {
    let status: String = get(row, "status")?;
    Ok(Order {
        id: get(row, "id")?,
        product: get(row, "product")?,
        status: OrderStatus::from_str(&status)?,
        amount: get(row, "amount")?,
        created_at: get(row, "timestamp_epoch")?,
    })
}

fn get<'r, T>(row: &'r AnyRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Any> + sqlx::Type<sqlx::Any>,
{
    row.try_get(column)
        .map_err(|e| RumshopError::Store(format!("bad {column} column: {e}")))
}

#[cfg(test)]
mod tests {
    use rumshop_core::model::order::NewOrder;

    use crate::db::tests::sqlite_config;

    use super::*;

    #[tokio::test]
    async fn count_filters_by_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&sqlite_config(dir.path())).await.unwrap();
        for status in [OrderStatus::Paid, OrderStatus::Paid, OrderStatus::Failed] {
            store
                .insert_order(&NewOrder {
                    product: "Bola".to_string(),
                    status,
                    amount: 49.0,
                    created_at: 1.0,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.count_orders(None).await.unwrap(), 3);
        assert_eq!(store.count_orders(Some(OrderStatus::Paid)).await.unwrap(), 2);
        assert_eq!(store.count_orders(Some(OrderStatus::Failed)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_order_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&sqlite_config(dir.path())).await.unwrap();
        assert!(store.get_order(42).await.unwrap().is_none());
    }
}
