use std::sync::Arc;

use rumshop_core::config::DatabaseConfig;
use rumshop_core::error::{Result, RumshopError};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tokio::sync::OnceCell;

use crate::schema::schema_sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(RumshopError::Config(format!(
                "unsupported database url scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }
}

/// Pooled handle to the orders database. Cloning shares the pool.
#[derive(Clone)]
pub struct Store {
    pool: AnyPool,
    backend: Backend,
    schema_ready: Arc<OnceCell<()>>,
}

impl Store {
    /// Builds the pool without touching the database, so the process can
    /// start (and answer 500s) while the database is down.
    pub fn connect_lazy(cfg: &DatabaseConfig) -> Result<Self> {
        let url = cfg.connection_url()?;
        let backend = Backend::from_url(&url)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(cfg.pool_max)
            .test_before_acquire(true)
            .max_lifetime(cfg.pool_recycle)
            .acquire_timeout(cfg.acquire_timeout)
            .connect_lazy(&url)
            .map_err(|e| RumshopError::Store(format!("invalid database url: {e}")))?;

        Ok(Self {
            pool,
            backend,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let store = Self::connect_lazy(cfg)?;
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the orders table once per process. A failed attempt leaves the
    /// cell empty so the next write tries again.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(schema_sql(self.backend))
                    .execute(&self.pool)
                    .await
                    .map_err(|e| RumshopError::Store(format!("failed to initialize schema: {e}")))?;
                tracing::debug!(backend = ?self.backend, "orders schema ready");
                Ok::<(), RumshopError>(())
            })
            .await?;
        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
