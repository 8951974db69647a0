use crate::db::Backend;

pub const POSTGRES_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
  id BIGSERIAL PRIMARY KEY,
  product TEXT NOT NULL,
  status TEXT NOT NULL,
  amount DOUBLE PRECISION NOT NULL,
  timestamp_epoch DOUBLE PRECISION NOT NULL
)
"#;

pub const SQLITE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  product TEXT NOT NULL,
  status TEXT NOT NULL,
  amount DOUBLE PRECISION NOT NULL,
  timestamp_epoch DOUBLE PRECISION NOT NULL
)
"#;

pub fn schema_sql(backend: Backend) -> &'static str {
    match backend {
        Backend::Postgres => POSTGRES_SCHEMA_SQL,
        Backend::Sqlite => SQLITE_SCHEMA_SQL,
    }
}
