pub mod app;
pub mod error;
pub mod handlers;
pub mod page;
pub mod telemetry;

pub use app::{AppState, router};
pub use error::AppError;
