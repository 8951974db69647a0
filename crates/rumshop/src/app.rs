use axum::Router;
use axum::routing::{get, post};
use bytes::Bytes;
use rumshop_store::Store;
use rumshop_telemetry::{Logger, Telemetry, Tracer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::handlers;

/// Instrumentation scope of the request handlers.
pub const HTTP_SCOPE: &str = "rumshop.http";

/// Everything a handler needs. Built once in `main` and shared by clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tracer: Tracer,
    pub logger: Logger,
    pub page: Bytes,
}

impl AppState {
    pub fn new(store: Store, telemetry: &Telemetry, page_html: String) -> Self {
        Self {
            store,
            tracer: telemetry.tracer(HTTP_SCOPE),
            logger: telemetry.logger(HTTP_SCOPE),
            page: Bytes::from(page_html),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/checkout", post(handlers::checkout))
        .route("/simular_erro", post(handlers::simulate_error))
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
