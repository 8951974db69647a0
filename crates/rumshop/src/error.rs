use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rumshop_core::RumshopError;
use serde_json::json;
use thiserror::Error;

/// Failure of one request. Every variant renders as
/// `{"status":"erro","msg":...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("falha ao gravar pedido: {0}")]
    Persistence(#[from] RumshopError),
    #[error("erro simulado pelo usuario")]
    Simulated,
    #[error("requisicao invalida: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Persistence(_) | AppError::Simulated => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "status": "erro", "msg": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
