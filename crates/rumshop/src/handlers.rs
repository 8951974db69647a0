use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use bytes::Bytes;
use chrono::Utc;
use rumshop_core::model::order::{NewOrder, OrderStatus};
use rumshop_core::model::span::{SpanKind, SpanStatus};
use rumshop_core::time::epoch_seconds;
use rumshop_telemetry::Span;
use rumshop_telemetry::propagation::{TRACEPARENT_HEADER, parse_traceparent};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::AppError;

pub const DEFAULT_PRODUCT: &str = "Tenis Esportivo";
pub const DEFAULT_AMOUNT: f64 = 199.90;

/// Body of `POST /checkout`. Both fields are optional; an empty body buys
/// the default product.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    pub product: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub status: &'static str,
    pub id: i64,
}

pub async fn index(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.page.clone())
}

pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, AppError> {
    let mut span = server_span(&state, &headers, "POST /checkout", "/checkout");
    let result = place_order(&state, &mut span, &body).await;
    finish(&state, span, result)
}

/// Records a FAILED order when the database allows it, then fails the
/// request regardless.
pub async fn simulate_error(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CheckoutResponse>, AppError> {
    let mut span = server_span(&state, &headers, "POST /simular_erro", "/simular_erro");
    let order = NewOrder {
        product: DEFAULT_PRODUCT.to_string(),
        status: OrderStatus::Failed,
        amount: DEFAULT_AMOUNT,
        created_at: epoch_seconds(Utc::now()),
    };
    span.set_attribute("order.status", order.status.as_str());
    match state.store.insert_order(&order).await {
        Ok(id) => {
            span.set_attribute("order.failed_id", id);
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not record failed order");
        }
    }
    finish(&state, span, Err(AppError::Simulated))
}

fn server_span(state: &AppState, headers: &HeaderMap, name: &str, route: &str) -> Span {
    let parent = headers
        .get(TRACEPARENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_traceparent);
    state
        .tracer
        .span_builder(name)
        .with_optional_parent(parent)
        .with_kind(SpanKind::Server)
        .with_attribute("http.request.method", "POST")
        .with_attribute("http.route", route)
        .start()
}

async fn place_order(state: &AppState, span: &mut Span, body: &[u8]) -> Result<i64, AppError> {
    let order = parse_checkout(body)?;
    span.set_attribute("order.product", order.product.as_str());
    span.set_attribute("order.amount", order.amount);
    Ok(state.store.insert_order(&order).await?)
}

fn parse_checkout(body: &[u8]) -> Result<NewOrder, AppError> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice::<CheckoutRequest>(body)
            .map_err(|e| AppError::BadRequest(format!("corpo JSON invalido: {e}")))?
    };

    let product = req.product.unwrap_or_else(|| DEFAULT_PRODUCT.to_string());
    if product.trim().is_empty() {
        return Err(AppError::BadRequest("produto vazio".to_string()));
    }
    let amount = req.amount.unwrap_or(DEFAULT_AMOUNT);
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::BadRequest(format!("valor invalido: {amount}")));
    }

    Ok(NewOrder {
        product,
        status: OrderStatus::Paid,
        amount,
        created_at: epoch_seconds(Utc::now()),
    })
}

/// Closes the request span and emits the correlated log for the outcome.
fn finish(
    state: &AppState,
    mut span: Span,
    result: Result<i64, AppError>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let ctx = span.context();
    match result {
        Ok(id) => {
            span.set_attribute("order.id", id);
            span.set_attribute("http.response.status_code", 200i64);
            let _ = span.set_status(SpanStatus::Ok);
            state
                .logger
                .info(format!("Pedido {id} pago com sucesso"), Some(ctx));
            span.end();
            tracing::info!(order_id = id, trace_id = %ctx.trace_id, "checkout committed");
            Ok(Json(CheckoutResponse {
                status: "sucesso",
                id,
            }))
        }
        Err(err) => {
            span.record_error(&err);
            span.set_attribute(
                "http.response.status_code",
                i64::from(err.status_code().as_u16()),
            );
            let _ = span.set_status(SpanStatus::error(err.to_string()));
            state
                .logger
                .error(format!("Falha no pedido: {err}"), Some(ctx));
            span.end();
            tracing::warn!(error = %err, trace_id = %ctx.trace_id, "request failed");
            Err(err)
        }
    }
}
