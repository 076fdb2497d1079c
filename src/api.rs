//! HTTP API
//!
//! - `GET /` reports that the service is online
//! - `GET /api/v1/gas_prices/:station_id[?fuel=<kind>]` resolves a station
//!
//! Upstream refusals are part of the record (`status`), so a resolved station
//! is always answered with 200. Only invalid input and local failures map to
//! error statuses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::data::PriceView;
use crate::resolver::{ResolveError, Resolver};

/// Query parameters of the price route
#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// Narrow the answer to one fuel kind
    pub fuel: Option<String>,
}

/// Builds the API router
pub fn router(resolver: Arc<Resolver>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/gas_prices/:station_id", get(gas_prices))
        .with_state(resolver)
}

/// Serves the API until the process is stopped
pub async fn serve(address: &str, resolver: Arc<Resolver>) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    tracing::info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(resolver)).await
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "Status": "Online" }))
}

async fn gas_prices(
    State(resolver): State<Arc<Resolver>>,
    Path(station_id): Path<String>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceView>, ApiError> {
    let view = resolver
        .resolve(&station_id, query.fuel.as_deref())
        .await?;
    Ok(Json(view))
}

/// A resolution error rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(ResolveError);

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            ResolveError::InvalidStationId(_) | ResolveError::InvalidFuelKind(_) => {
                StatusCode::BAD_REQUEST
            }
            ResolveError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ResolveError::CacheWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
