use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shopfloor_core::channel::{BrowseResponse, ErrorResponse, NamespacesResponse, ReadResponse};
use tower_http::trace::TraceLayer;

use crate::address_space::{AddressSpace, ChannelError};

/// Routes of the device access channel, served by every simulator.
pub fn router(space: AddressSpace) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/namespaces", get(namespaces))
        .route("/v1/objects/{ns}/{object}", get(browse))
        .route("/v1/objects/{ns}/{object}/{variable}", get(read))
        .layer(TraceLayer::new_for_http())
        .with_state(space)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn namespaces(
    State(space): State<AddressSpace>,
) -> Result<Json<NamespacesResponse>, AppError> {
    Ok(Json(NamespacesResponse {
        namespaces: space.namespaces()?,
    }))
}

async fn browse(
    State(space): State<AddressSpace>,
    Path((ns, object)): Path<(u16, String)>,
) -> Result<Json<BrowseResponse>, AppError> {
    let values = space.object_values(ns, &object)?;
    let variables = values.keys().cloned().collect();
    Ok(Json(BrowseResponse {
        object,
        variables,
        values: values.into_iter().collect(),
    }))
}

async fn read(
    State(space): State<AddressSpace>,
    Path((ns, object, variable)): Path<(u16, String, String)>,
) -> Result<Json<ReadResponse>, AppError> {
    let value = space.read(ns, &object, &variable)?;
    Ok(Json(ReadResponse { variable, value }))
}

struct AppError(ChannelError);

impl From<ChannelError> for AppError {
    fn from(err: ChannelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
