//! Resource endpoints
//!
//! - GET /{resource} - List all rows
//! - GET /{resource}/{id} - Fetch by identifier
//! - POST /{resource} - Insert a row
//! - PUT /{resource}/{id} - Replace a row
//! - DELETE /{resource}/{id} - Delete a row
//! - GET / - Describe the exposed resources
//!
//! HEAD is answered wherever GET is.

use crate::api::AppState;
use crate::dispatch::Outcome;
use crate::error::GatewayError;
use crate::registry::{Column, ResourceDescriptor};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Serialize)]
pub struct MutationResponse {
    pub status: String,
    pub resource: String,
    pub id: String,
    pub message: String,
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Rows(rows) => (StatusCode::OK, Json(rows)).into_response(),
            Outcome::Row(row) => (StatusCode::OK, Json(row)).into_response(),
            Outcome::Created(rows) => (StatusCode::CREATED, Json(rows)).into_response(),
            Outcome::Updated { resource, id } => (
                StatusCode::OK,
                Json(MutationResponse {
                    status: "updated".to_string(),
                    message: format!("{} '{}' updated", resource, id),
                    resource,
                    id,
                }),
            )
                .into_response(),
            Outcome::Deleted { resource, id } => (
                StatusCode::OK,
                Json(MutationResponse {
                    status: "deleted".to_string(),
                    message: format!("{} '{}' deleted", resource, id),
                    resource,
                    id,
                }),
            )
                .into_response(),
        }
    }
}

/// Catch-all handler routing every non-static path through the dispatcher
pub async fn dispatch_resource(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let result = match body {
        Ok(body) => state.dispatcher.dispatch(&method, uri.path(), &body).await,
        Err(rejection) => Err(GatewayError::from(rejection)),
    };

    match result {
        Ok(outcome) => outcome.into_response(),
        Err(err) => {
            if err.status_code().is_server_error() {
                error!(
                    request_id = request_id.as_deref().unwrap_or("-"),
                    "{} {} failed: {}",
                    method,
                    uri.path(),
                    err
                );
            } else {
                debug!(
                    request_id = request_id.as_deref().unwrap_or("-"),
                    "{} {} rejected: {}",
                    method,
                    uri.path(),
                    err
                );
            }
            err.into_response_with_id(request_id)
        }
    }
}

#[derive(Serialize)]
pub struct ResourceInfo {
    pub name: String,
    pub collection_path: String,
    pub item_path: String,
    pub read_only: bool,
    pub methods: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
}

impl From<&ResourceDescriptor> for ResourceInfo {
    fn from(d: &ResourceDescriptor) -> Self {
        let mut methods = vec!["GET"];
        if d.insert_query.is_some() {
            methods.push("POST");
        }
        if d.update_query.is_some() {
            methods.push("PUT");
        }
        if d.delete_query.is_some() {
            methods.push("DELETE");
        }

        Self {
            name: d.name.to_string(),
            collection_path: d.collection_path.clone(),
            item_path: d.item_path_template.clone(),
            read_only: d.is_read_only(),
            methods,
            columns: d.columns.clone(),
        }
    }
}

pub async fn list_resources(State(state): State<AppState>) -> Json<Vec<ResourceInfo>> {
    Json(
        state
            .dispatcher
            .registry()
            .iter()
            .map(ResourceInfo::from)
            .collect(),
    )
}
