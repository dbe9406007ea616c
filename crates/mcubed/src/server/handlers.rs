//! Axum request handlers for the record CRUD surface.
//!
//! Every handler resolves the target table (404 if none), reads the identity
//! headers (403 if absent), and then, holding the controller lock, authorizes
//! the caller (403 on denial) before touching the store.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{AffectedResponse, ErrorResponse};
use common::ServiceError;
use serde_json::Value;
use tokio::sync::MutexGuard;
use tracing::{debug, error, warn};

use super::identity::{target_table, Identity};
use super::state::{AppState, Controller};
use crate::codec::CodecError;
use crate::store::{Predicate, Record};

/// Query string as ordered `(key, value)` pairs.
type QueryPairs = Query<Vec<(String, String)>>;

/// A [`ServiceError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        error!(error = %err, "failed to persist database");
        Self(ServiceError::Internal("failed to persist database".into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Resolve the table, check identity and access, and return the held lock.
async fn authorized<'a>(
    state: &'a AppState,
    headers: &HeaderMap,
    raw_table: &str,
) -> Result<(MutexGuard<'a, Controller>, String), ApiError> {
    let table = target_table(raw_table)?;
    let identity = Identity::from_headers(headers)?;

    let controller = state.controller.lock().await;
    if !controller.authorize(&identity.app_name, &identity.app_key, &table) {
        warn!(app = %identity.app_name, table = %table, "access denied");
        return Err(ServiceError::Forbidden(
            "the specified application does not have access to the specified table".into(),
        )
        .into());
    }
    debug!(app = %identity.app_name, table = %table, "access granted");
    Ok((controller, table))
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ServiceError::BadRequest(format!("request body is not valid JSON: {e}")).into())
}

fn parse_patch(body: &Bytes) -> Result<Record, ApiError> {
    match parse_body(body)? {
        Value::Object(patch) => Ok(patch),
        _ => Err(ServiceError::BadRequest("the request body must be a JSON object".into()).into()),
    }
}

/// Split a create body into records: one object, or an array of objects.
fn parse_payloads(body: &Bytes) -> Result<(Vec<Record>, bool), ApiError> {
    let not_records =
        || ApiError(ServiceError::BadRequest("the request body must be a JSON object or an array of objects".into()));
    match parse_body(body)? {
        Value::Object(record) => Ok((vec![record], false)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                _ => Err(not_records()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|records| (records, true)),
        _ => Err(not_records()),
    }
}

fn record_not_found(table: &str, id: &str) -> ApiError {
    ServiceError::NotFound(format!("no record with id {id} in table {table}")).into()
}

/// `GET /{table}`: records matching the query parameters.
pub async fn list(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
) -> Result<Json<Vec<Record>>, ApiError> {
    let (controller, table) = authorized(&state, &headers, &table).await?;
    let predicate = Predicate::from_query(query);
    Ok(Json(controller.store().list(&table, &predicate)))
}

/// `GET /{table}/{id}`: a single record.
pub async fn get_one(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Record>, ApiError> {
    let (controller, table) = authorized(&state, &headers, &table).await?;
    controller
        .store()
        .get(&table, &id)
        .map(Json)
        .ok_or_else(|| record_not_found(&table, &id))
}

/// `POST /{table}`: store one record or an array of records.
pub async fn create(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (mut controller, table) = authorized(&state, &headers, &table).await?;
    let (payloads, batch) = parse_payloads(&body)?;

    let created = controller.commit(|store| store.create_many(&table, payloads))?;
    debug!(table = %table, count = created.len(), "records created");

    let mut records = created.into_iter().map(Value::Object);
    let body = if batch {
        Value::Array(records.collect())
    } else {
        records.next().unwrap_or(Value::Null)
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `PUT|PATCH /{table}`: merge the body into every record matching the query.
pub async fn update_many(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AffectedResponse>, ApiError> {
    let (mut controller, table) = authorized(&state, &headers, &table).await?;
    let patch = parse_patch(&body)?;
    let predicate = Predicate::from_query(query);

    let affected = controller.commit(|store| store.update_by_predicate(&table, &predicate, &patch))?;
    debug!(table = %table, affected, "records updated");
    Ok(Json(AffectedResponse { affected }))
}

/// `PUT|PATCH /{table}/{id}`: merge the body into one record.
pub async fn update_one(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Record>, ApiError> {
    let (mut controller, table) = authorized(&state, &headers, &table).await?;
    let patch = parse_patch(&body)?;
    if controller.store().get(&table, &id).is_none() {
        return Err(record_not_found(&table, &id));
    }

    controller
        .commit(|store| store.update_by_id(&table, &id, &patch))?
        .map(Json)
        .ok_or_else(|| record_not_found(&table, &id))
}

/// `DELETE /{table}`: remove every record matching the query.
pub async fn remove_many(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): QueryPairs,
    headers: HeaderMap,
) -> Result<Json<AffectedResponse>, ApiError> {
    let (mut controller, table) = authorized(&state, &headers, &table).await?;
    let predicate = Predicate::from_query(query);

    let affected = controller.commit(|store| store.remove_by_predicate(&table, &predicate))?;
    debug!(table = %table, affected, "records removed");
    Ok(Json(AffectedResponse { affected }))
}

/// `DELETE /{table}/{id}`: remove one record, returning it.
pub async fn remove_one(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Record>, ApiError> {
    let (mut controller, table) = authorized(&state, &headers, &table).await?;
    if controller.store().get(&table, &id).is_none() {
        return Err(record_not_found(&table, &id));
    }

    controller
        .commit(|store| store.remove_by_id(&table, &id))?
        .map(Json)
        .ok_or_else(|| record_not_found(&table, &id))
}

/// `/`: a request that names no table.
pub async fn missing_table() -> ApiError {
    ServiceError::NotFound("the table name must be specified with the request".into()).into()
}

/// Catch-all 404 handler.
pub async fn not_found() -> ApiError {
    ServiceError::NotFound("the requested resource does not exist".into()).into()
}
