//! Per-table REST routes.
//!
//! Every discovered table gets its own routes (`/{table}`, `/{table}/`, `/{table}/{id}`),
//! each bound to a [`TableState`] carrying the table schema and the injected row store.

use crate::config::AppOptions;
use crate::schema::route_segment;
use crate::store::{Entity, RowStore};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use dras_openapi::TableSchema;
use serde::Serialize;
use std::sync::Arc;

/// How row JSON is placed in a response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseEncoding {
    /// The row JSON is itself encoded as a JSON string (`"[{\"id\":1}]"`).
    #[default]
    EncodedString,
    /// The row JSON is the body.
    Plain,
}

impl ResponseEncoding {
    /// Render `value` as a response body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<String> {
        let raw = serde_json::to_string(value)?;
        match self {
            Self::Plain => Ok(raw),
            Self::EncodedString => serde_json::to_string(&raw),
        }
    }
}

/// Failure recorded on a response when a handler gave up on a request.
#[derive(Debug, Clone)]
pub struct RequestError(pub Arc<str>);

#[derive(Clone)]
struct TableState {
    table: Arc<TableSchema>,
    store: Arc<dyn RowStore>,
    encoding: ResponseEncoding,
    write_token: Option<Arc<str>>,
}

/// Build the routes for `tables`, all sharing `store`.
///
/// Write routes are only registered when `options.write_token` is set.
pub fn table_routes(
    tables: &[TableSchema],
    store: Arc<dyn RowStore>,
    options: &AppOptions,
) -> Router {
    let write_token: Option<Arc<str>> = options.write_token.as_deref().map(Arc::from);
    // Table names may start with `:` or `*`; those are literal segments here.
    let mut router = Router::new().without_v07_checks();

    for table in tables {
        let state = TableState {
            table: Arc::new(table.clone()),
            store: store.clone(),
            encoding: options.encoding,
            write_token: write_token.clone(),
        };

        let (collection, item): (MethodRouter<TableState>, MethodRouter<TableState>) =
            if write_token.is_some() {
                (
                    get(list_rows).post(create_row),
                    get(get_row).put(update_row).delete(delete_row),
                )
            } else {
                (get(list_rows), get(get_row))
            };

        let segment = route_segment(&table.name);
        router = router.merge(
            Router::new()
                .without_v07_checks()
                .route(&format!("/{segment}"), collection.clone())
                .route(&format!("/{segment}/"), collection)
                .route(&format!("/{segment}/{{id}}"), item)
                .with_state(state),
        );
        tracing::debug!(
            table = %table.name,
            path = %format!("/{segment}"),
            writes = write_token.is_some(),
            "registered routes"
        );
    }

    router
}

fn json_response<T: Serialize + ?Sized>(
    table: &str,
    encoding: ResponseEncoding,
    value: &T,
) -> Response {
    match encoding.encode(value) {
        Ok(body) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            )],
            body,
        )
            .into_response(),
        // 404 rather than 500: existing clients key off this status.
        Err(e) => {
            tracing::warn!(table, error = %e, "failed to serialize rows");
            with_request_error(StatusCode::NOT_FOUND.into_response(), e.to_string())
        }
    }
}

fn store_failure(table: &str, err: &anyhow::Error) -> Response {
    let message = format!("{err:#}");
    tracing::error!(table, error = %message, "row store query failed");
    with_request_error(
        (StatusCode::INTERNAL_SERVER_ERROR, "database error").into_response(),
        message,
    )
}

fn with_request_error(mut resp: Response, message: String) -> Response {
    resp.extensions_mut()
        .insert(RequestError(Arc::from(message.as_str())));
    resp
}

fn not_found(table: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("{table} row not found")).into_response()
}

fn authz(headers: &HeaderMap, expected: Option<&str>) -> Result<(), Response> {
    let Some(expected) = expected else {
        return Err((StatusCode::NOT_FOUND, "Not found").into_response());
    };
    let got = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    let want = format!("Bearer {expected}");
    if got == want {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "Unauthorized").into_response())
    }
}

async fn list_rows(State(state): State<TableState>) -> Response {
    match state.store.fetch_all(&state.table).await {
        Ok(rows) => json_response(&state.table.name, state.encoding, &rows),
        Err(e) => store_failure(&state.table.name, &e),
    }
}

async fn get_row(State(state): State<TableState>, Path(id): Path<String>) -> Response {
    match state.store.fetch_by_id(&state.table, &id).await {
        Ok(rows) => match rows.first() {
            Some(row) => json_response(&state.table.name, state.encoding, row),
            None => not_found(&state.table.name),
        },
        Err(e) => store_failure(&state.table.name, &e),
    }
}

async fn create_row(
    State(state): State<TableState>,
    headers: HeaderMap,
    body: Result<Json<Entity>, JsonRejection>,
) -> Response {
    if let Err(resp) = authz(&headers, state.write_token.as_deref()) {
        return resp;
    }
    let Json(entity) = match body {
        Ok(b) => b,
        Err(rejection) => return rejection.into_response(),
    };
    let values = match entity.into_columns(&state.table) {
        Ok(v) => v,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.store.insert(&state.table, &values).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => store_failure(&state.table.name, &e),
    }
}

async fn update_row(
    State(state): State<TableState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<Entity>, JsonRejection>,
) -> Response {
    if let Err(resp) = authz(&headers, state.write_token.as_deref()) {
        return resp;
    }
    let Json(entity) = match body {
        Ok(b) => b,
        Err(rejection) => return rejection.into_response(),
    };
    let values = match entity.into_columns(&state.table) {
        Ok(v) => v,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.store.update(&state.table, &id, &values).await {
        Ok(Some(row)) => Json(row).into_response(),
        Ok(None) => not_found(&state.table.name),
        Err(e) => store_failure(&state.table.name, &e),
    }
}

async fn delete_row(
    State(state): State<TableState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = authz(&headers, state.write_token.as_deref()) {
        return resp;
    }

    match state.store.delete(&state.table, &id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(&state.table.name),
        Err(e) => store_failure(&state.table.name, &e),
    }
}
