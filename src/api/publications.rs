use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::{Extension, Json};
use std::collections::HashMap;

use super::error::{api_validation_error, ApiError};
use super::{parse_body, AppState, OK_BODY};
use crate::context::RequestContext;
use crate::publication::{Publication, PublicationRequest};

/// `GET /publications/:database/:publication?withTables=bool`
pub(crate) async fn get_publication(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((database, publication)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Publication>, ApiError> {
    fetch(&state, &ctx, &database, &publication, &params).await
}

/// `GET` on `/publications/alter/{add,set}`: the static write routes shadow
/// the lookup route, so a publication in database `alter` is served here.
pub(crate) async fn get_shadowed_publication(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Publication>, ApiError> {
    let mut segments = uri.path().trim_start_matches("/publications/").splitn(2, '/');
    let database = segments.next().unwrap_or_default();
    let publication = segments.next().unwrap_or_default();
    fetch(&state, &ctx, database, publication, &params).await
}

async fn fetch(
    state: &AppState,
    ctx: &RequestContext,
    database: &str,
    publication: &str,
    params: &HashMap<String, String>,
) -> Result<Json<Publication>, ApiError> {
    let raw = params.get("withTables").map(String::as_str).unwrap_or("false");
    let with_tables = parse_bool(raw).ok_or_else(|| {
        tracing::error!("cannot parse bool value for param withTables: {:?}", raw);
        api_validation_error(format!("withTables must be a boolean, got {:?}", raw)).with_request_id(ctx)
    })?;

    let publication = state
        .reconciler
        .get(ctx, database, publication, with_tables)
        .await
        .map_err(|e| ApiError::from_core(e, ctx, StatusCode::NOT_FOUND))?;
    Ok(Json(publication))
}

/// `POST /publications/create`
pub(crate) async fn create_publication(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let request: PublicationRequest = parse_body(&body, &ctx)?;
    state
        .reconciler
        .create(&ctx, &request)
        .await
        .map_err(|e| ApiError::from_core(e, &ctx, StatusCode::BAD_REQUEST))?;
    Ok(OK_BODY)
}

/// `POST /publications/alter/add`
pub(crate) async fn alter_add_publication(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let request: PublicationRequest = parse_body(&body, &ctx)?;
    state
        .reconciler
        .alter_add(&ctx, &request)
        .await
        .map_err(|e| ApiError::from_core(e, &ctx, StatusCode::BAD_REQUEST))?;
    Ok(OK_BODY)
}

/// `POST /publications/alter/set`
pub(crate) async fn alter_set_publication(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let request: PublicationRequest = parse_body(&body, &ctx)?;
    state
        .reconciler
        .alter_set(&ctx, &request)
        .await
        .map_err(|e| ApiError::from_core(e, &ctx, StatusCode::BAD_REQUEST))?;
    Ok(OK_BODY)
}

/// `DELETE /publications/drop`
pub(crate) async fn drop_publication(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let request: PublicationRequest = parse_body(&body, &ctx)?;
    state
        .reconciler
        .drop_publication(&ctx, &request)
        .await
        .map_err(|e| ApiError::from_core(e, &ctx, StatusCode::BAD_REQUEST))?;
    Ok(OK_BODY)
}

/// Accepts `1`/`0`, `t`/`f` and `true`/`false` in lower, upper and title case.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
