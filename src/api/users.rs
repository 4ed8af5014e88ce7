use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::error::ApiError;
use super::{parse_body, AppState, OK_BODY};
use crate::context::RequestContext;
use crate::users::GrantRequest;

/// `POST /users/grant`
pub(crate) async fn grant_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let request: GrantRequest = parse_body(&body, &ctx)?;
    state
        .grants
        .grant_replication(&ctx, &request)
        .await
        .map_err(|e| ApiError::from_core(e, &ctx, StatusCode::BAD_REQUEST))?;
    Ok(OK_BODY)
}
