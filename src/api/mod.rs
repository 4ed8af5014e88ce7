//! HTTP surface of the controller.
//!
//! `/publications/*` and `/users/*` require basic authentication;
//! `/health` is open so orchestrators can probe it.
pub mod auth;
pub mod error;
mod health;
mod publications;
mod users;

pub use auth::ApiCredentials;
pub use error::{ApiError, ErrorResponse};

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::context::{RequestContext, REQUEST_ID_HEADER};
use crate::postgres::ConnectionProvider;
use crate::publication::PublicationReconciler;
use crate::users::UserGrantService;

pub(crate) const OK_BODY: &str = "OK";

/// Shared, immutable dependencies of every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ConnectionProvider>,
    pub reconciler: Arc<PublicationReconciler>,
    pub grants: Arc<UserGrantService>,
    pub credentials: Arc<ApiCredentials>,
    pub health_timeout: Duration,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        credentials: ApiCredentials,
        health_timeout: Duration,
    ) -> Self {
        Self {
            reconciler: Arc::new(PublicationReconciler::new(provider.clone())),
            grants: Arc::new(UserGrantService::new(provider.clone())),
            provider,
            credentials: Arc::new(credentials),
            health_timeout,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .extensions()
                .get::<RequestContext>()
                .map(|ctx| ctx.request_id.as_str())
                .unwrap_or_default();
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        });

    let admin = Router::new()
        .route(
            "/publications/:database/:publication",
            get(publications::get_publication),
        )
        .route("/publications/create", post(publications::create_publication))
        .route(
            "/publications/alter/add",
            post(publications::alter_add_publication).get(publications::get_shadowed_publication),
        )
        .route(
            "/publications/alter/set",
            post(publications::alter_set_publication).get(publications::get_shadowed_publication),
        )
        .route("/publications/drop", delete(publications::drop_publication))
        .route("/users/grant", post(users::grant_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::basic_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(admin)
        // The context layer runs first so the trace span sees its id.
        .layer(trace_layer)
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}

/// Attaches a [`RequestContext`] to the request and echoes its id back.
async fn request_context(mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_header(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let header = HeaderValue::from_str(&ctx.request_id).ok();
    tracing::debug!(request_id = %ctx.request_id, "{} {}", request.method(), request.uri().path());
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if let Some(header) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, header);
    }
    response
}

/// Decodes a JSON body; an empty body decodes to `T::default()`.
pub(crate) fn parse_body<T>(body: &[u8], ctx: &RequestContext) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!(request_id = %ctx.request_id, "cannot parse request body: {}", e);
        error::api_validation_error(format!("invalid request body: {}", e)).with_request_id(ctx)
    })
}
