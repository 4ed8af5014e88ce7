//! HTTP basic authentication for the admin endpoints.
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::error::api_unauthorized;
use super::AppState;
use crate::context::RequestContext;

const REALM: &str = "Basic realm=\"pg-publication-controller\"";

/// The single user allowed to call the admin API.
#[derive(Clone)]
pub struct ApiCredentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl ApiCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks an `Authorization` header value.
    pub fn verify(&self, header: Option<&str>) -> Result<(), &'static str> {
        let header = header.ok_or("Authentication required")?;
        let encoded = header
            .strip_prefix("Basic ")
            .ok_or("Invalid Authorization header format. Supported: Basic")?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| "Invalid Basic auth encoding")?;
        let credentials = String::from_utf8(decoded).map_err(|_| "Invalid credentials encoding")?;
        let (username, password) = credentials
            .split_once(':')
            .ok_or("Invalid Basic auth format")?;

        let user_ok: bool = self.username.as_bytes().ct_eq(username.as_bytes()).into();
        let pass_ok: bool = self.password.as_bytes().ct_eq(password.as_bytes()).into();
        if user_ok && pass_ok {
            Ok(())
        } else {
            Err("Invalid credentials")
        }
    }
}

pub(crate) async fn basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.credentials.verify(header) {
        Ok(()) => next.run(request).await,
        Err(reason) => {
            warn!(method = %request.method(), path = %request.uri().path(), "Authentication failed: {}", reason);
            let mut error = api_unauthorized(reason);
            if let Some(ctx) = request.extensions().get::<RequestContext>() {
                error = error.with_request_id(ctx);
            }
            let mut response = error.into_response();
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, axum::http::HeaderValue::from_static(REALM));
            response
        }
    }
}
