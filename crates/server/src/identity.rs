//! Best-effort identity extraction from an `Authorization: Bearer <jwt>`
//! header (§6). No signature verification — the gateway in front of this
//! service is the trust boundary; this just reads `email`/`exp` out of the
//! payload. A malformed token, an expired `exp`, or an empty `email` is
//! treated the same as no identity at all, never as a hard error.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use painmine_store::user::UserStore;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub email: String,
    pub exp: i64,
}

pub fn from_headers(headers: &HeaderMap) -> Option<Identity> {
    let auth = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    let payload_b64 = token.split('.').nth(1)?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let identity: Identity = serde_json::from_slice(&payload).ok()?;

    if identity.exp <= chrono::Utc::now().timestamp() || identity.email.is_empty() {
        return None;
    }
    Some(identity)
}

/// Best-effort: records which identities have hit the API (§3 `User`
/// table). A missing or malformed identity header never blocks the
/// request — this middleware only ever adds a row, it cannot reject one.
pub async fn touch_user(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if let Some(identity) = from_headers(request.headers()) {
        if let Err(e) = UserStore::touch(&state.pool, &identity.email).await {
            tracing::warn!(error = %e, "failed to record identity touch");
        }
    }
    next.run(request).await
}
