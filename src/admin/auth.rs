//! Single-credential HTTP Basic auth for the management API
//!
//! The management API's authentication is "a special instance of the same
//! rule" as a mapping's `basic_auth`: one operator-configured credential
//! pair, checked with a constant-time comparison, challenged with a
//! quoted-string `Basic realm="..."`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;

use crate::config::defaults::DEFAULT_REALM;
use crate::state::App;

use super::error::AdminError;
use std::sync::Arc;

/// Constant-time string comparison to avoid leaking credential length/prefix
/// via response timing.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}

/// Validates `Authorization: Basic <b64>` against the configured credential,
/// if any. No `auth` section means the management API is unauthenticated.
pub async fn auth_middleware(State(app): State<Arc<App>>, req: Request, next: Next) -> Result<Response, AdminError> {
    let cfg = app.snapshot().await;
    let Some(auth) = cfg.api.as_ref().and_then(|a| a.auth.as_ref()) else {
        return Ok(next.run(req).await);
    };

    let expected = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", auth.username, auth.password));
    let presented = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "));

    match presented {
        Some(b64) if constant_time_compare(b64, &expected) => Ok(next.run(req).await),
        _ => Err(AdminError::Unauthorized { realm: DEFAULT_REALM.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_compare_rejects_mismatched_length() {
        assert!(!constant_time_compare("short", "muchlonger"));
    }

    #[test]
    fn constant_time_compare_accepts_identical_strings() {
        assert!(constant_time_compare("dXNlcjpwYXNz", "dXNlcjpwYXNz"));
    }
}
