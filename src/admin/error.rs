//! Admin API error types
//!
//! Every handler failure funnels through `AdminError`, which renders as the
//! management API's `{errno, errmsg}` envelope instead of axum's default
//! plain-text error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::admin::types::ApiResponse;

pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("unauthorized")]
    Unauthorized { realm: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cert is in use")]
    CertInUse,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<crate::common::ProxyError> for AdminError {
    fn from(err: crate::common::ProxyError) -> Self {
        AdminError::Validation(err.to_string())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        if let AdminError::Unauthorized { realm } = &self {
            return (
                StatusCode::UNAUTHORIZED,
                [(axum::http::header::WWW_AUTHENTICATE, format!("Basic realm=\"{realm}\""))],
                Json(ApiResponse::<()>::err(1, "unauthorized")),
            )
                .into_response();
        }

        let (status, errmsg) = match &self {
            AdminError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AdminError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AdminError::CertInUse => (StatusCode::CONFLICT, "cert is in use".to_string()),
            AdminError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AdminError::Unauthorized { .. } => unreachable!(),
        };
        (status, Json(ApiResponse::<()>::err(1, &errmsg))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cert_in_use_maps_to_errno_one() {
        let resp = AdminError::CertInUse.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
