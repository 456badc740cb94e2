//! Admin API data types
//!
//! Every response body is the same `{errno, errmsg?, data?}` envelope;
//! `errno = 0` means success, matching the management API contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub errno: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> ApiResponse<T> {
        ApiResponse { errno: 0, errmsg: None, data: Some(data) }
    }

    pub fn ok_empty() -> ApiResponse<T> {
        ApiResponse { errno: 0, errmsg: None, data: None }
    }

    pub fn err(errno: i32, message: &str) -> ApiResponse<T> {
        ApiResponse { errno, errmsg: Some(message.to_string()), data: None }
    }
}

/// `GET/POST /api/v1/vhost-listen` payload: the three protocols' listen sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VhostListenDto {
    #[serde(default)]
    pub http: Vec<String>,
    #[serde(default)]
    pub https: Vec<String>,
    #[serde(default)]
    pub http3: Vec<String>,
}
