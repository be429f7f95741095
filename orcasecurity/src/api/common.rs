//! Common types and utilities for the Orca Security API

use serde::Deserialize;

/// Standard success envelope: `{"status": "success", "data": ...}`
///
/// Unknown sibling fields (request ids, timing) are ignored.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub status: Option<String>,
    pub data: T,
}

/// Error body shape; Orca uses `error` on most endpoints and `detail`
/// on the RBAC ones
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: error={error:?}, detail={detail:?}")]
pub struct ApiErrorDetails {
    pub error: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }

        let encoded: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();

        format!("?{}", encoded.join("&"))
    }
}
