use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams, ApiResponse};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager};

/// Orca Security API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(api_endpoint: &str, api_token: &str) -> Result<Self, ApiError> {
        Self::with_config(api_endpoint, api_token, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        api_endpoint: &str,
        api_token: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        url::Url::parse(api_endpoint)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", api_endpoint, e)))?;

        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };

        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client()?;

        let base_url = api_endpoint.trim_end_matches('/').to_string();
        let auth_header = format!("Token {}", api_token);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
                retry_config,
                pool_manager,
            }),
        })
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("GET request to: {}", url);

                self.inner
                    .http_client
                    .get(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body_ref = body;
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("POST request to: {}", url);

                self.inner
                    .http_client
                    .post(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body_ref)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body_ref = body;
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("PUT request to: {}", url);

                self.inner
                    .http_client
                    .put(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body_ref)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("DELETE request to: {}", url);

                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Get connection pool statistics
    pub async fn get_connection_stats(&self) -> super::pool::ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    /// Automation API operations (v1)
    pub fn automations(&self) -> crate::api::automations::AutomationsApi<'_> {
        crate::api::automations::AutomationsApi::new(self)
    }

    /// Automation API operations (v2)
    pub fn automations_v2(&self) -> crate::api::automations::AutomationsV2Api<'_> {
        crate::api::automations::AutomationsV2Api::new(self)
    }

    /// Business unit API operations
    pub fn business_units(&self) -> crate::api::business_units::BusinessUnitsApi<'_> {
        crate::api::business_units::BusinessUnitsApi::new(self)
    }

    /// RBAC API operations (roles, groups, permissions)
    pub fn rbac(&self) -> crate::api::rbac::RbacApi<'_> {
        crate::api::rbac::RbacApi::new(self)
    }

    /// Custom discovery alert API operations
    pub fn alerts(&self) -> crate::api::alerts::AlertsApi<'_> {
        crate::api::alerts::AlertsApi::new(self)
    }

    /// Custom sonar alert API operations
    pub fn sonar(&self) -> crate::api::sonar::SonarApi<'_> {
        crate::api::sonar::SonarApi::new(self)
    }

    /// Discovery view API operations
    pub fn discovery(&self) -> crate::api::discovery::DiscoveryApi<'_> {
        crate::api::discovery::DiscoveryApi::new(self)
    }

    /// Custom dashboard API operations
    pub fn dashboards(&self) -> crate::api::dashboards::DashboardsApi<'_> {
        crate::api::dashboards::DashboardsApi::new(self)
    }

    /// Custom widget API operations
    pub fn widgets(&self) -> crate::api::widgets::WidgetsApi<'_> {
        crate::api::widgets::WidgetsApi::new(self)
    }

    /// Shift Left API operations (projects, CVE exception lists)
    pub fn shiftleft(&self) -> crate::api::shiftleft::ShiftLeftApi<'_> {
        crate::api::shiftleft::ShiftLeftApi::new(self)
    }

    /// Trusted cloud account API operations
    pub fn trusted_accounts(&self) -> crate::api::trusted_accounts::TrustedAccountsApi<'_> {
        crate::api::trusted_accounts::TrustedAccountsApi::new(self)
    }

    /// Webhook API operations
    pub fn webhooks(&self) -> crate::api::webhooks::WebhooksApi<'_> {
        crate::api::webhooks::WebhooksApi::new(self)
    }

    /// User API operations
    pub fn users(&self) -> crate::api::users::UsersApi<'_> {
        crate::api::users::UsersApi::new(self)
    }

    /// Third-party integration API operations
    pub fn integrations(&self) -> crate::api::integrations::IntegrationsApi<'_> {
        crate::api::integrations::IntegrationsApi::new(self)
    }

    /// Execute request with retry logic
    ///
    /// Only rate limits and server errors are retried; 4xx responses are
    /// final on the first attempt.
    async fn execute_with_retry<F, Fut, T>(&self, request_fn: F, path: &str) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.pool_manager.record_request(true).await;
                        return self.parse_success_response(response).await;
                    }

                    self.inner.pool_manager.record_request(false).await;

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(ApiError::AuthError);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    self.inner.pool_manager.record_request(false).await;

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        // Some endpoints reply 200 with an empty body (deletes, reorders)
        let text = if text.is_empty() {
            "null".to_string()
        } else {
            text
        };

        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(wrapper) => Ok(wrapper.data),
            Err(_) => match serde_json::from_str::<T>(&text) {
                Ok(data) => Ok(data),
                Err(e) => {
                    tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
                    Err(ApiError::ParseError(format!(
                        "Failed to parse response: {}",
                        e
                    )))
                }
            },
        }
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => Some(Box::new(ApiErrorDetails {
                error: err_resp.error,
                detail: err_resp.detail,
            })),
            Err(_) => None,
        };

        let message = details
            .as_ref()
            .and_then(|d| d.error.clone().or_else(|| d.detail.clone()))
            .unwrap_or_else(|| text.clone());

        Err(ApiError::ApiError {
            status,
            message,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn test_client(server_url: &str) -> Client {
        Client::new(server_url, "test-token").unwrap()
    }

    fn fast_retry_client(server_url: &str, max_retries: u32) -> Client {
        Client::with_config(
            server_url,
            "test-token",
            RetryConfig {
                max_retries,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
                timeout_seconds: 5,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_token_auth_header_and_unwraps_envelope() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users")
            .match_header("authorization", "Token test-token")
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"users":[]}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: serde_json::Value = client.get("/api/users").await.unwrap();

        assert_eq!(result, json!({"users": []}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn falls_back_to_bare_payload_without_envelope() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/webhooks/ops")
            .with_status(200)
            .with_body(r#"{"name":"ops","url":"https://hooks.example.com"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: serde_json::Value = client.get("/api/webhooks/ops").await.unwrap();

        assert_eq!(result["name"], "ops");
    }

    #[tokio::test]
    async fn trims_trailing_slash_from_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let endpoint = format!("{}/", server.url());
        let client = test_client(&endpoint);
        let _: serde_json::Value = client.get("/api/users").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejects_invalid_endpoint() {
        let result = Client::new("not a url", "token");
        assert!(matches!(result, Err(ApiError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn maps_unauthorized_to_auth_error_without_retry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users")
            .with_status(401)
            .with_body(r#"{"error":"invalid token"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = fast_retry_client(&server.url(), 3);
        let result: Result<serde_json::Value, _> = client.get("/api/users").await;

        assert!(matches!(result, Err(ApiError::AuthError)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn maps_forbidden_to_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/rbac/roles")
            .with_status(403)
            .with_body(r#"{"detail":"permission denied"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<serde_json::Value, _> = client.get("/api/rbac/roles").await;

        assert!(matches!(result, Err(ApiError::AuthError)));
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/automations/missing")
            .with_status(404)
            .with_body(r#"{"error":"automation not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = fast_retry_client(&server.url(), 3);
        let result: Result<serde_json::Value, _> = client.get("/api/automations/missing").await;

        let err = result.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("automation not found"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_server_errors_before_giving_up() {
        let mut server = Server::new_async().await;
        // initial attempt plus two retries
        let mock = server
            .mock("GET", "/api/business_units")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = fast_retry_client(&server.url(), 2);
        let result: Result<serde_json::Value, _> = client.get("/api/business_units").await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn gives_up_after_max_retries_on_rate_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = fast_retry_client(&server.url(), 2);
        let result: Result<serde_json::Value, _> = client.get("/api/users").await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_error_body_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/rbac/groups")
            .with_status(400)
            .with_body(r#"{"error":"group with this name already exists"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<serde_json::Value, _> =
            client.post("/api/rbac/groups", &json!({"name": "dup"})).await;

        match result {
            Err(ApiError::ApiError {
                status, message, ..
            }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "group with this name already exists");
            }
            other => panic!("expected ApiError, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn tolerates_empty_success_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/webhooks/ops")
            .with_status(200)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<serde_json::Value, _> = client.delete("/api/webhooks/ops").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn records_request_statistics() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("GET", "/api/users")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/api/users/none")
            .with_status(404)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let _: serde_json::Value = client.get("/api/users").await.unwrap();
        let _: Result<serde_json::Value, _> = client.get("/api/users/none").await;

        let stats = client.get_connection_stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 1);
    }
}
