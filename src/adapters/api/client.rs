use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use crate::ports::{RepositoryError, RepositoryResult};

/// Thin JSON client for the task service REST API
#[derive(Clone)]
pub struct BoardClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl BoardClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> RepositoryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kanban-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepositoryError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RepositoryResult<Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RepositoryResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        self.handle_response(response).await
    }

    pub async fn post<T: DeserializeOwned, R: serde::Serialize>(
        &self,
        path: &str,
        body: &R,
    ) -> RepositoryResult<T> {
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        self.handle_response(response).await
    }

    pub async fn patch<T: DeserializeOwned, R: serde::Serialize>(
        &self,
        path: &str,
        body: &R,
    ) -> RepositoryResult<T> {
        let response = self.send(self.client.patch(self.url(path)).json(body)).await?;
        self.handle_response(response).await
    }

    pub async fn delete(&self, path: &str) -> RepositoryResult<()> {
        let response = self.send(self.client.delete(self.url(path))).await?;
        self.check_status(response).await.map(|_| ())
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> RepositoryResult<T> {
        let response = self.check_status(response).await?;
        let response_text = response
            .text()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        tracing::debug!("API Response: {}", response_text);

        serde_json::from_str(&response_text).map_err(|e| {
            RepositoryError::Serialization(format!(
                "Failed to parse response: {}. Response was: {}",
                e, response_text
            ))
        })
    }

    async fn check_status(&self, response: Response) -> RepositoryResult<Response> {
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),
            401 | 403 => Err(RepositoryError::Authentication(
                "Invalid or missing API token".to_string(),
            )),
            404 => Err(RepositoryError::NotFound(response.url().path().to_string())),
            429 => {
                // Extract retry-after header if available
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                Err(RepositoryError::RateLimit(retry_after))
            }
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(RepositoryError::Api(format!("HTTP {}: {}", status, error_text)))
            }
        }
    }
}
