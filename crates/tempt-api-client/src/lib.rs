//! Shared HTTP client for the Tempt API.
//!
//! Bearer-token client with generic JSON helpers and domain methods for
//! generation, gallery, social and billing endpoints. Also implements the
//! poller's [`StatusSource`] so the CLI can watch tasks over HTTP.

pub mod api;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use tempt_core::models::TaskStatusReport;
use tempt_worker::StatusSource;

pub const API_PREFIX: &str = "/api/v1";

/// Error body rendered by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// HTTP client for the Tempt API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create client from environment: TEMPT_API_URL, TEMPT_TOKEN (optional for public endpoints).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("TEMPT_API_URL")
            .unwrap_or_else(|_| "http://localhost:4000".to_string());
        let token = std::env::var("TEMPT_TOKEN").ok().filter(|t| !t.is_empty());

        Self::new(base_url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => match body.code {
                Some(code) => format!("{} ({})", body.error, code),
                None => body.error,
            },
            Err(_) => text,
        };
        Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            message
        ))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.apply_auth(self.client.get(self.build_url(path)));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        Self::read_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.apply_auth(self.client.post(self.build_url(path)).json(body));
        let response = request.send().await.context("Failed to send request")?;
        Self::read_json(response).await
    }

    /// PATCH JSON body and deserialize response.
    pub async fn patch_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.apply_auth(self.client.patch(self.build_url(path)).json(body));
        let response = request.send().await.context("Failed to send request")?;
        Self::read_json(response).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.apply_auth(self.client.delete(self.build_url(path)));
        let response = request.send().await.context("Failed to send request")?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatusReport> {
        self.task_status(task_id).await
    }
}
