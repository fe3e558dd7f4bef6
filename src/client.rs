//! Typed HTTP client for a running SBERT service.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::server::{EmbeddingResponse, SimilarityResponse};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("SBERT service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("SBERT service returned {status}: {message}")]
    Service { status: StatusCode, message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct SbertClient {
    http: reqwest::Client,
    base_url: String,
}

impl SbertClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` when `/health` answers with a success status.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    pub async fn embedding(&self, text: &str) -> Result<Vec<f32>, ClientError> {
        let body: EmbeddingResponse = self.post("embedding", &json!({ "text": text })).await?;
        Ok(body.embedding)
    }

    pub async fn similarity(&self, text1: &str, text2: &str) -> Result<f32, ClientError> {
        let body: SimilarityResponse = self
            .post("similarity", &json!({ "text1": text1, "text2": text2 }))
            .await?;
        Ok(body.similarity)
    }

    async fn post<B, T>(&self, route: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{route}", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        tracing::warn!(%status, %message, route, "SBERT service error");
        Err(ClientError::Service { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = SbertClient::new("http://localhost:3005/");
        assert_eq!(client.base_url(), "http://localhost:3005");
    }
}
