use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::types::*;
use super::ScamApi;
use crate::config::base_url;
use crate::error::ApiError;

/// HTTP client for the backend's `/api` routes.
///
/// No request timeout: a hung backend stalls the run, it is never retried.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(origin: Url) -> Self {
        Self::with_client(Client::new(), origin)
    }

    pub fn with_client(client: Client, origin: Url) -> Self {
        Self {
            client,
            base: base_url(origin),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Endpoint(format!("{path}: {e}")))
    }

    async fn send<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let url = self.endpoint(path)?;
        let endpoint = url.path().to_string();

        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, %endpoint, "backend request");
        let response = request.send().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|source| ApiError::Payload { endpoint, source })
    }
}

#[async_trait]
impl ScamApi for ApiClient {
    async fn create_session(&self) -> Result<String, ApiError> {
        let created: SessionCreated = self.send::<(), _>(Method::POST, "api/sessions", None).await?;
        Ok(created.session_id)
    }

    async fn session_info(&self, session_id: &str) -> Result<SessionInfo, ApiError> {
        self.send::<(), _>(Method::GET, &format!("api/sessions/{session_id}"), None).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .send::<(), _>(Method::DELETE, &format!("api/sessions/{session_id}"), None)
            .await?;
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.send(Method::POST, "api/chat", Some(request)).await
    }

    async fn start_run(&self, session_id: &str) -> Result<StartResponse, ApiError> {
        self.send(Method::POST, "api/auto-conversation/start", Some(&RunRequest { session_id }))
            .await
    }

    async fn next_turn(&self, session_id: &str, choice: Option<&str>) -> Result<TurnResponse, ApiError> {
        self.send(
            Method::POST,
            "api/auto-conversation/next",
            Some(&NextTurnRequest { session_id, choice }),
        )
        .await
    }

    async fn stop_run(&self, session_id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .send(Method::POST, "api/auto-conversation/stop", Some(&RunRequest { session_id }))
            .await?;
        Ok(())
    }
}
