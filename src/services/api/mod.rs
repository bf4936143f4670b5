//! The role-play backend, seen from the client.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::ApiError;
pub use client::ApiClient;
pub use types::*;

/// Backend operations the driver relies on. `ApiClient` is the HTTP
/// implementation; tests script their own.
#[async_trait]
pub trait ScamApi: Send + Sync {
    async fn create_session(&self) -> Result<String, ApiError>;

    async fn session_info(&self, session_id: &str) -> Result<SessionInfo, ApiError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;

    /// Manual mode: one scammer line in, one persona reply out.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;

    /// Opens an autonomous run and returns the scammer's opening line.
    async fn start_run(&self, session_id: &str) -> Result<StartResponse, ApiError>;

    /// `choice` is the encoded intervention answer from the previous turn, if any.
    async fn next_turn(&self, session_id: &str, choice: Option<&str>) -> Result<TurnResponse, ApiError>;

    async fn stop_run(&self, session_id: &str) -> Result<(), ApiError>;
}
