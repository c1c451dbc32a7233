//! HTTP transport implementation.
//!
//! Talks JSON to the sync server's `/document` endpoints over reqwest.

use crate::error::{SyncError, SyncResult};
use crate::transport::{SubmitReply, SyncTransport};
use async_trait::async_trait;
use parking_lot::RwLock;
use progsync_model::{
    ConflictPayload, DocumentState, ErrorBody, ForcePushRequest, OwnerId, SubmitRequest,
};
use reqwest::{RequestBuilder, Response, StatusCode};

/// Header carrying the owner when the server runs without authentication.
pub const OWNER_HEADER: &str = "x-owner-id";

/// How requests identify their owner.
#[derive(Debug, Clone)]
pub enum Identity {
    /// A bearer token issued by the server.
    Bearer(String),
    /// A plain owner header, for servers without authentication.
    Owner(OwnerId),
}

/// HTTP-based sync transport.
pub struct HttpTransport {
    /// Base URL of the sync server (e.g., "https://sync.example.com").
    base_url: String,
    client: reqwest::Client,
    identity: Identity,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, identity: Identity) -> Self {
        Self::with_client(base_url, identity, reqwest::Client::new())
    }

    /// Creates a transport over an existing client.
    pub fn with_client(
        base_url: impl Into<String>,
        identity: Identity,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            identity,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.identity {
            Identity::Bearer(token) => builder.bearer_auth(token),
            Identity::Owner(owner) => builder.header(OWNER_HEADER, owner.as_str()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, builder: RequestBuilder) -> SyncResult<Response> {
        let result = self.request(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                SyncError::Timeout
            } else if e.is_builder() {
                SyncError::transport_fatal(e.to_string())
            } else {
                SyncError::transport_retryable(e.to_string())
            }
        });
        match &result {
            Ok(_) => *self.last_error.write() = None,
            Err(e) => *self.last_error.write() = Some(e.to_string()),
        }
        result
    }

    async fn state(&self, response: Response) -> SyncResult<DocumentState> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| SyncError::Protocol(format!("failed to decode state: {e}")))
        } else {
            Err(self.failure(response).await)
        }
    }

    async fn failure(&self, response: Response) -> SyncError {
        let status = response.status();
        let (code, message) = match response.json::<ErrorBody>().await {
            Ok(body) => (body.code, body.error),
            Err(_) => (String::new(), status.to_string()),
        };
        let err = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SyncError::AuthenticationFailed(message)
            }
            s if s.is_client_error() => SyncError::Rejected { code, message },
            s => SyncError::Server {
                status: s.as_u16(),
                message,
            },
        };
        *self.last_error.write() = Some(err.to_string());
        err
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn fetch(&self) -> SyncResult<DocumentState> {
        let response = self.send(self.client.get(self.url("/document"))).await?;
        self.state(response).await
    }

    async fn submit(&self, request: &SubmitRequest) -> SyncResult<SubmitReply> {
        let response = self
            .send(self.client.post(self.url("/document")).json(request))
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let payload: ConflictPayload = response
                .json()
                .await
                .map_err(|e| SyncError::Protocol(format!("failed to decode conflict: {e}")))?;
            return Ok(SubmitReply::Conflict(payload));
        }
        self.state(response).await.map(SubmitReply::Accepted)
    }

    async fn force_push(&self, request: &ForcePushRequest) -> SyncResult<DocumentState> {
        let response = self
            .send(
                self.client
                    .post(self.url("/document/force-push"))
                    .json(request),
            )
            .await?;
        self.state(response).await
    }

    async fn force_sync(&self) -> SyncResult<DocumentState> {
        let response = self
            .send(self.client.post(self.url("/document/force-sync")))
            .await?;
        self.state(response).await
    }
}
