//! HTTP client for the task server.
//!
//! [`ApiClient`] wraps a `reqwest::Client` with the server base URL and the
//! caller's bearer token. Non-2xx responses are decoded into
//! [`ClientError::Api`] carrying the server's error code.

use letsfocus_proto::api::{
    CreateTaskRequest, ErrorBody, MessageResponse, RenormalizeResponse, ReorderRequest,
    ReorderResponse, UpdateTaskRequest,
};
use letsfocus_proto::task::{Task, TaskId};
use serde::de::DeserializeOwned;
use url::Url;

use crate::tasks::TaskTransport;

/// Errors returned by [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured server URL is not a valid base URL.
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never produced a response, or its body did not decode.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("server returned {status} {code}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code, e.g. `CONFLICT`.
        code: String,
        /// Server-provided message.
        message: String,
    },
}

impl ClientError {
    /// Returns the server error code, if the server answered at all.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// `true` when the list changed on the server and should be reloaded.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.code() == Some("CONFLICT")
    }
}

/// JSON client for one owner's task API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        // Keep any path prefix when joining relative endpoints.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: token.into(),
        })
    }

    /// The normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetches the caller's tasks (everything except deleted) in manual
    /// order.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let url = self.endpoint("api/tasks")?;
        self.send(self.http.get(url)).await
    }

    /// Creates a task at the end of the caller's list.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ClientError> {
        let url = self.endpoint("api/tasks")?;
        self.send(self.http.post(url).json(request)).await
    }

    /// Applies a partial update to a task.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn update_task(
        &self,
        id: &TaskId,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        let url = self.endpoint(&format!("api/tasks/{id}"))?;
        self.send(self.http.patch(url).json(request)).await
    }

    /// Soft-deletes a task.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn delete_task(&self, id: &TaskId) -> Result<MessageResponse, ClientError> {
        let url = self.endpoint(&format!("api/tasks/{id}"))?;
        self.send(self.http.delete(url)).await
    }

    /// Asks the server to place a task between two neighbours.
    ///
    /// # Errors
    ///
    /// See [`ClientError`]. A `CONFLICT` code means the neighbours are stale.
    pub async fn reorder(&self, request: &ReorderRequest) -> Result<ReorderResponse, ClientError> {
        let url = self.endpoint("api/tasks/reorder")?;
        self.send(self.http.put(url).json(request)).await
    }

    /// Re-spaces the caller's whole list.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn renormalize(&self) -> Result<RenormalizeResponse, ClientError> {
        let url = self.endpoint("api/tasks/renormalize")?;
        self.send(self.http.post(url)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let bytes = response.bytes().await?;
        let error = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| ErrorBody {
            code: "UNKNOWN".to_string(),
            message: String::from_utf8_lossy(&bytes).into_owned(),
        });
        tracing::debug!(status = status.as_u16(), code = %error.code, "server rejected request");
        Err(ClientError::Api {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
        })
    }
}

impl TaskTransport for ApiClient {
    async fn list(&self) -> Result<Vec<Task>, ClientError> {
        self.list_tasks().await
    }

    async fn reorder(&self, request: &ReorderRequest) -> Result<ReorderResponse, ClientError> {
        Self::reorder(self, request).await
    }
}
