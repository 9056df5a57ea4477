//! How the client reaches the gateway

use crate::dispatcher::ResumeDispatcher;
use crate::protocol::{
    Envelope, EnvelopeError, Rejection, ResetResponse, ResumeRequest, StartRequest,
    WorkflowOutcome,
};
use crate::workflow::Workflow;
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Request never got a usable answer
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    /// Server refused the request with a protocol rejection
    #[error("{} ({})", .0.error, .0.code)]
    Rejected(Rejection),
    /// Success status but the body is not a valid envelope
    #[error(transparent)]
    Malformed(#[from] EnvelopeError),
    /// Transport could not be built
    #[error("transport setup failed: {0}")]
    Setup(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn start(&self, request: &StartRequest) -> Result<WorkflowOutcome, TransportError>;

    async fn resume(&self, request: &ResumeRequest) -> Result<WorkflowOutcome, TransportError>;

    /// Returns whether the server dropped a pending task
    async fn reset(&self, session_id: &str) -> Result<bool, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn start(&self, request: &StartRequest) -> Result<WorkflowOutcome, TransportError> {
        (**self).start(request).await
    }

    async fn resume(&self, request: &ResumeRequest) -> Result<WorkflowOutcome, TransportError> {
        (**self).resume(request).await
    }

    async fn reset(&self, session_id: &str) -> Result<bool, TransportError> {
        (**self).reset(session_id).await
    }
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// Talks to a gateway server over HTTP/JSON
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Every request gives up after `timeout`, which surfaces as
    /// [`TransportError::Unreachable`] and leaves the request retryable.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::Setup(format!("invalid gateway URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Setup(format!(
                "gateway URL {base_url} cannot take a path"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded as a single
    /// path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::Setup(format!("gateway URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POST a JSON body and return the raw success body.
    /// Non-2xx responses are never parsed as envelopes.
    async fn post<B: Serialize + Sync>(
        &self,
        url: &Url,
        body: Option<&B>,
    ) -> Result<Vec<u8>, TransportError> {
        let mut request = self.client.post(url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        match serde_json::from_slice::<Rejection>(&bytes) {
            Ok(rejection) => Err(TransportError::Rejected(rejection)),
            Err(_) => {
                tracing::debug!(url = %url, status = %status, "Unrecognized error body");
                Err(TransportError::Unreachable(format!("server returned {status}")))
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&self, request: &StartRequest) -> Result<WorkflowOutcome, TransportError> {
        let url = self.endpoint(&["v1", "start"])?;
        let body = self.post(&url, Some(request)).await?;
        Ok(Envelope::decode(&body)?)
    }

    async fn resume(&self, request: &ResumeRequest) -> Result<WorkflowOutcome, TransportError> {
        let url = self.endpoint(&["v1", "resume"])?;
        let body = self.post(&url, Some(request)).await?;
        Ok(Envelope::decode(&body)?)
    }

    async fn reset(&self, session_id: &str) -> Result<bool, TransportError> {
        let url = self.endpoint(&["v1", "sessions", session_id, "reset"])?;
        let body = self.post::<()>(&url, None).await?;
        let response: ResetResponse =
            serde_json::from_slice(&body).map_err(|e| TransportError::Malformed(e.into()))?;
        Ok(response.reset)
    }
}

// ============================================================================
// In-process Transport
// ============================================================================

/// Calls a dispatcher in the same process, still going through the envelope
/// wire form so both ends see exactly what an HTTP client would
pub struct LocalTransport<W> {
    dispatcher: Arc<ResumeDispatcher<W>>,
}

impl<W> LocalTransport<W> {
    pub fn new(dispatcher: Arc<ResumeDispatcher<W>>) -> Self {
        Self { dispatcher }
    }
}

fn through_wire(outcome: &WorkflowOutcome) -> Result<WorkflowOutcome, TransportError> {
    let body = serde_json::to_vec(&Envelope::from(outcome)).map_err(EnvelopeError::from)?;
    Ok(Envelope::decode(&body)?)
}

fn rejected(error: &crate::dispatcher::DispatchError) -> TransportError {
    TransportError::Rejected(Rejection::new(error.code(), error.to_string()))
}

#[async_trait]
impl<W: Workflow> Transport for LocalTransport<W> {
    async fn start(&self, request: &StartRequest) -> Result<WorkflowOutcome, TransportError> {
        match self
            .dispatcher
            .start(&request.session_id, &request.message)
            .await
        {
            Ok(outcome) => through_wire(&outcome),
            Err(e) => Err(rejected(&e)),
        }
    }

    async fn resume(&self, request: &ResumeRequest) -> Result<WorkflowOutcome, TransportError> {
        match self
            .dispatcher
            .resume(&request.session_id, &request.to_reply())
            .await
        {
            Ok(outcome) => through_wire(&outcome),
            Err(e) => Err(rejected(&e)),
        }
    }

    async fn reset(&self, session_id: &str) -> Result<bool, TransportError> {
        self.dispatcher.reset(session_id).map_err(|e| rejected(&e))
    }
}
