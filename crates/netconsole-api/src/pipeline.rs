// Request/response middleware pipeline
//
// Request stages transform the descriptor before dispatch; response stages
// observe or transform the outcome of each attempt. Both lists are folded
// in insertion order. Token-refresh recovery is not a stage: it spans
// several network calls and lives in `ApiClient`.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, error};

use crate::error::Error;
use crate::request::{RequestDescriptor, RequestMetadata};
use crate::response::ApiResponse;
use crate::session::SharedSessionStore;

/// Context for one dispatched attempt, handed to response stages.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: Method,
    pub path: String,
    pub retried: bool,
    pub metadata: RequestMetadata,
}

/// Transforms a request before it is sent.
pub trait RequestStage: Send + Sync {
    fn on_request(&self, request: RequestDescriptor) -> Result<RequestDescriptor, Error>;
}

/// Observes or transforms the outcome of an attempt.
pub trait ResponseStage: Send + Sync {
    fn on_response(
        &self,
        exchange: &Exchange,
        outcome: Result<ApiResponse, Error>,
    ) -> Result<ApiResponse, Error>;
}

/// Ordered stage lists.
#[derive(Clone, Default)]
pub struct Pipeline {
    request: Vec<Arc<dyn RequestStage>>,
    response: Vec<Arc<dyn ResponseStage>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_stages", &self.request.len())
            .field("response_stages", &self.response.len())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bearer auth on the way out, latency logging on the way back.
    pub fn standard(session: SharedSessionStore) -> Self {
        Self::new()
            .with_request_stage(BearerAuth::new(session))
            .with_response_stage(LatencyLog)
    }

    pub fn with_request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.request.push(Arc::new(stage));
        self
    }

    pub fn with_response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.response.push(Arc::new(stage));
        self
    }

    /// Run every request stage in order. The first error aborts.
    pub fn prepare(&self, request: RequestDescriptor) -> Result<RequestDescriptor, Error> {
        self.request
            .iter()
            .try_fold(request, |req, stage| stage.on_request(req))
    }

    /// Run every response stage in order over an attempt's outcome.
    pub fn complete(
        &self,
        exchange: &Exchange,
        outcome: Result<ApiResponse, Error>,
    ) -> Result<ApiResponse, Error> {
        self.response
            .iter()
            .fold(outcome, |out, stage| stage.on_response(exchange, out))
    }
}

// ── Built-in stages ─────────────────────────────────────────────────

/// Sets `Authorization: Bearer <token>` from the session store when a
/// token is present. Without a session the request is left untouched.
pub struct BearerAuth {
    session: SharedSessionStore,
}

impl BearerAuth {
    pub fn new(session: SharedSessionStore) -> Self {
        Self { session }
    }
}

impl RequestStage for BearerAuth {
    fn on_request(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor, Error> {
        if let Some(session) = self.session.get()? {
            request.set_bearer(&session.access_token)?;
        }
        Ok(request)
    }
}

/// Emits elapsed time for every attempt, success or failure.
pub struct LatencyLog;

impl ResponseStage for LatencyLog {
    fn on_response(
        &self,
        exchange: &Exchange,
        outcome: Result<ApiResponse, Error>,
    ) -> Result<ApiResponse, Error> {
        let elapsed_ms =
            u64::try_from(exchange.metadata.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = match &outcome {
            Ok(resp) => Some(resp.status().as_u16()),
            Err(err) => err.status(),
        };
        debug!(
            method = %exchange.method,
            path = %exchange.path,
            status,
            retried = exchange.retried,
            elapsed_ms,
            "API request duration"
        );
        outcome
    }
}

/// Report a terminal error: message, status and path. Observational only.
pub fn log_terminal_error(path: &str, err: &Error) {
    error!(
        detail = %err.display_message(),
        status = err.status(),
        url = path,
        "API error"
    );
}
