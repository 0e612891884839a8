// Authenticated API client
//
// Every call runs through the middleware pipeline (bearer auth, latency
// logging). A 401 on a request that has not been replayed yet triggers one
// refresh of the access token and one replay; nothing else is retried.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::pipeline::{Exchange, Pipeline, log_terminal_error};
use crate::refresh::{LastRefresh, RefreshGate, RefreshOutcome, RefreshPolicy};
use crate::request::{RequestDescriptor, RequestMetadata};
use crate::response::ApiResponse;
use crate::session::{Session, SharedSessionStore};
use crate::transport::TransportConfig;

/// Base endpoint used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Async client for the netconsole REST API.
///
/// Holds the shared session store; cloning the store handle into several
/// clients makes them share one login.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SharedSessionStore,
    pipeline: Pipeline,
    refresh_policy: RefreshPolicy,
    refresh_gate: RefreshGate,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` with a fresh `reqwest::Client`.
    pub fn new(
        base_url: &str,
        session: SharedSessionStore,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, session)
    }

    /// Wrap an existing `reqwest::Client`.
    ///
    /// The standard pipeline is installed; replace it with
    /// [`with_pipeline`](Self::with_pipeline) to add stages.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        session: SharedSessionStore,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let pipeline = Pipeline::standard(Arc::clone(&session));
        Ok(Self {
            http,
            base_url,
            session,
            pipeline,
            refresh_policy: RefreshPolicy::default(),
            refresh_gate: RefreshGate::default(),
        })
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Parse the base endpoint and drop any trailing slash.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidPath {
                path: raw.into(),
                reason: "base endpoint must be a hierarchical http(s) URL".into(),
            });
        }
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&path);
        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SharedSessionStore {
        &self.session
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_policy
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a path onto the base endpoint.
    ///
    /// Rejects absolute URLs and paths that already start with the base
    /// path, so `/api` never ends up in the URL twice.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        if Url::parse(path).is_ok_and(|url| url.has_host()) {
            return Err(Error::InvalidPath {
                path: path.into(),
                reason: "expected a path relative to the base endpoint, not a URL".into(),
            });
        }

        let relative = path.trim_start_matches('/');
        let base_path = self.base_url.path().trim_matches('/');
        if !base_path.is_empty()
            && (relative == base_path || relative.starts_with(&format!("{base_path}/")))
        {
            return Err(Error::InvalidPath {
                path: path.into(),
                reason: format!("already includes the base path '/{base_path}'"),
            });
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{relative}"))?)
    }

    // ── Core request path ────────────────────────────────────────────

    /// Issue a request, recovering once from an expired access token.
    ///
    /// Terminal errors are logged with message, status and path before
    /// being returned unchanged.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, Error> {
        let path = descriptor.path.clone();
        let outcome = self.send_with_recovery(descriptor).await;
        if let Err(ref err) = outcome {
            log_terminal_error(&path, err);
        }
        outcome
    }

    async fn send_with_recovery(
        &self,
        mut descriptor: RequestDescriptor,
    ) -> Result<ApiResponse, Error> {
        let sent = self.pipeline.prepare(descriptor.clone())?;
        let unauthorized = match self.dispatch(&sent).await {
            Err(err) if err.is_unauthorized() && !descriptor.is_retried() => err,
            other => return other,
        };

        descriptor.mark_retried();
        let token = self.recover(unauthorized, &sent).await?;

        let mut replay = self.pipeline.prepare(descriptor)?;
        replay.set_bearer(&token)?;
        debug!(path = %replay.path, "replaying request with refreshed token");
        self.dispatch(&replay).await
    }

    /// Send one attempt and run the response stages over its outcome.
    async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse, Error> {
        let url = self.url_for(&request.path)?;
        debug!("{} {url}", request.method);

        let exchange = Exchange {
            method: request.method.clone(),
            path: request.path.clone(),
            retried: request.is_retried(),
            metadata: RequestMetadata::start(),
        };

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let outcome = match builder.send().await {
            Ok(resp) => ApiResponse::read(resp, &exchange.metadata).await,
            Err(e) => Err(Error::Transport(e)),
        };
        self.pipeline.complete(&exchange, outcome)
    }

    // ── 401 recovery ─────────────────────────────────────────────────

    /// Obtain a fresh access token after `sent` was rejected with 401.
    ///
    /// Returns the token to replay with, or the terminal error.
    async fn recover(
        &self,
        unauthorized: Error,
        sent: &RequestDescriptor,
    ) -> Result<SecretString, Error> {
        let Some(mut last) = self.refresh_gate.enter(self.refresh_policy).await else {
            return self.refresh_session(unauthorized).await;
        };

        if let Some(current) = self.session.get()? {
            if !sent.carries_bearer(&current.access_token) {
                debug!("reusing access token replaced since the request was sent");
                return Ok(current.access_token);
            }
        }
        // The store is empty or still holds the token we sent. If a refresh
        // already ran for that token, its outcome is ours too.
        let sent_auth = sent.headers.get(reqwest::header::AUTHORIZATION);
        if let Some(previous) = last.as_ref().filter(|l| l.replaced.as_ref() == sent_auth) {
            debug!("adopting the outcome of a concurrent refresh");
            return previous.outcome.clone().into_token(unauthorized);
        }

        let outcome = self.refresh_once().await?;
        *last = Some(LastRefresh {
            replaced: sent_auth.cloned(),
            outcome: outcome.clone(),
        });
        outcome.into_token(unauthorized)
    }

    /// Swap the stored access token for a new one via the refresh endpoint.
    ///
    /// Without a refresh token the session is dropped and `unauthorized`
    /// is returned as-is. A failed refresh drops the session and surfaces
    /// the refresh error as [`Error::SessionInvalid`].
    pub(crate) async fn refresh_session(&self, unauthorized: Error) -> Result<SecretString, Error> {
        self.refresh_once().await?.into_token(unauthorized)
    }

    /// One refresh attempt against whatever the store holds right now.
    /// `Err` is reserved for session-store failures.
    async fn refresh_once(&self) -> Result<RefreshOutcome, Error> {
        let refresh_token = self
            .session
            .get()?
            .and_then(|s| s.refresh_token)
            .filter(|t| !t.expose_secret().is_empty());

        let Some(refresh_token) = refresh_token else {
            warn!("access token rejected and no refresh token stored, dropping session");
            self.session.clear()?;
            return Ok(RefreshOutcome::NoRefreshToken);
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(refreshed) => {
                let access_token = refreshed.token;
                let refresh_token = refreshed.refresh_token.unwrap_or(refresh_token);
                self.session.set(Session {
                    access_token: access_token.clone(),
                    refresh_token: Some(refresh_token),
                })?;
                info!("access token refreshed");
                Ok(RefreshOutcome::Refreshed(access_token))
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, dropping session");
                self.session.clear()?;
                Ok(RefreshOutcome::Failed(Arc::new(err)))
            }
        }
    }

    // ── Typed verb helpers ───────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(RequestDescriptor::get(path)).await?.json()
    }

    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let descriptor = params
            .iter()
            .fold(RequestDescriptor::get(path), |req, (k, v)| {
                req.query(*k, v.as_str())
            });
        self.request(descriptor).await?.json()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(RequestDescriptor::post(path).json(body)?)
            .await?
            .json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(RequestDescriptor::put(path).json(body)?)
            .await?
            .json()
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(RequestDescriptor::patch(path).json(body)?)
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.request(RequestDescriptor::delete(path)).await?;
        Ok(())
    }
}
