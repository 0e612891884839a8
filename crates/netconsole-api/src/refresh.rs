// Token refresh coordination
//
// When several in-flight requests hit 401 at once, each may refresh on its
// own (`Independent`) or queue behind one shared refresh (`SingleFlight`).

use std::sync::Arc;

use reqwest::header::HeaderValue;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::Error;

/// How concurrent 401 recoveries are coordinated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Every request that hits 401 issues its own refresh call.
    #[default]
    Independent,
    /// The first request refreshes; concurrent ones wait and reuse the
    /// token it obtained.
    SingleFlight,
}

impl RefreshPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::SingleFlight => "single-flight",
        }
    }
}

impl std::fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "independent" => Ok(Self::Independent),
            "single-flight" | "single_flight" | "singleflight" => Ok(Self::SingleFlight),
            other => Err(format!(
                "expected 'independent' or 'single-flight', got '{other}'"
            )),
        }
    }
}

/// What one refresh attempt ended with, in a form every waiting request
/// can share.
#[derive(Debug, Clone)]
pub(crate) enum RefreshOutcome {
    Refreshed(SecretString),
    /// No refresh token was stored; the session has been dropped.
    NoRefreshToken,
    /// The refresh call failed; the session has been dropped.
    Failed(Arc<Error>),
}

impl RefreshOutcome {
    /// The token to replay with, or the error the rejected request ends with.
    ///
    /// `unauthorized` is the request's own 401, returned unchanged when
    /// there was nothing to refresh with.
    pub(crate) fn into_token(self, unauthorized: Error) -> Result<SecretString, Error> {
        match self {
            Self::Refreshed(token) => Ok(token),
            Self::NoRefreshToken => Err(unauthorized),
            Self::Failed(source) => Err(Error::SessionInvalid { source }),
        }
    }
}

/// The most recent refresh run under the gate, keyed by the
/// `Authorization` header it replaced.
#[derive(Debug)]
pub(crate) struct LastRefresh {
    pub(crate) replaced: Option<HeaderValue>,
    pub(crate) outcome: RefreshOutcome,
}

/// Serialises refreshes under [`RefreshPolicy::SingleFlight`].
///
/// Holding the guard means no other refresh is running. The guarded slot
/// records the last outcome, so a request that was rejected with the same
/// stale token adopts it instead of refreshing again.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    last: Mutex<Option<LastRefresh>>,
}

impl RefreshGate {
    /// `None` under the independent policy: no coordination at all.
    pub(crate) async fn enter(
        &self,
        policy: RefreshPolicy,
    ) -> Option<MutexGuard<'_, Option<LastRefresh>>> {
        match policy {
            RefreshPolicy::Independent => None,
            RefreshPolicy::SingleFlight => Some(self.last.lock().await),
        }
    }
}
