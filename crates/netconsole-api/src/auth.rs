// Session authentication
//
// Username/password login establishes the session; the refresh endpoint
// trades the refresh token for a new access token. Neither call runs the
// request stages, so a stale bearer header never rides along. Login still
// passes its outcome through the response stages to be timed like any
// other call.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::Error;
use crate::pipeline::Exchange;
use crate::request::RequestMetadata;
use crate::response::ApiResponse;
use crate::session::Session;

/// Login endpoint, relative to the base URL.
pub const LOGIN_PATH: &str = "/auth/login";
/// Refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "/auth/refresh";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    #[serde(default)]
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// The authenticated user as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Successful login: the new session plus the user profile, if sent.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
    pub user: Option<User>,
}

/// Successful refresh. The backend may rotate the refresh token; when it
/// doesn't, the old one stays in use.
#[derive(Debug, Clone)]
pub struct RefreshResponse {
    pub token: SecretString,
    pub refresh_token: Option<SecretString>,
}

fn non_empty(token: Option<String>) -> Option<SecretString> {
    token.filter(|t| !t.is_empty()).map(SecretString::from)
}

impl ApiClient {
    /// Authenticate with username/password and store the resulting session.
    ///
    /// `POST {base}/auth/login` → `{ token, refreshToken, user }`.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, Error> {
        let url = self.url_for(LOGIN_PATH)?;
        debug!("logging in at {url}");

        let exchange = Exchange {
            method: Method::POST,
            path: LOGIN_PATH.into(),
            retried: false,
            metadata: RequestMetadata::start(),
        };
        let sent = self
            .http()
            .post(url)
            .json(&LoginRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await;
        let outcome = match sent {
            Ok(resp) => ApiResponse::read(resp, &exchange.metadata).await,
            Err(e) => Err(Error::Transport(e)),
        };

        let payload: TokenPayload = match self.pipeline().complete(&exchange, outcome) {
            Ok(resp) => resp.json()?,
            Err(err @ Error::Http { .. }) => {
                return Err(Error::Authentication {
                    message: format!("login failed: {}", err.display_message()),
                });
            }
            Err(err) => return Err(err),
        };

        if payload.token.is_empty() {
            return Err(Error::Authentication {
                message: "login response carried no token".into(),
            });
        }

        let session = Session {
            access_token: SecretString::from(payload.token),
            refresh_token: non_empty(payload.refresh_token),
        };
        self.session().set(session.clone())?;

        info!(username, "login successful");
        Ok(LoginResponse {
            session,
            user: payload.user,
        })
    }

    /// Drop the local session. The backend keeps no server-side state to
    /// revoke, so this never touches the network.
    pub fn logout(&self) -> Result<(), Error> {
        self.session().clear()?;
        debug!("session cleared");
        Ok(())
    }

    /// Whether an access token is currently stored.
    pub fn is_authenticated(&self) -> Result<bool, Error> {
        Ok(self.session().get()?.is_some())
    }

    /// Refresh the access token on demand.
    ///
    /// Fails with [`Error::Authentication`] without touching the store when
    /// no refresh token is held. A rejected refresh drops the session.
    pub async fn refresh(&self) -> Result<Session, Error> {
        let can_refresh = self
            .session()
            .get()?
            .is_some_and(|session| session.can_refresh());
        if !can_refresh {
            return Err(Error::Authentication {
                message: "no refresh token stored".into(),
            });
        }

        let missing = Error::Authentication {
            message: "refresh token disappeared before refresh".into(),
        };
        self.refresh_session(missing).await?;
        self.session()
            .get()?
            .ok_or_else(|| Error::SessionStore("session vanished right after refresh".into()))
    }

    /// `POST {base}/auth/refresh` with `{ refreshToken }`.
    pub(crate) async fn exchange_refresh_token(
        &self,
        refresh_token: &SecretString,
    ) -> Result<RefreshResponse, Error> {
        let url = self.url_for(REFRESH_PATH)?;
        debug!("refreshing access token at {url}");

        let metadata = RequestMetadata::start();
        let resp = self
            .http()
            .post(url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;
        let payload: TokenPayload = ApiResponse::read(resp, &metadata).await?.json()?;

        let token = non_empty(Some(payload.token)).ok_or_else(|| Error::Authentication {
            message: "refresh response carried no token".into(),
        })?;
        Ok(RefreshResponse {
            token,
            refresh_token: non_empty(payload.refresh_token),
        })
    }
}
