// Session credential storage
//
// The access/refresh token pair is process-wide shared state: every
// in-flight request reads it and any recovery path may replace or clear
// it. Stores hand out snapshots; the last writer wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::Error;

/// Persisted key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "authToken";
/// Persisted key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// An authenticated session: one access token, optionally a refresh token.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        }
    }

    /// Whether a non-empty refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }
}

/// Shared handle to a session store.
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Credential store for the current session.
///
/// `set` replaces both tokens in one step; `clear` drops the session.
/// An empty store means "not logged in".
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Result<Option<Session>, Error>;
    fn set(&self, session: Session) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

// ── In-memory ───────────────────────────────────────────────────────

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    current: ArcSwapOption<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<Session>, Error> {
        Ok(self.current.load_full().map(|s| Session::clone(&s)))
    }

    fn set(&self, session: Session) -> Result<(), Error> {
        self.current.store(Some(Arc::new(session)));
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.current.store(None);
        Ok(())
    }
}

// ── File-backed ─────────────────────────────────────────────────────

/// On-disk layout: two string values under fixed keys.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl StoredTokens {
    fn into_session(self) -> Option<Session> {
        let access = self.auth_token.filter(|t| !t.is_empty())?;
        Some(Session::new(access, self.refresh_token))
    }
}

/// JSON file store. The file is read once at open; afterwards the cached
/// snapshot is authoritative and every change is written through.
pub struct FileSessionStore {
    path: PathBuf,
    current: ArcSwapOption<Session>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let session = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<StoredTokens>(&raw)
                .map_err(|e| {
                    Error::SessionStore(format!("corrupt session file {}: {e}", path.display()))
                })?
                .into_session(),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(Error::SessionStore(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        debug!(path = %path.display(), loaded = session.is_some(), "opened session file");
        Ok(Self {
            path,
            current: ArcSwapOption::new(session.map(Arc::new)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, tokens: &StoredTokens) -> Result<(), Error> {
        let io_err =
            |e: std::io::Error| Error::SessionStore(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(tokens)?;

        // Write to a sibling and rename so readers never see a torn file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        restrict_permissions(&tmp).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<Session>, Error> {
        Ok(self.current.load_full().map(|s| Session::clone(&s)))
    }

    fn set(&self, session: Session) -> Result<(), Error> {
        let tokens = StoredTokens {
            auth_token: Some(session.access_token.expose_secret().to_owned()),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
        };
        self.write(&tokens)?;
        self.current.store(Some(Arc::new(session)));
        trace!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.current.store(None);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::SessionStore(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

// ── System keyring ──────────────────────────────────────────────────

/// Keyring store: one entry per token under a fixed service name.
pub struct KeyringSessionStore {
    access: keyring::Entry,
    refresh: keyring::Entry,
    current: ArcSwapOption<Session>,
}

fn keyring_err(e: &keyring::Error) -> Error {
    Error::SessionStore(format!("keyring: {e}"))
}

fn read_entry(entry: &keyring::Entry) -> Result<Option<String>, Error> {
    match entry.get_password() {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(keyring_err(&e)),
    }
}

fn delete_entry(entry: &keyring::Entry) -> Result<(), Error> {
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(keyring_err(&e)),
    }
}

impl KeyringSessionStore {
    pub fn open(service: &str) -> Result<Self, Error> {
        let access = keyring::Entry::new(service, ACCESS_TOKEN_KEY).map_err(|e| keyring_err(&e))?;
        let refresh =
            keyring::Entry::new(service, REFRESH_TOKEN_KEY).map_err(|e| keyring_err(&e))?;
        let store = Self::from_entries(access, refresh)?;
        debug!(
            service,
            loaded = store.current.load().is_some(),
            "opened keyring session store"
        );
        Ok(store)
    }

    fn from_entries(access: keyring::Entry, refresh: keyring::Entry) -> Result<Self, Error> {
        let session = StoredTokens {
            auth_token: read_entry(&access)?,
            refresh_token: read_entry(&refresh)?,
        }
        .into_session();

        Ok(Self {
            access,
            refresh,
            current: ArcSwapOption::new(session.map(Arc::new)),
        })
    }
}

impl SessionStore for KeyringSessionStore {
    fn get(&self) -> Result<Option<Session>, Error> {
        Ok(self.current.load_full().map(|s| Session::clone(&s)))
    }

    fn set(&self, session: Session) -> Result<(), Error> {
        let previous = self.current.load_full();
        self.access
            .set_password(session.access_token.expose_secret())
            .map_err(|e| keyring_err(&e))?;

        let refresh_written = match &session.refresh_token {
            Some(token) => self
                .refresh
                .set_password(token.expose_secret())
                .map_err(|e| keyring_err(&e)),
            None => delete_entry(&self.refresh),
        };
        if let Err(err) = refresh_written {
            // Both entries change together or not at all.
            let restored = match previous.as_deref() {
                Some(old) => self
                    .access
                    .set_password(old.access_token.expose_secret())
                    .map_err(|e| keyring_err(&e)),
                None => delete_entry(&self.access),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "could not restore previous access token");
            }
            return Err(err);
        }

        self.current.store(Some(Arc::new(session)));
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.current.store(None);
        delete_entry(&self.access)?;
        delete_entry(&self.refresh)
    }
}
