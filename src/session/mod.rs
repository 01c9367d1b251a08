#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ConfigError;
use crate::{PlaygroundError, Result};

/// Name of the signed cookie carrying the session id
pub const SESSION_COOKIE: &str = "__session";

/// One client's server-side state: an opaque id plus a map of string keys to
/// arbitrary JSON values.
///
/// "Clearing" a key means setting it to an empty value; keys are never
/// removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    values: BTreeMap<String, Value>,
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            values: BTreeMap::new(),
        }
    }

    fn with_id(id: Uuid) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read a typed value; a missing key or a value of the wrong shape both
    /// yield `None`
    #[inline]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Session value for key '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    #[inline]
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to serialize session value for key '{}'", key))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

impl Default for Session {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// File-per-session storage keyed by a signed cookie.
///
/// Sessions live as `<dir>/<uuid>.json`; the cookie carries only the id.
#[derive(Clone)]
pub struct SessionStore {
    dir: PathBuf,
    key: Key,
}

impl SessionStore {
    #[inline]
    pub fn new(dir: PathBuf, cookie_secret: &str) -> Result<Self> {
        if cookie_secret.len() < 32 {
            return Err(PlaygroundError::Config(
                ConfigError::CookieSecretTooShort(cookie_secret.len()).to_string(),
            ));
        }

        Ok(Self {
            dir,
            key: Key::derive_from(cookie_secret.as_bytes()),
        })
    }

    /// Signing key for the cookie jar extractor
    #[inline]
    pub fn cookie_key(&self) -> Key {
        self.key.clone()
    }

    /// Load the session identified by the request's cookie jar.
    ///
    /// An absent or invalid cookie yields a fresh empty session; a missing or
    /// unparseable session file yields an empty session that keeps the
    /// cookie's id. Only a storage-layer I/O failure is an error
    /// (`SessionUnavailable`).
    #[inline]
    pub fn load(&self, jar: &SignedCookieJar) -> Result<Session> {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            debug!("No session cookie present, starting empty session");
            return Ok(Session::new());
        };

        let Ok(id) = Uuid::parse_str(cookie.value()) else {
            warn!("Session cookie carried a non-UUID value, starting empty session");
            return Ok(Session::new());
        };

        let path = self.session_path(id);
        if !path.exists() {
            return Ok(Session::with_id(id));
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            PlaygroundError::SessionUnavailable(format!(
                "Failed to read session file {}: {}",
                path.display(),
                e
            ))
        })?;

        match serde_json::from_str(&content) {
            Ok(values) => Ok(Session { id, values }),
            Err(e) => {
                warn!(
                    "Session file {} is not valid JSON ({}), starting empty session",
                    path.display(),
                    e
                );
                Ok(Session::with_id(id))
            }
        }
    }

    /// `load`, recovering from storage failure by logging and falling back to
    /// an empty session
    #[inline]
    pub fn load_or_empty(&self, jar: &SignedCookieJar) -> Session {
        match self.load(jar) {
            Ok(session) => session,
            Err(e) => {
                warn!("Session storage unavailable, continuing with empty session: {}", e);
                Session::new()
            }
        }
    }

    /// Persist the session's contents and return the cookie to set on the
    /// response
    #[inline]
    pub fn commit(&self, session: &Session) -> Result<Cookie<'static>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PlaygroundError::SessionUnavailable(format!(
                "Failed to create session directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.session_path(session.id);
        let content = serde_json::to_string(&session.values)
            .context("Failed to serialize session values")?;

        fs::write(&path, content).map_err(|e| {
            PlaygroundError::SessionUnavailable(format!(
                "Failed to write session file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Committed session {}", session.id);

        Ok(Cookie::build((SESSION_COOKIE, session.id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .build())
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}
