use crate::error::SessionError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// How long a stored token stays usable after login.
pub const TOKEN_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// The one bearer-token slot of the client.
///
/// Screens never touch the file directly; they ask the session for the token
/// and the app host is the only caller of [`Session::set`] and [`Session::clear`].
#[derive(Debug, Default)]
pub struct Session {
    path: Option<PathBuf>,
    current: Option<StoredToken>,
}

impl Session {
    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the session file. A missing or malformed file, or one holding an
    /// expired token, yields an empty session.
    pub fn load(path: PathBuf) -> Result<Self, SessionError> {
        let current = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<StoredToken>(&data) {
                Ok(stored) => Some(stored).filter(|t| t.is_live(Utc::now())),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "ignoring malformed session file"
                    );
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            current,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|t| t.is_live(Utc::now()))
            .map(|t| t.token.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.token().is_some()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|t| t.expires_at)
    }

    pub fn set(&mut self, token: String) -> Result<(), SessionError> {
        let stored = StoredToken {
            token,
            expires_at: Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS),
        };
        if let Some(path) = &self.path {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|source| SessionError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            // write then rename so a crash never leaves a half-written file
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, serde_json::to_string_pretty(&stored)?)
                .and_then(|()| fs::rename(&tmp, path))
                .map_err(|source| SessionError::Io {
                    path: path.clone(),
                    source,
                })?;
        }
        self.current = Some(stored);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.current = None;
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Io {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}
