//! Persistent anonymous installation identifier
//!
//! The identifier is created lazily the first time telemetry or trial
//! provisioning needs it, written to `<config_dir>/install_id`, and read back
//! on every later run. Within a process the value is cached after the first
//! successful lookup.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;

/// File name holding the identifier inside the config directory
pub const INSTALL_ID_FILE: &str = "install_id";

/// Human-readable prefix of generated identifiers
pub const INSTALL_ID_PREFIX: &str = "mcp-";

/// Number of random hex characters following the prefix
const INSTALL_ID_HEX_LEN: usize = 16;

/// Errors raised while locating or persisting the installation identifier
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Could not determine the home directory for the default config location")]
    NoHomeDir,

    #[error("Failed to create config directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read installation id from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write installation id to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opaque installation identifier (`mcp-` followed by random hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallationId(String);

impl InstallationId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", INSTALL_ID_PREFIX, &hex[..INSTALL_ID_HEX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default config directory: `$HOME/.coinrailz`
pub fn default_config_dir() -> Result<PathBuf, IdentityError> {
    dirs::home_dir()
        .map(|home| home.join(".coinrailz"))
        .ok_or(IdentityError::NoHomeDir)
}

/// Get-or-create store for the installation identifier
#[derive(Debug)]
pub struct IdentityStore {
    dir: PathBuf,
    cached: OnceCell<InstallationId>,
}

impl IdentityStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cached: OnceCell::new(),
        }
    }

    /// Directory holding the identity file
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the identity file
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(INSTALL_ID_FILE)
    }

    /// Return the installation id, creating and persisting it on first use.
    ///
    /// Failures are returned to the caller and nothing is cached, so a
    /// transient I/O problem never yields an unpersisted identity.
    pub async fn get_or_create(&self) -> Result<InstallationId, IdentityError> {
        self.cached
            .get_or_try_init(|| self.load_or_generate())
            .await
            .cloned()
    }

    async fn load_or_generate(&self) -> Result<InstallationId, IdentityError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| IdentityError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.file_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    tracing::debug!(path = %path.display(), "Loaded installation id");
                    return Ok(InstallationId(trimmed.to_string()));
                }
                tracing::warn!(path = %path.display(), "Installation id file is empty, regenerating");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(IdentityError::Read { path, source }),
        }

        let id = InstallationId::generate();
        tokio::fs::write(&path, id.as_str())
            .await
            .map_err(|source| IdentityError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Created new installation id");
        Ok(id)
    }
}
