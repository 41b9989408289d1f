//! In-memory credential slot
//!
//! At most one access credential is held per process. It starts as the
//! user-configured key (if any) and may be overwritten by an auto-provisioned
//! trial key. Nothing here is ever written to disk.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Header carrying the credential on service dispatch
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Where the held credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Supplied through configuration at startup
    Configured,
    /// Auto-provisioned trial key
    Trial,
}

/// Opaque bearer credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    source: CredentialSource,
}

impl Credential {
    pub fn configured(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            source: CredentialSource::Configured,
        }
    }

    pub fn trial(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            source: CredentialSource::Trial,
        }
    }

    /// Raw header value
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Shared handle to the process-wide credential slot.
///
/// Concurrent invocations that both provision a trial key race on `store`;
/// the last writer wins. Each invocation keeps using the snapshot it resolved.
#[derive(Debug, Clone, Default)]
pub struct CredentialSlot {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl CredentialSlot {
    pub fn new(initial: Option<Credential>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Snapshot of the current credential
    pub async fn current(&self) -> Option<Credential> {
        self.inner.read().await.clone()
    }

    /// Replace the held credential
    pub async fn store(&self, credential: Credential) {
        tracing::debug!(source = ?credential.source(), "Credential slot updated");
        *self.inner.write().await = Some(credential);
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_none()
    }
}
