use thiserror::Error;
use tracing::{info, warn};

use super::storage::{Storage, StorageError, CREDENTIAL_KEY};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key must not be empty")]
    Empty,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Holds the API key that authorizes generation calls.
///
/// Until a key is committed the workflow stays gated. A committed key can
/// be replaced through `commit` but never cleared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CredentialHolder {
    value: Option<String>,
}

impl CredentialHolder {
    /// Load the persisted key, if any. Read failures count as "no key".
    pub fn load(storage: &dyn Storage) -> Self {
        match storage.get(CREDENTIAL_KEY) {
            Ok(value) => Self {
                value: value.filter(|v| !v.trim().is_empty()),
            },
            Err(e) => {
                warn!(error = %e, "Could not read stored API key");
                Self::default()
            }
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Persist `value` and make it the active key.
    ///
    /// Surrounding whitespace is trimmed; a blank value is rejected and
    /// nothing is written.
    pub fn commit(&mut self, storage: &dyn Storage, value: &str) -> Result<(), CredentialError> {
        let value = value.trim();
        if value.is_empty() {
            warn!("Rejected empty API key");
            return Err(CredentialError::Empty);
        }

        storage.set(CREDENTIAL_KEY, value)?;
        self.value = Some(value.to_string());

        info!("API key committed");
        Ok(())
    }
}
