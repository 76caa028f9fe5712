//! The stable interface the engine uses to look up decrypted credentials.
//!
//! The encrypted credential store itself (AES-256-GCM at rest, keyed by
//! `ENCRYPTION_KEY`) is an external collaborator out of the core's scope —
//! only this lookup contract lives here, implemented by the `db` crate.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::NodeError;

/// A credential as handed to a node after decryption.
#[derive(Debug, Clone, Default)]
pub struct DecryptedCredential {
    pub fields: HashMap<String, String>,
}

impl DecryptedCredential {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn get(&self, credential_id: Uuid) -> Result<Option<DecryptedCredential>, NodeError>;
}

/// Used in tests and wherever a workflow has no credential store wired up.
/// Every lookup resolves to "no credential available", matching the
/// graceful-degradation contract for HTTP auth in spec §7.
pub struct NoCredentials;

#[async_trait]
impl CredentialLookup for NoCredentials {
    async fn get(&self, _credential_id: Uuid) -> Result<Option<DecryptedCredential>, NodeError> {
        Ok(None)
    }
}
