//! Credential repository functions and the `nodes::credentials::CredentialLookup`
//! implementation nodes actually call through at execution time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use nodes::credentials::{CredentialLookup, DecryptedCredential};
use nodes::error::NodeError;

use crate::crypto;
use crate::{models::CredentialRow, DbError};

/// Store a new credential. `fields` is serialised to a JSON object and
/// encrypted as a single blob — a credential may carry several related
/// secrets (e.g. `apiKey` + `apiSecret`) under one id.
pub async fn create_credential(
    pool: &PgPool,
    workflow_id: Uuid,
    name: &str,
    fields: &HashMap<String, String>,
    key: &[u8; 32],
) -> Result<CredentialRow, DbError> {
    let id = Uuid::new_v4();
    let plaintext = serde_json::to_vec(fields).map_err(|_| DbError::Crypto)?;
    let encrypted_data = crypto::encrypt(&plaintext, key);

    let row = sqlx::query_as!(
        CredentialRow,
        r#"
        INSERT INTO credentials (id, workflow_id, name, encrypted_data, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, workflow_id, name, encrypted_data, created_at
        "#,
        id,
        workflow_id,
        name,
        encrypted_data,
        Utc::now(),
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_credentials(pool: &PgPool, workflow_id: Uuid) -> Result<Vec<CredentialRow>, DbError> {
    let rows = sqlx::query_as!(
        CredentialRow,
        r#"SELECT id, workflow_id, name, encrypted_data, created_at
           FROM credentials WHERE workflow_id = $1 ORDER BY created_at DESC"#,
        workflow_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn delete_credential(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query!("DELETE FROM credentials WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

async fn get_credential_row(pool: &PgPool, id: Uuid) -> Result<Option<CredentialRow>, DbError> {
    let row = sqlx::query_as!(
        CredentialRow,
        r#"SELECT id, workflow_id, name, encrypted_data, created_at FROM credentials WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

fn decrypt_row(row: &CredentialRow, key: &[u8; 32]) -> Result<DecryptedCredential, DbError> {
    let plaintext = crypto::decrypt(&row.encrypted_data, key)?;
    let fields: HashMap<String, String> = serde_json::from_slice(&plaintext).map_err(|_| DbError::Crypto)?;
    Ok(DecryptedCredential { fields })
}

/// The `CredentialLookup` the `engine`/`nodes` crates call through at
/// execution time. Holds the Postgres pool and the process's
/// `ENCRYPTION_KEY`-derived AES key (spec §6).
pub struct DbCredentialLookup {
    pool: PgPool,
    key: [u8; 32],
}

impl DbCredentialLookup {
    pub fn new(pool: PgPool, key: [u8; 32]) -> Arc<Self> {
        Arc::new(Self { pool, key })
    }
}

#[async_trait]
impl CredentialLookup for DbCredentialLookup {
    async fn get(&self, credential_id: Uuid) -> Result<Option<DecryptedCredential>, NodeError> {
        let row = get_credential_row(&self.pool, credential_id)
            .await
            .map_err(|e| NodeError::Fatal(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let decrypted = decrypt_row(&row, &self.key).map_err(|_| NodeError::Fatal("Failed to decrypt data".into()))?;
        Ok(Some(decrypted))
    }
}
