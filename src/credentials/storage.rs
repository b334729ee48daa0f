//! Encrypted token blob storage using SQLite.
//!
//! Each row lives for a fixed TTL from its last write, the way a key with an
//! expiry would in a key-value store. Reads ignore expired rows; the periodic
//! sweep deletes them.

use super::{encryption, Credentials};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use crmhub_model::Provider;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Encrypted credential storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE credentials (
///     id INTEGER PRIMARY KEY,
///     provider TEXT NOT NULL,
///     org_id TEXT NOT NULL,
///     user_id TEXT NOT NULL,
///     blob TEXT NOT NULL,          -- base64(nonce || AES-GCM ciphertext)
///     expires_at TEXT NOT NULL,    -- RFC 3339, end of the row's TTL
///     updated_at TEXT NOT NULL,    -- RFC 3339
///     UNIQUE(provider, org_id, user_id)
/// );
/// ```
pub struct CredentialStore {
    conn: Mutex<Connection>,
    encryption_key: Vec<u8>,
}

impl CredentialStore {
    /// Creates or opens a credential store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (`:memory:` for tests)
    /// * `encryption_key` - Base64-encoded 32-byte master key
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self> {
        let key_bytes =
            encryption::validate_key(encryption_key).context("Invalid encryption key")?;

        let conn = Connection::open(db_path).context("Failed to open database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY,
                provider TEXT NOT NULL,
                org_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                blob TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(provider, org_id, user_id)
            )
            "#,
            [],
        )
        .context("Failed to create credentials table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_credentials_expires_at ON credentials(expires_at)",
            [],
        )
        .context("Failed to create index")?;

        Ok(Self {
            conn: Mutex::new(conn),
            encryption_key: key_bytes,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Credential store lock poisoned"))
    }

    /// Stores (or replaces) the blob for a provider/org/user, live for `ttl`.
    pub fn store(
        &self,
        provider: Provider,
        org_id: &str,
        user_id: &str,
        credentials: &Credentials,
        ttl: Duration,
    ) -> Result<()> {
        self.store_at(provider, org_id, user_id, credentials, ttl, Utc::now())
    }

    fn store_at(
        &self,
        provider: Provider,
        org_id: &str,
        user_id: &str,
        credentials: &Credentials,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let plaintext =
            serde_json::to_string(credentials).context("Failed to serialize credentials")?;
        let sealed = encryption::seal(&plaintext, &self.encryption_key)
            .context("Failed to encrypt credentials")?;

        let expires_at = now
            .checked_add_signed(ttl)
            .map(sortable_timestamp)
            .context("Credential TTL out of range")?;

        self.conn()?
            .execute(
                r#"
                INSERT INTO credentials (provider, org_id, user_id, blob, expires_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(provider, org_id, user_id) DO UPDATE SET
                    blob = excluded.blob,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at
                "#,
                params![
                    provider.as_str(),
                    org_id,
                    user_id,
                    sealed,
                    expires_at,
                    sortable_timestamp(now),
                ],
            )
            .context("Failed to store credentials")?;

        Ok(())
    }

    /// Retrieves the blob for a provider/org/user.
    ///
    /// # Returns
    /// * `Ok(Some(_))` - Found, within its TTL, decrypted
    /// * `Ok(None)` - Never stored or past its TTL
    /// * `Err` - Decryption or database failure
    pub fn get(&self, provider: Provider, org_id: &str, user_id: &str) -> Result<Option<Credentials>> {
        self.get_at(provider, org_id, user_id, Utc::now())
    }

    fn get_at(
        &self,
        provider: Provider,
        org_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Credentials>> {
        let row: Option<(String, String)> = self
            .conn()?
            .query_row(
                r#"
                SELECT blob, expires_at
                FROM credentials
                WHERE provider = ?1 AND org_id = ?2 AND user_id = ?3
                "#,
                params![provider.as_str(), org_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to query credentials")?;

        let Some((sealed, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .context("Failed to parse expires_at timestamp")?
            .with_timezone(&Utc);
        if now >= expires_at {
            return Ok(None);
        }

        let plaintext = encryption::open(&sealed, &self.encryption_key)
            .context("Failed to decrypt credentials")?;
        let credentials =
            serde_json::from_str(&plaintext).context("Stored credentials are not valid JSON")?;

        Ok(Some(credentials))
    }

    /// Removes every row past its TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now())
    }

    fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM credentials WHERE expires_at <= ?1",
                params![sortable_timestamp(now)],
            )
            .context("Failed to purge expired credentials")?;
        Ok(removed)
    }

    /// Number of rows, expired or not (reported by the cleanup sweep).
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))
            .context("Failed to count credentials")?;
        Ok(count as usize)
    }
}

/// Fixed-width UTC RFC 3339, so `expires_at` compares correctly as text in SQL.
fn sortable_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
