//! Durable storage for encrypted registry credentials.
//!
//! The vault talks to storage through [`CredentialStore`]; the bundled
//! implementation keeps one SQLite table with a soft-delete flag.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{RegistryError, Result};

/// A credential row as persisted, with the secret still encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    /// Row identifier.
    pub id: i64,
    /// Registry username (case-sensitive).
    pub username: String,
    /// Encoded ciphertext of the access token.
    pub encrypted_secret: String,
    /// When the row was first written.
    pub created_at: DateTime<Utc>,
    /// When the secret was last replaced.
    pub updated_at: DateTime<Utc>,
    /// Whether the row is the live record for its username.
    pub active: bool,
}

/// Whether a save created or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new active record was inserted.
    Inserted,
    /// The existing active record's secret was replaced.
    Updated,
}

impl SaveOutcome {
    /// Returns true for [`SaveOutcome::Updated`].
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Parameterized access to the credentials table.
///
/// Implementations must keep at most one active row per username.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Returns the active row for `username`, if any.
    async fn find_active(&self, username: &str) -> Result<Option<StoredCredential>>;

    /// Replaces the secret of the active row, or inserts one if none exists.
    ///
    /// The lookup and the write happen atomically, so concurrent first saves
    /// for one username end in a single active row.
    async fn upsert(&self, username: &str, encrypted_secret: &str) -> Result<SaveOutcome>;

    /// Marks the active row inactive. Returns true if a row was changed.
    async fn deactivate(&self, username: &str) -> Result<bool>;

    /// Counts active rows for `username`.
    async fn count_active(&self, username: &str) -> Result<usize>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_registry_credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    encrypted_secret TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_credentials_active_username
    ON user_registry_credentials(username) WHERE is_active = 1;
";

/// SQLite-backed credential store.
///
/// Queries run on the blocking thread pool against a single shared connection.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    /// Opens (or creates) a database file and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if the file cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::persistence(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Creates a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if the schema cannot be applied.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            op(&conn)
        })
        .await?
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RegistryError::persistence(format!("invalid stored timestamp '{raw}': {e}")))
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_active(&self, username: &str) -> Result<Option<StoredCredential>> {
        let username = username.to_string();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, encrypted_secret, created_at, updated_at, is_active
                     FROM user_registry_credentials
                     WHERE username = ?1 AND is_active = 1",
                    params![username],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, bool>(5)?,
                        ))
                    },
                )
                .optional()?;

            row.map(
                |(id, username, encrypted_secret, created_at, updated_at, active)| {
                    Ok(StoredCredential {
                        id,
                        username,
                        encrypted_secret,
                        created_at: parse_timestamp(&created_at)?,
                        updated_at: parse_timestamp(&updated_at)?,
                        active,
                    })
                },
            )
            .transpose()
        })
        .await
    }

    async fn upsert(&self, username: &str, encrypted_secret: &str) -> Result<SaveOutcome> {
        let username = username.to_string();
        let encrypted_secret = encrypted_secret.to_string();
        let now = Utc::now().to_rfc3339();
        self.run(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let updated = tx.execute(
                "UPDATE user_registry_credentials
                 SET encrypted_secret = ?1, updated_at = ?2
                 WHERE username = ?3 AND is_active = 1",
                params![encrypted_secret, now, username],
            )?;
            let outcome = if updated > 0 {
                SaveOutcome::Updated
            } else {
                tx.execute(
                    "INSERT INTO user_registry_credentials
                        (username, encrypted_secret, created_at, updated_at, is_active)
                     VALUES (?1, ?2, ?3, ?3, 1)",
                    params![username, encrypted_secret, now],
                )?;
                SaveOutcome::Inserted
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn deactivate(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        let now = Utc::now().to_rfc3339();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE user_registry_credentials
                 SET is_active = 0, updated_at = ?1
                 WHERE username = ?2 AND is_active = 1",
                params![now, username],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn count_active(&self, username: &str) -> Result<usize> {
        let username = username.to_string();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM user_registry_credentials
                 WHERE username = ?1 AND is_active = 1",
                params![username],
                |row| row.get(0),
            )?;
            usize::try_from(count)
                .map_err(|_| RegistryError::persistence("negative row count"))
        })
        .await
    }
}
