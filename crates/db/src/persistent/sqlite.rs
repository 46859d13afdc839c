//! SQLite implementation of the journal.

use std::{future::Future, path::Path, str::FromStr};

use async_trait::async_trait;
use campaign_primitives::{hashes::TxId, time::PosixTime};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{debug, warn};

use super::{config::DbConfig, constants::JOURNAL_SCHEMA, errors::StorageError};
use crate::{
    errors::DbResult,
    journal::{JournalDb, JournalEntry},
};

/// Columns of a journal row: duty, attempt, spends, tx id, recorded at.
type JournalRow = (String, i64, String, Option<String>, i64);

/// Journal stored in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteJournal {
    pool: SqlitePool,
    config: DbConfig,
}

impl SqliteJournal {
    /// Wraps `pool`, creating the journal table if it does not exist yet.
    pub async fn new(pool: SqlitePool, config: DbConfig) -> DbResult<Self> {
        sqlx::query(JOURNAL_SCHEMA)
            .execute(&pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Self { pool, config })
    }

    /// Opens (or creates) the database file at `path`.
    pub async fn connect(path: impl AsRef<Path>, config: DbConfig) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;
        Self::new(pool, config).await
    }

    /// A private database living as long as the journal.
    pub async fn in_memory(config: DbConfig) -> DbResult<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(StorageError::from)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;
        Self::new(pool, config).await
    }

    async fn with_retries<T, F, Fut>(&self, operation: &'static str, mut run: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut retries = 0;
        loop {
            match run().await {
                Ok(value) => return Ok(value),
                Err(err) if retries < self.config.max_retry_count() && is_transient(&err) => {
                    retries += 1;
                    warn!(%operation, %err, retries, "journal operation failed, retrying");
                    tokio::time::sleep(self.config.backoff_period()).await;
                }
                Err(err) => return Err(StorageError::from(err).into()),
            }
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        // SQLITE_BUSY and SQLITE_LOCKED
        sqlx::Error::Database(db) => db.code().is_some_and(|code| code == "5" || code == "6"),
        _ => false,
    }
}

fn mismatched(column: &str, err: impl ToString) -> StorageError {
    StorageError::MismatchedTypes(format!("{column}: {}", err.to_string()))
}

fn decode_row(row: JournalRow) -> DbResult<JournalEntry> {
    let (duty, attempt, spends, tx_id, recorded_at) = row;
    Ok(JournalEntry {
        duty: serde_json::from_str(&duty)?,
        attempt: u32::try_from(attempt).map_err(|e| mismatched("attempt", e))?,
        spends: serde_json::from_str(&spends)?,
        tx_id: tx_id
            .map(|id| TxId::from_str(&id))
            .transpose()
            .map_err(|e| mismatched("tx_id", e))?,
        recorded_at: PosixTime(
            u64::try_from(recorded_at).map_err(|e| mismatched("recorded_at", e))?,
        ),
    })
}

#[async_trait]
impl JournalDb for SqliteJournal {
    async fn pending(&self, campaign: &str) -> DbResult<Option<JournalEntry>> {
        let pool = &self.pool;
        let row = self
            .with_retries("pending", move || {
                sqlx::query_as::<_, JournalRow>(
                    "SELECT duty, attempt, spends, tx_id, recorded_at
                        FROM campaign_journal WHERE campaign = $1",
                )
                .bind(campaign)
                .fetch_optional(pool)
            })
            .await?;
        row.map(decode_row).transpose()
    }

    async fn record(&self, campaign: &str, entry: &JournalEntry) -> DbResult<()> {
        let duty = serde_json::to_string(&entry.duty)?;
        let spends = serde_json::to_string(&entry.spends)?;
        let tx_id = entry.tx_id.map(|id| id.to_string());
        let recorded_at =
            i64::try_from(entry.recorded_at.0).map_err(|e| mismatched("recorded_at", e))?;
        let attempt = i64::from(entry.attempt);

        let pool = &self.pool;
        let (duty, spends, tx_id) = (duty.as_str(), spends.as_str(), tx_id.as_deref());
        self.with_retries("record", move || {
            sqlx::query(
                "INSERT OR REPLACE INTO campaign_journal
                    (campaign, duty, attempt, spends, tx_id, recorded_at)
                    VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(campaign)
            .bind(duty)
            .bind(attempt)
            .bind(spends)
            .bind(tx_id)
            .bind(recorded_at)
            .execute(pool)
        })
        .await?;
        debug!(%campaign, duty = %entry.duty, attempt = entry.attempt, "journaled submission");
        Ok(())
    }

    async fn clear(&self, campaign: &str) -> DbResult<()> {
        let pool = &self.pool;
        self.with_retries("clear", move || {
            sqlx::query("DELETE FROM campaign_journal WHERE campaign = $1")
                .bind(campaign)
                .execute(pool)
        })
        .await?;
        Ok(())
    }
}
