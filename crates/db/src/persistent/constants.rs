//! Constants of the persistence layer.

use std::time::Duration;

/// The number of times to retry a database operation before erroring out.
pub const DEFAULT_MAX_RETRY_COUNT: usize = 5;

/// The period of time to wait before retrying a database operation.
pub const DEFAULT_BACKOFF_PERIOD: Duration = Duration::from_secs(1);

/// Schema of the journal table.
pub(crate) const JOURNAL_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS campaign_journal (
    campaign TEXT PRIMARY KEY NOT NULL,
    duty TEXT NOT NULL,
    attempt INTEGER NOT NULL,
    spends TEXT NOT NULL,
    tx_id TEXT,
    recorded_at INTEGER NOT NULL
)";
