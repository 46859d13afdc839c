//! Runtime options of the orchestrator.

use std::{path::PathBuf, time::Duration};

use campaign_db::persistent::config::DbConfig;
use campaign_primitives::{address::Address, hashes::PubKeyHash};
use campaign_sm::{driver::DriverConfig, planner::PlannerOptions};
use serde::{Deserialize, Serialize};

/// Attempts per duty.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts; longer than a confirmation usually takes.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(180);

/// How long to wait for a submitted transaction.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest pause while nothing can be done.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// The configuration of one orchestrator.
///
/// Durations use the `{ secs, nanos }` form of `serde`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Key that signs and pays for every orchestrator transaction.
    pub operator: PubKeyHash,

    /// Attempts per duty before giving up.
    pub max_attempts: u32,

    /// Pause between two attempts of a duty.
    pub retry_delay: Duration,

    /// How long to wait for each submitted transaction.
    pub confirmation_timeout: Duration,

    /// Longest pause while waiting for time to pass or for others to act.
    pub poll_interval: Duration,

    /// Create the head of the set if it is missing; the operator must hold the campaign's
    /// `init_utxo`.
    #[serde(default)]
    pub create_head: bool,

    /// Fund the reward pool with this many reward tokens once stakes are counted.
    #[serde(default)]
    pub reward_pool_amount: Option<u64>,

    /// Destroy the head once the reward fold is gone.
    #[serde(default)]
    pub destroy_head: bool,

    /// Where the undistributed reward goes; the operator's own address if unset.
    #[serde(default)]
    pub reclaim_address: Option<Address>,

    /// SQLite file of the journal; the journal is kept in memory if unset.
    #[serde(default)]
    pub journal: Option<PathBuf>,

    /// Retry policy of the journal database.
    #[serde(default)]
    pub db: DbConfig,
}

impl OrchestratorConfig {
    /// A passive configuration for `operator` with the default timings.
    pub fn new(operator: PubKeyHash) -> Self {
        Self {
            operator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            create_head: false,
            reward_pool_amount: None,
            destroy_head: false,
            reclaim_address: None,
            journal: None,
            db: DbConfig::default(),
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Retry and polling bounds handed to the driver.
    pub const fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            max_attempts: self.max_attempts,
            retry_delay: self.retry_delay,
            poll_interval: self.poll_interval,
        }
    }

    /// Opt-in duties handed to the planner; `settle_margin` is the validity tolerance.
    pub const fn planner_options(&self, settle_margin: Duration) -> PlannerOptions {
        PlannerOptions {
            create_head: self.create_head,
            fund_reward_pool: self.reward_pool_amount.is_some(),
            destroy_head: self.destroy_head,
            settle_margin,
        }
    }

    /// Where reclaimed reward goes.
    pub fn reclaim_to(&self) -> Address {
        self.reclaim_address
            .unwrap_or_else(|| Address::from_key(self.operator))
    }
}
