//! Command-line arguments of the simulator.

use std::{path::PathBuf, time::Duration};

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "dev-campaign",
    about = "Runs a staking campaign end to end against an in-memory ledger",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "Orchestrator configuration file; the simulated creator always operates"
    )]
    pub(crate) config: Option<PathBuf>,

    #[clap(long, help = "SQLite journal file, overriding the one in the configuration")]
    pub(crate) journal: Option<PathBuf>,

    #[clap(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..=200),
        help = "Number of participants"
    )]
    pub(crate) stakers: u8,

    #[clap(long, default_value_t = 4_000, help = "Stake of the first participant")]
    pub(crate) stake: u64,

    #[clap(
        long,
        default_value_t = 1_000,
        help = "How much more each next participant stakes"
    )]
    pub(crate) stake_step: u64,

    #[clap(
        long,
        default_value_t = 8_000_000,
        help = "Reward pool, unless the configuration sets one"
    )]
    pub(crate) pool: u64,

    #[clap(long, default_value_t = 900, help = "Seconds from genesis to the freeze")]
    pub(crate) freeze_in_secs: u64,

    #[clap(long, default_value_t = 1_800, help = "Seconds from genesis to the end")]
    pub(crate) end_in_secs: u64,

    #[clap(
        long,
        default_value_t = 10,
        help = "Simulated seconds that pass every time the ledger clock is read"
    )]
    pub(crate) clock_step_secs: u64,

    #[clap(
        long,
        default_value_t = 10,
        help = "Real milliseconds between polls and retries without a configuration file"
    )]
    pub(crate) poll_ms: u64,
}

impl Cli {
    pub(crate) const fn freeze_in(&self) -> Duration {
        Duration::from_secs(self.freeze_in_secs)
    }

    pub(crate) const fn end_in(&self) -> Duration {
        Duration::from_secs(self.end_in_secs)
    }

    pub(crate) const fn clock_step(&self) -> Duration {
        Duration::from_secs(self.clock_step_secs)
    }

    pub(crate) const fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
