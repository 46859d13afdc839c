//! Simulates a staking campaign on an in-memory ledger, with the orchestrator driving every
//! protocol step and simulated participants staking and claiming around it.

mod args;

use std::fs;

use anyhow::{bail, ensure, Context, Result};
use campaign_common::logging::{self, LoggerConfig};
use campaign_db::{inmemory::JournalInMemory, journal::JournalDb, persistent::sqlite::SqliteJournal};
use campaign_orchestrator::{config::OrchestratorConfig, pipeline::Pipeline};
use campaign_sorted_set::mutator::SetMutator;
use campaign_test_utils::fixtures::{key, reward_asset, CampaignFixture};
use clap::Parser;
use tracing::info;

use crate::args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger = LoggerConfig::with_base_name("dev-campaign");
    if let Some(url) = logging::get_otlp_url_from_env() {
        logger.set_otlp_url(url);
    }
    logging::init(logger)?;

    let args = Cli::parse();
    ensure!(
        args.freeze_in_secs < args.end_in_secs,
        "the freeze must come before the end"
    );

    let fixture = CampaignFixture::new(args.freeze_in(), args.end_in()).await;
    fixture.ledger.set_clock_step(args.clock_step()).await;
    let config = load_config(&args, &fixture)?;
    if let Some(pool) = config.reward_pool_amount {
        fixture.fund_rewards(fixture.creator, pool).await;
    }
    info!(campaign = %fixture.ctx.campaign_token(), stakers = args.stakers, "deployed campaign");

    match config.journal.clone() {
        Some(path) => {
            let journal = SqliteJournal::connect(&path, config.db)
                .await
                .with_context(|| format!("opening journal at {}", path.display()))?;
            simulate(&args, &fixture, journal, config).await
        }
        None => simulate(&args, &fixture, JournalInMemory::default(), config).await,
    }
}

fn load_config(args: &Cli, fixture: &CampaignFixture) -> Result<OrchestratorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config from {}", path.display()))?;
            OrchestratorConfig::from_toml_str(&raw).context("parsing orchestrator config")?
        }
        None => OrchestratorConfig {
            retry_delay: args.poll(),
            confirmation_timeout: args.poll(),
            poll_interval: args.poll(),
            destroy_head: true,
            ..OrchestratorConfig::new(fixture.creator)
        },
    };
    config.operator = fixture.creator;
    config.create_head = true;
    config.reward_pool_amount.get_or_insert(args.pool);
    if args.journal.is_some() {
        config.journal.clone_from(&args.journal);
    }
    Ok(config)
}

async fn simulate<J: JournalDb>(
    args: &Cli,
    fixture: &CampaignFixture,
    journal: J,
    config: OrchestratorConfig,
) -> Result<()> {
    let mut pipeline = Pipeline::new(fixture.ledger.clone(), journal, fixture.ctx.clone(), config);
    let mutator = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone());

    while mutator.store().await?.head().is_none() {
        if !pipeline.step().await? {
            bail!("orchestrator stopped before creating the set");
        }
    }

    let stakers: Vec<_> = (0..args.stakers).map(|i| key(0x10 + i)).collect();
    let mut stake = args.stake;
    for who in &stakers {
        fixture.fund_participant(*who, stake).await;
        mutator.insert(*who, stake).await?;
        info!(%who, stake, "participant staked");
        stake = stake.saturating_add(args.stake_step);
    }

    pipeline.run().await?;

    for who in &stakers {
        mutator.claim(*who).await?;
        let reward = fixture.ledger.balance_of(who).await.amount_of(&reward_asset());
        info!(%who, reward, "participant claimed");
    }
    info!(history = ?fixture.ledger.history().await, "campaign complete");
    Ok(())
}
