//! The orchestrator loop: performs what the driver asks for and reports the outcome back.

use std::collections::VecDeque;

use campaign_db::journal::JournalDb;
use campaign_ledger::{context::CampaignContext, gateway::LedgerGateway, submit::submit};
use campaign_primitives::{
    duties::CampaignDuty,
    errors::{CampaignError, CampaignResult},
    hashes::TxId,
};
use campaign_sm::{
    driver::{CampaignDriver, DriverConfig, DriverDuty, DriverEvent, DriverState},
    phase::{derive_phase, CampaignSnapshot},
    planner::{plan_for_phase, PlannerOptions},
    state_machine::StateMachine,
};
use tracing::{debug, info, warn};

use crate::{
    config::OrchestratorConfig,
    duty_dispatcher::DutyDispatcher,
    errors::{OrchestratorError, OrchestratorResult},
    observer::observe,
    persister::Persister,
};

/// Drives one campaign to completion on behalf of one operator.
///
/// Every submission is journaled before it reaches the gateway and settled once confirmed, so a
/// pipeline built over the same journal after a crash picks up where the previous one stopped.
#[derive(Debug)]
pub struct Pipeline<G, J> {
    gateway: G,
    ctx: CampaignContext,
    config: OrchestratorConfig,
    driver_config: DriverConfig,
    planner: PlannerOptions,
    dispatcher: DutyDispatcher<G>,
    persister: Persister<J>,
    driver: CampaignDriver,
    queue: VecDeque<DriverDuty>,
    next_duty: Option<CampaignDuty>,
}

impl<G, J> Pipeline<G, J>
where
    G: LedgerGateway + Clone,
    J: JournalDb,
{
    /// Creates a pipeline that has not read its journal yet.
    pub fn new(gateway: G, journal: J, ctx: CampaignContext, config: OrchestratorConfig) -> Self {
        let planner = config.planner_options(ctx.protocol().validity_tolerance);
        Self {
            dispatcher: DutyDispatcher::new(gateway.clone(), ctx.clone(), &config),
            persister: Persister::new(journal, &ctx),
            driver_config: config.driver_config(),
            planner,
            gateway,
            ctx,
            config,
            driver: CampaignDriver::new(),
            queue: VecDeque::new(),
            next_duty: None,
        }
    }

    /// The driver and its current state.
    pub const fn driver(&self) -> &CampaignDriver {
        &self.driver
    }

    /// The duty planned by the latest observation.
    pub const fn next_duty(&self) -> Option<&CampaignDuty> {
        self.next_duty.as_ref()
    }

    /// Reads the journal and hands the outcome to the driver; does nothing once started.
    pub async fn start(&mut self) -> OrchestratorResult<()> {
        if !matches!(self.driver.state(), DriverState::Recovering) {
            return Ok(());
        }
        let recovery = self.persister.recover(&self.gateway).await?;
        self.feed(DriverEvent::Recovered(recovery))
    }

    /// Performs the next driver duty.
    ///
    /// Returns `false` once the driver has nothing left to do.
    pub async fn step(&mut self) -> OrchestratorResult<bool> {
        self.start().await?;
        let Some(duty) = self.queue.pop_front() else {
            return Ok(false);
        };
        let event = self.perform(duty).await?;
        self.feed(event)?;
        Ok(!self.queue.is_empty())
    }

    /// Steps until the campaign is done or a duty is exhausted.
    pub async fn run(mut self) -> OrchestratorResult<()> {
        info!(
            campaign = %self.persister.campaign(),
            operator = %self.config.operator,
            "starting campaign pipeline"
        );
        while self.step().await? {}
        match self.driver.state() {
            DriverState::Finished => {
                info!(campaign = %self.persister.campaign(), "campaign pipeline finished");
                Ok(())
            }
            DriverState::Failed { duty, reason } => Err(OrchestratorError::Exhausted {
                duty: duty.clone(),
                reason: reason.clone(),
            }),
            state => Err(OrchestratorError::Stalled(state.to_string())),
        }
    }

    fn feed(&mut self, event: DriverEvent) -> OrchestratorResult<()> {
        debug!(state = %self.driver.state(), %event, "feeding driver");
        let output = self.driver.process_event(&self.driver_config, event)?;
        self.queue.extend(output.duties);
        Ok(())
    }

    async fn perform(&mut self, duty: DriverDuty) -> OrchestratorResult<DriverEvent> {
        match duty {
            DriverDuty::Observe => self.observe().await,
            DriverDuty::Dispatch { duty, attempt } => self.dispatch(&duty, attempt).await,
            DriverDuty::AwaitConfirmation { duty, tx_id } => {
                self.await_confirmation(&duty, &tx_id).await
            }
            DriverDuty::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(DriverEvent::Elapsed)
            }
        }
    }

    async fn snapshot(&self) -> CampaignResult<CampaignSnapshot> {
        let mut failures = 0;
        loop {
            match observe(&self.gateway, &self.ctx).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if err.is_recoverable() && failures + 1 < self.config.max_attempts => {
                    failures += 1;
                    warn!(%err, failures, "observation failed, retrying");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn observe(&mut self) -> OrchestratorResult<DriverEvent> {
        let snapshot = self.snapshot().await?;
        let phase = derive_phase(&snapshot);
        let duty = plan_for_phase(phase, &snapshot, &self.planner);
        info!(%phase, %duty, now = %snapshot.now, "planned next duty");

        if duty == CampaignDuty::Done {
            self.persister.settle().await?;
        }
        self.next_duty = Some(duty.clone());
        Ok(DriverEvent::Observed {
            now: snapshot.now,
            duty,
        })
    }

    async fn dispatch(
        &mut self,
        duty: &CampaignDuty,
        attempt: u32,
    ) -> OrchestratorResult<DriverEvent> {
        let planned = match self.dispatcher.prepare(duty).await {
            Ok(planned) => planned,
            Err(err) => return Ok(failed(duty, err)),
        };
        let now = match self.gateway.current_time().await {
            Ok(now) => now,
            Err(err) => return Ok(failed(duty, err.into())),
        };

        let entry = self.persister.begin(duty, attempt, &planned, now).await?;
        match submit(&self.gateway, &planned).await {
            Ok(tx_id) => {
                self.persister.submitted(entry, tx_id).await?;
                info!(%duty, attempt, %tx_id, "dispatched duty");
                Ok(DriverEvent::Submitted { tx_id })
            }
            Err(err) => {
                self.persister.settle().await?;
                Ok(failed(duty, err))
            }
        }
    }

    async fn await_confirmation(
        &mut self,
        duty: &CampaignDuty,
        tx_id: &TxId,
    ) -> OrchestratorResult<DriverEvent> {
        let timeout = self.config.confirmation_timeout;
        match self.gateway.await_confirmation(tx_id, timeout).await {
            Ok(true) => {
                self.persister.settle().await?;
                info!(%duty, %tx_id, "duty confirmed");
                Ok(DriverEvent::Confirmed)
            }
            Ok(false) => {
                warn!(%duty, %tx_id, timeout_secs = timeout.as_secs(), "confirmation timed out");
                Ok(DriverEvent::ConfirmationTimedOut)
            }
            Err(err) => Ok(failed(duty, err.into())),
        }
    }
}

fn failed(duty: &CampaignDuty, err: CampaignError) -> DriverEvent {
    warn!(%duty, %err, recoverable = err.is_recoverable(), "duty failed");
    DriverEvent::Failed {
        recoverable: err.is_recoverable(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use campaign_db::{
        inmemory::JournalInMemory,
        persistent::{config::DbConfig, sqlite::SqliteJournal},
    };
    use campaign_ledger::errors::GatewayError;
    use campaign_sorted_set::mutator::SetMutator;
    use campaign_test_utils::{
        emulator::LedgerEmulator,
        fixtures::{key, reward_asset, CampaignFixture},
    };

    use super::*;

    const HOUR: Duration = Duration::from_secs(3_600);
    const TICK: Duration = Duration::from_millis(1);
    const POOL: u64 = 8_000_000;

    fn fast_config(fixture: &CampaignFixture) -> OrchestratorConfig {
        OrchestratorConfig {
            retry_delay: TICK,
            confirmation_timeout: TICK,
            poll_interval: TICK,
            create_head: true,
            reward_pool_amount: Some(POOL),
            destroy_head: true,
            ..OrchestratorConfig::new(fixture.creator)
        }
    }

    fn pipeline<J: JournalDb>(
        fixture: &CampaignFixture,
        journal: J,
        config: OrchestratorConfig,
    ) -> Pipeline<Arc<LedgerEmulator>, J> {
        Pipeline::new(fixture.ledger.clone(), journal, fixture.ctx.clone(), config)
    }

    async fn count(fixture: &CampaignFixture, label: &str) -> usize {
        fixture
            .ledger
            .history()
            .await
            .iter()
            .filter(|l| l.as_str() == label)
            .count()
    }

    async fn step_until_submitted<J: JournalDb>(
        fixture: &CampaignFixture,
        pipeline: &mut Pipeline<Arc<LedgerEmulator>, J>,
        label: &str,
    ) {
        while count(fixture, label).await == 0 {
            assert!(
                pipeline.step().await.unwrap(),
                "pipeline stopped before submitting {label}"
            );
        }
    }

    /// A head with three stakers, past the end of staking.
    async fn staked(fixture: &CampaignFixture) {
        let mutator = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone());
        for (who, amount) in [(key(0x0a), 4_000), (key(0x0b), 5_000), (key(0x0c), 5_000)] {
            fixture.fund_participant(who, amount).await;
            mutator.insert(who, amount).await.unwrap();
        }
        fixture.pass_end().await;
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        fixture.fund_rewards(fixture.creator, POOL).await;
        let mut pipeline = pipeline(&fixture, JournalInMemory::default(), fast_config(&fixture));

        step_until_submitted(&fixture, &mut pipeline, "init-set").await;
        staked(&fixture).await;
        pipeline.run().await.expect("campaign must run to completion");

        let history = fixture.ledger.history().await;
        for label in [
            "init-set",
            "init-commit-fold",
            "advance-commit-fold",
            "init-reward-pool",
            "init-reward-fold",
            "advance-reward-fold",
            "reclaim-reward",
            "deinit-set",
        ] {
            assert_eq!(
                history.iter().filter(|l| l.as_str() == label).count(),
                1,
                "{label} must be submitted exactly once"
            );
        }

        let mutator = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone());
        let store = mutator.store().await.unwrap();
        assert!(store.head().is_none());
        for (who, owed) in [(key(0x0b), 2_857_142), (key(0x0c), 2_857_142)] {
            assert_eq!(store.get(&who).unwrap().amount_of(&reward_asset()), owed);
        }
        assert_eq!(
            fixture
                .ledger
                .balance_of(&fixture.creator)
                .await
                .amount_of(&reward_asset()),
            2,
            "dust goes back to the operator"
        );

        mutator.claim(key(0x0a)).await.unwrap();
        assert_eq!(
            fixture
                .ledger
                .balance_of(&key(0x0a))
                .await
                .amount_of(&reward_asset()),
            2_285_714
        );
    }

    #[tokio::test]
    async fn test_landed_but_unconfirmed_duty_is_not_repeated() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone())
            .init_set(fixture.creator)
            .await
            .unwrap();
        staked(&fixture).await;
        fixture.fund_rewards(fixture.creator, POOL).await;
        fixture.ledger.withhold_confirmations(1).await;

        let config = OrchestratorConfig {
            create_head: false,
            ..fast_config(&fixture)
        };
        pipeline(&fixture, JournalInMemory::default(), config)
            .run()
            .await
            .unwrap();
        assert_eq!(count(&fixture, "init-commit-fold").await, 1);
        assert_eq!(count(&fixture, "deinit-set").await, 1);
    }

    #[tokio::test]
    async fn test_three_rejections_exhaust_the_duty() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        for _ in 0..3 {
            fixture
                .ledger
                .inject_failure(GatewayError::Rejected("busy".to_string()))
                .await;
        }
        let err = pipeline(&fixture, JournalInMemory::default(), fast_config(&fixture))
            .run()
            .await
            .unwrap_err();
        assert!(
            matches!(
                &err,
                OrchestratorError::Exhausted { duty: CampaignDuty::InitSet, .. }
            ),
            "unexpected error: {err}"
        );
        assert_eq!(count(&fixture, "init-set").await, 0);
    }

    #[tokio::test]
    async fn test_two_rejections_are_retried() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        for _ in 0..2 {
            fixture
                .ledger
                .inject_failure(GatewayError::Rejected("busy".to_string()))
                .await;
        }
        let mut pipeline = pipeline(&fixture, JournalInMemory::default(), fast_config(&fixture));
        step_until_submitted(&fixture, &mut pipeline, "init-set").await;
        assert!(matches!(
            pipeline.driver().state(),
            DriverState::Confirming {
                duty: CampaignDuty::InitSet,
                attempt: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_resume_after_crash_does_not_resubmit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;

        let journal = SqliteJournal::connect(&path, DbConfig::default())
            .await
            .unwrap();
        let mut first = pipeline(&fixture, journal, fast_config(&fixture));
        step_until_submitted(&fixture, &mut first, "init-set").await;
        // crash between submission and confirmation
        drop(first);

        let journal = SqliteJournal::connect(&path, DbConfig::default())
            .await
            .unwrap();
        assert!(journal
            .pending(fixture.ctx.campaign_token().to_string().as_str())
            .await
            .unwrap()
            .is_some_and(|entry| entry.tx_id.is_some()));

        let mut resumed = pipeline(&fixture, journal, fast_config(&fixture));
        for _ in 0..4 {
            assert!(resumed.step().await.unwrap());
        }
        assert_eq!(count(&fixture, "init-set").await, 1);
        assert!(matches!(
            resumed.next_duty(),
            Some(CampaignDuty::WaitUntil(_))
        ));
    }

    #[tokio::test]
    async fn test_abandoned_dispatch_resumes_at_same_attempt() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        let journal = JournalInMemory::default();
        let planned = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone())
            .prepare_init_set(fixture.creator)
            .await
            .unwrap();
        Persister::new(journal.clone(), &fixture.ctx)
            .begin(&CampaignDuty::InitSet, 1, &planned, fixture.ledger.now().await)
            .await
            .unwrap();

        let mut pipeline = pipeline(&fixture, journal, fast_config(&fixture));
        assert!(pipeline.step().await.unwrap());
        assert_eq!(pipeline.next_duty(), Some(&CampaignDuty::InitSet));
        assert_eq!(
            pipeline.driver().state(),
            &DriverState::Executing {
                duty: CampaignDuty::InitSet,
                attempt: 1
            }
        );
        step_until_submitted(&fixture, &mut pipeline, "init-set").await;
        assert_eq!(count(&fixture, "init-set").await, 1);
    }

    #[tokio::test]
    async fn test_abandoned_last_attempt_is_submitted_once() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        let journal = JournalInMemory::default();
        let planned = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone())
            .prepare_init_set(fixture.creator)
            .await
            .unwrap();
        Persister::new(journal.clone(), &fixture.ctx)
            .begin(&CampaignDuty::InitSet, 3, &planned, fixture.ledger.now().await)
            .await
            .unwrap();

        let mut pipeline = pipeline(&fixture, journal, fast_config(&fixture));
        step_until_submitted(&fixture, &mut pipeline, "init-set").await;
        assert_eq!(count(&fixture, "init-set").await, 1);
        assert!(matches!(
            pipeline.driver().state(),
            DriverState::Confirming {
                duty: CampaignDuty::InitSet,
                attempt: 3,
                ..
            }
        ));

        for _ in 0..2 {
            assert!(pipeline.step().await.unwrap());
        }
        assert_eq!(count(&fixture, "init-set").await, 1);
        assert!(matches!(
            pipeline.next_duty(),
            Some(CampaignDuty::WaitUntil(_))
        ));
    }
}
