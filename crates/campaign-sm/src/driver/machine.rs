//! Transitions of the driver.

use campaign_primitives::duties::CampaignDuty;
use serde::{Deserialize, Serialize};

use crate::{
    driver::{
        config::DriverConfig,
        duties::DriverDuty,
        errors::{DriverError, DriverResult},
        events::{DriverEvent, Recovery},
        state::{DriverState, PendingRetry},
    },
    state_machine::{SMOutput, StateMachine},
};

/// The output of the driver after processing an event.
pub type DriverOutput = SMOutput<DriverDuty>;

/// The driver of one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDriver {
    /// The current state.
    pub state: DriverState,
}

impl Default for CampaignDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignDriver {
    /// A driver that has not read its journal yet.
    pub const fn new() -> Self {
        Self {
            state: DriverState::Recovering,
        }
    }

    /// A driver in the given state.
    pub const fn from_state(state: DriverState) -> Self {
        Self { state }
    }

    /// The current state.
    pub const fn state(&self) -> &DriverState {
        &self.state
    }

    fn transition(
        &self,
        cfg: &DriverConfig,
        event: DriverEvent,
    ) -> DriverResult<(DriverState, Vec<DriverDuty>)> {
        if self.state.is_terminal() {
            return Err(DriverError::Terminal {
                state: self.state.clone(),
                event: event.to_string(),
            });
        }

        let next = match (&self.state, event) {
            (DriverState::Recovering, DriverEvent::Recovered(recovery)) => {
                recover(recovery)
            }

            (DriverState::Observing { retry }, DriverEvent::Observed { now, duty }) => {
                match retry {
                    Some(retry) if retry.duty == duty && retry.exhausted => (
                        DriverState::Failed {
                            duty,
                            reason: retry.last_error.clone(),
                        },
                        vec![],
                    ),
                    Some(retry) if retry.duty == duty => {
                        execute(duty, retry.attempts.saturating_add(1))
                    }
                    _ => match duty {
                        CampaignDuty::Done => (DriverState::Finished, vec![]),
                        CampaignDuty::WaitUntil(until) => {
                            let pause = now.until(until).min(cfg.poll_interval);
                            (DriverState::Waiting { duty }, vec![DriverDuty::Sleep(pause)])
                        }
                        CampaignDuty::WaitForRewardPool => (
                            DriverState::Waiting { duty },
                            vec![DriverDuty::Sleep(cfg.poll_interval)],
                        ),
                        duty => execute(duty, 1),
                    },
                }
            }

            (DriverState::Executing { duty, attempt }, DriverEvent::Submitted { tx_id }) => (
                DriverState::Confirming {
                    duty: duty.clone(),
                    attempt: *attempt,
                    tx_id,
                },
                vec![DriverDuty::AwaitConfirmation {
                    duty: duty.clone(),
                    tx_id,
                }],
            ),

            (
                DriverState::Executing { duty, attempt },
                DriverEvent::Failed {
                    recoverable,
                    reason,
                },
            )
            | (
                DriverState::Confirming { duty, attempt, .. },
                DriverEvent::Failed {
                    recoverable,
                    reason,
                },
            ) => fail(cfg, duty.clone(), *attempt, recoverable, reason),

            (DriverState::Confirming { .. }, DriverEvent::Confirmed) => observe(None),

            (
                DriverState::Confirming {
                    duty,
                    attempt,
                    tx_id,
                },
                DriverEvent::ConfirmationTimedOut,
            ) => fail(
                cfg,
                duty.clone(),
                *attempt,
                true,
                format!("{tx_id} was not confirmed in time"),
            ),

            (
                DriverState::Retrying {
                    duty,
                    attempt,
                    reason,
                },
                DriverEvent::Elapsed,
            ) => observe(Some(PendingRetry {
                duty: duty.clone(),
                attempts: *attempt,
                exhausted: false,
                last_error: reason.clone(),
            })),

            (DriverState::Waiting { .. }, DriverEvent::Elapsed) => observe(None),

            (state, event) => {
                return Err(DriverError::InvalidEvent {
                    state: state.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }
}

fn observe(retry: Option<PendingRetry>) -> (DriverState, Vec<DriverDuty>) {
    (DriverState::Observing { retry }, vec![DriverDuty::Observe])
}

fn execute(duty: CampaignDuty, attempt: u32) -> (DriverState, Vec<DriverDuty>) {
    (
        DriverState::Executing {
            duty: duty.clone(),
            attempt,
        },
        vec![DriverDuty::Dispatch { duty, attempt }],
    )
}

fn fail(
    cfg: &DriverConfig,
    duty: CampaignDuty,
    attempt: u32,
    recoverable: bool,
    reason: String,
) -> (DriverState, Vec<DriverDuty>) {
    if recoverable && attempt < cfg.max_attempts {
        return (
            DriverState::Retrying {
                duty,
                attempt,
                reason,
            },
            vec![DriverDuty::Sleep(cfg.retry_delay)],
        );
    }
    // out of attempts: fail only if the next observation still asks for the same duty
    observe(Some(PendingRetry {
        duty,
        attempts: attempt,
        exhausted: true,
        last_error: reason,
    }))
}

fn recover(recovery: Recovery) -> (DriverState, Vec<DriverDuty>) {
    match recovery {
        Recovery::Clean | Recovery::Settled => observe(None),
        Recovery::InFlight {
            duty,
            attempt,
            tx_id,
        } => (
            DriverState::Confirming {
                duty: duty.clone(),
                attempt,
                tx_id,
            },
            vec![DriverDuty::AwaitConfirmation { duty, tx_id }],
        ),
        // the gateway never saw the interrupted attempt, so it is dispatched again under its number
        Recovery::Abandoned { duty, attempt } => observe(Some(PendingRetry {
            duty,
            attempts: attempt.saturating_sub(1),
            exhausted: false,
            last_error: "interrupted before submission".to_string(),
        })),
    }
}

impl StateMachine for CampaignDriver {
    type Config = DriverConfig;
    type Duty = DriverDuty;
    type Event = DriverEvent;
    type Error = DriverError;

    fn process_event(
        &mut self,
        cfg: &Self::Config,
        event: Self::Event,
    ) -> Result<DriverOutput, Self::Error> {
        let (state, duties) = self.transition(cfg, event)?;
        self.state = state;
        Ok(SMOutput::with_duties(duties))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use campaign_primitives::{
        hashes::{PubKeyHash, TxId},
        time::PosixTime,
    };

    use super::*;
    use crate::{
        prop_deterministic, prop_no_silent_acceptance, prop_terminal_states_reject,
        testing::{
            fixtures::{arb_driver_event, arb_driver_state, arb_terminal_state},
            transition::{
                test_invalid_transition, test_transition, EventSequence, InvalidTransition,
                Transition,
            },
        },
    };

    fn cfg() -> DriverConfig {
        DriverConfig {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
        }
    }

    fn create_driver(state: DriverState) -> CampaignDriver {
        CampaignDriver::from_state(state)
    }

    fn get_state(driver: &CampaignDriver) -> &DriverState {
        driver.state()
    }

    fn advance(from: u8) -> CampaignDuty {
        CampaignDuty::AdvanceCommitFold {
            from: Some(PubKeyHash::new([from; 28])),
        }
    }

    fn observed(duty: CampaignDuty) -> DriverEvent {
        DriverEvent::Observed {
            now: PosixTime(1_000),
            duty,
        }
    }

    fn rejected(reason: &str) -> DriverEvent {
        DriverEvent::Failed {
            recoverable: true,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_clean_start_observes() {
        test_transition(
            create_driver,
            get_state,
            &cfg(),
            Transition {
                from_state: DriverState::Recovering,
                event: DriverEvent::Recovered(Recovery::Clean),
                expected_state: DriverState::Observing { retry: None },
                expected_duties: vec![DriverDuty::Observe],
            },
        );
    }

    #[test]
    fn test_in_flight_submission_is_awaited_not_resubmitted() {
        let tx_id = TxId::digest("in-flight");
        test_transition(
            create_driver,
            get_state,
            &cfg(),
            Transition {
                from_state: DriverState::Recovering,
                event: DriverEvent::Recovered(Recovery::InFlight {
                    duty: advance(1),
                    attempt: 2,
                    tx_id,
                }),
                expected_state: DriverState::Confirming {
                    duty: advance(1),
                    attempt: 2,
                    tx_id,
                },
                expected_duties: vec![DriverDuty::AwaitConfirmation {
                    duty: advance(1),
                    tx_id,
                }],
            },
        );
    }

    #[test]
    fn test_waits_are_capped_by_poll_interval() {
        test_transition(
            create_driver,
            get_state,
            &cfg(),
            Transition {
                from_state: DriverState::Observing { retry: None },
                event: observed(CampaignDuty::WaitUntil(PosixTime(60_000))),
                expected_state: DriverState::Waiting {
                    duty: CampaignDuty::WaitUntil(PosixTime(60_000)),
                },
                expected_duties: vec![DriverDuty::Sleep(Duration::from_secs(2))],
            },
        );
        test_transition(
            create_driver,
            get_state,
            &cfg(),
            Transition {
                from_state: DriverState::Observing { retry: None },
                event: observed(CampaignDuty::WaitUntil(PosixTime(1_500))),
                expected_state: DriverState::Waiting {
                    duty: CampaignDuty::WaitUntil(PosixTime(1_500)),
                },
                expected_duties: vec![DriverDuty::Sleep(Duration::from_millis(500))],
            },
        );
    }

    #[test]
    fn test_done_finishes() {
        test_transition(
            create_driver,
            get_state,
            &cfg(),
            Transition {
                from_state: DriverState::Observing { retry: None },
                event: observed(CampaignDuty::Done),
                expected_state: DriverState::Finished,
                expected_duties: vec![],
            },
        );
    }

    #[test]
    fn test_unrecoverable_failure_fails_if_still_planned() {
        let mut seq = EventSequence::new(
            create_driver(DriverState::Executing {
                duty: CampaignDuty::InitRewardPool,
                attempt: 1,
            }),
            get_state,
        );
        seq.process(
            &cfg(),
            DriverEvent::Failed {
                recoverable: false,
                reason: "not enough reward tokens".to_string(),
            },
        )
        .process(&cfg(), observed(CampaignDuty::InitRewardPool))
        .assert_no_errors()
        .assert_final_state(&DriverState::Failed {
            duty: CampaignDuty::InitRewardPool,
            reason: "not enough reward tokens".to_string(),
        });
    }

    #[test]
    fn test_three_attempts_then_failure() {
        let cfg = cfg();
        let duty = CampaignDuty::InitCommitFold;
        let mut seq = EventSequence::new(
            create_driver(DriverState::Observing { retry: None }),
            get_state,
        );
        for _ in 0..2 {
            seq.process(&cfg, observed(duty.clone()))
                .process(&cfg, rejected("input already spent"))
                .process(&cfg, DriverEvent::Elapsed);
        }
        seq.process(&cfg, observed(duty.clone()))
            .process(&cfg, rejected("input already spent"))
            .process(&cfg, observed(duty.clone()))
            .assert_no_errors()
            .assert_final_state(&DriverState::Failed {
                duty: duty.clone(),
                reason: "input already spent".to_string(),
            });

        let dispatched: Vec<u32> = seq
            .all_duties()
            .into_iter()
            .filter_map(|d| match d {
                DriverDuty::Dispatch { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(dispatched, vec![1, 2, 3]);
        seq.assert_duties_contain(&[DriverDuty::Sleep(cfg.retry_delay)]);
    }

    #[test]
    fn test_exhausted_duty_is_dropped_when_campaign_moved_on() {
        let cfg = cfg();
        let mut seq = EventSequence::new(
            create_driver(DriverState::Confirming {
                duty: advance(1),
                attempt: 3,
                tx_id: TxId::digest("slow"),
            }),
            get_state,
        );
        seq.process(&cfg, DriverEvent::ConfirmationTimedOut)
            .process(&cfg, observed(advance(7)))
            .assert_no_errors()
            .assert_final_state(&DriverState::Executing {
                duty: advance(7),
                attempt: 1,
            });
    }

    #[test]
    fn test_progress_between_retries_resets_attempts() {
        test_transition(
            create_driver,
            get_state,
            &cfg(),
            Transition {
                from_state: DriverState::Observing {
                    retry: Some(PendingRetry {
                        duty: advance(1),
                        attempts: 2,
                        exhausted: false,
                        last_error: "timeout".to_string(),
                    }),
                },
                event: observed(advance(2)),
                expected_state: DriverState::Executing {
                    duty: advance(2),
                    attempt: 1,
                },
                expected_duties: vec![DriverDuty::Dispatch {
                    duty: advance(2),
                    attempt: 1,
                }],
            },
        );
    }

    #[test]
    fn test_restart_plans_the_same_dispatch() {
        let cfg = cfg();
        let mut before = CampaignDriver::new();
        before
            .process_event(&cfg, DriverEvent::Recovered(Recovery::Clean))
            .unwrap();
        let first = before.process_event(&cfg, observed(advance(3))).unwrap();

        let mut after = CampaignDriver::new();
        after
            .process_event(
                &cfg,
                DriverEvent::Recovered(Recovery::Abandoned {
                    duty: advance(3),
                    attempt: 1,
                }),
            )
            .unwrap();
        let second = after.process_event(&cfg, observed(advance(3))).unwrap();

        assert_eq!(
            first.duties,
            vec![DriverDuty::Dispatch {
                duty: advance(3),
                attempt: 1
            }]
        );
        assert_eq!(second.duties, first.duties);
    }

    #[test]
    fn test_interrupted_last_attempt_is_dispatched_again() {
        let cfg = cfg();
        let mut driver = CampaignDriver::new();
        driver
            .process_event(
                &cfg,
                DriverEvent::Recovered(Recovery::Abandoned {
                    duty: advance(3),
                    attempt: cfg.max_attempts,
                }),
            )
            .unwrap();
        let output = driver.process_event(&cfg, observed(advance(3))).unwrap();

        assert_eq!(
            output.duties,
            vec![DriverDuty::Dispatch {
                duty: advance(3),
                attempt: cfg.max_attempts
            }]
        );
    }

    #[test]
    fn test_out_of_order_events_are_invalid() {
        test_invalid_transition(
            create_driver,
            &cfg(),
            InvalidTransition {
                from_state: DriverState::Observing { retry: None },
                event: DriverEvent::Confirmed,
                expected_error: |e| matches!(e, DriverError::InvalidEvent { .. }),
            },
        );
        test_invalid_transition(
            create_driver,
            &cfg(),
            InvalidTransition {
                from_state: DriverState::Finished,
                event: DriverEvent::Elapsed,
                expected_error: |e| matches!(e, DriverError::Terminal { .. }),
            },
        );
    }

    #[test]
    fn test_driver_state_serializes() {
        let driver = CampaignDriver::from_state(DriverState::Retrying {
            duty: advance(2),
            attempt: 1,
            reason: "timeout".to_string(),
        });
        let json = serde_json::to_string(&driver).unwrap();
        assert_eq!(serde_json::from_str::<CampaignDriver>(&json).unwrap(), driver);
    }

    prop_deterministic!(
        CampaignDriver,
        create_driver,
        get_state,
        &cfg(),
        arb_driver_state(),
        arb_driver_event()
    );

    prop_terminal_states_reject!(
        CampaignDriver,
        create_driver,
        &cfg(),
        arb_terminal_state(),
        arb_driver_event()
    );

    prop_no_silent_acceptance!(
        CampaignDriver,
        create_driver,
        get_state,
        &cfg(),
        arb_driver_state(),
        arb_driver_event()
    );
}
