//! Strategies for the driver's states and events.

use campaign_primitives::{
    duties::CampaignDuty,
    hashes::{PubKeyHash, TxId},
    time::PosixTime,
};
use proptest::prelude::*;

use crate::driver::{DriverEvent, DriverState, PendingRetry, Recovery};

fn arb_pointer() -> impl Strategy<Value = Option<PubKeyHash>> {
    proptest::option::of(any::<u8>().prop_map(|b| PubKeyHash::new([b; 28])))
}

fn arb_tx_id() -> impl Strategy<Value = TxId> {
    any::<u16>().prop_map(|n| TxId::digest(n.to_be_bytes()))
}

pub(crate) fn arb_campaign_duty() -> impl Strategy<Value = CampaignDuty> {
    prop_oneof![
        Just(CampaignDuty::InitSet),
        (0u64..100_000).prop_map(|t| CampaignDuty::WaitUntil(PosixTime(t))),
        Just(CampaignDuty::InitCommitFold),
        arb_pointer().prop_map(|from| CampaignDuty::AdvanceCommitFold { from }),
        Just(CampaignDuty::InitRewardPool),
        Just(CampaignDuty::WaitForRewardPool),
        Just(CampaignDuty::InitRewardFold),
        arb_pointer().prop_map(|from| CampaignDuty::AdvanceRewardFold { from }),
        Just(CampaignDuty::ReclaimReward),
        Just(CampaignDuty::DeinitSet),
        Just(CampaignDuty::Done),
    ]
}

fn arb_reason() -> impl Strategy<Value = String> {
    "[a-z ]{0,12}"
}

pub(crate) fn arb_terminal_state() -> impl Strategy<Value = DriverState> {
    prop_oneof![
        Just(DriverState::Finished),
        (arb_campaign_duty(), arb_reason())
            .prop_map(|(duty, reason)| DriverState::Failed { duty, reason }),
    ]
}

pub(crate) fn arb_driver_state() -> impl Strategy<Value = DriverState> {
    let retry = proptest::option::of(
        (arb_campaign_duty(), 1u32..5, any::<bool>(), arb_reason()).prop_map(
            |(duty, attempts, exhausted, last_error)| PendingRetry {
                duty,
                attempts,
                exhausted,
                last_error,
            },
        ),
    );
    prop_oneof![
        Just(DriverState::Recovering),
        retry.prop_map(|retry| DriverState::Observing { retry }),
        (arb_campaign_duty(), 1u32..5)
            .prop_map(|(duty, attempt)| DriverState::Executing { duty, attempt }),
        (arb_campaign_duty(), 1u32..5, arb_tx_id()).prop_map(|(duty, attempt, tx_id)| {
            DriverState::Confirming {
                duty,
                attempt,
                tx_id,
            }
        }),
        (arb_campaign_duty(), 1u32..5, arb_reason()).prop_map(|(duty, attempt, reason)| {
            DriverState::Retrying {
                duty,
                attempt,
                reason,
            }
        }),
        arb_campaign_duty().prop_map(|duty| DriverState::Waiting { duty }),
        arb_terminal_state(),
    ]
}

pub(crate) fn arb_driver_event() -> impl Strategy<Value = DriverEvent> {
    let recovery = prop_oneof![
        Just(Recovery::Clean),
        Just(Recovery::Settled),
        (arb_campaign_duty(), 1u32..5, arb_tx_id()).prop_map(|(duty, attempt, tx_id)| {
            Recovery::InFlight {
                duty,
                attempt,
                tx_id,
            }
        }),
        (arb_campaign_duty(), 1u32..5)
            .prop_map(|(duty, attempt)| Recovery::Abandoned { duty, attempt }),
    ];
    prop_oneof![
        recovery.prop_map(DriverEvent::Recovered),
        (0u64..100_000, arb_campaign_duty()).prop_map(|(now, duty)| DriverEvent::Observed {
            now: PosixTime(now),
            duty,
        }),
        arb_tx_id().prop_map(|tx_id| DriverEvent::Submitted { tx_id }),
        (any::<bool>(), arb_reason()).prop_map(|(recoverable, reason)| DriverEvent::Failed {
            recoverable,
            reason,
        }),
        Just(DriverEvent::Confirmed),
        Just(DriverEvent::ConfirmationTimedOut),
        Just(DriverEvent::Elapsed),
    ]
}

