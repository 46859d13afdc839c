//! The campaign lifecycle as pure state machines.
//!
//! [`phase`] derives where the campaign stands from a snapshot of its on-ledger records and
//! [`planner`] turns that into the next
//! [`CampaignDuty`](campaign_primitives::duties::CampaignDuty).
//! [`driver`] is the retry/confirmation automaton the orchestrator loop runs: it never touches
//! the ledger itself, it only tells its caller what to do next.

pub mod driver;
pub mod phase;
pub mod planner;
pub mod state_machine;

#[cfg(test)]
pub(crate) mod testing;
