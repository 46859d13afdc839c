//! The crash-resumable control loop of a campaign.
//!
//! The [`pipeline::Pipeline`] repeatedly observes the campaign ([`observer`]), plans the next
//! duty, journals it ([`persister`]), builds and submits its transaction ([`duty_dispatcher`])
//! and waits for confirmation. The order of those steps and the retry policy live in the
//! [`CampaignDriver`](campaign_sm::driver::CampaignDriver); this crate only performs what the
//! driver asks for. Exactly one transaction is in flight at any time.

pub mod config;
pub mod duty_dispatcher;
pub mod errors;
pub mod observer;
pub mod persister;
pub mod pipeline;
