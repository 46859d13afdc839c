//! This crate contains the parameters every participant and operator of a campaign has to agree
//! on: the protocol amounts and limits, and the hashes of the deployed authorization scripts.

pub mod default;
pub mod errors;
pub mod protocol;
pub mod scripts;

use serde::{Deserialize, Serialize};

use crate::{errors::ParamsError, protocol::ProtocolParams, scripts::ScriptParams};

/// Everything needed to build and recognize campaign transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParams {
    /// Amounts and limits.
    #[serde(default)]
    pub protocol: ProtocolParams,

    /// Deployed script hashes.
    pub scripts: ScriptParams,
}

impl CampaignParams {
    /// Parses and validates params from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ParamsError> {
        let params: Self = toml::from_str(s).map_err(|e| ParamsError::Parse(e.to_string()))?;
        params.protocol.validate()?;
        Ok(params)
    }
}
