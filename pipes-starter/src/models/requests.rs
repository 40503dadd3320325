// Request models for the config-persistence and contract-metadata collaborators.

use serde::{Deserialize, Serialize};

use super::config::NetworkType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    pub json_config: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadataRequest {
    pub network_type: NetworkType,
    pub network: String,
    pub addresses: Vec<String>,
}
