// Configuration model
// The derived `PipesConfig` and the closed vocabularies the wizard selects from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Arbitrary parameter object recorded for a template. Key order is insertion order.
pub type TemplateParams = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    #[default]
    Evm,
    Svm,
}

impl NetworkType {
    pub const ALL: [NetworkType; 2] = [NetworkType::Evm, NetworkType::Svm];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Evm => "evm",
            NetworkType::Svm => "svm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NetworkType::Evm => "EVM",
            NetworkType::Svm => "SVM",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            NetworkType::Evm => NetworkType::Svm,
            NetworkType::Svm => NetworkType::Evm,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Pnpm,
    Yarn,
    Npm,
    Bun,
}

impl PackageManager {
    pub const ALL: [PackageManager; 4] = [
        PackageManager::Pnpm,
        PackageManager::Yarn,
        PackageManager::Npm,
        PackageManager::Bun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
            PackageManager::Bun => "bun",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PackageManager::Pnpm => "Fast, disk-efficient package manager",
            PackageManager::Yarn => "Stable, widely used package manager",
            PackageManager::Npm => "Default Node.js package manager",
            PackageManager::Bun => "Lightning fast, modern package manager",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sink {
    Clickhouse,
    Postgresql,
    Memory,
}

impl Sink {
    pub const ALL: [Sink; 3] = [Sink::Clickhouse, Sink::Postgresql, Sink::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sink::Clickhouse => "clickhouse",
            Sink::Postgresql => "postgresql",
            Sink::Memory => "memory",
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers of the pipeline templates known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateId {
    Erc20Transfers,
    UniswapV3Swaps,
    MorphoBlue,
    UniswapV4,
    Polymarket,
    TokenBalances,
    Custom,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Erc20Transfers => "erc20Transfers",
            TemplateId::UniswapV3Swaps => "uniswapV3Swaps",
            TemplateId::MorphoBlue => "morphoBlue",
            TemplateId::UniswapV4 => "uniswapV4",
            TemplateId::Polymarket => "polymarket",
            TemplateId::TokenBalances => "tokenBalances",
            TemplateId::Custom => "custom",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub template_id: TemplateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<TemplateParams>,
}

/// Final config JSON consumed by the scaffolding CLI.
///
/// Field order here is the serialized key order and must not change: the serialized text is the
/// input of the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipesConfig {
    pub project_folder: String,
    pub network_type: NetworkType,
    pub package_manager: PackageManager,
    pub network: String,
    pub templates: Vec<TemplateConfig>,
    pub sink: Sink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_ids_serialize_as_camel_case() {
        let json = serde_json::to_string(&TemplateId::Erc20Transfers).unwrap();
        assert_eq!(json, "\"erc20Transfers\"");
        let json = serde_json::to_string(&TemplateId::UniswapV3Swaps).unwrap();
        assert_eq!(json, "\"uniswapV3Swaps\"");

        for id in [
            TemplateId::Erc20Transfers,
            TemplateId::UniswapV3Swaps,
            TemplateId::MorphoBlue,
            TemplateId::UniswapV4,
            TemplateId::Polymarket,
            TemplateId::TokenBalances,
            TemplateId::Custom,
        ] {
            assert_eq!(
                serde_json::to_string(&id).unwrap(),
                format!("\"{}\"", id.as_str()),
                "serde name and as_str must agree for {:?}",
                id
            );
        }
    }

    #[test]
    fn pipes_config_serializes_in_fixed_key_order() {
        let cfg = PipesConfig {
            project_folder: "my-bot".to_string(),
            network_type: NetworkType::Evm,
            package_manager: PackageManager::Pnpm,
            network: "ethereum-mainnet".to_string(),
            templates: vec![TemplateConfig {
                template_id: TemplateId::TokenBalances,
                params: None,
            }],
            sink: Sink::Memory,
        };

        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(
            json,
            r#"{"projectFolder":"my-bot","networkType":"evm","packageManager":"pnpm","network":"ethereum-mainnet","templates":[{"templateId":"tokenBalances"}],"sink":"memory"}"#
        );
    }

    #[test]
    fn network_type_toggle_flips() {
        assert_eq!(NetworkType::Evm.toggle(), NetworkType::Svm);
        assert_eq!(NetworkType::Svm.toggle(), NetworkType::Evm);
    }
}
