//! Template metadata registry.
//!
//! Static description of every pipeline template: which network family it belongs to, whether
//! it takes parameters, the parameter schema and defaults. Disablement is recorded here but only
//! enforced by callers.

pub mod custom;
pub mod form;
pub mod params;

use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::models::config::{NetworkType, TemplateId, TemplateParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    StringArray,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMetadata {
    pub template_id: TemplateId,
    pub template_name: &'static str,
    pub network_type: NetworkType,
    pub params_schema: Option<Vec<ParamField>>,
    pub default_params: Option<TemplateParams>,
    pub disabled: bool,
}

impl TemplateMetadata {
    fn plain(template_id: TemplateId, template_name: &'static str, network_type: NetworkType) -> Self {
        Self {
            template_id,
            template_name,
            network_type,
            params_schema: None,
            default_params: None,
            disabled: false,
        }
    }

    fn with_schema(mut self, schema: Vec<ParamField>) -> Self {
        let defaults: TemplateParams = schema
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.to_string(), d)))
            .collect();
        self.default_params = (!defaults.is_empty()).then_some(defaults);
        self.params_schema = Some(schema);
        self
    }

    fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

const WETH_ADDRESS: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const UNISWAP_V3_FACTORY: &str = "0x1f98431c8ad98523631ae4a59f267346ea31f984";

fn registry() -> &'static [TemplateMetadata] {
    static REGISTRY: OnceLock<Vec<TemplateMetadata>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        vec![
            TemplateMetadata::plain(TemplateId::Erc20Transfers, "ERC20 Transfers", NetworkType::Evm)
                .with_schema(vec![ParamField {
                    name: "contractAddresses",
                    label: "Array of erc20 contract addresses to track",
                    kind: ParamKind::StringArray,
                    default: Some(json!([WETH_ADDRESS])),
                }]),
            TemplateMetadata::plain(TemplateId::UniswapV3Swaps, "Uniswap V3 Swaps", NetworkType::Evm)
                .with_schema(vec![ParamField {
                    name: "factoryAddress",
                    label: "The Uniswap V3 compatible factory address to dynamically track pools",
                    kind: ParamKind::String,
                    default: Some(json!(UNISWAP_V3_FACTORY)),
                }]),
            TemplateMetadata::plain(TemplateId::MorphoBlue, "Morpho Blue", NetworkType::Evm).disabled(),
            TemplateMetadata::plain(TemplateId::UniswapV4, "Uniswap V4", NetworkType::Evm).disabled(),
            TemplateMetadata::plain(TemplateId::Polymarket, "Polymarket", NetworkType::Evm).disabled(),
            // Parameters come from the contract picker, not a schema.
            TemplateMetadata::plain(TemplateId::Custom, "Bring your own contracts", NetworkType::Evm),
            TemplateMetadata::plain(TemplateId::TokenBalances, "Token balances", NetworkType::Svm),
        ]
    })
}

pub fn get_template_metadata(template_id: TemplateId) -> Option<&'static TemplateMetadata> {
    registry().iter().find(|m| m.template_id == template_id)
}

/// True iff the template is registered and either declares a schema or is the custom-contracts
/// template (which always collects parameters interactively).
pub fn needs_params(template_id: TemplateId) -> bool {
    get_template_metadata(template_id)
        .map(|m| m.params_schema.is_some() || m.template_id == TemplateId::Custom)
        .unwrap_or(false)
}

pub fn is_disabled(template_id: TemplateId) -> bool {
    get_template_metadata(template_id)
        .map(|m| m.disabled)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_templates_need_params() {
        assert!(needs_params(TemplateId::Erc20Transfers));
        assert!(needs_params(TemplateId::UniswapV3Swaps));
    }

    #[test]
    fn custom_always_needs_params_without_schema() {
        let meta = get_template_metadata(TemplateId::Custom).unwrap();
        assert!(meta.params_schema.is_none());
        assert!(needs_params(TemplateId::Custom));
    }

    #[test]
    fn schema_less_templates_do_not_need_params() {
        assert!(!needs_params(TemplateId::TokenBalances));
        assert!(!needs_params(TemplateId::MorphoBlue));
        assert!(!needs_params(TemplateId::Polymarket));
    }

    #[test]
    fn defaults_are_derived_from_schema() {
        let meta = get_template_metadata(TemplateId::Erc20Transfers).unwrap();
        let defaults = meta.default_params.as_ref().unwrap();
        assert_eq!(defaults["contractAddresses"], json!([WETH_ADDRESS]));

        let meta = get_template_metadata(TemplateId::UniswapV3Swaps).unwrap();
        let defaults = meta.default_params.as_ref().unwrap();
        assert_eq!(defaults["factoryAddress"], json!(UNISWAP_V3_FACTORY));

        assert!(get_template_metadata(TemplateId::TokenBalances)
            .unwrap()
            .default_params
            .is_none());
    }

    #[test]
    fn disabled_flags_are_recorded_not_enforced() {
        assert!(is_disabled(TemplateId::MorphoBlue));
        assert!(is_disabled(TemplateId::UniswapV4));
        assert!(!is_disabled(TemplateId::Erc20Transfers));
        // Disabled templates still resolve.
        assert!(get_template_metadata(TemplateId::UniswapV4).is_some());
    }

    #[test]
    fn every_template_is_registered_once() {
        let ids: Vec<TemplateId> = registry().iter().map(|m| m.template_id).collect();
        let mut dedup = ids.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(ids.len(), dedup.len());
        assert_eq!(ids.len(), 7);
    }
}
