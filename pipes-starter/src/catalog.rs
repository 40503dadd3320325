//! Network / sink / template catalog.
//!
//! The wizard only reads this data. A default catalog is compiled in; settings may point at a
//! replacement TOML file with the same layout.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::models::config::{NetworkType, Sink, TemplateId};

const DEFAULT_CATALOG: &str = include_str!("../catalog.toml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkSummary {
    pub slug: String,
    pub name: String,
    /// `mainnet` / `testnet`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub realtime: bool,
    #[serde(default)]
    pub traces: bool,
    #[serde(default)]
    pub state_diffs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SinkOption {
    pub id: Sink,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateOption {
    pub id: TemplateId,
    pub name: String,
}

/// One list per network family (`[[networks.evm]]`, `[[networks.svm]]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct PerNetworkType<T> {
    #[serde(default = "Vec::new")]
    evm: Vec<T>,
    #[serde(default = "Vec::new")]
    svm: Vec<T>,
}

impl<T> Default for PerNetworkType<T> {
    fn default() -> Self {
        Self {
            evm: Vec::new(),
            svm: Vec::new(),
        }
    }
}

impl<T> PerNetworkType<T> {
    fn get(&self, network_type: NetworkType) -> &[T] {
        match network_type {
            NetworkType::Evm => &self.evm,
            NetworkType::Svm => &self.svm,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    networks: PerNetworkType<NetworkSummary>,
    #[serde(default)]
    sinks: Vec<SinkOption>,
    #[serde(default)]
    templates: PerNetworkType<TemplateOption>,
}

impl Catalog {
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(text)?)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(DEFAULT_CATALOG)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&text)
    }

    /// Settings override if given, else the compiled-in catalog.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    pub fn networks(&self, network_type: NetworkType) -> &[NetworkSummary] {
        self.networks.get(network_type)
    }

    pub fn sinks(&self) -> &[SinkOption] {
        &self.sinks
    }

    pub fn template_options(&self, network_type: NetworkType) -> &[TemplateOption] {
        self.templates.get(network_type)
    }

    /// Case-insensitive substring match on name, slug or chain id. Catalog order is kept.
    pub fn search_networks(&self, network_type: NetworkType, query: &str) -> Vec<&NetworkSummary> {
        let q = query.trim().to_lowercase();
        self.networks(network_type)
            .iter()
            .filter(|n| {
                q.is_empty()
                    || n.name.to_lowercase().contains(&q)
                    || n.slug.to_lowercase().contains(&q)
                    || n.chain_id
                        .as_deref()
                        .map(|c| c.to_lowercase().contains(&q))
                        .unwrap_or(false)
            })
            .collect()
    }

    pub fn network_name(&self, network_type: NetworkType, slug: &str) -> String {
        self.networks(network_type)
            .iter()
            .find(|n| n.slug == slug)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| slug.to_string())
    }

    pub fn sink_name(&self, sink: Sink) -> String {
        self.sinks
            .iter()
            .find(|s| s.id == sink)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| sink.as_str().to_string())
    }

    pub fn template_name(&self, network_type: NetworkType, template_id: TemplateId) -> String {
        self.template_options(network_type)
            .iter()
            .find(|t| t.id == template_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| template_id.as_str().to_string())
    }
}
