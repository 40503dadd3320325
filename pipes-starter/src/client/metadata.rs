// Contract metadata lookup
// Decodes contract addresses into names and events for the custom-contracts picker.

use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::requests::ContractMetadataRequest;
use crate::models::responses::{ContractMetadata, ErrorBody};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Contract lookup is not configured (set metadata_service_url)")]
    NotConfigured,
    /// 4xx: the service rejected the input; message is user-facing.
    #[error("{0}")]
    Rejected(String),
    #[error("Contract lookup failed ({status})")]
    Service { status: u16 },
    #[error("Contract lookup unreachable: {0}")]
    Transport(String),
    #[error("Contract lookup returned an unexpected response")]
    MalformedResponse,
}

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(
        &self,
        request: &ContractMetadataRequest,
    ) -> Result<Vec<ContractMetadata>, MetadataError>;
}

fn interpret(status: u16, body: &str) -> Result<Vec<ContractMetadata>, MetadataError> {
    match status {
        200..=299 => serde_json::from_str(body).map_err(|_| MetadataError::MalformedResponse),
        400..=499 => Err(MetadataError::Rejected(
            serde_json::from_str::<ErrorBody>(body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("Request rejected ({})", status)),
        )),
        _ => Err(MetadataError::Service { status }),
    }
}

pub struct HttpMetadataLookup {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpMetadataLookup {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Transport(e.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl MetadataLookup for HttpMetadataLookup {
    async fn lookup(
        &self,
        request: &ContractMetadataRequest,
    ) -> Result<Vec<ContractMetadata>, MetadataError> {
        debug!(
            "[PHASE: metadata] [STEP: lookup] {} address(es) on {} ({})",
            request.addresses.len(),
            request.network,
            request.network_type
        );

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| MetadataError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| MetadataError::Transport(e.to_string()))?;

        let result = interpret(status, &body);
        if let Err(e) = &result {
            warn!("[PHASE: metadata] [STEP: lookup] Lookup failed: {}", e);
        }
        result
    }
}

/// Used when no metadata service is configured; every lookup fails with `NotConfigured`.
pub struct DisabledMetadataLookup;

#[async_trait]
impl MetadataLookup for DisabledMetadataLookup {
    async fn lookup(
        &self,
        _request: &ContractMetadataRequest,
    ) -> Result<Vec<ContractMetadata>, MetadataError> {
        Err(MetadataError::NotConfigured)
    }
}
