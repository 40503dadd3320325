// Short-reference exchange
//
// The wizard talks to config persistence through `ConfigExchange`: save returns the content hash,
// load returns the stored JSON text. `LocalConfigExchange` runs the handlers in-process over a
// `ConfigStore`; `HttpConfigExchange` calls a remote config service with the same contract.

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::api::config::{load_config, save_config};
use crate::database::store::ConfigStore;
use crate::models::requests::SaveConfigRequest;
use crate::models::responses::{ErrorBody, SaveConfigResponse};
use crate::security::crypto::is_config_hash;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Config id is empty")]
    InvalidId,
    #[error("Config not found")]
    NotFound,
    /// 4xx with a message.
    #[error("{0}")]
    Rejected(String),
    /// 5xx or any other unexpected status.
    #[error("Config service error ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("Config service unreachable: {0}")]
    Transport(String),
    #[error("Config service returned an unexpected response")]
    MalformedResponse,
}

#[async_trait]
pub trait ConfigExchange: Send + Sync {
    /// Persist `json_config`, returning its hash. Saving identical content again yields the
    /// same hash and is not an error.
    async fn save(&self, json_config: &str) -> Result<String, ExchangeError>;

    /// Fetch the stored text for `config_id`. Blank ids fail with `InvalidId` before any lookup.
    async fn load(&self, config_id: &str) -> Result<String, ExchangeError>;

    /// Short description for logs and the TUI footer.
    fn describe(&self) -> String;
}

fn error_text(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn interpret_save(status: u16, body: &str) -> Result<String, ExchangeError> {
    match status {
        200..=299 => serde_json::from_str::<SaveConfigResponse>(body)
            .ok()
            .map(|r| r.hash)
            .filter(|hash| is_config_hash(hash))
            .ok_or(ExchangeError::MalformedResponse),
        400..=499 => Err(ExchangeError::Rejected(error_text(body))),
        _ => Err(ExchangeError::Service {
            status,
            message: error_text(body),
        }),
    }
}

fn interpret_load(status: u16, body: String) -> Result<String, ExchangeError> {
    match status {
        200..=299 => Ok(body),
        400 => Err(ExchangeError::InvalidId),
        404 => Err(ExchangeError::NotFound),
        401..=499 => Err(ExchangeError::Rejected(error_text(&body))),
        _ => Err(ExchangeError::Service {
            status,
            message: error_text(&body),
        }),
    }
}

// =============================================================================
// In-process exchange
// =============================================================================

pub struct LocalConfigExchange {
    store: Arc<dyn ConfigStore>,
}

impl LocalConfigExchange {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConfigExchange for LocalConfigExchange {
    async fn save(&self, json_config: &str) -> Result<String, ExchangeError> {
        let reply = save_config(
            self.store.as_ref(),
            Some(SaveConfigRequest {
                json_config: json_config.to_string(),
            }),
        )
        .await;
        interpret_save(reply.status, &reply.body)
    }

    async fn load(&self, config_id: &str) -> Result<String, ExchangeError> {
        if config_id.trim().is_empty() {
            return Err(ExchangeError::InvalidId);
        }
        let reply = load_config(self.store.as_ref(), config_id).await;
        interpret_load(reply.status, reply.body)
    }

    fn describe(&self) -> String {
        format!("local ({})", self.store.backend_name())
    }
}

// =============================================================================
// HTTP exchange
// =============================================================================

pub struct HttpConfigExchange {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpConfigExchange {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    /// `<base>/api/config` plus optional id segment (percent-encoded).
    pub fn endpoint(&self, config_id: Option<&str>) -> Result<Url, ExchangeError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ExchangeError::Transport("base URL cannot be a base".to_string()))?;
            segments.pop_if_empty().push("api").push("config");
            if let Some(id) = config_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ConfigExchange for HttpConfigExchange {
    async fn save(&self, json_config: &str) -> Result<String, ExchangeError> {
        let url = self.endpoint(None)?;
        debug!("[PHASE: exchange] [STEP: save] POST {}", url);

        let resp = self
            .client
            .post(url)
            .json(&SaveConfigRequest {
                json_config: json_config.to_string(),
            })
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let result = interpret_save(status, &body);
        if let Err(e) = &result {
            warn!("[PHASE: exchange] [STEP: save] Save failed: {}", e);
        }
        result
    }

    async fn load(&self, config_id: &str) -> Result<String, ExchangeError> {
        let id = config_id.trim();
        if id.is_empty() {
            return Err(ExchangeError::InvalidId);
        }
        let url = self.endpoint(Some(id))?;
        debug!("[PHASE: exchange] [STEP: load] GET {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        interpret_load(status, body)
    }

    fn describe(&self) -> String {
        format!("http ({})", self.base_url)
    }
}

#[cfg(test)]
pub(crate) mod test_stubs {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Exchange that always fails to save with a fixed error.
    pub struct FailingExchange {
        pub error: ExchangeError,
        pub call_count: AtomicU32,
    }

    impl FailingExchange {
        pub fn new(error: ExchangeError) -> Self {
            Self {
                error,
                call_count: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ConfigExchange for FailingExchange {
        async fn save(&self, _json_config: &str) -> Result<String, ExchangeError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }

        async fn load(&self, _config_id: &str) -> Result<String, ExchangeError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }
}
