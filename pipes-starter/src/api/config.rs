// Config save/load handlers
//
// Status mapping:
//   save: 200 {hash} (including "already stored"), 400 blank jsonConfig, 500 store failure
//   load: 200 raw JSON, 400 blank id, 404 unknown id, 500 store failure

use log::{error, info};
use std::time::Instant;
use uuid::Uuid;

use crate::database::store::{ConfigStore, StoreError};
use crate::models::requests::SaveConfigRequest;
use crate::models::responses::{ApiReply, SaveConfigResponse};
use crate::security::crypto::config_hash;

pub const ERR_INVALID_CONFIG: &str = "Invalid jsonConfig";
pub const ERR_INVALID_HASH: &str = "Invalid config hash";
pub const ERR_NOT_FOUND: &str = "Config not found";
pub const ERR_SAVE_FAILED: &str = "Failed to save config";
pub const ERR_LOAD_FAILED: &str = "Failed to load config";

pub async fn save_config(store: &dyn ConfigStore, payload: Option<SaveConfigRequest>) -> ApiReply {
    let started = Instant::now();
    let correlation_id = Uuid::new_v4().simple().to_string();

    let Some(req) = payload else {
        return ApiReply::error(400, ERR_INVALID_CONFIG);
    };
    if req.json_config.trim().is_empty() {
        return ApiReply::error(400, ERR_INVALID_CONFIG);
    }

    let hash = config_hash(&req.json_config);
    match store.insert(&hash, &req.json_config).await {
        Ok(()) => {
            info!(
                "[PHASE: api] [STEP: save_config] Stored config hash={} backend={} (correlation_id={}, {} ms)",
                hash,
                store.backend_name(),
                correlation_id,
                started.elapsed().as_millis()
            );
            ApiReply::json(200, &SaveConfigResponse { hash })
        }
        // Same content, same hash: the stored record is already this config.
        Err(StoreError::Duplicate) => {
            info!(
                "[PHASE: api] [STEP: save_config] Config already stored hash={} (correlation_id={})",
                hash, correlation_id
            );
            ApiReply::json(200, &SaveConfigResponse { hash })
        }
        Err(e) => {
            error!(
                "[PHASE: api] [STEP: save_config] Save failed (correlation_id={}): {}",
                correlation_id, e
            );
            ApiReply::error(500, ERR_SAVE_FAILED)
        }
    }
}

pub async fn load_config(store: &dyn ConfigStore, config_id: &str) -> ApiReply {
    let id = config_id.trim();
    if id.is_empty() {
        return ApiReply::error(400, ERR_INVALID_HASH);
    }

    match store.fetch(id).await {
        Ok(Some(json)) => ApiReply::raw_json(json),
        Ok(None) => {
            info!(
                "[PHASE: api] [STEP: load_config] Unknown config hash={}",
                id
            );
            ApiReply::error(404, ERR_NOT_FOUND)
        }
        Err(e) => {
            error!(
                "[PHASE: api] [STEP: load_config] Load failed hash={}: {}",
                id, e
            );
            ApiReply::error(500, ERR_LOAD_FAILED)
        }
    }
}
