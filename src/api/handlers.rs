//! API Handlers
//!
//! HTTP request handlers forwarding to the shared cache manager.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HasResponse, HealthResponse, KeysResponse,
    SetRequest, SetResponse, StatsResponse, TagInvalidationResponse,
};

/// Application state shared across all handlers.
///
/// Holds a handle to the cache manager; clones share one cache.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheManager,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Fails when the configured provider is not implemented.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheManager::new(config)?))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value with optional TTL, tier and tags.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    state
        .cache
        .set_value(req.key.clone(), req.value, &options)
        .await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get_value(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<HasResponse> {
    let exists = state.cache.has(&key).await;
    Json(HasResponse { key, exists })
}

/// Handler for DELETE /del/:key
///
/// Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key).await;
    Json(DeleteResponse::new(key))
}

/// Handler for DELETE /tag/:tag
pub async fn delete_by_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<TagInvalidationResponse> {
    let removed = state.cache.delete_by_tag(&tag).await;
    Json(TagInvalidationResponse { tag, removed })
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::cleared())
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let keys = state.cache.keys().await;
    let size = state.cache.size().await;
    Json(KeysResponse::new(keys, size))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().await.into())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> AppState {
        AppState::from_config(&Config::default()).unwrap()
    }

    fn set_request(key: &str, value: serde_json::Value, tags: &[&str]) -> SetRequest {
        serde_json::from_value(json!({
            "key": key,
            "value": value,
            "tags": tags,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = state();

        let req = set_request("test_key", json!({"venue": "Hall A"}), &[]);
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"venue": "Hall A"}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(state()), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        let req = set_request("to_delete", json!("value"), &[]);
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        delete_handler(State(state.clone()), Path("to_delete".to_string())).await;

        let exists = has_handler(State(state), Path("to_delete".to_string())).await;
        assert!(!exists.exists);
    }

    #[tokio::test]
    async fn test_delete_by_tag_handler() {
        let state = state();
        for key in ["a", "b"] {
            let req = set_request(key, json!(key), &["t"]);
            set_handler(State(state.clone()), Json(req)).await.unwrap();
        }
        let req = set_request("c", json!("c"), &[]);
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let response = delete_by_tag_handler(State(state.clone()), Path("t".to_string())).await;
        assert_eq!(response.removed, 2);

        let keys = keys_handler(State(state)).await;
        assert_eq!(keys.keys, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_and_stats_handler() {
        let state = state();
        let req = set_request("k", json!(1), &[]);
        set_handler(State(state.clone()), Json(req)).await.unwrap();
        let _ = get_handler(State(state.clone()), Path("k".to_string())).await;

        clear_handler(State(state.clone())).await;

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hit_count, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let req = set_request("", json!("value"), &[]);
        let result = set_handler(State(state()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
