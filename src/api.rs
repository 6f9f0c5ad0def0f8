//! ==============================================================================
//! api.rs - read-only sensor http api
//! ==============================================================================
//!
//! routes:
//!     GET /api/sensor/latest   -> 200 latest reading | 204 empty | 500 {"error": ..}
//!     GET /api/sensor/history  -> 200 full array (oldest first) | 500 empty body
//!
//! both routes sit behind auth::require_reader. both create the history file
//! as `[]` if it does not exist yet, then read it fresh; nothing is cached.
//!
//! the two failure bodies differ: /latest answers with an `error` field,
//! /history with an empty 500.
//!
//! relationships:
//!     - used by: main.rs (serve)
//!     - uses: store.rs (HistoryStore), auth.rs (require_reader)
//!
//! ==============================================================================

use crate::auth::{self, TokenRegistry};
use crate::domain::History;
use crate::error::StoreError;
use crate::store::HistoryStore;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub const READ_FAILURE_MESSAGE: &str = "Failed to read data.";

// ==============================================================================
// shared state
// ==============================================================================
// handlers only hold handles; the file itself is the single source of truth.

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn HistoryStore>,
    pub tokens: Arc<TokenRegistry>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/sensor/latest", get(latest_handler))
        .route("/api/sensor/history", get(history_handler))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth::require_reader,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// serve the api on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: ApiState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn read_history(store: &dyn HistoryStore) -> Result<History, StoreError> {
    store.ensure_initialized().await?;
    store.load().await
}

/// latest reading, 204 when there is none yet
async fn latest_handler(State(state): State<ApiState>) -> Response {
    match read_history(state.store.as_ref()).await {
        Ok(history) => match history.latest() {
            Some(reading) => Json(reading).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to read latest reading");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": READ_FAILURE_MESSAGE })),
            )
                .into_response()
        }
    }
}

/// full history, oldest first
async fn history_handler(State(state): State<ApiState>) -> Response {
    match read_history(state.store.as_ref()).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to read sensor history");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
// these run the real router on an ephemeral port and talk to it over http.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenEntry;
    use crate::domain::{Authority, Reading};
    use crate::fetcher::Fetcher;
    use crate::provider::TemperatureSource;
    use crate::store::JsonFileStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use reqwest::StatusCode as HttpStatus;

    const USER_TOKEN: &str = "user-token";
    const ADMIN_TOKEN: &str = "admin-token";
    const GUEST_TOKEN: &str = "guest-token";

    struct Harness {
        base: String,
        client: reqwest::Client,
        store: Arc<JsonFileStore>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        async fn start() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(JsonFileStore::new(
                dir.path().join("data").join("history.json"),
                1000,
            ));
            let tokens = TokenRegistry::from_entries(&[
                TokenEntry { token: USER_TOKEN.into(), authorities: vec![Authority::User] },
                TokenEntry { token: ADMIN_TOKEN.into(), authorities: vec![Authority::Admin] },
                TokenEntry { token: GUEST_TOKEN.into(), authorities: vec![Authority::Anonymous] },
            ]);
            let state = ApiState {
                store: store.clone(),
                tokens: Arc::new(tokens),
            };

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(serve(listener, state, std::future::pending()));

            Self {
                base: format!("http://{}", addr),
                client: reqwest::Client::new(),
                store,
                _dir: dir,
            }
        }

        async fn get(&self, route: &str, token: Option<&str>) -> reqwest::Response {
            let mut request = self.client.get(format!("{}{}", self.base, route));
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            request.send().await.unwrap()
        }

        async fn seed(&self, readings: &[(i64, f64)]) {
            let history: History = readings
                .iter()
                .map(|&(secs, t)| Reading::new(Utc.timestamp_opt(secs, 0).unwrap(), t))
                .collect::<Vec<_>>()
                .into();
            self.store.ensure_initialized().await.unwrap();
            self.store.save(&history).await.unwrap();
        }
    }

    struct FixedSource(f64);

    #[async_trait]
    impl TemperatureSource for FixedSource {
        async fn current_temperature(&self) -> Result<f64, crate::error::FetchError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_latest_bootstraps_missing_file() {
        let h = Harness::start().await;
        assert!(!h.store.path().exists());

        let response = h.get("/api/sensor/latest", Some(USER_TOKEN)).await;

        assert_eq!(response.status(), HttpStatus::NO_CONTENT);
        assert!(response.bytes().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(h.store.path()).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_history_bootstraps_missing_file() {
        let h = Harness::start().await;

        let response = h.get("/api/sensor/history", Some(ADMIN_TOKEN)).await;

        assert_eq!(response.status(), HttpStatus::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!([]));
        assert!(h.store.path().exists());
    }

    #[tokio::test]
    async fn test_latest_returns_last_element() {
        let h = Harness::start().await;
        h.seed(&[(0, 10.0), (30, 11.0), (60, 12.5)]).await;

        let response = h.get("/api/sensor/latest", Some(USER_TOKEN)).await;

        assert_eq!(response.status(), HttpStatus::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["temperature"], 12.5);
        assert_eq!(body["timestamp"], "1970-01-01T00:01:00Z");
    }

    #[tokio::test]
    async fn test_history_in_stored_order_and_idempotent() {
        let h = Harness::start().await;
        h.seed(&[(0, 10.0), (30, 11.0), (60, 12.5)]).await;

        let first: serde_json::Value = h.get("/api/sensor/history", Some(USER_TOKEN)).await.json().await.unwrap();
        let second: serde_json::Value = h.get("/api/sensor/history", Some(USER_TOKEN)).await.json().await.unwrap();

        let temps: Vec<f64> = first
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["temperature"].as_f64().unwrap())
            .collect();
        assert_eq!(temps, vec![10.0, 11.0, 12.5]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_read_failures_have_asymmetric_bodies() {
        let h = Harness::start().await;
        h.store.ensure_initialized().await.unwrap();
        std::fs::write(h.store.path(), "{ not an array").unwrap();

        let latest = h.get("/api/sensor/latest", Some(USER_TOKEN)).await;
        assert_eq!(latest.status(), HttpStatus::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = latest.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Failed to read data." }));

        let history = h.get("/api/sensor/history", Some(USER_TOKEN)).await;
        assert_eq!(history.status(), HttpStatus::INTERNAL_SERVER_ERROR);
        assert!(history.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_path_is_a_server_error() {
        let h = Harness::start().await;
        // a directory where the file should be
        std::fs::create_dir_all(h.store.path()).unwrap();

        let latest = h.get("/api/sensor/latest", Some(USER_TOKEN)).await;
        assert_eq!(latest.status(), HttpStatus::INTERNAL_SERVER_ERROR);

        let history = h.get("/api/sensor/history", Some(USER_TOKEN)).await;
        assert_eq!(history.status(), HttpStatus::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_authorization_is_enforced() {
        let h = Harness::start().await;

        for route in ["/api/sensor/latest", "/api/sensor/history"] {
            assert_eq!(h.get(route, None).await.status(), HttpStatus::UNAUTHORIZED);
            assert_eq!(h.get(route, Some("wrong")).await.status(), HttpStatus::UNAUTHORIZED);
            assert_eq!(h.get(route, Some(GUEST_TOKEN)).await.status(), HttpStatus::FORBIDDEN);
        }
        // rejected callers never reach the store
        assert!(!h.store.path().exists());
    }

    struct DownSource;

    #[async_trait]
    impl TemperatureSource for DownSource {
        async fn current_temperature(&self) -> Result<f64, crate::error::FetchError> {
            Err(crate::error::FetchError::Status(503))
        }
    }

    #[tokio::test]
    async fn test_provider_outage_is_invisible_to_readers() {
        let h = Harness::start().await;
        let fetcher = Fetcher::new(Arc::new(DownSource), h.store.clone(), false);

        // nothing stored yet: still an empty answer, not an error
        assert!(fetcher.run_cycle().await.is_err());
        assert_eq!(h.get("/api/sensor/latest", Some(USER_TOKEN)).await.status(), HttpStatus::NO_CONTENT);

        h.seed(&[(0, 10.0), (30, 11.0)]).await;
        let before: serde_json::Value = h.get("/api/sensor/history", Some(USER_TOKEN)).await.json().await.unwrap();

        fetcher.tick().await;

        let latest = h.get("/api/sensor/latest", Some(USER_TOKEN)).await;
        assert_eq!(latest.status(), HttpStatus::OK);
        let latest: serde_json::Value = latest.json().await.unwrap();
        assert_eq!(latest["temperature"], 11.0);

        let history = h.get("/api/sensor/history", Some(USER_TOKEN)).await;
        assert_eq!(history.status(), HttpStatus::OK);
        let after: serde_json::Value = history.json().await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_fetched_reading_round_trips_through_api() {
        let h = Harness::start().await;
        let fetcher = Fetcher::new(Arc::new(FixedSource(18.4)), h.store.clone(), false);

        // empty file, then one successful cycle
        h.get("/api/sensor/history", Some(USER_TOKEN)).await;
        fetcher.run_cycle().await.unwrap();

        let latest: serde_json::Value = h.get("/api/sensor/latest", Some(USER_TOKEN)).await.json().await.unwrap();
        assert_eq!(latest["temperature"], 18.4);
        let timestamp = latest["timestamp"].as_str().unwrap();
        assert!(timestamp.parse::<DateTime<Utc>>().is_ok());

        let history: serde_json::Value = h.get("/api/sensor/history", Some(USER_TOKEN)).await.json().await.unwrap();
        let last = history.as_array().unwrap().last().unwrap();
        assert_eq!(last, &latest);
    }
}
