//! strawberry-hub library interface
//!
//! Orchestration service in front of the content generation backends: it
//! gates client requests on signed launch parameters and bearer tokens,
//! registers groups, fans their posts out to every backend and keeps each
//! group's readiness current in the background.

pub mod api;
pub mod db;
pub mod error;
pub mod fanout;
pub mod pagination;
pub mod reconciler;

pub use crate::error::{Error, Result};

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::fanout::FanoutClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub fanout: Arc<FanoutClient>,
    /// Secret the platform signs launch parameters with
    pub client_secret: Arc<str>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, fanout: Arc<FanoutClient>, client_secret: impl Into<Arc<str>>) -> Self {
        Self {
            db,
            fanout,
            client_secret: client_secret.into(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(api::token_routes())
        .merge(api::group_routes())
        .merge(api::generate_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins; `"*"` anywhere in the list allows any
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
