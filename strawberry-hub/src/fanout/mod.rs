//! Microservice fan-out client
//!
//! Broadcasts group operations to every configured generation backend and
//! folds the individual answers into one result:
//!
//! - `ingest` walks the backends in configuration order and stops at the
//!   first failure. Backends after the failing one are not contacted and
//!   backends before it are not rolled back.
//! - `check_status` is ready only when every backend is ready. A backend
//!   reporting an error aborts the whole check; a backend that is merely not
//!   ready does not.
//! - `generate` goes to exactly one backend, selected by name.
//!
//! Every backend call is bounded by its own timeout. A timed-out call is
//! treated like an explicit backend error.

pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strawberry_common::config::{AppConfig, TimeoutConfig};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure talking to a generation backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FanoutError {
    /// Connection refused, DNS failure, reset, ...
    #[error("Backend {backend} unreachable: {detail}")]
    Unreachable { backend: String, detail: String },

    /// Call exceeded its timeout
    #[error("Backend {backend} timed out")]
    Timeout { backend: String },

    /// Backend answered with an explicit error result
    #[error("Backend {backend} reported an error during {operation}")]
    Rejected {
        backend: String,
        operation: &'static str,
    },

    /// Non-2xx status or undecodable body
    #[error("Backend {backend} sent an invalid response: {detail}")]
    InvalidResponse { backend: String, detail: String },

    /// No configured backend has this name
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),
}

/// One generation backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Name used to route generate calls
    fn name(&self) -> &str;

    /// Hand the group's posts to the backend
    async fn ingest(&self, group_id: i64, texts: &[String]) -> Result<(), FanoutError>;

    /// Whether the backend's model for the group is ready
    async fn check_status(&self, group_id: i64) -> Result<bool, FanoutError>;

    /// Generate content for the group from a hint
    async fn generate(&self, group_id: i64, hint: &str) -> Result<String, FanoutError>;
}

/// Aggregating client over all configured backends
pub struct FanoutClient {
    backends: Vec<Arc<dyn Backend>>,
    timeouts: TimeoutConfig,
}

impl FanoutClient {
    pub fn new(backends: Vec<Arc<dyn Backend>>, timeouts: TimeoutConfig) -> Self {
        Self { backends, timeouts }
    }

    /// Build an HTTP backend for every configured service
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let mut backends: Vec<Arc<dyn Backend>> = Vec::with_capacity(config.services.len());
        for service in &config.services {
            let backend = HttpBackend::new(service).map_err(|e| {
                crate::Error::Internal(format!("HTTP client for {}: {}", service.name, e))
            })?;
            backends.push(Arc::new(backend));
        }
        Ok(Self::new(backends, config.timeouts))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Send the corpus to every backend, failing fast
    pub async fn ingest(&self, group_id: i64, texts: &[String]) -> Result<(), FanoutError> {
        for backend in &self.backends {
            debug!("Ingesting group {} into {}", group_id, backend.name());
            bounded(backend.name(), self.timeouts.ingest(), backend.ingest(group_id, texts))
                .await
                .map_err(|e| {
                    warn!("Ingest of group {} stopped at {}: {}", group_id, backend.name(), e);
                    e
                })?;
        }
        Ok(())
    }

    /// Overall readiness: true only if every backend is ready
    pub async fn check_status(&self, group_id: i64) -> Result<bool, FanoutError> {
        let mut all_ready = true;
        for backend in &self.backends {
            let ready =
                bounded(backend.name(), self.timeouts.status(), backend.check_status(group_id))
                    .await?;
            if !ready {
                debug!("Group {} not ready on {}", group_id, backend.name());
                all_ready = false;
            }
        }
        Ok(all_ready)
    }

    /// Generate from the backend called `backend_name`
    pub async fn generate(
        &self,
        backend_name: &str,
        group_id: i64,
        hint: &str,
    ) -> Result<String, FanoutError> {
        let backend = self
            .backends
            .iter()
            .find(|b| b.name() == backend_name)
            .ok_or_else(|| FanoutError::UnknownBackend(backend_name.to_string()))?;

        bounded(backend.name(), self.timeouts.generate(), backend.generate(group_id, hint)).await
    }
}

async fn bounded<T>(
    backend: &str,
    limit: Duration,
    call: impl Future<Output = Result<T, FanoutError>>,
) -> Result<T, FanoutError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(FanoutError::Timeout {
            backend: backend.to_string(),
        }),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{client, Behavior, StubBackend};
    use super::*;

    #[tokio::test]
    async fn test_check_status_all_ready() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::Ready),
            StubBackend::new("image_gen", Behavior::Ready),
        ];
        assert!(client(&stubs).check_status(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_status_one_not_ready() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::Ready),
            StubBackend::new("image_gen", Behavior::NotReady),
        ];
        assert!(!client(&stubs).check_status(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_status_not_ready_does_not_short_circuit() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::NotReady),
            StubBackend::new("image_gen", Behavior::Error),
        ];

        // A later explicit error still surfaces after an earlier not-ready
        let result = client(&stubs).check_status(1).await;
        assert!(matches!(result, Err(FanoutError::Rejected { .. })));
        assert_eq!(stubs[1].calls(), 1);
    }

    #[tokio::test]
    async fn test_check_status_error_aborts() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::Ready),
            StubBackend::new("image_gen", Behavior::Error),
        ];
        let result = client(&stubs).check_status(1).await;
        assert_eq!(
            result,
            Err(FanoutError::Rejected {
                backend: "image_gen".to_string(),
                operation: "check_status",
            })
        );
    }

    #[tokio::test]
    async fn test_check_status_timeout_is_error() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::Hang),
            StubBackend::new("image_gen", Behavior::Ready),
        ];
        let result = client(&stubs).check_status(1).await;
        assert_eq!(
            result,
            Err(FanoutError::Timeout {
                backend: "text_gen".to_string()
            })
        );
        assert_eq!(stubs[1].calls(), 0);
    }

    #[tokio::test]
    async fn test_ingest_contacts_every_backend() {
        let stubs = [
            StubBackend::new("a", Behavior::Ready),
            StubBackend::new("b", Behavior::NotReady),
            StubBackend::new("c", Behavior::Ready),
        ];
        client(&stubs)
            .ingest(1, &["post".to_string()])
            .await
            .unwrap();
        assert!(stubs.iter().all(|s| s.calls() == 1));
    }

    #[tokio::test]
    async fn test_ingest_fails_fast() {
        let stubs = [
            StubBackend::new("a", Behavior::Ready),
            StubBackend::new("b", Behavior::Error),
            StubBackend::new("c", Behavior::Ready),
        ];
        let result = client(&stubs).ingest(1, &[]).await;

        assert!(matches!(result, Err(FanoutError::Rejected { ref backend, .. }) if backend == "b"));
        assert_eq!(stubs[0].calls(), 1);
        assert_eq!(stubs[1].calls(), 1);
        // Backends after the failing one are never contacted
        assert_eq!(stubs[2].calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_routes_by_name() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::Ready),
            StubBackend::new("image_gen", Behavior::Ready),
        ];
        let text = client(&stubs).generate("image_gen", 5, "cats").await.unwrap();

        assert_eq!(text, "image_gen:5:cats");
        assert_eq!(stubs[0].calls(), 0);
        assert_eq!(stubs[1].calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_unknown_backend() {
        let stubs = [StubBackend::new("text_gen", Behavior::Ready)];
        let result = client(&stubs).generate("meme_template_gen", 5, "x").await;
        assert_eq!(
            result,
            Err(FanoutError::UnknownBackend("meme_template_gen".to_string()))
        );
    }

    #[tokio::test]
    async fn test_generate_backend_error() {
        let stubs = [StubBackend::new("text_gen", Behavior::Error)];
        let result = client(&stubs).generate("text_gen", 5, "x").await;
        assert!(matches!(result, Err(FanoutError::Rejected { .. })));
    }

    #[test]
    fn test_backend_names_in_config_order() {
        let stubs = [
            StubBackend::new("text_gen", Behavior::Ready),
            StubBackend::new("image_gen", Behavior::Ready),
        ];
        assert_eq!(client(&stubs).backend_names(), vec!["text_gen", "image_gen"]);
    }
}
