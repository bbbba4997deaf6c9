//! HTTP generation backend
//!
//! Every backend exposes the same three endpoints and answers with a JSON
//! object carrying a `result` field:
//!
//! | Call                      | Request                              | Result                          |
//! |---------------------------|--------------------------------------|---------------------------------|
//! | `POST /add_group`         | `{"group_id": n, "texts": [...]}`    | `"ERROR"` on failure            |
//! | `GET /check_status?group_id=n` | -                               | `"OK"`, `1` or `true` when ready |
//! | `POST /generate`          | `{"group_id": n, "hint": "..."}`     | generated text or `"ERROR"`     |
//!
//! Any non-2xx answer, or a 2xx body without `result`, is a backend error.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use strawberry_common::config::ServiceConfig;
use tracing::debug;

use super::{Backend, FanoutError};

/// Literal result a backend sends to signal failure
const ERROR_RESULT: &str = "ERROR";

/// Literal result a backend sends to signal readiness
const READY_RESULT: &str = "OK";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct IngestBody<'a> {
    group_id: i64,
    texts: &'a [String],
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    group_id: i64,
    hint: &'a str,
}

/// Every 2xx answer must carry `result`; a body without it is undecodable
#[derive(Deserialize)]
struct BackendReply {
    result: Value,
}

/// Backend reached over HTTP
pub struct HttpBackend {
    name: String,
    base_url: String,
    http_client: Client,
}

impl HttpBackend {
    pub fn new(service: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            name: service.name.clone(),
            base_url: service.base_url(),
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send_error(&self, err: reqwest::Error) -> FanoutError {
        if err.is_timeout() {
            FanoutError::Timeout {
                backend: self.name.clone(),
            }
        } else {
            FanoutError::Unreachable {
                backend: self.name.clone(),
                detail: err.to_string(),
            }
        }
    }

    fn invalid(&self, detail: impl Into<String>) -> FanoutError {
        FanoutError::InvalidResponse {
            backend: self.name.clone(),
            detail: detail.into(),
        }
    }

    fn rejected(&self, operation: &'static str) -> FanoutError {
        FanoutError::Rejected {
            backend: self.name.clone(),
            operation,
        }
    }

    async fn read_result(&self, response: Response) -> Result<Value, FanoutError> {
        let status = response.status();
        if !status.is_success() {
            return Err(self.invalid(format!("HTTP {}", status)));
        }

        let reply: BackendReply = response
            .json()
            .await
            .map_err(|e| self.invalid(format!("undecodable body: {}", e)))?;

        Ok(reply.result)
    }
}

/// Interpret a `check_status` result
///
/// `None` means the backend reported an error.
pub(crate) fn readiness(result: &Value) -> Option<bool> {
    match result {
        Value::String(s) if s == ERROR_RESULT => None,
        Value::String(s) => Some(s == READY_RESULT),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_i64() == Some(1)),
        _ => Some(false),
    }
}

fn is_error_result(result: &Value) -> bool {
    matches!(result, Value::String(s) if s == ERROR_RESULT)
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ingest(&self, group_id: i64, texts: &[String]) -> Result<(), FanoutError> {
        debug!("POST {} ({} texts)", self.url("add_group"), texts.len());

        let response = self
            .http_client
            .post(self.url("add_group"))
            .json(&IngestBody { group_id, texts })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let result = self.read_result(response).await?;
        if is_error_result(&result) {
            return Err(self.rejected("ingest"));
        }
        Ok(())
    }

    async fn check_status(&self, group_id: i64) -> Result<bool, FanoutError> {
        let response = self
            .http_client
            .get(self.url("check_status"))
            .query(&[("group_id", group_id)])
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let result = self.read_result(response).await?;
        readiness(&result).ok_or_else(|| self.rejected("check_status"))
    }

    async fn generate(&self, group_id: i64, hint: &str) -> Result<String, FanoutError> {
        let response = self
            .http_client
            .post(self.url("generate"))
            .json(&GenerateBody { group_id, hint })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        match self.read_result(response).await? {
            Value::String(s) if s == ERROR_RESULT => Err(self.rejected("generate")),
            Value::String(s) => Ok(s),
            other => Err(self.invalid(format!("expected text result, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_readiness_values() {
        assert_eq!(readiness(&json!("OK")), Some(true));
        assert_eq!(readiness(&json!(1)), Some(true));
        assert_eq!(readiness(&json!(true)), Some(true));

        assert_eq!(readiness(&json!("NOT_READY")), Some(false));
        assert_eq!(readiness(&json!(0)), Some(false));
        assert_eq!(readiness(&json!(false)), Some(false));
        assert_eq!(readiness(&Value::Null), Some(false));

        assert_eq!(readiness(&json!("ERROR")), None);
    }

    #[test]
    fn test_url_building() {
        let backend = HttpBackend::new(&ServiceConfig {
            name: "text_gen".to_string(),
            url: "http://text_gen/".to_string(),
            port: 8001,
        })
        .unwrap();

        assert_eq!(backend.name(), "text_gen");
        assert_eq!(backend.url("generate"), "http://text_gen:8001/generate");
    }
}
