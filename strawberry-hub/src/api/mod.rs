//! HTTP API for strawberry-hub
//!
//! Every route except `/health` is a POST with a JSON body and answers
//! HTTP 200 with an [`OpStatus`] in the body, whatever the outcome. Only a
//! body that cannot be decoded gets a 400 (see [`extract`]).

pub mod extract;
pub mod gate;
pub mod generate;
pub mod groups;
pub mod health;
pub mod tokens;

pub use generate::generate_routes;
pub use groups::group_routes;
pub use health::health_routes;
pub use tokens::token_routes;

use axum::Json;
use strawberry_common::api::types::StatusBody;
use strawberry_common::api::OpStatus;
use tracing::{error, info};

use crate::error::Result;

/// Turn a handler outcome into the response body
///
/// Errors are logged under `operation` and reduced to their status code.
pub(crate) fn reply<T: StatusBody>(operation: &str, result: Result<T>) -> Json<T> {
    match result {
        Ok(body) => Json(body),
        Err(e) => {
            let status = e.status();
            match status {
                OpStatus::AuthError | OpStatus::NotReady => {
                    info!("{} refused: {}", operation, e)
                }
                _ => error!("{} failed: {}", operation, e),
            }
            Json(T::with_status(status))
        }
    }
}
