//! Token registration and renewal
//!
//! `POST /verify` stores a bearer token once the caller proves, through signed
//! launch parameters, that they came from the platform. `POST /renew` swaps a
//! still-valid token for a new one.

use axum::{extract::State, routing::post, Json, Router};
use strawberry_common::api::types::{OperationResult, RenewRequest, StatusBody, VerifyRequest};
use strawberry_common::api::OpStatus;
use tracing::info;

use super::extract::ApiJson;
use super::{gate, reply};
use crate::db::credentials;
use crate::error::Result;
use crate::AppState;

/// POST /verify
pub async fn verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Json<OperationResult> {
    reply("verify", verify_inner(&state, req).await)
}

async fn verify_inner(state: &AppState, req: VerifyRequest) -> Result<OperationResult> {
    gate::verify_signature(&req.request, &state.client_secret)?;
    credentials::add_credential(&state.db, &req.token).await?;

    info!("Token registered");
    Ok(OperationResult::with_status(OpStatus::Ok))
}

/// POST /renew
pub async fn renew(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RenewRequest>,
) -> Json<OperationResult> {
    reply("renew", renew_inner(&state, req).await)
}

async fn renew_inner(state: &AppState, req: RenewRequest) -> Result<OperationResult> {
    gate::check_token(&state.db, &req.old_token).await?;
    credentials::renew(&state.db, &req.old_token, &req.new_token).await?;

    info!("Token renewed");
    Ok(OperationResult::with_status(OpStatus::Ok))
}

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify))
        .route("/renew", post(renew))
}
