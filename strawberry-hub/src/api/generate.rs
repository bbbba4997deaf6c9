//! Content generation
//!
//! Generation is only attempted for groups whose stored status is READY;
//! anything else is answered with NOT_READY without contacting a backend.

use axum::{extract::State, routing::post, Json, Router};
use strawberry_common::api::types::{DataString, GenerateRequest, NamedGenerateRequest};
use strawberry_common::api::{GroupStatus, LaunchParams, OpStatus};
use tracing::info;

use super::extract::ApiJson;
use super::{gate, reply};
use crate::db::groups;
use crate::error::{Error, Result};
use crate::AppState;

pub const TEXT_BACKEND: &str = "text_gen";
pub const IMAGE_BACKEND: &str = "image_gen";
pub const MEME_TEMPLATE_BACKEND: &str = "meme_template_gen";

/// POST /generate
pub async fn generate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Json<DataString> {
    let result = run(
        &state,
        &req.auth,
        &req.token,
        &req.service_name,
        req.group_id,
        &req.hint,
    )
    .await;
    reply("generate", result)
}

/// POST /generate_text
pub async fn generate_text(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NamedGenerateRequest>,
) -> Json<DataString> {
    reply("generate_text", run_named(&state, req, TEXT_BACKEND).await)
}

/// POST /generate_image
///
/// The backend answers with a link to the generated image.
pub async fn generate_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NamedGenerateRequest>,
) -> Json<DataString> {
    reply("generate_image", run_named(&state, req, IMAGE_BACKEND).await)
}

/// POST /generate_meme_template
pub async fn generate_meme_template(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NamedGenerateRequest>,
) -> Json<DataString> {
    reply(
        "generate_meme_template",
        run_named(&state, req, MEME_TEMPLATE_BACKEND).await,
    )
}

async fn run_named(
    state: &AppState,
    req: NamedGenerateRequest,
    backend: &str,
) -> Result<DataString> {
    run(state, &req.auth, &req.token, backend, req.group_id, &req.hint).await
}

async fn run(
    state: &AppState,
    auth: &LaunchParams,
    token: &str,
    backend: &str,
    group_id: i64,
    hint: &str,
) -> Result<DataString> {
    gate::authorize(&state.db, &state.client_secret, auth, token).await?;

    if groups::get_status(&state.db, group_id).await? != GroupStatus::Ready {
        return Err(Error::NotReady(group_id));
    }

    let data = state.fanout.generate(backend, group_id, hint).await?;

    info!("Generated content for group {} via {}", group_id, backend);
    Ok(DataString {
        status: OpStatus::Ok,
        data,
    })
}

pub fn generate_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/generate_text", post(generate_text))
        .route("/generate_image", post(generate_image))
        .route("/generate_meme_template", post(generate_meme_template))
}
