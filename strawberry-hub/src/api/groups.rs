//! Group registration and status queries

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use strawberry_common::api::types::{
    AddGroupRequest, GetGroupsRequest, GroupAndStatus, GroupList, OperationResult, StatusBody,
};
use strawberry_common::api::OpStatus;
use tracing::info;

use super::extract::ApiJson;
use super::{gate, reply};
use crate::db::groups;
use crate::error::Result;
use crate::pagination::slice_page;
use crate::AppState;

/// Request body cap for the group routes
///
/// `/add_group` carries a group's whole post corpus, which easily exceeds
/// axum's 2 MiB default.
pub const CORPUS_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// POST /add_group
///
/// Registers the group as NOT_READY under the caller, then hands its posts to
/// every backend. A backend failure is reported, but the registry entry is
/// kept; the reconciler picks the group up once the backends catch up.
pub async fn add_group(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddGroupRequest>,
) -> Json<OperationResult> {
    reply("add_group", add_group_inner(&state, req).await)
}

async fn add_group_inner(state: &AppState, req: AddGroupRequest) -> Result<OperationResult> {
    let owner_id = gate::authorize(&state.db, &state.client_secret, &req.auth, &req.token).await?;

    if groups::add_group(&state.db, req.group_id, owner_id).await? {
        info!("Group {} registered by user {}", req.group_id, owner_id);
    }

    state.fanout.ingest(req.group_id, &req.texts).await?;

    info!("Group {} ingested ({} texts)", req.group_id, req.texts.len());
    Ok(OperationResult::with_status(OpStatus::Ok))
}

/// POST /get_groups
///
/// With `group_id`, returns that one group (UNKNOWN when it is not tracked).
/// Otherwise returns the caller's groups, sliced by `offset`/`count`;
/// `count` in the response is the total before slicing.
pub async fn get_groups(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GetGroupsRequest>,
) -> Json<GroupList> {
    reply("get_groups", get_groups_inner(&state, req).await)
}

async fn get_groups_inner(state: &AppState, req: GetGroupsRequest) -> Result<GroupList> {
    let owner_id = gate::authorize(&state.db, &state.client_secret, &req.auth, &req.token).await?;

    if let Some(group_id) = req.group_id {
        let group_status = groups::get_status(&state.db, group_id).await?;
        return Ok(GroupList {
            status: OpStatus::Ok,
            data: vec![GroupAndStatus {
                group_id,
                group_status,
            }],
            count: 1,
        });
    }

    let owned = groups::list_owned_by(&state.db, owner_id).await?;
    let total = owned.len();

    Ok(GroupList {
        status: OpStatus::Ok,
        data: slice_page(owned, req.offset, req.count),
        count: total,
    })
}

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/add_group", post(add_group))
        .route("/get_groups", post(get_groups))
        .layer(DefaultBodyLimit::max(CORPUS_BODY_LIMIT))
}
