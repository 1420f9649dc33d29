use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::registry::{GroupKey, MemberId, RegistryError, ReloadStatus};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub topic_arn: String,
    pub groups: usize,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct GroupStatus {
    pub key: String,
    pub name: String,
    pub artifact_path: String,
    pub member_dir: String,
    pub members: Vec<MemberId>,
}

#[derive(Deserialize)]
pub struct RegenerateParams {
    pub group: String,
}

#[derive(Serialize)]
pub struct RegenerateResponse {
    pub group: String,
    pub members: usize,
    pub reloaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

type AdminError = (StatusCode, String);

fn admin_error(e: RegistryError) -> AdminError {
    let status = match e {
        RegistryError::UnknownGroup(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        topic_arn: state.dispatcher.topic_arn().to_string(),
        groups: state.dispatcher.engine().groups().count(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupStatus>>, AdminError> {
    let engine = state.dispatcher.engine();
    let mut statuses = Vec::new();

    for group in engine.groups() {
        let members = engine
            .members(&GroupKey::new(group.key.clone()))
            .await
            .map_err(admin_error)?;
        statuses.push(GroupStatus {
            key: group.key.clone(),
            name: group.name.clone(),
            artifact_path: group.artifact_path.display().to_string(),
            member_dir: group.member_dir.display().to_string(),
            members,
        });
    }

    Ok(Json(statuses))
}

pub async fn regenerate_group(
    State(state): State<AppState>,
    Query(params): Query<RegenerateParams>,
) -> Result<Json<RegenerateResponse>, AdminError> {
    let outcome = state
        .dispatcher
        .engine()
        .regenerate(&GroupKey::new(params.group))
        .await
        .map_err(admin_error)?;

    let reload_error = match &outcome.reload {
        ReloadStatus::Reloaded(_) => None,
        ReloadStatus::Failed(e) => Some(e.to_string()),
    };
    tracing::info!(group = %outcome.group_name, members = outcome.members, "Artifact regenerated via admin API");

    Ok(Json(RegenerateResponse {
        group: outcome.group_name,
        members: outcome.members,
        reloaded: reload_error.is_none(),
        reload_error,
    }))
}
