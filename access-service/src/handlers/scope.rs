//! Handlers behind the authorization pipeline. They render the resolved
//! scope as JSON; real pages would hand the same values to templates.

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use service_core::error::AppError;
use tower_sessions::Session;

use crate::authz::RequestScope;
use crate::models::{Identity, MemberRole, Organization, Project, Team};
use crate::services::session::take_messages;
use crate::services::FlashMessage;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AccessSummary {
    pub role: Option<MemberRole>,
    pub is_global: bool,
    pub is_sso_valid: bool,
    pub is_admin: bool,
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct ScopeView {
    pub organization: Option<Organization>,
    pub team: Option<Team>,
    pub project: Option<Project>,
    pub access: AccessSummary,
    pub team_list: Vec<Team>,
}

impl From<RequestScope> for ScopeView {
    fn from(scope: RequestScope) -> Self {
        let access = AccessSummary {
            role: scope.access.role(),
            is_global: scope.access.is_global(),
            is_sso_valid: scope.access.is_sso_valid(),
            is_admin: scope.access.is_admin(),
            is_owner: scope.access.is_owner(),
        };
        Self {
            organization: scope.organization,
            team: scope.team,
            project: scope.project,
            access,
            team_list: scope.team_list,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
}

pub async fn index(Extension(identity): Extension<Identity>) -> Result<Json<UserView>, AppError> {
    let user = identity
        .user()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not authenticated")))?;
    Ok(Json(UserView {
        id: user.id,
        username: user.username.clone(),
        is_superuser: user.is_superuser,
    }))
}

pub async fn organization_home(scope: RequestScope) -> Json<ScopeView> {
    Json(scope.into())
}

pub async fn team_home(scope: RequestScope) -> Json<ScopeView> {
    Json(scope.into())
}

pub async fn project_home(scope: RequestScope) -> Json<ScopeView> {
    Json(scope.into())
}

pub async fn account_settings(
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserView>, AppError> {
    index(Extension(identity)).await
}

/// Drain the flash messages queued for this session.
pub async fn messages(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<FlashMessage>>, AppError> {
    let keys = state.config.session.keys();
    let messages = take_messages(&session, &keys.messages).await?;
    Ok(Json(messages))
}
