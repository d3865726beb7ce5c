use std::collections::HashMap;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use service_core::error::AppError;

use crate::models::{Access, Organization, Project, Team};

pub const ORGANIZATION_SLUG_PARAM: &str = "organization_slug";
pub const TEAM_SLUG_PARAM: &str = "team_slug";
pub const PROJECT_SLUG_PARAM: &str = "project_slug";

/// Entity slugs carried by the request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopePath {
    pub organization_slug: Option<String>,
    pub team_slug: Option<String>,
    pub project_slug: Option<String>,
}

impl ScopePath {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |name: &str| params.get(name).filter(|v| !v.is_empty()).cloned();
        Self {
            organization_slug: get(ORGANIZATION_SLUG_PARAM),
            team_slug: get(TEAM_SLUG_PARAM),
            project_slug: get(PROJECT_SLUG_PARAM),
        }
    }

    pub fn organization(slug: impl Into<String>) -> Self {
        Self {
            organization_slug: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn with_team(mut self, slug: impl Into<String>) -> Self {
        self.team_slug = Some(slug.into());
        self
    }

    pub fn with_project(mut self, slug: impl Into<String>) -> Self {
        self.project_slug = Some(slug.into());
        self
    }
}

/// Entities and access resolved for one request. Attached to the request
/// extensions once the permission check passes.
///
/// A present team belongs to the organization. For project endpoints the
/// team is always the project's owning team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestScope {
    pub organization: Option<Organization>,
    pub team: Option<Team>,
    pub project: Option<Project>,
    pub access: Access,
    /// Teams of the organization the caller can see.
    pub team_list: Vec<Team>,
}

impl RequestScope {
    pub fn unscoped(access: Access) -> Self {
        Self {
            organization: None,
            team: None,
            project: None,
            access,
            team_list: Vec::new(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestScope>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Request scope missing from request extensions"
            ))
        })
    }
}
