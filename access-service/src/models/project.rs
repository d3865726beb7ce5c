use serde::{Deserialize, Serialize};

use super::{OrganizationId, Team};

pub type ProjectId = i64;

/// A project owned by a team. Slug is unique within the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub slug: String,
    pub name: String,
    pub organization_id: OrganizationId,
    /// Owning team; always in the same organization as the project.
    pub team: Team,
}

impl Project {
    pub fn new(id: ProjectId, team: Team, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            organization_id: team.organization_id,
            team,
        }
    }
}
