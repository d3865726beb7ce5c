use serde::{Deserialize, Serialize};

use super::OrganizationId;

pub type TeamId = i64;

/// A team inside an organization. The slug is unique within the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub slug: String,
    pub name: String,
    pub organization_id: OrganizationId,
}

impl Team {
    pub fn new(
        id: TeamId,
        organization_id: OrganizationId,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            organization_id,
        }
    }
}
