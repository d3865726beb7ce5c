use serde::{Deserialize, Serialize};

pub type OrganizationId = i64;

/// Lifecycle status of an organization. Only `Visible` organizations can be
/// entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    #[default]
    Visible,
    PendingDeletion,
    DeletionInProgress,
}

/// A tenant. Owns teams, projects and memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    /// Unique, human-routable key.
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub status: OrganizationStatus,
}

impl Organization {
    pub fn new(id: OrganizationId, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            status: OrganizationStatus::Visible,
        }
    }

    pub fn with_status(mut self, status: OrganizationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_visible(&self) -> bool {
        self.status == OrganizationStatus::Visible
    }
}
