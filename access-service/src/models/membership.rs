use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{MemberRole, OrganizationId, TeamId, UserId};

/// A user's role and reach inside one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: MemberRole,
    /// Reaches every team of the organization; `teams` is ignored when set.
    #[serde(default)]
    pub has_global_access: bool,
    #[serde(default)]
    pub teams: BTreeSet<TeamId>,
    /// Set when the SSO provider reported the linked identity as revoked.
    #[serde(default)]
    pub sso_invalid: bool,
}

impl Membership {
    pub fn new(user_id: UserId, organization_id: OrganizationId, role: MemberRole) -> Self {
        Self {
            user_id,
            organization_id,
            role,
            has_global_access: false,
            teams: BTreeSet::new(),
            sso_invalid: false,
        }
    }

    pub fn global(mut self) -> Self {
        self.has_global_access = true;
        self
    }

    pub fn with_teams(mut self, teams: impl IntoIterator<Item = TeamId>) -> Self {
        self.teams = teams.into_iter().collect();
        self
    }

    pub fn with_sso_invalid(mut self) -> Self {
        self.sso_invalid = true;
        self
    }

    /// Teams the member can reach, or `None` when access is organization wide.
    pub fn scoped_teams(&self) -> Option<&BTreeSet<TeamId>> {
        if self.has_global_access {
            None
        } else {
            Some(&self.teams)
        }
    }
}
