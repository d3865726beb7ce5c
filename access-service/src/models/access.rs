//! Effective rights of one caller against one organization.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{MemberRole, Team, TeamId};

/// Result of an access computation. Built fresh for every request.
///
/// `Denied` answers every query negatively. A `Granted` value without a role
/// (caller is not a member) does the same, but still reports its flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Access {
    Denied,
    Granted(Grant),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    role: Option<MemberRole>,
    is_global: bool,
    is_sso_valid: bool,
    teams: BTreeSet<TeamId>,
}

impl Grant {
    pub fn new(
        role: Option<MemberRole>,
        is_global: bool,
        is_sso_valid: bool,
        teams: BTreeSet<TeamId>,
    ) -> Self {
        Self {
            role,
            is_global,
            is_sso_valid,
            teams,
        }
    }

    pub fn role(&self) -> Option<MemberRole> {
        self.role
    }

    pub fn teams(&self) -> &BTreeSet<TeamId> {
        &self.teams
    }
}

impl Access {
    /// Superusers bypass membership and SSO entirely.
    pub fn superuser() -> Self {
        Access::Granted(Grant::new(
            Some(MemberRole::Owner),
            true,
            true,
            BTreeSet::new(),
        ))
    }

    /// Caller is known but holds no membership in the organization.
    pub fn non_member() -> Self {
        Access::Granted(Grant::new(None, false, false, BTreeSet::new()))
    }

    pub fn role(&self) -> Option<MemberRole> {
        match self {
            Access::Denied => None,
            Access::Granted(grant) => grant.role,
        }
    }

    /// True when the caller's tier is at least as privileged as `required`.
    pub fn has_access(&self, required: MemberRole) -> bool {
        match self {
            Access::Denied => false,
            Access::Granted(grant) => grant.role.is_some_and(|role| role.satisfies(required)),
        }
    }

    pub fn has_team_access(&self, team: &Team) -> bool {
        match self {
            Access::Denied => false,
            Access::Granted(Grant { role: None, .. }) => false,
            Access::Granted(grant) if grant.is_global => true,
            Access::Granted(grant) => grant.teams.contains(&team.id),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_access(MemberRole::Admin)
    }

    pub fn is_owner(&self) -> bool {
        self.has_access(MemberRole::Owner)
    }

    pub fn is_global(&self) -> bool {
        match self {
            Access::Denied => false,
            Access::Granted(grant) => grant.is_global,
        }
    }

    pub fn is_sso_valid(&self) -> bool {
        match self {
            Access::Denied => false,
            Access::Granted(grant) => grant.is_sso_valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [MemberRole; 3] = [MemberRole::Owner, MemberRole::Admin, MemberRole::Member];

    fn team(id: TeamId) -> Team {
        Team::new(id, 1, format!("team-{}", id), "Team")
    }

    #[test]
    fn test_denied_answers_nothing() {
        let access = Access::Denied;
        for role in ALL_ROLES {
            assert!(!access.has_access(role));
        }
        assert!(!access.has_team_access(&team(1)));
        assert!(!access.is_global());
        assert!(!access.is_sso_valid());
    }

    #[test]
    fn test_missing_role_denies_even_when_global() {
        let access = Access::Granted(Grant::new(None, true, true, BTreeSet::from([1])));
        for role in ALL_ROLES {
            assert!(!access.has_access(role));
        }
        assert!(!access.has_team_access(&team(1)));
        assert!(!access.is_admin());
        assert!(!access.is_owner());
    }

    #[test]
    fn test_global_grant_reaches_any_team() {
        let access = Access::Granted(Grant::new(
            Some(MemberRole::Member),
            true,
            true,
            BTreeSet::new(),
        ));
        assert!(access.has_team_access(&team(7)));
        assert!(access.has_team_access(&team(99)));
    }

    #[test]
    fn test_scoped_grant_reaches_only_listed_teams() {
        let access = Access::Granted(Grant::new(
            Some(MemberRole::Admin),
            false,
            true,
            BTreeSet::from([3]),
        ));
        assert!(access.has_team_access(&team(3)));
        assert!(!access.has_team_access(&team(4)));
    }

    #[test]
    fn test_admin_is_admin_but_not_owner() {
        let access = Access::Granted(Grant::new(
            Some(MemberRole::Admin),
            false,
            true,
            BTreeSet::new(),
        ));
        assert!(access.is_admin());
        assert!(!access.is_owner());
        assert!(access.has_access(MemberRole::Member));
    }

    #[test]
    fn test_superuser_grant_is_owner_global_and_sso_valid() {
        let access = Access::superuser();
        assert_eq!(access.role(), Some(MemberRole::Owner));
        assert!(access.is_owner());
        assert!(access.is_global());
        assert!(access.is_sso_valid());
    }

    #[test]
    fn test_non_member_is_not_global() {
        let access = Access::non_member();
        assert_eq!(access.role(), None);
        assert!(!access.is_global());
        assert_ne!(access, Access::Denied);
    }
}
