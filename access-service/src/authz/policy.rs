//! Permission checks for organization, team and project endpoints.
//!
//! Each level requires the one before it plus its own entity. Project
//! endpoints skip the team check since a resolved project carries its team.

use crate::authz::{EndpointSpec, RequestScope, ScopeLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    OrganizationMissing,
    SsoInvalid,
    TeamMissing,
    ProjectMissing,
}

impl PolicyViolation {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyViolation::OrganizationMissing => "organization_missing",
            PolicyViolation::SsoInvalid => "sso_invalid",
            PolicyViolation::TeamMissing => "team_missing",
            PolicyViolation::ProjectMissing => "project_missing",
        }
    }
}

pub fn check(endpoint: &EndpointSpec, scope: &RequestScope) -> Result<(), PolicyViolation> {
    match endpoint.level {
        ScopeLevel::None => Ok(()),
        ScopeLevel::Organization => check_organization(endpoint, scope),
        ScopeLevel::Team => {
            check_organization(endpoint, scope)?;
            scope.team.as_ref().map(|_| ()).ok_or(PolicyViolation::TeamMissing)
        }
        ScopeLevel::Project => {
            check_organization(endpoint, scope)?;
            scope
                .project
                .as_ref()
                .map(|_| ())
                .ok_or(PolicyViolation::ProjectMissing)
        }
    }
}

fn check_organization(endpoint: &EndpointSpec, scope: &RequestScope) -> Result<(), PolicyViolation> {
    if scope.organization.is_none() {
        return Err(PolicyViolation::OrganizationMissing);
    }
    if endpoint.sso_required && !scope.access.is_sso_valid() {
        return Err(PolicyViolation::SsoInvalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::models::{Access, Grant, MemberRole, Organization, Project, Team};

    fn grant(sso_valid: bool) -> Access {
        Access::Granted(Grant::new(
            Some(MemberRole::Member),
            true,
            sso_valid,
            BTreeSet::new(),
        ))
    }

    fn scope(access: Access) -> RequestScope {
        RequestScope {
            organization: Some(Organization::new(1, "acme", "Acme")),
            ..RequestScope::unscoped(access)
        }
    }

    #[test]
    fn test_unscoped_endpoints_always_pass() {
        let scope = RequestScope::unscoped(Access::Denied);
        assert_eq!(check(&EndpointSpec::authenticated(), &scope), Ok(()));
    }

    #[test]
    fn test_organization_level() {
        let endpoint = EndpointSpec::organization();
        assert_eq!(check(&endpoint, &scope(grant(true))), Ok(()));
        assert_eq!(
            check(&endpoint, &RequestScope::unscoped(grant(true))),
            Err(PolicyViolation::OrganizationMissing)
        );
        assert_eq!(
            check(&endpoint, &scope(grant(false))),
            Err(PolicyViolation::SsoInvalid)
        );
        assert_eq!(check(&endpoint.without_sso(), &scope(grant(false))), Ok(()));
    }

    #[test]
    fn test_team_level_needs_team() {
        let endpoint = EndpointSpec::team();
        assert_eq!(
            check(&endpoint, &scope(grant(true))),
            Err(PolicyViolation::TeamMissing)
        );

        let mut with_team = scope(grant(true));
        with_team.team = Some(Team::new(10, 1, "backend", "Backend"));
        assert_eq!(check(&endpoint, &with_team), Ok(()));
    }

    #[test]
    fn test_project_level_needs_project_not_explicit_team() {
        let endpoint = EndpointSpec::project();
        assert_eq!(
            check(&endpoint, &scope(grant(true))),
            Err(PolicyViolation::ProjectMissing)
        );

        let mut with_project = scope(grant(true));
        with_project.project = Some(Project::new(
            100,
            Team::new(10, 1, "backend", "Backend"),
            "api",
            "API",
        ));
        assert_eq!(check(&endpoint, &with_project), Ok(()));
    }

    #[test]
    fn test_sso_checked_before_entity() {
        assert_eq!(
            check(&EndpointSpec::project(), &scope(grant(false))),
            Err(PolicyViolation::SsoInvalid)
        );
    }
}
