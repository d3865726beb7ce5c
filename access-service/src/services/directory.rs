//! In-memory implementation of every store contract, seedable from a JSON
//! fixture. Backs the demo binary and the test suites.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::models::{
    AuthIdentity, AuthProvider, Identity, MemberRole, Membership, Organization, OrganizationId,
    Project, ProjectId, Team, TeamId, User, UserId,
};
use crate::services::{
    AuthIdentityStore, EntityStore, MembershipStore, ServiceError, UserStore,
};

/// Project row of a fixture file; the owning team is referenced by id.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureProject {
    pub id: ProjectId,
    pub slug: String,
    pub name: String,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub projects: Vec<FixtureProject>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub auth_providers: Vec<AuthProvider>,
    #[serde(default)]
    pub auth_identities: Vec<AuthIdentity>,
}

impl Fixture {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Fixture(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Fixture(format!("cannot parse {}: {}", path.display(), e)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: DashMap<UserId, User>,
    organizations: DashMap<String, Organization>,
    teams: DashMap<(OrganizationId, String), Team>,
    projects: DashMap<(OrganizationId, String), Project>,
    memberships: DashMap<(UserId, OrganizationId), Membership>,
    auth_providers: DashMap<OrganizationId, AuthProvider>,
    auth_identities: DashMap<(OrganizationId, UserId), AuthIdentity>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Result<Self, ServiceError> {
        let directory = Self::new();

        for user in fixture.users {
            directory.insert_user(user);
        }
        for organization in fixture.organizations {
            directory.insert_organization(organization);
        }
        for team in fixture.teams {
            directory.insert_team(team);
        }
        for project in fixture.projects {
            let team = directory
                .teams
                .iter()
                .find(|entry| entry.value().id == project.team_id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| {
                    ServiceError::Fixture(format!(
                        "project '{}' references unknown team {}",
                        project.slug, project.team_id
                    ))
                })?;
            directory.insert_project(Project::new(project.id, team, project.slug, project.name));
        }
        for membership in fixture.memberships {
            directory.insert_membership(membership);
        }
        for provider in fixture.auth_providers {
            directory.insert_auth_provider(provider);
        }
        for identity in fixture.auth_identities {
            directory.insert_auth_identity(identity);
        }

        tracing::info!(
            organizations = directory.organizations.len(),
            teams = directory.teams.len(),
            projects = directory.projects.len(),
            memberships = directory.memberships.len(),
            "Directory seeded from fixture"
        );

        Ok(directory)
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_organization(&self, organization: Organization) {
        self.organizations
            .insert(organization.slug.clone(), organization);
    }

    pub fn insert_team(&self, team: Team) {
        self.teams
            .insert((team.organization_id, team.slug.clone()), team);
    }

    pub fn insert_project(&self, project: Project) {
        self.projects
            .insert((project.organization_id, project.slug.clone()), project);
    }

    pub fn insert_membership(&self, membership: Membership) {
        self.memberships
            .insert((membership.user_id, membership.organization_id), membership);
    }

    pub fn insert_auth_provider(&self, provider: AuthProvider) {
        self.auth_providers
            .insert(provider.organization_id, provider);
    }

    pub fn insert_auth_identity(&self, identity: AuthIdentity) {
        self.auth_identities
            .insert((identity.organization_id, identity.user_id), identity);
    }

    fn member_reaches_team(
        &self,
        user_id: UserId,
        team: &Team,
        required: Option<MemberRole>,
    ) -> bool {
        let Some(membership) = self.memberships.get(&(user_id, team.organization_id)) else {
            return false;
        };

        if let Some(required) = required {
            if !membership.role.satisfies(required) {
                return false;
            }
        }

        membership.has_global_access || membership.teams.contains(&team.id)
    }
}

fn sort_organizations(organizations: &mut [Organization]) {
    organizations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl EntityStore for InMemoryDirectory {
    async fn organization_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Organization>, ServiceError> {
        Ok(self.organizations.get(slug).map(|entry| entry.value().clone()))
    }

    async fn accessible_organizations(
        &self,
        identity: &Identity,
        minimum_role: Option<MemberRole>,
    ) -> Result<Vec<Organization>, ServiceError> {
        let mut organizations: Vec<Organization> = match identity {
            Identity::Anonymous => Vec::new(),
            Identity::User(user) if user.is_superuser => self
                .organizations
                .iter()
                .filter(|entry| entry.value().is_visible())
                .map(|entry| entry.value().clone())
                .collect(),
            Identity::User(user) => self
                .organizations
                .iter()
                .filter(|entry| entry.value().is_visible())
                .filter(|entry| {
                    self.memberships
                        .get(&(user.id, entry.value().id))
                        .is_some_and(|membership| {
                            minimum_role.map_or(true, |required| membership.role.satisfies(required))
                        })
                })
                .map(|entry| entry.value().clone())
                .collect(),
        };

        sort_organizations(&mut organizations);
        Ok(organizations)
    }

    async fn team_by_slug(
        &self,
        organization: &Organization,
        slug: &str,
    ) -> Result<Option<Team>, ServiceError> {
        Ok(self
            .teams
            .get(&(organization.id, slug.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn project_by_slug(
        &self,
        organization: &Organization,
        slug: &str,
    ) -> Result<Option<Project>, ServiceError> {
        Ok(self
            .projects
            .get(&(organization.id, slug.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn team_has_access(
        &self,
        team: &Team,
        user: &User,
        required: Option<MemberRole>,
    ) -> Result<bool, ServiceError> {
        Ok(self.member_reaches_team(user.id, team, required))
    }

    async fn project_has_access(
        &self,
        project: &Project,
        user: &User,
        required: Option<MemberRole>,
    ) -> Result<bool, ServiceError> {
        Ok(self.member_reaches_team(user.id, &project.team, required))
    }

    async fn teams_for_user(
        &self,
        organization: &Organization,
        identity: &Identity,
    ) -> Result<Vec<Team>, ServiceError> {
        let in_organization: Vec<Team> = self
            .teams
            .iter()
            .filter(|entry| entry.value().organization_id == organization.id)
            .map(|entry| entry.value().clone())
            .collect();

        let mut teams: Vec<Team> = match identity {
            Identity::Anonymous => Vec::new(),
            Identity::User(user) if user.is_superuser => in_organization,
            Identity::User(user) => match self.memberships.get(&(user.id, organization.id)) {
                Some(membership) => match membership.scoped_teams() {
                    Some(reachable) => in_organization
                        .into_iter()
                        .filter(|team| reachable.contains(&team.id))
                        .collect(),
                    None => in_organization,
                },
                None => Vec::new(),
            },
        };

        teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(teams)
    }
}

#[async_trait]
impl MembershipStore for InMemoryDirectory {
    async fn membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Membership>, ServiceError> {
        Ok(self
            .memberships
            .get(&(user_id, organization_id))
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl AuthIdentityStore for InMemoryDirectory {
    async fn auth_provider_for_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<AuthProvider>, ServiceError> {
        Ok(self
            .auth_providers
            .get(&organization_id)
            .map(|entry| entry.value().clone()))
    }

    async fn auth_identity_for_organization(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<Option<AuthIdentity>, ServiceError> {
        Ok(self
            .auth_identities
            .get(&(organization_id, user_id))
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl UserStore for InMemoryDirectory {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, ServiceError> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrganizationStatus;

    fn directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.insert_organization(Organization::new(1, "zeta", "Zeta"));
        directory.insert_organization(Organization::new(2, "acme", "Acme"));
        directory.insert_organization(
            Organization::new(3, "gone", "Gone").with_status(OrganizationStatus::PendingDeletion),
        );
        directory.insert_team(Team::new(10, 2, "backend", "Backend"));
        directory.insert_team(Team::new(11, 2, "alpha", "Alpha"));
        directory.insert_membership(Membership::new(5, 1, MemberRole::Member));
        directory.insert_membership(Membership::new(5, 2, MemberRole::Admin).with_teams([10]));
        directory.insert_membership(Membership::new(5, 3, MemberRole::Owner));
        directory
    }

    #[tokio::test]
    async fn test_accessible_organizations_are_sorted_and_visible_only() {
        let directory = directory();
        let identity = Identity::from(User::new(5, "jane"));

        let organizations = directory
            .accessible_organizations(&identity, None)
            .await
            .unwrap();
        let slugs: Vec<&str> = organizations.iter().map(|o| o.slug.as_str()).collect();
        assert_eq!(slugs, vec!["acme", "zeta"]);
    }

    #[tokio::test]
    async fn test_accessible_organizations_respects_minimum_role() {
        let directory = directory();
        let identity = Identity::from(User::new(5, "jane"));

        let organizations = directory
            .accessible_organizations(&identity, Some(MemberRole::Admin))
            .await
            .unwrap();
        assert_eq!(organizations.len(), 1);
        assert_eq!(organizations[0].slug, "acme");
    }

    #[tokio::test]
    async fn test_superuser_sees_every_visible_organization() {
        let directory = directory();
        let identity = Identity::from(User::superuser(99, "root"));

        let organizations = directory
            .accessible_organizations(&identity, Some(MemberRole::Owner))
            .await
            .unwrap();
        assert_eq!(organizations.len(), 2);
    }

    #[tokio::test]
    async fn test_teams_for_scoped_member() {
        let directory = directory();
        let acme = Organization::new(2, "acme", "Acme");
        let identity = Identity::from(User::new(5, "jane"));

        let teams = directory.teams_for_user(&acme, &identity).await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].slug, "backend");
    }

    #[tokio::test]
    async fn test_fixture_rejects_unknown_team() {
        let fixture = Fixture {
            projects: vec![FixtureProject {
                id: 1,
                slug: "web".to_string(),
                name: "Web".to_string(),
                team_id: 404,
            }],
            ..Default::default()
        };
        assert!(matches!(
            InMemoryDirectory::from_fixture(fixture),
            Err(ServiceError::Fixture(_))
        ));
    }
}
