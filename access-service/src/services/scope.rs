//! Turns path and session hints into concrete organization, team and
//! project values the caller is allowed to see.

use std::sync::Arc;

use crate::models::{Identity, MemberRole, Organization, Project, Team};
use crate::services::metrics::record_resolution;
use crate::services::{EntityStore, ServiceError, SessionKeys, SessionState};

#[derive(Clone)]
pub struct ScopeResolver {
    entities: Arc<dyn EntityStore>,
    keys: SessionKeys,
}

impl ScopeResolver {
    pub fn new(entities: Arc<dyn EntityStore>, keys: SessionKeys) -> Self {
        Self { entities, keys }
    }

    /// Resolve the active organization.
    ///
    /// Without a path slug the session's last active organization is used,
    /// falling back to the first organization the caller can reach. The
    /// session key is rewritten whenever the resolved slug differs from the
    /// stored one and cleared when the stored slug is no longer reachable.
    /// Only session failures are returned as errors.
    pub async fn resolve_organization(
        &self,
        session: &dyn SessionState,
        path_slug: Option<&str>,
        identity: &Identity,
        required: Option<MemberRole>,
    ) -> Result<Option<Organization>, ServiceError> {
        let key = self.keys.active_organization.as_str();
        let mut stored = session
            .read_key(key)
            .await?
            .filter(|slug| !slug.is_empty());

        let is_implicit = path_slug.is_none();
        let slug = match path_slug {
            Some(slug) => Some(slug.to_string()),
            None => stored.clone(),
        };

        let mut resolved = None;

        if identity.is_superuser() {
            if let Some(slug) = slug.as_deref() {
                resolved = self.superuser_lookup(slug).await;
            }
        }

        if resolved.is_none() {
            let accessible = match self
                .entities
                .accessible_organizations(identity, required)
                .await
            {
                Ok(organizations) => organizations,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list accessible organizations");
                    Vec::new()
                }
            };

            if let Some(slug) = slug.as_deref() {
                resolved = accessible.iter().find(|o| o.slug == slug).cloned();
                if resolved.is_none() {
                    tracing::info!(
                        organization_slug = %slug,
                        implicit = is_implicit,
                        "Organization not accessible to caller"
                    );
                    if is_implicit {
                        session.delete_key(key).await?;
                        stored = None;
                    }
                }
            }

            if resolved.is_none() && is_implicit {
                resolved = accessible.into_iter().next();
            }
        }

        match &resolved {
            Some(organization) => {
                if stored.as_deref() != Some(organization.slug.as_str()) {
                    session.write_key(key, organization.slug.clone()).await?;
                }
                record_resolution("organization", "resolved");
            }
            None => record_resolution("organization", "missing"),
        }

        Ok(resolved)
    }

    async fn superuser_lookup(&self, slug: &str) -> Option<Organization> {
        match self.entities.organization_by_slug(slug).await {
            Ok(Some(organization)) if organization.is_visible() => Some(organization),
            Ok(Some(organization)) => {
                tracing::info!(
                    organization_slug = %slug,
                    status = ?organization.status,
                    "Skipping organization that is not visible"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, organization_slug = %slug, "Organization lookup failed");
                None
            }
        }
    }

    pub async fn resolve_team(
        &self,
        identity: &Identity,
        organization: &Organization,
        slug: &str,
        required: Option<MemberRole>,
    ) -> Option<Team> {
        let team = match self.entities.team_by_slug(organization, slug).await {
            Ok(Some(team)) => team,
            Ok(None) => {
                tracing::info!(team_slug = %slug, organization_slug = %organization.slug, "Team not found");
                record_resolution("team", "missing");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, team_slug = %slug, "Team lookup failed");
                record_resolution("team", "error");
                return None;
            }
        };

        let allowed = match identity {
            Identity::Anonymous => false,
            Identity::User(user) if user.is_superuser => true,
            Identity::User(user) => self
                .entities
                .team_has_access(&team, user, required)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, team_slug = %slug, "Team access check failed");
                    false
                }),
        };

        if allowed {
            record_resolution("team", "resolved");
            Some(team)
        } else {
            tracing::info!(team_slug = %slug, "Caller cannot reach team");
            record_resolution("team", "forbidden");
            None
        }
    }

    pub async fn resolve_project(
        &self,
        identity: &Identity,
        organization: &Organization,
        slug: &str,
        required: Option<MemberRole>,
    ) -> Option<Project> {
        let project = match self.entities.project_by_slug(organization, slug).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                tracing::info!(project_slug = %slug, organization_slug = %organization.slug, "Project not found");
                record_resolution("project", "missing");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, project_slug = %slug, "Project lookup failed");
                record_resolution("project", "error");
                return None;
            }
        };

        let allowed = match identity {
            Identity::Anonymous => false,
            Identity::User(user) if user.is_superuser => true,
            Identity::User(user) => self
                .entities
                .project_has_access(&project, user, required)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, project_slug = %slug, "Project access check failed");
                    false
                }),
        };

        if allowed {
            record_resolution("project", "resolved");
            Some(project)
        } else {
            tracing::info!(project_slug = %slug, "Caller cannot reach project");
            record_resolution("project", "forbidden");
            None
        }
    }

    /// Teams of the organization the caller can see. Empty on store failure.
    pub async fn team_list(&self, identity: &Identity, organization: &Organization) -> Vec<Team> {
        self.entities
            .teams_for_user(organization, identity)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, organization_slug = %organization.slug, "Failed to list teams");
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::{Membership, OrganizationStatus, User};
    use crate::services::{InMemoryDirectory, MemorySession};

    const KEY: &str = "activeorg";

    /// Directory wrapper counting calls to the accessible-organizations query.
    struct CountingStore {
        inner: InMemoryDirectory,
        listings: AtomicUsize,
    }

    impl CountingStore {
        fn listings(&self) -> usize {
            self.listings.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityStore for CountingStore {
        async fn organization_by_slug(
            &self,
            slug: &str,
        ) -> Result<Option<Organization>, ServiceError> {
            self.inner.organization_by_slug(slug).await
        }

        async fn accessible_organizations(
            &self,
            identity: &Identity,
            minimum_role: Option<MemberRole>,
        ) -> Result<Vec<Organization>, ServiceError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            self.inner.accessible_organizations(identity, minimum_role).await
        }

        async fn team_by_slug(
            &self,
            organization: &Organization,
            slug: &str,
        ) -> Result<Option<Team>, ServiceError> {
            self.inner.team_by_slug(organization, slug).await
        }

        async fn project_by_slug(
            &self,
            organization: &Organization,
            slug: &str,
        ) -> Result<Option<Project>, ServiceError> {
            self.inner.project_by_slug(organization, slug).await
        }

        async fn team_has_access(
            &self,
            team: &Team,
            user: &User,
            required: Option<MemberRole>,
        ) -> Result<bool, ServiceError> {
            self.inner.team_has_access(team, user, required).await
        }

        async fn project_has_access(
            &self,
            project: &Project,
            user: &User,
            required: Option<MemberRole>,
        ) -> Result<bool, ServiceError> {
            self.inner.project_has_access(project, user, required).await
        }

        async fn teams_for_user(
            &self,
            organization: &Organization,
            identity: &Identity,
        ) -> Result<Vec<Team>, ServiceError> {
            self.inner.teams_for_user(organization, identity).await
        }
    }

    fn seeded() -> Arc<CountingStore> {
        let directory = InMemoryDirectory::new();
        directory.insert_organization(Organization::new(1, "acme", "Acme"));
        directory.insert_organization(Organization::new(2, "globex", "Globex"));
        directory.insert_organization(
            Organization::new(3, "initech", "Initech")
                .with_status(OrganizationStatus::PendingDeletion),
        );
        let backend = Team::new(10, 1, "backend", "Backend");
        directory.insert_team(backend.clone());
        directory.insert_team(Team::new(11, 1, "frontend", "Frontend"));
        directory.insert_project(Project::new(100, backend, "api", "API"));
        directory.insert_membership(Membership::new(5, 1, MemberRole::Member).with_teams([10]));
        directory.insert_membership(Membership::new(5, 2, MemberRole::Owner));
        Arc::new(CountingStore {
            inner: directory,
            listings: AtomicUsize::new(0),
        })
    }

    fn resolver(store: Arc<CountingStore>) -> ScopeResolver {
        ScopeResolver::new(store, SessionKeys::default())
    }

    fn jane() -> Identity {
        Identity::from(User::new(5, "jane"))
    }

    fn root() -> Identity {
        Identity::from(User::superuser(1, "root"))
    }

    #[tokio::test]
    async fn test_explicit_slug_resolves_and_updates_session() {
        let resolver = resolver(seeded());
        let session = MemorySession::new().with_value(KEY, "globex");

        let organization = resolver
            .resolve_organization(&session, Some("acme"), &jane(), None)
            .await
            .unwrap();

        assert_eq!(organization.map(|o| o.slug), Some("acme".to_string()));
        assert_eq!(session.value(KEY), Some("acme".to_string()));
        assert_eq!(session.writes(), 1);
    }

    #[tokio::test]
    async fn test_session_default_for_member_does_not_write() {
        let store = seeded();
        let resolver = resolver(store.clone());
        let session = MemorySession::new().with_value(KEY, "acme");

        let organization = resolver
            .resolve_organization(&session, None, &jane(), None)
            .await
            .unwrap();

        assert_eq!(organization.map(|o| o.slug), Some("acme".to_string()));
        assert_eq!(session.writes(), 0);
        assert_eq!(store.listings(), 1);
    }

    #[tokio::test]
    async fn test_superuser_session_default_skips_listing() {
        let store = seeded();
        let resolver = resolver(store.clone());
        let session = MemorySession::new().with_value(KEY, "acme");

        let organization = resolver
            .resolve_organization(&session, None, &root(), None)
            .await
            .unwrap();

        assert_eq!(organization.map(|o| o.slug), Some("acme".to_string()));
        assert_eq!(store.listings(), 0);
        assert_eq!(session.writes(), 0);
    }

    #[tokio::test]
    async fn test_superuser_falls_through_for_hidden_organization() {
        let store = seeded();
        let resolver = resolver(store.clone());
        let session = MemorySession::new();

        let organization = resolver
            .resolve_organization(&session, Some("initech"), &root(), None)
            .await
            .unwrap();

        assert!(organization.is_none());
        assert_eq!(store.listings(), 1);
        assert_eq!(session.writes(), 0);
    }

    #[tokio::test]
    async fn test_stale_session_slug_is_cleared_then_defaulted() {
        let resolver = resolver(seeded());
        let session = MemorySession::new().with_value(KEY, "vanished");

        let organization = resolver
            .resolve_organization(&session, None, &jane(), None)
            .await
            .unwrap();

        // First accessible organization by name.
        assert_eq!(organization.map(|o| o.slug), Some("acme".to_string()));
        assert_eq!(session.value(KEY), Some("acme".to_string()));
        assert_eq!(session.writes(), 2);
    }

    #[tokio::test]
    async fn test_stale_session_slug_with_nothing_accessible() {
        let resolver = resolver(seeded());
        let session = MemorySession::new().with_value(KEY, "vanished");
        let stranger = Identity::from(User::new(404, "stranger"));

        let organization = resolver
            .resolve_organization(&session, None, &stranger, None)
            .await
            .unwrap();

        assert!(organization.is_none());
        assert_eq!(session.value(KEY), None);
        assert_eq!(session.writes(), 1);
    }

    #[tokio::test]
    async fn test_unknown_explicit_slug_keeps_session() {
        let resolver = resolver(seeded());
        let session = MemorySession::new().with_value(KEY, "acme");

        let organization = resolver
            .resolve_organization(&session, Some("nope"), &jane(), None)
            .await
            .unwrap();

        assert!(organization.is_none());
        assert_eq!(session.value(KEY), Some("acme".to_string()));
        assert_eq!(session.writes(), 0);
    }

    #[tokio::test]
    async fn test_required_role_filters_organizations() {
        let resolver = resolver(seeded());
        let session = MemorySession::new();

        let organization = resolver
            .resolve_organization(&session, Some("acme"), &jane(), Some(MemberRole::Admin))
            .await
            .unwrap();
        assert!(organization.is_none());

        let organization = resolver
            .resolve_organization(&session, None, &jane(), Some(MemberRole::Admin))
            .await
            .unwrap();
        assert_eq!(organization.map(|o| o.slug), Some("globex".to_string()));
    }

    #[tokio::test]
    async fn test_repeated_resolution_is_idempotent() {
        let resolver = resolver(seeded());
        let session = MemorySession::new();

        let first = resolver
            .resolve_organization(&session, None, &jane(), None)
            .await
            .unwrap();
        let writes = session.writes();
        let second = resolver
            .resolve_organization(&session, None, &jane(), None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(writes, 1);
        assert_eq!(session.writes(), writes);
    }

    #[tokio::test]
    async fn test_team_resolution_respects_membership() {
        let resolver = resolver(seeded());
        let acme = Organization::new(1, "acme", "Acme");

        assert!(resolver
            .resolve_team(&jane(), &acme, "backend", None)
            .await
            .is_some());
        assert!(resolver
            .resolve_team(&jane(), &acme, "frontend", None)
            .await
            .is_none());
        assert!(resolver
            .resolve_team(&jane(), &acme, "backend", Some(MemberRole::Admin))
            .await
            .is_none());
        assert!(resolver
            .resolve_team(&root(), &acme, "frontend", Some(MemberRole::Owner))
            .await
            .is_some());
        assert!(resolver
            .resolve_team(&Identity::Anonymous, &acme, "backend", None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_project_resolution_carries_owning_team() {
        let resolver = resolver(seeded());
        let acme = Organization::new(1, "acme", "Acme");

        let project = resolver
            .resolve_project(&jane(), &acme, "api", None)
            .await
            .unwrap();
        assert_eq!(project.team.slug, "backend");
        assert!(resolver
            .resolve_project(&jane(), &acme, "missing", None)
            .await
            .is_none());
    }
}
