//! Contracts of the persistence layer the access layer reads from.
//!
//! Lookups return `Ok(None)` for missing rows. `Err` is reserved for backend
//! failures; resolvers log those and carry on as if nothing was found.

use async_trait::async_trait;

use crate::models::{
    AuthIdentity, AuthProvider, Identity, MemberRole, Membership, Organization, OrganizationId,
    Project, Team, User, UserId,
};
use crate::services::ServiceError;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Cached lookup by slug, regardless of status.
    async fn organization_by_slug(&self, slug: &str)
        -> Result<Option<Organization>, ServiceError>;

    /// Visible organizations `identity` may enter, optionally restricted to
    /// memberships holding at least `minimum_role`. Order is stable between
    /// calls so that "first organization" is deterministic.
    async fn accessible_organizations(
        &self,
        identity: &Identity,
        minimum_role: Option<MemberRole>,
    ) -> Result<Vec<Organization>, ServiceError>;

    async fn team_by_slug(
        &self,
        organization: &Organization,
        slug: &str,
    ) -> Result<Option<Team>, ServiceError>;

    async fn project_by_slug(
        &self,
        organization: &Organization,
        slug: &str,
    ) -> Result<Option<Project>, ServiceError>;

    /// Whether `user` reaches `team` with at least `required` (any role when `None`).
    async fn team_has_access(
        &self,
        team: &Team,
        user: &User,
        required: Option<MemberRole>,
    ) -> Result<bool, ServiceError>;

    async fn project_has_access(
        &self,
        project: &Project,
        user: &User,
        required: Option<MemberRole>,
    ) -> Result<bool, ServiceError>;

    /// Teams of `organization` visible to `identity`, ordered by name.
    async fn teams_for_user(
        &self,
        organization: &Organization,
        identity: &Identity,
    ) -> Result<Vec<Team>, ServiceError>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Membership>, ServiceError>;
}

#[async_trait]
pub trait AuthIdentityStore: Send + Sync {
    /// SSO provider the organization enforces, if any.
    async fn auth_provider_for_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<AuthProvider>, ServiceError>;

    /// The caller's link to the SSO provider configured for the organization.
    async fn auth_identity_for_organization(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<Option<AuthIdentity>, ServiceError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, ServiceError>;
}
