//! Computes the [`Access`] a caller holds against an organization.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::models::{Access, Grant, Identity, Membership, Organization};
use crate::services::{AuthIdentityStore, MembershipStore};

#[derive(Clone)]
pub struct AccessResolver {
    memberships: Arc<dyn MembershipStore>,
    auth_identities: Arc<dyn AuthIdentityStore>,
    /// How long an SSO verification stays valid.
    sso_max_age: Duration,
}

impl AccessResolver {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        auth_identities: Arc<dyn AuthIdentityStore>,
        sso_max_age: Duration,
    ) -> Self {
        Self {
            memberships,
            auth_identities,
            sso_max_age,
        }
    }

    /// Superusers get an owner grant regardless of organization. Otherwise no
    /// organization means `Access::Denied` and no membership means a grant
    /// without a role.
    pub async fn from_identity(
        &self,
        identity: &Identity,
        organization: Option<&Organization>,
    ) -> Access {
        if identity.is_superuser() {
            return Access::superuser();
        }

        let Some(organization) = organization else {
            return Access::Denied;
        };

        let Some(user_id) = identity.user_id() else {
            return Access::non_member();
        };

        match self.memberships.membership(user_id, organization.id).await {
            Ok(Some(membership)) => self.from_membership(&membership).await,
            Ok(None) => Access::non_member(),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id,
                    organization_slug = %organization.slug,
                    "Membership lookup failed, treating caller as non-member"
                );
                Access::non_member()
            }
        }
    }

    pub async fn from_membership(&self, membership: &Membership) -> Access {
        let teams = membership.scoped_teams().cloned().unwrap_or_default();

        let is_sso_valid = self.is_sso_valid(membership).await;

        Access::Granted(Grant::new(
            Some(membership.role),
            membership.has_global_access,
            is_sso_valid,
            teams,
        ))
    }

    /// Valid when the organization enforces no SSO provider. Otherwise the
    /// member needs a linked identity that is still valid. Lookup failures
    /// count as invalid.
    async fn is_sso_valid(&self, membership: &Membership) -> bool {
        let provider = match self
            .auth_identities
            .auth_provider_for_organization(membership.organization_id)
            .await
        {
            Ok(Some(provider)) => provider,
            Ok(None) => return true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    organization_id = membership.organization_id,
                    "Auth provider lookup failed, treating SSO as invalid"
                );
                return false;
            }
        };

        match self
            .auth_identities
            .auth_identity_for_organization(membership.organization_id, membership.user_id)
            .await
        {
            Ok(Some(identity)) => identity.is_valid(membership, Utc::now(), self.sso_max_age),
            Ok(None) => {
                tracing::debug!(
                    user_id = membership.user_id,
                    organization_id = membership.organization_id,
                    provider = %provider.provider,
                    "Member has not linked the organization's SSO provider"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id = membership.user_id,
                    organization_id = membership.organization_id,
                    "Auth identity lookup failed, treating SSO as invalid"
                );
                false
            }
        }
    }
}
