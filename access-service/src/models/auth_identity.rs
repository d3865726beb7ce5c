use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Membership, OrganizationId, UserId};

/// Single-sign-on provider an organization enforces for its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProvider {
    pub organization_id: OrganizationId,
    pub provider: String,
}

impl AuthProvider {
    pub fn new(organization_id: OrganizationId, provider: impl Into<String>) -> Self {
        Self {
            organization_id,
            provider: provider.into(),
        }
    }
}

/// Link between a user and the single-sign-on provider of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub provider: String,
    /// Provider-side subject of the linked account.
    pub ident: String,
    #[serde(default)]
    pub last_verified: Option<DateTime<Utc>>,
}

impl AuthIdentity {
    pub fn new(
        user_id: UserId,
        organization_id: OrganizationId,
        provider: impl Into<String>,
        ident: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            organization_id,
            provider: provider.into(),
            ident: ident.into(),
            last_verified: None,
        }
    }

    pub fn verified_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_verified = Some(at);
        self
    }

    /// Whether the link still satisfies the organization's SSO enforcement for
    /// `member`: the membership must not be flagged invalid and the identity
    /// must have been verified within `max_age` of `now`.
    pub fn is_valid(&self, member: &Membership, now: DateTime<Utc>, max_age: Duration) -> bool {
        if member.sso_invalid {
            return false;
        }

        match self.last_verified {
            Some(verified) => verified > now - max_age,
            None => false,
        }
    }
}
