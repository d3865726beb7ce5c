//! The authorization pipeline run in front of every scoped endpoint.
//!
//! Stages run in a fixed order: authentication, sudo, scope conversion,
//! access computation, permission check. The first failing stage decides
//! where the caller is sent.

use chrono::Utc;

use crate::authz::policy::{self, PolicyViolation};
use crate::authz::{EndpointSpec, RequestScope, ScopeLevel, ScopePath};
use crate::config::RedirectConfig;
use crate::models::{Access, Identity, Organization, Project, Team};
use crate::services::metrics::record_decision;
use crate::services::session::{is_sudo, push_message};
use crate::services::{
    AccessResolver, FlashMessage, ScopeResolver, ServiceError, SessionKeys, SessionState,
};

pub const SSO_LINK_REQUIRED_MESSAGE: &str =
    "You need to link your account with the SSO provider to continue.";

/// Everything the pipeline needs to know about one request.
pub struct AuthorizationRequest<'a> {
    pub endpoint: &'a EndpointSpec,
    pub identity: &'a Identity,
    pub path: &'a ScopePath,
    /// Requested path including the query string.
    pub full_path: &'a str,
    pub session: &'a dyn SessionState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow(RequestScope),
    Deny(Denial),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenialReason,
    /// Redirect target.
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    NotAuthenticated,
    SudoRequired,
    SsoLinkRequired,
    PermissionDenied(PolicyViolation),
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::NotAuthenticated => "not_authenticated",
            DenialReason::SudoRequired => "sudo_required",
            DenialReason::SsoLinkRequired => "sso_link_required",
            DenialReason::PermissionDenied(violation) => violation.as_str(),
        }
    }
}

struct ResolvedEntities {
    organization: Option<Organization>,
    team: Option<Team>,
    project: Option<Project>,
}

#[derive(Clone)]
pub struct RequestAuthorizer {
    scopes: ScopeResolver,
    access: AccessResolver,
    redirects: RedirectConfig,
    keys: SessionKeys,
}

impl RequestAuthorizer {
    pub fn new(
        scopes: ScopeResolver,
        access: AccessResolver,
        redirects: RedirectConfig,
        keys: SessionKeys,
    ) -> Self {
        Self {
            scopes,
            access,
            redirects,
            keys,
        }
    }

    /// Run every stage for `request`.
    ///
    /// Denials are regular outcomes. `Err` is returned only for session
    /// failures and for a team or project endpoint whose path lacks the slug
    /// its level needs.
    pub async fn authorize(
        &self,
        request: AuthorizationRequest<'_>,
    ) -> Result<Decision, ServiceError> {
        let decision = self.run(&request).await?;

        match &decision {
            Decision::Allow(scope) => {
                record_decision("allow", request.endpoint.level.as_str());
                tracing::debug!(
                    level = request.endpoint.level.as_str(),
                    organization_slug = scope.organization.as_ref().map(|o| o.slug.as_str()),
                    role = scope.access.role().map(|r| r.as_str()),
                    "Request authorized"
                );
            }
            Decision::Deny(denial) => {
                record_decision("deny", denial.reason.as_str());
                tracing::info!(
                    reason = denial.reason.as_str(),
                    path = %request.full_path,
                    location = %denial.location,
                    "Request denied"
                );
            }
        }

        Ok(decision)
    }

    async fn run(&self, request: &AuthorizationRequest<'_>) -> Result<Decision, ServiceError> {
        if let Some(denial) = self.check_authentication(request).await? {
            return Ok(Decision::Deny(denial));
        }

        if let Some(denial) = self.check_sudo(request).await? {
            return Ok(Decision::Deny(denial));
        }

        let entities = self.convert_scope(request).await?;

        let access = match request.endpoint.level {
            ScopeLevel::None => Access::Denied,
            _ => {
                self.access
                    .from_identity(request.identity, entities.organization.as_ref())
                    .await
            }
        };

        let mut scope = RequestScope {
            organization: entities.organization,
            team: entities.team,
            project: entities.project,
            access,
            team_list: Vec::new(),
        };

        if let Err(violation) = policy::check(request.endpoint, &scope) {
            return self.deny_permission(request, &scope, violation).await;
        }

        if let Some(organization) = &scope.organization {
            scope.team_list = self.scopes.team_list(request.identity, organization).await;
        }

        Ok(Decision::Allow(scope))
    }

    async fn check_authentication(
        &self,
        request: &AuthorizationRequest<'_>,
    ) -> Result<Option<Denial>, ServiceError> {
        if !request.endpoint.auth_required || request.identity.is_authenticated() {
            return Ok(None);
        }

        request
            .session
            .write_key(&self.keys.next, request.full_path.to_string())
            .await?;

        let location = match request.path.organization_slug.as_deref() {
            Some(slug) => self.redirects.organization_login(slug),
            None => self.redirects.login_url.clone(),
        };

        Ok(Some(Denial {
            reason: DenialReason::NotAuthenticated,
            location,
        }))
    }

    async fn check_sudo(
        &self,
        request: &AuthorizationRequest<'_>,
    ) -> Result<Option<Denial>, ServiceError> {
        if !request.endpoint.sudo_required
            || is_sudo(request.session, &self.keys.sudo_until, Utc::now()).await?
        {
            return Ok(None);
        }

        Ok(Some(Denial {
            reason: DenialReason::SudoRequired,
            location: self.redirects.sudo(request.full_path),
        }))
    }

    async fn convert_scope(
        &self,
        request: &AuthorizationRequest<'_>,
    ) -> Result<ResolvedEntities, ServiceError> {
        let endpoint = request.endpoint;
        let path = request.path;
        let organization_slug = path.organization_slug.as_deref();

        let mut entities = ResolvedEntities {
            organization: None,
            team: None,
            project: None,
        };

        match endpoint.level {
            ScopeLevel::None => {}
            ScopeLevel::Organization => {
                entities.organization = self
                    .scopes
                    .resolve_organization(
                        request.session,
                        organization_slug,
                        request.identity,
                        endpoint.required_role,
                    )
                    .await?;
            }
            ScopeLevel::Team => {
                let team_slug = path.team_slug.as_deref().ok_or_else(|| {
                    ServiceError::MalformedEndpoint("team endpoint without team slug".to_string())
                })?;
                let organization_slug = organization_slug.ok_or_else(|| {
                    ServiceError::MalformedEndpoint(
                        "team endpoint without organization slug".to_string(),
                    )
                })?;
                entities.organization = self
                    .scopes
                    .resolve_organization(
                        request.session,
                        Some(organization_slug),
                        request.identity,
                        None,
                    )
                    .await?;
                if let Some(organization) = &entities.organization {
                    entities.team = self
                        .scopes
                        .resolve_team(
                            request.identity,
                            organization,
                            team_slug,
                            endpoint.required_role,
                        )
                        .await;
                }
            }
            ScopeLevel::Project => {
                let project_slug = path.project_slug.as_deref().ok_or_else(|| {
                    ServiceError::MalformedEndpoint(
                        "project endpoint without project slug".to_string(),
                    )
                })?;
                let organization_slug = organization_slug.ok_or_else(|| {
                    ServiceError::MalformedEndpoint(
                        "project endpoint without organization slug".to_string(),
                    )
                })?;
                entities.organization = self
                    .scopes
                    .resolve_organization(
                        request.session,
                        Some(organization_slug),
                        request.identity,
                        None,
                    )
                    .await?;
                if let Some(organization) = &entities.organization {
                    entities.project = self
                        .scopes
                        .resolve_project(
                            request.identity,
                            organization,
                            project_slug,
                            endpoint.required_role,
                        )
                        .await;
                    entities.team = entities.project.as_ref().map(|p| p.team.clone());
                }
            }
        }

        Ok(entities)
    }

    async fn deny_permission(
        &self,
        request: &AuthorizationRequest<'_>,
        scope: &RequestScope,
        violation: PolicyViolation,
    ) -> Result<Decision, ServiceError> {
        if violation == PolicyViolation::SsoInvalid && request.identity.is_authenticated() {
            if let Some(organization) = &scope.organization {
                push_message(
                    request.session,
                    &self.keys.messages,
                    FlashMessage::error(SSO_LINK_REQUIRED_MESSAGE),
                )
                .await?;

                return Ok(Decision::Deny(Denial {
                    reason: DenialReason::SsoLinkRequired,
                    location: self.redirects.sso_link(&organization.slug),
                }));
            }
        }

        Ok(Decision::Deny(Denial {
            reason: DenialReason::PermissionDenied(violation),
            location: self.redirects.no_permission_url.clone(),
        }))
    }
}
