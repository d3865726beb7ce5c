pub mod authz;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use service_core::middleware::{http_metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::authz::{EndpointSpec, RequestAuthorizer};
use crate::config::AccessConfig;
use crate::handlers::{
    account_settings, health_check, index, messages, organization_home, project_home, team_home,
};
use crate::middleware::{authorize_middleware, session_identity_middleware, ScopeGuard};
use crate::services::{
    AccessResolver, AuthIdentityStore, EntityStore, InMemoryDirectory, MembershipStore,
    ScopeResolver, UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AccessConfig,
    pub authorizer: Arc<RequestAuthorizer>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(
        config: AccessConfig,
        entities: Arc<dyn EntityStore>,
        memberships: Arc<dyn MembershipStore>,
        auth_identities: Arc<dyn AuthIdentityStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let keys = config.session.keys();
        let authorizer = RequestAuthorizer::new(
            ScopeResolver::new(entities, keys.clone()),
            AccessResolver::new(memberships, auth_identities, config.sso.verification_window()),
            config.redirects.clone(),
            keys,
        );

        Self {
            config,
            authorizer: Arc::new(authorizer),
            users,
        }
    }

    /// State backed entirely by one in-memory directory.
    pub fn with_directory(config: AccessConfig, directory: Arc<InMemoryDirectory>) -> Self {
        Self::new(
            config,
            directory.clone(),
            directory.clone(),
            directory.clone(),
            directory,
        )
    }

    fn guard(&self, endpoint: EndpointSpec) -> ScopeGuard {
        ScopeGuard::new(self.authorizer.clone(), endpoint)
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.session.cookie_secure)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            state.config.session.inactivity_hours,
        )));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/",
            get(index).layer(from_fn_with_state(
                state.guard(EndpointSpec::authenticated()),
                authorize_middleware,
            )),
        )
        .route(
            "/organizations/",
            get(organization_home).layer(from_fn_with_state(
                state.guard(EndpointSpec::organization()),
                authorize_middleware,
            )),
        )
        .route(
            "/organizations/:organization_slug/",
            get(organization_home).layer(from_fn_with_state(
                state.guard(EndpointSpec::organization()),
                authorize_middleware,
            )),
        )
        .route(
            "/organizations/:organization_slug/teams/:team_slug/",
            get(team_home).layer(from_fn_with_state(
                state.guard(EndpointSpec::team()),
                authorize_middleware,
            )),
        )
        .route(
            "/organizations/:organization_slug/projects/:project_slug/",
            get(project_home).layer(from_fn_with_state(
                state.guard(EndpointSpec::project()),
                authorize_middleware,
            )),
        )
        .route(
            "/account/settings/",
            get(account_settings).layer(from_fn_with_state(
                state.guard(EndpointSpec::authenticated().with_sudo()),
                authorize_middleware,
            )),
        )
        .route("/messages", get(messages))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.users.clone(),
            session_identity_middleware,
        ))
        .layer(session_layer)
        .layer(from_fn(http_metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
}
