use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use service_core::error::AppError;
use tower_sessions::Session;

use crate::authz::{AuthorizationRequest, Decision, EndpointSpec, RequestAuthorizer, ScopePath};
use crate::models::Identity;

/// Middleware state: the shared pipeline plus the declaration of the route
/// it guards.
#[derive(Clone)]
pub struct ScopeGuard {
    pub authorizer: Arc<RequestAuthorizer>,
    pub endpoint: EndpointSpec,
}

impl ScopeGuard {
    pub fn new(authorizer: Arc<RequestAuthorizer>, endpoint: EndpointSpec) -> Self {
        Self {
            authorizer,
            endpoint,
        }
    }
}

/// Run the authorization pipeline for the guarded route. Allowed requests
/// carry a [`crate::authz::RequestScope`] extension; denied ones are
/// redirected with `303 See Other`.
pub async fn authorize_middleware(
    State(guard): State<ScopeGuard>,
    session: Session,
    params: Option<Path<HashMap<String, String>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_default();
    let path = params
        .map(|Path(params)| ScopePath::from_params(&params))
        .unwrap_or_default();
    let full_path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let decision = guard
        .authorizer
        .authorize(AuthorizationRequest {
            endpoint: &guard.endpoint,
            identity: &identity,
            path: &path,
            full_path: &full_path,
            session: &session,
        })
        .await?;

    match decision {
        Decision::Allow(scope) => {
            req.extensions_mut().insert(scope);
            Ok(next.run(req).await)
        }
        Decision::Deny(denial) => Ok(Redirect::to(&denial.location).into_response()),
    }
}
