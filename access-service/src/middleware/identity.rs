use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

use crate::models::{Identity, UserId};
use crate::services::UserStore;

/// Session key holding the id of the logged-in user.
pub const USER_ID_KEY: &str = "user_id";

/// Attach the caller's [`Identity`] to the request. A request that already
/// carries one is left alone; otherwise the user is loaded from the
/// session's `user_id`, falling back to anonymous.
pub async fn session_identity_middleware(
    State(users): State<Arc<dyn UserStore>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    if req.extensions().get::<Identity>().is_none() {
        let identity = load_identity(users.as_ref(), &session).await;
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}

async fn load_identity(users: &dyn UserStore, session: &Session) -> Identity {
    let user_id: Option<UserId> = match session.get(USER_ID_KEY).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read user id from session");
            None
        }
    };

    let Some(user_id) = user_id else {
        return Identity::Anonymous;
    };

    match users.user_by_id(user_id).await {
        Ok(Some(user)) => Identity::User(user),
        Ok(None) => {
            tracing::info!(user_id, "Session references unknown user");
            Identity::Anonymous
        }
        Err(e) => {
            tracing::error!(error = %e, user_id, "User lookup failed");
            Identity::Anonymous
        }
    }
}
