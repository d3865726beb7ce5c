pub mod authorize;
pub mod identity;

pub use authorize::{authorize_middleware, ScopeGuard};
pub use identity::{session_identity_middleware, USER_ID_KEY};
