//! Services layer for access-service.
//!
//! Store contracts, the in-memory directory, session access and the
//! resolvers that compute scope and access for a request.

mod access;
pub mod directory;
pub mod error;
pub mod metrics;
mod scope;
pub mod session;
mod store;

pub use access::AccessResolver;
pub use directory::{Fixture, InMemoryDirectory};
pub use error::ServiceError;
pub use scope::ScopeResolver;
pub use session::{FlashMessage, MemorySession, MessageLevel, SessionKeys, SessionState};
pub use store::{AuthIdentityStore, EntityStore, MembershipStore, UserStore};
