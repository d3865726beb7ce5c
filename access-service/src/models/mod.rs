pub mod access;
pub mod auth_identity;
pub mod identity;
pub mod membership;
pub mod organization;
pub mod project;
pub mod role;
pub mod team;

pub use access::{Access, Grant};
pub use auth_identity::{AuthIdentity, AuthProvider};
pub use identity::{Identity, User, UserId};
pub use membership::Membership;
pub use organization::{Organization, OrganizationId, OrganizationStatus};
pub use project::{Project, ProjectId};
pub use role::MemberRole;
pub use team::{Team, TeamId};
