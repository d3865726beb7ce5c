//! Request authorization: endpoint declarations, the resolved request scope,
//! permission checks and the pipeline tying them together.

pub mod endpoint;
pub mod pipeline;
pub mod policy;
pub mod scope;

pub use endpoint::{EndpointSpec, ScopeLevel};
pub use pipeline::{AuthorizationRequest, Decision, Denial, DenialReason, RequestAuthorizer};
pub use policy::PolicyViolation;
pub use scope::{RequestScope, ScopePath};
