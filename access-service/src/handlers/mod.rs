pub mod health;
pub mod scope;

pub use health::health_check;
pub use scope::{account_settings, index, messages, organization_home, project_home, team_home};
