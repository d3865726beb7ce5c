//! Membership role tiers.

use serde::{Deserialize, Serialize};

/// Role a member holds inside an organization.
///
/// Tiers are ordered by privilege with the most privileged tier carrying the
/// smallest value: `Owner (0) < Admin (25) < Member (50)`. A caller satisfies a
/// required tier when its own value is less than or equal to the required one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    pub fn value(self) -> u8 {
        match self {
            MemberRole::Owner => 0,
            MemberRole::Admin => 25,
            MemberRole::Member => 50,
        }
    }

    /// True when `self` is at least as privileged as `required`.
    pub fn satisfies(self, required: MemberRole) -> bool {
        self.value() <= required.value()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}
