use crate::models::MemberRole;

/// Entity an endpoint operates on; selects which resolvers run and which
/// permission check applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeLevel {
    None,
    Organization,
    Team,
    Project,
}

impl ScopeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeLevel::None => "none",
            ScopeLevel::Organization => "organization",
            ScopeLevel::Team => "team",
            ScopeLevel::Project => "project",
        }
    }
}

/// Per-endpoint authorization declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub auth_required: bool,
    pub sudo_required: bool,
    pub level: ScopeLevel,
    /// Minimum role for the entity named by `level`.
    pub required_role: Option<MemberRole>,
    /// Whether a stale or unlinked SSO identity blocks the endpoint.
    pub sso_required: bool,
}

impl EndpointSpec {
    pub fn public() -> Self {
        Self {
            auth_required: false,
            sudo_required: false,
            level: ScopeLevel::None,
            required_role: None,
            sso_required: false,
        }
    }

    pub fn authenticated() -> Self {
        Self {
            auth_required: true,
            ..Self::public()
        }
    }

    pub fn organization() -> Self {
        Self::scoped(ScopeLevel::Organization)
    }

    pub fn team() -> Self {
        Self::scoped(ScopeLevel::Team)
    }

    pub fn project() -> Self {
        Self::scoped(ScopeLevel::Project)
    }

    fn scoped(level: ScopeLevel) -> Self {
        Self {
            auth_required: true,
            sudo_required: false,
            level,
            required_role: None,
            sso_required: true,
        }
    }

    pub fn with_sudo(mut self) -> Self {
        self.sudo_required = true;
        self
    }

    pub fn with_required_role(mut self, role: MemberRole) -> Self {
        self.required_role = Some(role);
        self
    }

    pub fn without_sso(mut self) -> Self {
        self.sso_required = false;
        self
    }

    pub fn allow_anonymous(mut self) -> Self {
        self.auth_required = false;
        self
    }
}
