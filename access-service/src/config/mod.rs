use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use validator::Validate;

use crate::services::SessionKeys;

const ORGANIZATION_SLUG: &str = "{organization_slug}";

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub redirects: RedirectConfig,
    pub session: SessionConfig,
    pub sso: SsoConfig,
    pub fixtures_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

/// Destinations the pipeline redirects to when a request is turned away.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedirectConfig {
    #[validate(length(min = 1, message = "Login URL is required"))]
    pub login_url: String,
    #[validate(contains(
        pattern = "{organization_slug}",
        message = "Organization login URL must contain {organization_slug}"
    ))]
    pub organization_login_url: String,
    #[validate(contains(
        pattern = "{organization_slug}",
        message = "SSO link URL must contain {organization_slug}"
    ))]
    pub sso_link_url: String,
    #[validate(length(min = 1, message = "Sudo URL is required"))]
    pub sudo_url: String,
    #[validate(length(min = 1, message = "No-permission URL is required"))]
    pub no_permission_url: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            login_url: "/auth/login/".to_string(),
            organization_login_url: "/auth/login/{organization_slug}/".to_string(),
            sso_link_url: "/auth/link/{organization_slug}/".to_string(),
            sudo_url: "/account/sudo/".to_string(),
            no_permission_url: "/".to_string(),
        }
    }
}

impl RedirectConfig {
    pub fn organization_login(&self, organization_slug: &str) -> String {
        self.organization_login_url
            .replace(ORGANIZATION_SLUG, &urlencoding::encode(organization_slug))
    }

    pub fn sso_link(&self, organization_slug: &str) -> String {
        self.sso_link_url
            .replace(ORGANIZATION_SLUG, &urlencoding::encode(organization_slug))
    }

    /// Sudo flow URL that returns to `next` once re-authenticated.
    pub fn sudo(&self, next: &str) -> String {
        let separator = if self.sudo_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}next={}",
            self.sudo_url,
            separator,
            urlencoding::encode(next)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub active_organization_key: String,
    pub next_key: String,
    pub sudo_key: String,
    pub messages_key: String,
    pub cookie_secure: bool,
    pub inactivity_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let keys = SessionKeys::default();
        Self {
            active_organization_key: keys.active_organization,
            next_key: keys.next,
            sudo_key: keys.sudo_until,
            messages_key: keys.messages,
            cookie_secure: false,
            inactivity_hours: 24,
        }
    }
}

impl SessionConfig {
    pub fn keys(&self) -> SessionKeys {
        SessionKeys {
            active_organization: self.active_organization_key.clone(),
            next: self.next_key.clone(),
            sudo_until: self.sudo_key.clone(),
            messages: self.messages_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SsoConfig {
    /// How long a verified SSO identity stays valid.
    pub verification_window_hours: i64,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            verification_window_hours: 24,
        }
    }
}

impl SsoConfig {
    pub fn verification_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.verification_window_hours)
    }
}

impl Default for AccessConfig {
    /// Development settings with no fixture file and no trace export.
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "access-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            redirects: RedirectConfig::default(),
            session: SessionConfig::default(),
            sso: SsoConfig::default(),
            fixtures_path: None,
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let redirect_defaults = RedirectConfig::default();
        let session_defaults = SessionConfig::default();

        let config = AccessConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("access-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            redirects: RedirectConfig {
                login_url: get_env("LOGIN_URL", Some(&redirect_defaults.login_url), is_prod)?,
                organization_login_url: get_env(
                    "ORGANIZATION_LOGIN_URL",
                    Some(&redirect_defaults.organization_login_url),
                    is_prod,
                )?,
                sso_link_url: get_env(
                    "SSO_LINK_URL",
                    Some(&redirect_defaults.sso_link_url),
                    is_prod,
                )?,
                sudo_url: get_env("SUDO_URL", Some(&redirect_defaults.sudo_url), is_prod)?,
                no_permission_url: get_env(
                    "NO_PERMISSION_URL",
                    Some(&redirect_defaults.no_permission_url),
                    is_prod,
                )?,
            },
            session: SessionConfig {
                active_organization_key: get_env(
                    "SESSION_ACTIVE_ORGANIZATION_KEY",
                    Some(&session_defaults.active_organization_key),
                    false,
                )?,
                next_key: get_env("SESSION_NEXT_KEY", Some(&session_defaults.next_key), false)?,
                sudo_key: get_env("SESSION_SUDO_KEY", Some(&session_defaults.sudo_key), false)?,
                messages_key: get_env(
                    "SESSION_MESSAGES_KEY",
                    Some(&session_defaults.messages_key),
                    false,
                )?,
                cookie_secure: get_env("SESSION_COOKIE_SECURE", Some("false"), is_prod)?
                    .parse()
                    .unwrap_or(false),
                inactivity_hours: get_env("SESSION_INACTIVITY_HOURS", Some("24"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            sso: SsoConfig {
                verification_window_hours: get_env(
                    "SSO_VERIFICATION_WINDOW_HOURS",
                    Some("24"),
                    is_prod,
                )?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            },
            fixtures_path: env::var("FIXTURES_PATH").ok().filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        self.redirects
            .validate()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?;

        if self.session.inactivity_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_INACTIVITY_HOURS must be positive"
            )));
        }

        if self.sso.verification_window_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SSO_VERIFICATION_WINDOW_HOURS must be positive"
            )));
        }

        if self.environment == Environment::Prod && !self.session.cookie_secure {
            tracing::error!("Session cookies are not marked secure in production");
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
