//! Tenants and the per-request tenant context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticated caller of the administrative surface.
///
/// Built per request and passed explicitly into every endpoint call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    /// Tenant the caller acts for.
    pub tenant_id: String,
    /// Admin callers may act across tenants.
    pub is_admin: bool,
}

impl TenantContext {
    /// Admin context acting for `tenant_id`.
    #[must_use]
    pub fn admin(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            is_admin: true,
        }
    }

    /// Context confined to `tenant_id`.
    #[must_use]
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            is_admin: false,
        }
    }

    /// Whether the caller may see resources owned by `tenant_id`.
    #[must_use]
    pub fn can_access(&self, tenant_id: &str) -> bool {
        self.is_admin || self.tenant_id == tenant_id
    }
}

/// How a tenant reaches a WOPI client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WopiMode {
    /// Shared client configured for the deployment.
    #[default]
    Pool,
    /// Tenant-specific client.
    Own,
    /// WOPI editing is turned off.
    Disabled,
}

impl WopiMode {
    /// Convert to database string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::Own => "own",
            Self::Disabled => "disabled",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pool" => Some(Self::Pool),
            "own" => Some(Self::Own),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// A tenant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// WOPI client selection.
    pub wopi_mode: WopiMode,
    /// Client URL used in `own` mode.
    pub wopi_client_url: Option<String>,
    /// Whether the tenant may authenticate and create sessions.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// WOPI client URL for this tenant, `None` when WOPI is disabled.
    ///
    /// `own` mode without a configured URL falls back to `pool_url`.
    #[must_use]
    pub fn wopi_client_url(&self, pool_url: &str) -> Option<String> {
        match self.wopi_mode {
            WopiMode::Pool => Some(pool_url.to_string()),
            WopiMode::Own => Some(
                self.wopi_client_url
                    .clone()
                    .filter(|url| !url.is_empty())
                    .unwrap_or_else(|| pool_url.to_string()),
            ),
            WopiMode::Disabled => None,
        }
    }
}

/// Input for creating or updating a tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertTenantInput {
    /// Tenant identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// WOPI client selection.
    #[serde(default)]
    pub wopi_mode: WopiMode,
    /// Client URL used in `own` mode.
    #[serde(default)]
    pub wopi_client_url: Option<String>,
    /// Whether the tenant is active.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl UpsertTenantInput {
    /// Validate the input.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::Validation` for an empty or malformed id, an
    /// empty name, or `own` mode without a client URL.
    pub fn validate(&self) -> Result<(), TenantError> {
        if self.id.is_empty()
            || !self
                .id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(TenantError::Validation(
                "tenant id must be non-empty and contain only [A-Za-z0-9_-]".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(TenantError::Validation("tenant name is required".to_string()));
        }
        if self.wopi_mode == WopiMode::Own
            && self.wopi_client_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(TenantError::Validation(
                "wopi_client_url is required in own mode".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tenant operation errors.
#[derive(Debug, Error)]
pub enum TenantError {
    /// Malformed tenant input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tenant not found.
    #[error("tenant not found: {0}")]
    NotFound(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn tenant(mode: WopiMode, url: Option<&str>) -> Tenant {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Tenant {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            wopi_mode: mode,
            wopi_client_url: url.map(str::to_string),
            active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    #[case(WopiMode::Pool, Some("https://own.example"), Some("https://pool.example"))]
    #[case(WopiMode::Own, Some("https://own.example"), Some("https://own.example"))]
    #[case(WopiMode::Own, None, Some("https://pool.example"))]
    #[case(WopiMode::Own, Some(""), Some("https://pool.example"))]
    #[case(WopiMode::Disabled, Some("https://own.example"), None)]
    fn test_wopi_client_url(
        #[case] mode: WopiMode,
        #[case] url: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            tenant(mode, url).wopi_client_url("https://pool.example").as_deref(),
            expected
        );
    }

    #[test]
    fn test_context_access() {
        assert!(TenantContext::admin("default").can_access("acme"));
        assert!(TenantContext::tenant("acme").can_access("acme"));
        assert!(!TenantContext::tenant("acme").can_access("globex"));
    }

    #[rstest]
    #[case("acme", "Acme", WopiMode::Pool, None, true)]
    #[case("", "Acme", WopiMode::Pool, None, false)]
    #[case("ac/me", "Acme", WopiMode::Pool, None, false)]
    #[case("acme", " ", WopiMode::Pool, None, false)]
    #[case("acme", "Acme", WopiMode::Own, None, false)]
    #[case("acme", "Acme", WopiMode::Own, Some("https://own.example"), true)]
    fn test_upsert_validation(
        #[case] id: &str,
        #[case] name: &str,
        #[case] mode: WopiMode,
        #[case] url: Option<&str>,
        #[case] ok: bool,
    ) {
        let input = UpsertTenantInput {
            id: id.to_string(),
            name: name.to_string(),
            wopi_mode: mode,
            wopi_client_url: url.map(str::to_string),
            active: true,
        };
        assert_eq!(input.validate().is_ok(), ok);
    }

    #[test]
    fn test_mode_round_trip() {
        for mode in [WopiMode::Pool, WopiMode::Own, WopiMode::Disabled] {
            assert_eq!(WopiMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(WopiMode::parse("shared"), None);
    }
}
