//! Session and role types.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Access profile assigned by the API on login.
///
/// The wire format uses the upper-snake names from the auth service
/// (`SUPER_ADMIN`, `ADMIN_TENANT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "SUPER_ADMIN")]
    SuperAdmin,
    #[serde(rename = "ADMIN_TENANT")]
    AdminTenant,
    #[serde(rename = "RECEPCAO")]
    Recepcao,
    #[serde(rename = "CLINICO")]
    Clinico,
    #[serde(rename = "FATURAMENTO")]
    Faturamento,
    #[serde(rename = "AUDITOR_INTERNO")]
    AuditorInterno,
}

impl Role {
    pub fn parse(value: &str) -> Result<Role, CoreError> {
        match value {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN_TENANT" => Ok(Role::AdminTenant),
            "RECEPCAO" => Ok(Role::Recepcao),
            "CLINICO" => Ok(Role::Clinico),
            "FATURAMENTO" => Ok(Role::Faturamento),
            "AUDITOR_INTERNO" => Ok(Role::AuditorInterno),
            other => Err(CoreError::UnknownRole {
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::AdminTenant => "ADMIN_TENANT",
            Role::Recepcao => "RECEPCAO",
            Role::Clinico => "CLINICO",
            Role::Faturamento => "FATURAMENTO",
            Role::AuditorInterno => "AUDITOR_INTERNO",
        }
    }
}

/// Authenticated session: bearer token, role set, and the single active
/// tenant context. Exactly one tenant at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub roles: Vec<Role>,
    pub tenant_id: i64,
}

impl Session {
    pub fn new(token: impl Into<String>, roles: Vec<Role>, tenant_id: i64) -> Self {
        Self {
            token: token.into(),
            roles,
            tenant_id,
        }
    }

    /// Build a session from the wire role strings, dropping unknown roles.
    ///
    /// The auth service may grow roles this client does not know about;
    /// a session with an unknown role must still log in.
    pub fn from_wire(token: impl Into<String>, roles: &[String], tenant_id: i64) -> Self {
        let roles = roles
            .iter()
            .filter_map(|r| Role::parse(r).ok())
            .collect();
        Self {
            token: token.into(),
            roles,
            tenant_id,
        }
    }
}

/// True iff the session's role set intersects `allowed`.
///
/// An absent session never has a role.
pub fn has_role(session: Option<&Session>, allowed: &[Role]) -> bool {
    match session {
        Some(session) => session.roles.iter().any(|r| allowed.contains(r)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_wire_names() {
        for role in [
            Role::SuperAdmin,
            Role::AdminTenant,
            Role::Recepcao,
            Role::Clinico,
            Role::Faturamento,
            Role::AuditorInterno,
        ] {
            assert_eq!(Role::parse(role.as_str()), Ok(role));
        }
        assert!(Role::parse("GERENTE").is_err());
    }

    #[test]
    fn clinico_session_has_only_its_roles() {
        let session = Session::from_wire("tok", &["CLINICO".to_string()], 7);
        assert!(has_role(Some(&session), &[Role::Clinico]));
        assert!(!has_role(Some(&session), &[Role::AdminTenant]));
    }

    #[test]
    fn absent_session_has_no_roles() {
        assert!(!has_role(None, &[Role::SuperAdmin]));
    }

    #[test]
    fn unknown_wire_roles_are_dropped() {
        let session = Session::from_wire(
            "tok",
            &["CLINICO".to_string(), "NOVA_FUNCAO".to_string()],
            1,
        );
        assert_eq!(session.roles, vec![Role::Clinico]);
    }
}
