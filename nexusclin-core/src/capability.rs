//! Capability table for role-gated navigation.
//!
//! Every view's access rule lives in this one table; navigation and route
//! guards consult it instead of repeating per-view role checks.

use crate::session::{has_role, Role, Session};
use serde::{Deserialize, Serialize};

/// Application features a session may or may not reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    Dashboard,
    Agenda,
    Prontuario,
    Producao,
    Auditoria,
    Usuarios,
    Tenants,
    Perfil,
}

impl Feature {
    pub fn all() -> &'static [Feature] {
        &[
            Feature::Dashboard,
            Feature::Agenda,
            Feature::Prontuario,
            Feature::Producao,
            Feature::Auditoria,
            Feature::Usuarios,
            Feature::Tenants,
            Feature::Perfil,
        ]
    }

    /// Roles allowed to reach this feature. `None` means any authenticated
    /// session.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Feature::Dashboard | Feature::Perfil => None,
            Feature::Agenda => Some(&[Role::Recepcao, Role::AdminTenant]),
            Feature::Prontuario => Some(&[Role::Clinico, Role::AdminTenant]),
            Feature::Producao => Some(&[
                Role::Faturamento,
                Role::AdminTenant,
                Role::SuperAdmin,
            ]),
            Feature::Auditoria => Some(&[
                Role::Faturamento,
                Role::AdminTenant,
                Role::SuperAdmin,
                Role::AuditorInterno,
            ]),
            Feature::Usuarios => Some(&[Role::AdminTenant, Role::SuperAdmin]),
            Feature::Tenants => Some(&[Role::SuperAdmin]),
        }
    }

    /// True iff `session` may reach this feature. No session reaches
    /// anything.
    pub fn accessible(&self, session: Option<&Session>) -> bool {
        if session.is_none() {
            return false;
        }
        match self.allowed_roles() {
            None => true,
            Some(allowed) => has_role(session, allowed),
        }
    }
}

/// The features visible to `session`, in navigation order.
pub fn visible_features(session: Option<&Session>) -> Vec<Feature> {
    Feature::all()
        .iter()
        .copied()
        .filter(|f| f.accessible(session))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(roles: &[Role]) -> Session {
        Session::new("tok", roles.to_vec(), 1)
    }

    #[test]
    fn super_admin_sees_tenants() {
        let session = session_with(&[Role::SuperAdmin]);
        assert!(Feature::Tenants.accessible(Some(&session)));
        let session = session_with(&[Role::AdminTenant]);
        assert!(!Feature::Tenants.accessible(Some(&session)));
    }

    #[test]
    fn clinico_sees_prontuario_but_not_agenda() {
        let session = session_with(&[Role::Clinico]);
        let visible = visible_features(Some(&session));
        assert!(visible.contains(&Feature::Prontuario));
        assert!(visible.contains(&Feature::Dashboard));
        assert!(visible.contains(&Feature::Perfil));
        assert!(!visible.contains(&Feature::Agenda));
        assert!(!visible.contains(&Feature::Usuarios));
    }

    #[test]
    fn no_session_sees_nothing() {
        assert!(visible_features(None).is_empty());
    }

    #[test]
    fn auditor_reaches_auditoria_only_among_gated_views() {
        let session = session_with(&[Role::AuditorInterno]);
        assert!(Feature::Auditoria.accessible(Some(&session)));
        assert!(!Feature::Producao.accessible(Some(&session)));
        assert!(!Feature::Usuarios.accessible(Some(&session)));
    }
}
