//! Navigation and view switching, gated by the capability table.

use nexusclin_core::{Feature, Session};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Login,
    Dashboard,
    Agenda,
    Prontuario,
    Producao,
    Auditoria,
    Usuarios,
    Tenants,
    Perfil,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Login => "Login",
            View::Dashboard => "Dashboard",
            View::Agenda => "Agenda",
            View::Prontuario => "Prontuário",
            View::Producao => "Produção",
            View::Auditoria => "Auditoria",
            View::Usuarios => "Usuários",
            View::Tenants => "Tenants",
            View::Perfil => "Perfil",
        }
    }

    /// The capability-table feature guarding this view. Login is ungated.
    pub fn feature(&self) -> Option<Feature> {
        match self {
            View::Login => None,
            View::Dashboard => Some(Feature::Dashboard),
            View::Agenda => Some(Feature::Agenda),
            View::Prontuario => Some(Feature::Prontuario),
            View::Producao => Some(Feature::Producao),
            View::Auditoria => Some(Feature::Auditoria),
            View::Usuarios => Some(Feature::Usuarios),
            View::Tenants => Some(Feature::Tenants),
            View::Perfil => Some(Feature::Perfil),
        }
    }

    pub fn for_feature(feature: Feature) -> View {
        match feature {
            Feature::Dashboard => View::Dashboard,
            Feature::Agenda => View::Agenda,
            Feature::Prontuario => View::Prontuario,
            Feature::Producao => View::Producao,
            Feature::Auditoria => View::Auditoria,
            Feature::Usuarios => View::Usuarios,
            Feature::Tenants => View::Tenants,
            Feature::Perfil => View::Perfil,
        }
    }

    /// True iff `session` may open this view.
    pub fn accessible(&self, session: Option<&Session>) -> bool {
        match self.feature() {
            None => session.is_none(),
            Some(feature) => feature.accessible(session),
        }
    }
}

/// The navigation tabs visible to `session`, derived from the capability
/// table in one place. An unauthenticated session only sees Login.
pub fn visible_views(session: Option<&Session>) -> Vec<View> {
    if session.is_none() {
        return vec![View::Login];
    }
    nexusclin_core::capability::visible_features(session)
        .into_iter()
        .map(View::for_feature)
        .collect()
}

/// The view after `current` in tab order, cycling within the visible set.
pub fn next_view(current: View, session: Option<&Session>) -> View {
    step(current, session, 1)
}

/// The view before `current` in tab order, cycling within the visible set.
pub fn previous_view(current: View, session: Option<&Session>) -> View {
    step(current, session, -1)
}

fn step(current: View, session: Option<&Session>, direction: isize) -> View {
    let views = visible_views(session);
    if views.is_empty() {
        return current;
    }
    let len = views.len() as isize;
    let index = views
        .iter()
        .position(|v| *v == current)
        .map(|i| i as isize)
        .unwrap_or(0);
    let next = (index + direction).rem_euclid(len) as usize;
    views[next]
}

pub fn view_at(index: usize, session: Option<&Session>) -> Option<View> {
    visible_views(session).get(index).copied()
}
