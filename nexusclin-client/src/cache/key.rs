//! Cache keys: resource kind plus qualifiers.

use nexusclin_core::{Competencia, ExportKind};
use std::fmt;

/// Server resource families the cache addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Tenants,
    Users,
    Agendas,
    Atendimentos,
    Evolucoes,
    Audit,
    Exports,
    Dashboard,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tenants => "tenants",
            ResourceKind::Users => "users",
            ResourceKind::Agendas => "agendas",
            ResourceKind::Atendimentos => "atendimentos",
            ResourceKind::Evolucoes => "evolucoes",
            ResourceKind::Audit => "audit",
            ResourceKind::Exports => "exports",
            ResourceKind::Dashboard => "dashboard",
        }
    }
}

/// Address of one cache entry: a resource kind plus ordered qualifiers,
/// e.g. `(exports, "bpa", "202501")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: ResourceKind,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new<I, S>(kind: ResourceKind, params: I) -> QueryKey
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryKey {
            kind,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Prefix match used by prefix invalidation: same kind, and `self`'s
    /// qualifiers lead `other`'s.
    pub fn is_prefix_of(&self, other: &QueryKey) -> bool {
        self.kind == other.kind && other.params.starts_with(&self.params)
    }

    pub fn tenants() -> QueryKey {
        QueryKey::new(ResourceKind::Tenants, Vec::<String>::new())
    }

    pub fn users() -> QueryKey {
        QueryKey::new(ResourceKind::Users, Vec::<String>::new())
    }

    pub fn agendas() -> QueryKey {
        QueryKey::new(ResourceKind::Agendas, Vec::<String>::new())
    }

    pub fn atendimentos() -> QueryKey {
        QueryKey::new(ResourceKind::Atendimentos, Vec::<String>::new())
    }

    pub fn evolucoes(atendimento_id: Option<i64>) -> QueryKey {
        let params: Vec<String> = atendimento_id.map(|id| id.to_string()).into_iter().collect();
        QueryKey::new(ResourceKind::Evolucoes, params)
    }

    pub fn audit(competencia: &Competencia) -> QueryKey {
        QueryKey::new(ResourceKind::Audit, [competencia.as_str()])
    }

    pub fn exports(kind: ExportKind, competencia: Option<&Competencia>) -> QueryKey {
        let mut params = vec![kind.as_str().to_string()];
        if let Some(c) = competencia {
            params.push(c.as_str().to_string());
        }
        QueryKey::new(ResourceKind::Exports, params)
    }

    /// Prefix key covering every exports entry for `kind`, regardless of
    /// competency.
    pub fn exports_prefix(kind: ExportKind) -> QueryKey {
        QueryKey::new(ResourceKind::Exports, [kind.as_str()])
    }

    pub fn dashboard() -> QueryKey {
        QueryKey::new(ResourceKind::Dashboard, Vec::<String>::new())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        for param in &self.params {
            write!(f, "/{}", param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_within_the_same_kind() {
        let prefix = QueryKey::exports_prefix(ExportKind::Bpa);
        let full = QueryKey::exports(
            ExportKind::Bpa,
            Some(&Competencia::parse("202501").unwrap()),
        );
        assert!(prefix.is_prefix_of(&full));
        assert!(prefix.is_prefix_of(&prefix));
        assert!(!full.is_prefix_of(&prefix));
    }

    #[test]
    fn prefix_never_crosses_kinds() {
        let exports = QueryKey::exports_prefix(ExportKind::Bpa);
        let audit = QueryKey::audit(&Competencia::parse("202501").unwrap());
        assert!(!exports.is_prefix_of(&audit));
    }

    #[test]
    fn display_joins_kind_and_params() {
        let key = QueryKey::exports(
            ExportKind::Apac,
            Some(&Competencia::parse("202502").unwrap()),
        );
        assert_eq!(key.to_string(), "exports/apac/202502");
    }
}
