//! Concrete mutations, one per write operation of the API.
//!
//! Each mutation owns an [`ApiClient`] handle and declares its cache side
//! effects: the agenda reschedule patches optimistically and rolls back on
//! failure; the admin mutations invalidate their listing so the next read
//! re-fetches authoritative data.

use crate::api_client::ApiClient;
use crate::cache::{CacheSnapshot, Mutation, QueryCache, QueryKey};
use crate::error::ApiError;
use async_trait::async_trait;
use nexusclin_core::{
    AgendaItem, Competencia, CreateEvolucaoRequest, CreateTenantRequest, CreateUserRequest,
    Evolucao, ExportFile, ExportKind, ResetPasswordRequest, Tenant, UpdateAgendaRequest,
    UpdateTenantRequest, UpdateUserRequest, User,
};

// ============================================================================
// AGENDA
// ============================================================================

pub struct UpdateAgendaVars {
    pub id: i64,
    pub request: UpdateAgendaRequest,
}

/// Reschedule (or otherwise update) an appointment, optimistically moving it
/// in the cached agenda listing.
pub struct UpdateAgendaMutation {
    api: ApiClient,
}

impl UpdateAgendaMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for UpdateAgendaMutation {
    type Vars = UpdateAgendaVars;
    type Output = AgendaItem;

    async fn execute(&self, vars: &UpdateAgendaVars) -> Result<AgendaItem, ApiError> {
        self.api.update_agenda(vars.id, &vars.request).await
    }

    fn on_mutate(&self, cache: &QueryCache, vars: &UpdateAgendaVars) -> Option<CacheSnapshot> {
        let key = QueryKey::agendas();
        let snapshot = cache.snapshot(std::slice::from_ref(&key));
        cache.modify::<Vec<AgendaItem>, _>(&key, |items| {
            for item in items.iter_mut().filter(|item| item.id == vars.id) {
                if let Some(data) = &vars.request.data {
                    item.data = data.clone();
                }
                if let Some(status) = vars.request.status {
                    item.status = Some(status);
                }
            }
        });
        Some(snapshot)
    }

    fn on_success(&self, cache: &QueryCache, _output: &AgendaItem, _vars: &UpdateAgendaVars) {
        cache.invalidate(&QueryKey::agendas());
    }
}

// ============================================================================
// USERS
// ============================================================================

pub struct CreateUserMutation {
    api: ApiClient,
}

impl CreateUserMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for CreateUserMutation {
    type Vars = CreateUserRequest;
    type Output = User;

    async fn execute(&self, vars: &CreateUserRequest) -> Result<User, ApiError> {
        self.api.create_user(vars).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &User, _vars: &CreateUserRequest) {
        cache.invalidate(&QueryKey::users());
    }
}

pub struct UpdateUserVars {
    pub id: i64,
    pub request: UpdateUserRequest,
}

pub struct UpdateUserMutation {
    api: ApiClient,
}

impl UpdateUserMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for UpdateUserMutation {
    type Vars = UpdateUserVars;
    type Output = User;

    async fn execute(&self, vars: &UpdateUserVars) -> Result<User, ApiError> {
        self.api.update_user(vars.id, &vars.request).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &User, _vars: &UpdateUserVars) {
        cache.invalidate(&QueryKey::users());
    }
}

pub struct DeleteUserMutation {
    api: ApiClient,
}

impl DeleteUserMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for DeleteUserMutation {
    type Vars = i64;
    type Output = ();

    async fn execute(&self, id: &i64) -> Result<(), ApiError> {
        self.api.delete_user(*id).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &(), _id: &i64) {
        cache.invalidate(&QueryKey::users());
    }
}

pub struct ResetPasswordVars {
    pub id: i64,
    pub request: ResetPasswordRequest,
}

pub struct ResetUserPasswordMutation {
    api: ApiClient,
}

impl ResetUserPasswordMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for ResetUserPasswordMutation {
    type Vars = ResetPasswordVars;
    type Output = ();

    async fn execute(&self, vars: &ResetPasswordVars) -> Result<(), ApiError> {
        self.api.reset_user_password(vars.id, &vars.request).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &(), _vars: &ResetPasswordVars) {
        cache.invalidate(&QueryKey::users());
    }
}

// ============================================================================
// TENANTS
// ============================================================================

pub struct CreateTenantMutation {
    api: ApiClient,
}

impl CreateTenantMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for CreateTenantMutation {
    type Vars = CreateTenantRequest;
    type Output = Tenant;

    async fn execute(&self, vars: &CreateTenantRequest) -> Result<Tenant, ApiError> {
        self.api.create_tenant(vars).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &Tenant, _vars: &CreateTenantRequest) {
        cache.invalidate(&QueryKey::tenants());
    }
}

pub struct UpdateTenantVars {
    pub id: i64,
    pub request: UpdateTenantRequest,
}

pub struct UpdateTenantMutation {
    api: ApiClient,
}

impl UpdateTenantMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for UpdateTenantMutation {
    type Vars = UpdateTenantVars;
    type Output = Tenant;

    async fn execute(&self, vars: &UpdateTenantVars) -> Result<Tenant, ApiError> {
        self.api.update_tenant(vars.id, &vars.request).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &Tenant, _vars: &UpdateTenantVars) {
        cache.invalidate(&QueryKey::tenants());
    }
}

// ============================================================================
// CLINICAL RECORD
// ============================================================================

pub struct CreateEvolucaoMutation {
    api: ApiClient,
}

impl CreateEvolucaoMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for CreateEvolucaoMutation {
    type Vars = CreateEvolucaoRequest;
    type Output = Evolucao;

    async fn execute(&self, vars: &CreateEvolucaoRequest) -> Result<Evolucao, ApiError> {
        self.api.create_evolucao(vars).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &Evolucao, vars: &CreateEvolucaoRequest) {
        cache.invalidate(&QueryKey::evolucoes(None));
        cache.invalidate(&QueryKey::evolucoes(Some(vars.atendimento_id)));
    }
}

// ============================================================================
// EXPORTS
// ============================================================================

pub struct GenerateExportVars {
    pub kind: ExportKind,
    pub competencia: Competencia,
}

/// Generate a billing file. No cache side effects: the result is handed
/// straight to the caller.
pub struct GenerateExportMutation {
    api: ApiClient,
}

impl GenerateExportMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for GenerateExportMutation {
    type Vars = GenerateExportVars;
    type Output = ExportFile;

    async fn execute(&self, vars: &GenerateExportVars) -> Result<ExportFile, ApiError> {
        self.api.generate_export(vars.kind, &vars.competencia).await
    }
}

pub struct RetryExportVars {
    pub kind: ExportKind,
    pub id: i64,
}

pub struct RetryExportMutation {
    api: ApiClient,
}

impl RetryExportMutation {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutation for RetryExportMutation {
    type Vars = RetryExportVars;
    type Output = ();

    async fn execute(&self, vars: &RetryExportVars) -> Result<(), ApiError> {
        self.api.retry_export(vars.kind, vars.id).await
    }

    fn on_success(&self, cache: &QueryCache, _output: &(), vars: &RetryExportVars) {
        cache.invalidate_prefix(&QueryKey::exports_prefix(vars.kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::SessionStore;
    use nexusclin_core::ExportItem;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn offline_api() -> ApiClient {
        // never actually called in these tests: only the cache hooks run
        ApiClient::new(
            "http://localhost:0",
            Duration::from_millis(100),
            Arc::new(SessionStore::in_memory()),
        )
        .unwrap()
    }

    fn item(id: i64, data: &str) -> AgendaItem {
        AgendaItem {
            id,
            data: data.to_string(),
            tipo: Some("consulta".to_string()),
            status: None,
            profissional_id: Some(1),
            paciente_id: None,
        }
    }

    #[test]
    fn agenda_move_patches_only_the_dragged_item() {
        let cache = QueryCache::new();
        let key = QueryKey::agendas();
        cache.set(
            &key,
            &vec![item(42, "2025-01-06T09:00:00"), item(7, "2025-01-07T11:00:00")],
        );

        let mutation = UpdateAgendaMutation::new(offline_api());
        let vars = UpdateAgendaVars {
            id: 42,
            request: UpdateAgendaRequest {
                data: Some("2025-01-08T10:00:00".to_string()),
                status: None,
            },
        };
        let snapshot = mutation.on_mutate(&cache, &vars);
        assert!(snapshot.is_some());

        let items: Vec<AgendaItem> = cache.peek(&key).unwrap();
        assert_eq!(items[0].data, "2025-01-08T10:00:00");
        assert_eq!(items[1].data, "2025-01-07T11:00:00");
    }

    #[test]
    fn agenda_move_rolls_back_to_the_original_cell() {
        let cache = QueryCache::new();
        let key = QueryKey::agendas();
        cache.set(&key, &vec![item(42, "2025-01-06T09:00:00")]);
        let before: Value = cache.peek(&key).unwrap();

        let mutation = UpdateAgendaMutation::new(offline_api());
        let vars = UpdateAgendaVars {
            id: 42,
            request: UpdateAgendaRequest {
                data: Some("2025-01-08T10:00:00".to_string()),
                status: None,
            },
        };
        let snapshot = mutation.on_mutate(&cache, &vars);
        let error = ApiError::Api {
            status: 500,
            message: "conflito".to_string(),
            data: None,
        };
        mutation.on_error(&cache, &error, &vars, snapshot);

        let after: Value = cache.peek(&key).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn retry_invalidates_every_competencia_of_the_kind() {
        let cache = QueryCache::new();
        let jan = Competencia::parse("202501").unwrap();
        let feb = Competencia::parse("202502").unwrap();
        let jan_key = QueryKey::exports(ExportKind::Bpa, Some(&jan));
        let feb_key = QueryKey::exports(ExportKind::Bpa, Some(&feb));
        let apac_key = QueryKey::exports(ExportKind::Apac, Some(&jan));
        cache.set(&jan_key, &Vec::<ExportItem>::new());
        cache.set(&feb_key, &Vec::<ExportItem>::new());
        cache.set(&apac_key, &Vec::<ExportItem>::new());

        let mutation = RetryExportMutation::new(offline_api());
        mutation.on_success(
            &cache,
            &(),
            &RetryExportVars {
                kind: ExportKind::Bpa,
                id: 1,
            },
        );

        use crate::cache::EntryStatus;
        assert_eq!(cache.status(&jan_key), Some(EntryStatus::Stale));
        assert_eq!(cache.status(&feb_key), Some(EntryStatus::Stale));
        assert_eq!(cache.status(&apac_key), Some(EntryStatus::Fresh));
    }
}
