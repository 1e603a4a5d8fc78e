//! Application state and view state definitions.

use crate::config::TuiConfig;
use crate::nav::{self, View};
use crate::notifications::Toasts;
use crate::theme::Theme;
use crate::widgets::{FormField, FormState};
use chrono::NaiveDate;
use nexusclin_client::{ApiClient, ApiError, QueryCache, SessionStore};
use nexusclin_core::schedule::{
    self, parse_item_timestamp, slot_of, BUSINESS_HOURS, DAYS_PER_WEEK, HOURS_PER_DAY,
};
use nexusclin_core::{
    AgendaItem, Atendimento, AuditError, Dashboard, Evolucao, ExportItem, ExportKind, Session,
    Tenant, User,
};
use std::sync::Arc;
use std::time::Duration;

pub struct App {
    pub config: TuiConfig,
    pub theme: Theme,
    pub api: ApiClient,
    pub session: Arc<SessionStore>,
    pub cache: Arc<QueryCache>,
    pub active_view: View,
    pub toasts: Toasts,

    pub login_view: LoginViewState,
    pub dashboard_view: DashboardViewState,
    pub agenda_view: AgendaViewState,
    pub prontuario_view: ProntuarioViewState,
    pub producao_view: ProducaoViewState,
    pub auditoria_view: AuditoriaViewState,
    pub usuarios_view: UsuariosViewState,
    pub tenants_view: TenantsViewState,
    pub perfil_view: PerfilViewState,

    pub help_open: bool,
}

impl App {
    pub fn new(
        config: TuiConfig,
        api: ApiClient,
        session: Arc<SessionStore>,
        cache: Arc<QueryCache>,
    ) -> App {
        let toast_ttl = Duration::from_millis(config.toast_ttl_ms);
        let active_view = if session.is_authenticated() {
            View::Dashboard
        } else {
            View::Login
        };
        App {
            config,
            theme: Theme::slate(),
            api,
            session,
            cache,
            active_view,
            toasts: Toasts::new(toast_ttl),
            login_view: LoginViewState::new(),
            dashboard_view: DashboardViewState::default(),
            agenda_view: AgendaViewState::new(today()),
            prontuario_view: ProntuarioViewState::new(),
            producao_view: ProducaoViewState::default(),
            auditoria_view: AuditoriaViewState::new(),
            usuarios_view: UsuariosViewState::default(),
            tenants_view: TenantsViewState::default(),
            perfil_view: PerfilViewState::new(),
            help_open: false,
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.get()
    }

    /// Switch to `view` if the capability table allows it.
    pub fn activate(&mut self, view: View) {
        let session = self.current_session();
        if view.accessible(session.as_ref()) {
            self.active_view = view;
        }
    }

    /// Route an API failure: authorization errors end the session (lazy
    /// expiry discovery); everything else becomes an error toast.
    pub fn handle_api_error(&mut self, error: &ApiError) {
        if error.is_auth() {
            tracing::info!("authorization failure, discarding session");
            self.logout();
            self.toasts.error("Sessão expirada, entre novamente");
        } else {
            self.toasts.error(error.to_string());
        }
    }

    pub fn logout(&mut self) {
        self.session.clear();
        self.cache.clear();
        self.login_view = LoginViewState::new();
        self.active_view = View::Login;
    }

    /// True while the active view owns raw key input (forms, editors).
    pub fn in_text_input(&self) -> bool {
        match self.active_view {
            View::Login => true,
            View::Perfil => true,
            View::Usuarios => self.usuarios_view.form.is_some(),
            View::Tenants => self.tenants_view.form.is_some(),
            View::Prontuario => {
                self.prontuario_view.editor_open || self.prontuario_view.chat_open
            }
            View::Auditoria => self.auditoria_view.editing_competencia,
            _ => false,
        }
    }

    pub fn select_next(&mut self) {
        match self.active_view {
            View::Producao => select_adjacent(
                &self.producao_view.atendimentos,
                &mut self.producao_view.selected,
                |a| a.id,
                1,
            ),
            View::Prontuario => {
                select_adjacent(
                    &self.prontuario_view.atendimentos,
                    &mut self.prontuario_view.selected,
                    |a| a.id,
                    1,
                );
                self.prontuario_view.evolucoes.clear();
            }
            View::Usuarios => select_adjacent(
                &self.usuarios_view.users,
                &mut self.usuarios_view.selected,
                |u| u.id,
                1,
            ),
            View::Tenants => select_adjacent(
                &self.tenants_view.tenants,
                &mut self.tenants_view.selected,
                |t| t.id,
                1,
            ),
            View::Auditoria => select_adjacent(
                &self.auditoria_view.exports,
                &mut self.auditoria_view.selected_export,
                |e| e.id,
                1,
            ),
            View::Dashboard | View::Agenda | View::Login | View::Perfil => {}
        }
    }

    pub fn select_previous(&mut self) {
        match self.active_view {
            View::Producao => select_adjacent(
                &self.producao_view.atendimentos,
                &mut self.producao_view.selected,
                |a| a.id,
                -1,
            ),
            View::Prontuario => {
                select_adjacent(
                    &self.prontuario_view.atendimentos,
                    &mut self.prontuario_view.selected,
                    |a| a.id,
                    -1,
                );
                self.prontuario_view.evolucoes.clear();
            }
            View::Usuarios => select_adjacent(
                &self.usuarios_view.users,
                &mut self.usuarios_view.selected,
                |u| u.id,
                -1,
            ),
            View::Tenants => select_adjacent(
                &self.tenants_view.tenants,
                &mut self.tenants_view.selected,
                |t| t.id,
                -1,
            ),
            View::Auditoria => select_adjacent(
                &self.auditoria_view.exports,
                &mut self.auditoria_view.selected_export,
                |e| e.id,
                -1,
            ),
            View::Dashboard | View::Agenda | View::Login | View::Perfil => {}
        }
    }

    pub fn next_view(&mut self) {
        let session = self.current_session();
        self.active_view = nav::next_view(self.active_view, session.as_ref());
    }

    pub fn previous_view(&mut self) {
        let session = self.current_session();
        self.active_view = nav::previous_view(self.active_view, session.as_ref());
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn select_adjacent<T>(
    items: &[T],
    selected: &mut Option<i64>,
    id_of: impl Fn(&T) -> i64,
    step: isize,
) {
    if items.is_empty() {
        *selected = None;
        return;
    }
    let len = items.len() as isize;
    let index = selected
        .and_then(|id| items.iter().position(|item| id_of(item) == id))
        .map(|i| i as isize);
    let next = match index {
        Some(i) => (i + step).rem_euclid(len) as usize,
        None => 0,
    };
    *selected = Some(id_of(&items[next]));
}

// ============================================================================
// LOGIN & PROFILE
// ============================================================================

pub struct LoginViewState {
    pub form: FormState,
    pub submitting: bool,
}

impl LoginViewState {
    pub fn new() -> LoginViewState {
        LoginViewState {
            form: FormState::new(vec![
                FormField::new("Email"),
                FormField::secret("Senha"),
                FormField::new("Tenant"),
                FormField::new("Código MFA (opcional)"),
            ]),
            submitting: false,
        }
    }

    pub fn email(&self) -> &str {
        self.form.value(0)
    }

    pub fn senha(&self) -> &str {
        self.form.value(1)
    }

    pub fn tenant_id(&self) -> Option<i64> {
        self.form.value(2).trim().parse().ok()
    }

    pub fn mfa_code(&self) -> Option<String> {
        let value = self.form.value(3).trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

pub struct PerfilViewState {
    pub form: FormState,
    pub submitting: bool,
}

impl PerfilViewState {
    pub fn new() -> PerfilViewState {
        PerfilViewState {
            form: FormState::new(vec![
                FormField::secret("Senha atual"),
                FormField::secret("Senha nova"),
            ]),
            submitting: false,
        }
    }
}

// ============================================================================
// DASHBOARD & PRODUCAO
// ============================================================================

#[derive(Default)]
pub struct DashboardViewState {
    pub data: Option<Dashboard>,
}

#[derive(Default)]
pub struct ProducaoViewState {
    pub atendimentos: Vec<Atendimento>,
    pub selected: Option<i64>,
}

// ============================================================================
// AGENDA
// ============================================================================

/// Reschedule state machine. The mutation is the only transition that can
/// fail; failure lands back in `Idle` with the cache rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Idle,
    Picked { id: i64 },
    Committing { id: i64 },
}

pub struct AgendaViewState {
    pub items: Vec<AgendaItem>,
    pub week_start: NaiveDate,
    /// Cursor cell: (day column 0..7, hour row 0..10).
    pub cursor_day: usize,
    pub cursor_row: usize,
    pub move_state: MoveState,
}

impl AgendaViewState {
    pub fn new(today: NaiveDate) -> AgendaViewState {
        AgendaViewState {
            items: Vec::new(),
            week_start: schedule::start_of_week(today),
            cursor_day: 0,
            cursor_row: 0,
            move_state: MoveState::Idle,
        }
    }

    pub fn days(&self) -> [NaiveDate; DAYS_PER_WEEK] {
        schedule::week_days(self.week_start)
    }

    pub fn hour_at(row: usize) -> u32 {
        *BUSINESS_HOURS.start() + row as u32
    }

    pub fn cursor_cell(&self) -> (NaiveDate, u32) {
        (
            self.days()[self.cursor_day],
            Self::hour_at(self.cursor_row),
        )
    }

    /// Items whose wall-clock timestamp falls into the given cell.
    pub fn items_in_cell(&self, day: NaiveDate, hour: u32) -> Vec<&AgendaItem> {
        self.items
            .iter()
            .filter(|item| {
                parse_item_timestamp(&item.data)
                    .map(|ts| slot_of(ts) == (day, hour))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn move_cursor(&mut self, d_day: isize, d_row: isize) {
        let days = DAYS_PER_WEEK as isize;
        let rows = HOURS_PER_DAY as isize;
        self.cursor_day = (self.cursor_day as isize + d_day).rem_euclid(days) as usize;
        self.cursor_row = (self.cursor_row as isize + d_row).rem_euclid(rows) as usize;
    }

    /// Pick up the first item under the cursor.
    pub fn pick(&mut self) {
        if self.move_state != MoveState::Idle {
            return;
        }
        let (day, hour) = self.cursor_cell();
        if let Some(item) = self.items_in_cell(day, hour).first() {
            self.move_state = MoveState::Picked { id: item.id };
        }
    }

    pub fn cancel_pick(&mut self) {
        if matches!(self.move_state, MoveState::Picked { .. }) {
            self.move_state = MoveState::Idle;
        }
    }
}

// ============================================================================
// PRONTUARIO
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub from_user: bool,
    pub text: String,
}

pub struct ProntuarioViewState {
    pub atendimentos: Vec<Atendimento>,
    pub selected: Option<i64>,
    pub evolucoes: Vec<Evolucao>,
    pub editor_open: bool,
    /// Multiline structured-text buffer for a new evolução.
    pub editor: String,
    pub chat_open: bool,
    pub chat_input: String,
    pub chat_log: Vec<ChatMessage>,
    pub chat_waiting: bool,
}

impl ProntuarioViewState {
    pub fn new() -> ProntuarioViewState {
        ProntuarioViewState {
            atendimentos: Vec::new(),
            selected: None,
            evolucoes: Vec::new(),
            editor_open: false,
            editor: String::new(),
            chat_open: false,
            chat_input: String::new(),
            chat_log: Vec::new(),
            chat_waiting: false,
        }
    }

    pub fn selected_atendimento(&self) -> Option<&Atendimento> {
        self.selected
            .and_then(|id| self.atendimentos.iter().find(|a| a.id == id))
    }
}

// ============================================================================
// AUDITORIA
// ============================================================================

/// Per-competency audit state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Pending,
    Ok,
    Error,
}

pub struct AuditoriaViewState {
    pub competencia_input: String,
    pub editing_competencia: bool,
    pub status: AuditStatus,
    pub erros: Vec<AuditError>,
    pub audit_ran: bool,
    pub loading_audit: bool,
    pub loading_export: Option<ExportKind>,
    /// Preview of the last generated file (truncated by the server, or the
    /// full content when the follow-up fetch succeeded).
    pub preview: String,
    pub download_path: Option<std::path::PathBuf>,
    pub kind_tab: ExportKind,
    pub exports: Vec<ExportItem>,
    pub selected_export: Option<i64>,
}

impl AuditoriaViewState {
    pub fn new() -> AuditoriaViewState {
        AuditoriaViewState {
            competencia_input: String::new(),
            editing_competencia: false,
            status: AuditStatus::Pending,
            erros: Vec::new(),
            audit_ran: false,
            loading_audit: false,
            loading_export: None,
            preview: String::new(),
            download_path: None,
            kind_tab: ExportKind::Bpa,
            exports: Vec::new(),
            selected_export: None,
        }
    }

    /// Export actions are enabled only after a clean audit.
    pub fn exports_enabled(&self) -> bool {
        self.status == AuditStatus::Ok
            && self.loading_export.is_none()
            && !self.loading_audit
    }

    /// Entering a new competency resets the machine to Pending, disabling
    /// exports until re-validated.
    pub fn reset_for(&mut self, competencia: &str) {
        self.competencia_input = competencia.to_string();
        self.status = AuditStatus::Pending;
        self.erros.clear();
        self.audit_ran = false;
        self.preview.clear();
        self.download_path = None;
    }

    pub fn apply_audit(&mut self, erros: Vec<AuditError>) {
        self.audit_ran = true;
        self.status = if erros.is_empty() {
            AuditStatus::Ok
        } else {
            AuditStatus::Error
        };
        self.erros = erros;
    }
}

// ============================================================================
// ADMIN VIEWS
// ============================================================================

pub struct UserFormState {
    /// `None` while creating, the user's id while editing.
    pub id: Option<i64>,
    pub form: FormState,
    pub ativo: bool,
}

impl UserFormState {
    pub fn create() -> UserFormState {
        UserFormState {
            id: None,
            form: FormState::new(vec![
                FormField::new("Email"),
                FormField::new("Nome"),
                FormField::secret("Senha"),
                FormField::new("Roles (vírgula)"),
            ]),
            ativo: true,
        }
    }

    pub fn edit(user: &User) -> UserFormState {
        UserFormState {
            id: Some(user.id),
            form: FormState::new(vec![
                FormField::with_value("Email", user.email.clone()),
                FormField::with_value("Nome", user.nome.clone()),
                FormField::secret("Senha"),
                FormField::with_value("Roles (vírgula)", user.roles.join(",")),
            ]),
            ativo: user.ativo,
        }
    }

    pub fn roles(&self) -> Vec<String> {
        self.form
            .value(3)
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Default)]
pub struct UsuariosViewState {
    pub users: Vec<User>,
    pub selected: Option<i64>,
    pub form: Option<UserFormState>,
    /// Armed by the first delete press; a second press on the same user
    /// confirms.
    pub pending_delete: Option<i64>,
}

impl UsuariosViewState {
    pub fn selected_user(&self) -> Option<&User> {
        self.selected
            .and_then(|id| self.users.iter().find(|u| u.id == id))
    }
}

pub struct TenantFormState {
    pub id: Option<i64>,
    pub form: FormState,
}

impl TenantFormState {
    pub fn create() -> TenantFormState {
        TenantFormState {
            id: None,
            form: FormState::new(vec![FormField::new("Nome"), FormField::new("CNPJ")]),
        }
    }

    pub fn edit(tenant: &Tenant) -> TenantFormState {
        TenantFormState {
            id: Some(tenant.id),
            form: FormState::new(vec![
                FormField::with_value("Nome", tenant.name.clone()),
                FormField::with_value("CNPJ", tenant.cnpj.clone().unwrap_or_default()),
            ]),
        }
    }
}

#[derive(Default)]
pub struct TenantsViewState {
    pub tenants: Vec<Tenant>,
    pub selected: Option<i64>,
    pub form: Option<TenantFormState>,
}

impl TenantsViewState {
    pub fn selected_tenant(&self) -> Option<&Tenant> {
        self.selected
            .and_then(|id| self.tenants.iter().find(|t| t.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, data: &str) -> AgendaItem {
        AgendaItem {
            id,
            data: data.to_string(),
            tipo: None,
            status: None,
            profissional_id: None,
            paciente_id: None,
        }
    }

    #[test]
    fn agenda_cursor_wraps_the_grid() {
        let mut view = AgendaViewState::new(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
        assert_eq!(view.cursor_cell().1, 8);
        view.move_cursor(0, -1);
        assert_eq!(view.cursor_row, HOURS_PER_DAY - 1);
        assert_eq!(view.cursor_cell().1, 17);
        view.move_cursor(-1, 0);
        assert_eq!(view.cursor_day, DAYS_PER_WEEK - 1);
    }

    #[test]
    fn items_bucket_into_their_cells() {
        // 2025-01-08 is a Wednesday
        let mut view = AgendaViewState::new(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
        view.items = vec![
            item(1, "2025-01-08T10:15:00"),
            item(2, "2025-01-08T10:45:00"),
            item(3, "2025-01-09T11:00:00"),
            item(4, "2025-01-20T10:00:00"), // next week, not rendered
        ];
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let in_cell = view.items_in_cell(wednesday, 10);
        let ids: Vec<i64> = in_cell.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(view
            .items_in_cell(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(), 10)
            .iter()
            .any(|i| i.id == 4));
    }

    #[test]
    fn pick_requires_an_item_under_the_cursor() {
        let mut view = AgendaViewState::new(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
        view.items = vec![item(42, "2025-01-08T10:00:00")];
        // cursor starts at Monday 08:00, empty cell
        view.pick();
        assert_eq!(view.move_state, MoveState::Idle);

        // Wednesday is column 2, 10:00 is row 2
        view.cursor_day = 2;
        view.cursor_row = 2;
        view.pick();
        assert_eq!(view.move_state, MoveState::Picked { id: 42 });

        view.cancel_pick();
        assert_eq!(view.move_state, MoveState::Idle);
    }

    #[test]
    fn audit_machine_transitions() {
        let mut view = AuditoriaViewState::new();
        assert_eq!(view.status, AuditStatus::Pending);
        assert!(!view.exports_enabled());

        view.apply_audit(Vec::new());
        assert_eq!(view.status, AuditStatus::Ok);
        assert!(view.exports_enabled());

        view.apply_audit(vec![AuditError {
            procedimento_id: 9,
            erros: vec!["CBO inválido".to_string()],
        }]);
        assert_eq!(view.status, AuditStatus::Error);
        assert!(!view.exports_enabled());

        // editing the competency re-arms the machine
        view.reset_for("202502");
        assert_eq!(view.status, AuditStatus::Pending);
        assert!(!view.exports_enabled());
        assert!(view.erros.is_empty());
    }

    #[test]
    fn selection_cycles_through_ids() {
        let mut selected = None;
        let items = vec![item(1, "x"), item(2, "x"), item(3, "x")];
        select_adjacent(&items, &mut selected, |i| i.id, 1);
        assert_eq!(selected, Some(1));
        select_adjacent(&items, &mut selected, |i| i.id, 1);
        assert_eq!(selected, Some(2));
        select_adjacent(&items, &mut selected, |i| i.id, -1);
        assert_eq!(selected, Some(1));
        select_adjacent(&items, &mut selected, |i| i.id, -1);
        assert_eq!(selected, Some(3));
    }

    #[test]
    fn user_form_splits_roles() {
        let form = UserFormState {
            id: None,
            form: FormState::new(vec![
                FormField::new("Email"),
                FormField::new("Nome"),
                FormField::secret("Senha"),
                FormField::with_value("Roles (vírgula)", "CLINICO, RECEPCAO,,"),
            ]),
            ativo: true,
        };
        assert_eq!(form.roles(), vec!["CLINICO", "RECEPCAO"]);
    }
}
