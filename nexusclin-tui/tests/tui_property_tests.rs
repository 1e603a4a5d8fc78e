use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use nexusclin_core::schedule::{format_slot, slot_timestamp, start_of_week};
use nexusclin_core::{Competencia, Role, Session};
use nexusclin_tui::config::{ThemeConfig, TuiConfig};
use nexusclin_tui::keys::{map_key, Action};
use nexusclin_tui::nav::{self, View};
use nexusclin_tui::state::{AgendaViewState, AuditStatus, AuditoriaViewState};
use proptest::prelude::*;

fn base_config() -> TuiConfig {
    TuiConfig {
        api_base_url: "http://localhost:8000".to_string(),
        request_timeout_ms: 5_000,
        refresh_interval_ms: 2_000,
        toast_ttl_ms: 5_000,
        state_dir: "tmp/nexusclin".into(),
        log_path: "tmp/nexusclin/tui.log".into(),
        theme: ThemeConfig {
            name: "slate".to_string(),
        },
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

#[test]
fn config_requires_theme_name() {
    let mut config = base_config();
    config.theme = ThemeConfig {
        name: "unknown".to_string(),
    };
    assert!(config.validate().is_err());
    assert!(base_config().validate().is_ok());
}

#[test]
fn config_rejects_zero_intervals() {
    let mut config = base_config();
    config.refresh_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = base_config();
    config.request_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = base_config();
    config.toast_ttl_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn unauthenticated_nav_is_pinned_to_login() {
    assert_eq!(nav::visible_views(None), vec![View::Login]);
    assert_eq!(nav::next_view(View::Login, None), View::Login);
    assert_eq!(nav::previous_view(View::Login, None), View::Login);
}

#[test]
fn clinico_nav_matches_the_capability_table() {
    let session = Session::from_wire("tok", &["CLINICO".to_string()], 7);
    let visible = nav::visible_views(Some(&session));
    assert_eq!(
        visible,
        vec![View::Dashboard, View::Prontuario, View::Perfil]
    );
    // cycling stays inside the visible set
    assert_eq!(
        nav::next_view(View::Dashboard, Some(&session)),
        View::Prontuario
    );
    assert_eq!(
        nav::previous_view(View::Dashboard, Some(&session)),
        View::Perfil
    );
}

#[test]
fn super_admin_reaches_tenants() {
    let session = Session::from_wire("tok", &["SUPER_ADMIN".to_string()], 1);
    assert!(nav::visible_views(Some(&session)).contains(&View::Tenants));
    let session = Session::from_wire("tok", &["ADMIN_TENANT".to_string()], 1);
    assert!(!nav::visible_views(Some(&session)).contains(&View::Tenants));
}

#[test]
fn wednesday_ten_oclock_drop_builds_the_expected_timestamp() {
    // week of 2025-01-06 (Monday); Wednesday is column 2, 10:00 is row 2
    let mut view = AgendaViewState::new(chrono::NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
    view.cursor_day = 2;
    view.cursor_row = 2;
    let (day, hour) = view.cursor_cell();
    let slot = slot_timestamp(day, hour).unwrap();
    assert_eq!(format_slot(slot), "2025-01-08T10:00:00");
}

#[test]
fn audit_ok_enables_exports_and_error_disables_them() {
    let mut view = AuditoriaViewState::new();
    view.reset_for("202501");
    view.apply_audit(Vec::new());
    assert_eq!(view.status, AuditStatus::Ok);
    assert!(view.exports_enabled());

    view.apply_audit(vec![nexusclin_core::AuditError {
        procedimento_id: 1,
        erros: vec!["sem CBO".to_string()],
    }]);
    assert_eq!(view.status, AuditStatus::Error);
    assert!(!view.exports_enabled());
}

proptest! {
    #[test]
    fn keybinding_digit_switches_view(digit in 0u8..=9u8) {
        let ch = char::from(b'0' + digit);
        let action = map_key(key(KeyCode::Char(ch)));
        let expected_index = if ch == '0' { 9 } else { (digit - 1) as usize };
        prop_assert!(matches!(action, Some(Action::SwitchView(i)) if i == expected_index));
    }

    #[test]
    fn competencia_accepts_exactly_six_digits(value in "[0-9-]{0,8}") {
        let expected = value.len() == 6 && value.chars().all(|c| c.is_ascii_digit());
        prop_assert_eq!(Competencia::is_valid(&value), expected);
    }

    #[test]
    fn visible_views_respect_the_capability_table(mask in 0u8..64) {
        let all_roles = [
            Role::SuperAdmin,
            Role::AdminTenant,
            Role::Recepcao,
            Role::Clinico,
            Role::Faturamento,
            Role::AuditorInterno,
        ];
        let roles: Vec<Role> = all_roles
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, r)| *r)
            .collect();
        let session = Session::new("tok", roles, 1);
        let visible = nav::visible_views(Some(&session));

        // any authenticated session sees Dashboard and Perfil, never Login
        prop_assert!(visible.contains(&View::Dashboard));
        prop_assert!(visible.contains(&View::Perfil));
        prop_assert!(!visible.contains(&View::Login));
        // every visible view is individually accessible
        for view in &visible {
            prop_assert!(view.accessible(Some(&session)));
        }
        // Tenants is SUPER_ADMIN only
        prop_assert_eq!(
            visible.contains(&View::Tenants),
            session.roles.contains(&Role::SuperAdmin)
        );
    }

    #[test]
    fn cursor_cell_always_lies_in_the_displayed_week(
        days in 0isize..40,
        rows in -40isize..40,
        offset in 0i64..10_000,
    ) {
        let today = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
            + chrono::Duration::days(offset);
        let mut view = AgendaViewState::new(today);
        view.move_cursor(days, rows);
        let (day, hour) = view.cursor_cell();
        prop_assert!((8..=17).contains(&hour));
        let start = start_of_week(today);
        prop_assert!(day >= start);
        prop_assert!(day < start + chrono::Duration::days(7));
    }
}
