//! Profile view: session info and password change.

use crate::error::TuiError;
use crate::state::App;
use crate::widgets::DetailPanel;
use crossterm::event::{KeyCode, KeyEvent};
use nexusclin_core::ChangePasswordRequest;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut fields = Vec::new();
    if let Some(session) = app.current_session() {
        fields.push(("Tenant", format!("#{}", session.tenant_id)));
        fields.push((
            "Roles",
            session
                .roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ));
    }
    let detail = DetailPanel {
        title: "Sessão",
        fields,
        style: Style::default().fg(app.theme.primary),
    };
    detail.render(f, chunks[0]);

    let title = if app.perfil_view.submitting {
        "Alterar senha (enviando...)"
    } else {
        "Alterar senha"
    };
    app.perfil_view.form.render(
        f,
        chunks[1],
        title,
        Style::default().fg(app.theme.border_focus),
    );
}

pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match key.code {
        KeyCode::Enter => submit(app).await,
        _ => {
            app.perfil_view.form.input(key);
            Ok(())
        }
    }
}

async fn submit(app: &mut App) -> Result<(), TuiError> {
    if app.perfil_view.submitting {
        return Ok(());
    }
    let request = ChangePasswordRequest {
        senha_atual: app.perfil_view.form.value(0).to_string(),
        senha_nova: app.perfil_view.form.value(1).to_string(),
    };
    if request.senha_atual.is_empty() || request.senha_nova.is_empty() {
        app.toasts.warning("Preencha a senha atual e a nova");
        return Ok(());
    }

    app.perfil_view.submitting = true;
    let result = app.api.change_password(&request).await;
    app.perfil_view.submitting = false;

    match result {
        Ok(()) => {
            app.perfil_view = crate::state::PerfilViewState::new();
            app.toasts.success("Senha alterada");
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}
