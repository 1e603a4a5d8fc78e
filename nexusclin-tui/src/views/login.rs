//! Login view.

use crate::error::TuiError;
use crate::nav::View;
use crate::state::App;
use crossterm::event::{KeyCode, KeyEvent};
use nexusclin_core::{LoginRequest, Session};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .split(area);

    let hint = if app.login_view.submitting {
        "Entrando..."
    } else {
        "Informe as credenciais e o tenant para entrar."
    };
    f.render_widget(
        Paragraph::new(hint).style(Style::default().fg(app.theme.text_dim)),
        chunks[0],
    );

    app.login_view.form.render(
        f,
        chunks[1],
        "Login",
        Style::default().fg(app.theme.border_focus),
    );

    f.render_widget(
        Block::default()
            .borders(Borders::NONE)
            .style(Style::default().fg(app.theme.text_muted)),
        chunks[2],
    );
}

pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match key.code {
        KeyCode::Enter => submit(app).await,
        _ => {
            app.login_view.form.input(key);
            Ok(())
        }
    }
}

async fn submit(app: &mut App) -> Result<(), TuiError> {
    if app.login_view.submitting {
        return Ok(());
    }
    let Some(tenant_id) = app.login_view.tenant_id() else {
        app.toasts.warning("Tenant deve ser numérico");
        return Ok(());
    };
    let request = LoginRequest {
        email: app.login_view.email().trim().to_string(),
        password: app.login_view.senha().to_string(),
        tenant_id,
        mfa_code: app.login_view.mfa_code(),
    };
    if request.email.is_empty() || request.password.is_empty() {
        app.toasts.warning("Email e senha são obrigatórios");
        return Ok(());
    }

    app.login_view.submitting = true;
    let result = app.api.login(&request).await;
    app.login_view.submitting = false;

    match result {
        Ok(response) => {
            let session = Session::from_wire(
                response.access_token.clone(),
                &response.roles,
                response.tenant_id,
            );
            app.session.set(session);
            app.toasts.success("Login efetuado");
            app.active_view = if response.must_change_password {
                app.toasts.warning("Troque a senha antes de continuar");
                View::Perfil
            } else {
                View::Dashboard
            };
        }
        Err(err) => {
            app.toasts.error(err.to_string());
        }
    }
    Ok(())
}
