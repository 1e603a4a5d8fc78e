//! User administration view.

use crate::error::TuiError;
use crate::state::{App, UserFormState};
use crate::widgets::DetailPanel;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nexusclin_client::mutations::{
    CreateUserMutation, DeleteUserMutation, ResetPasswordVars, ResetUserPasswordMutation,
    UpdateUserMutation, UpdateUserVars,
};
use nexusclin_core::{CreateUserRequest, ResetPasswordRequest, UpdateUserRequest};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let items: Vec<ListItem> = app
        .usuarios_view
        .users
        .iter()
        .map(|user| {
            let flag = if user.ativo { "" } else { " [inativo]" };
            let line = format!("#{} {} <{}>{}", user.id, user.nome, user.email, flag);
            let style = if user.ativo {
                Style::default()
            } else {
                Style::default().fg(app.theme.text_muted)
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let mut state = ListState::default();
    if let Some(selected) = app.usuarios_view.selected {
        if let Some(index) = app
            .usuarios_view
            .users
            .iter()
            .position(|u| u.id == selected)
        {
            state.select(Some(index));
        }
    }

    let list = List::new(items)
        .block(Block::default().title("Usuários").borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary));
    f.render_stateful_widget(list, chunks[0], &mut state);

    if let Some(form) = &app.usuarios_view.form {
        let title = if form.id.is_some() {
            if form.ativo {
                "Editar usuário (ativo, Ctrl+T alterna)"
            } else {
                "Editar usuário (inativo, Ctrl+T alterna)"
            }
        } else {
            "Novo usuário"
        };
        form.form.render(
            f,
            chunks[1],
            title,
            Style::default().fg(app.theme.border_focus),
        );
    } else {
        let mut fields = Vec::new();
        if let Some(user) = app.usuarios_view.selected_user() {
            fields.push(("Usuário", format!("#{}", user.id)));
            fields.push(("Nome", user.nome.clone()));
            fields.push(("Email", user.email.clone()));
            fields.push(("Roles", user.roles.join(", ")));
            fields.push(("Ativo", if user.ativo { "sim" } else { "não" }.to_string()));
            fields.push((
                "Troca de senha pendente",
                if user.must_change_password {
                    "sim"
                } else {
                    "não"
                }
                .to_string(),
            ));
        }
        let detail = DetailPanel {
            title: "Detalhes",
            fields,
            style: Style::default().fg(app.theme.secondary),
        };
        detail.render(f, chunks[1]);
    }
}

pub fn open_create(app: &mut App) {
    app.usuarios_view.form = Some(UserFormState::create());
}

pub fn open_edit(app: &mut App) {
    if let Some(user) = app.usuarios_view.selected_user() {
        app.usuarios_view.form = Some(UserFormState::edit(user));
    }
}

pub async fn handle_form_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
        if let Some(form) = app.usuarios_view.form.as_mut() {
            form.ativo = !form.ativo;
        }
        return Ok(());
    }
    match key.code {
        KeyCode::Esc => {
            app.usuarios_view.form = None;
            Ok(())
        }
        KeyCode::Enter => submit_form(app).await,
        _ => {
            if let Some(form) = app.usuarios_view.form.as_mut() {
                form.form.input(key);
            }
            Ok(())
        }
    }
}

async fn submit_form(app: &mut App) -> Result<(), TuiError> {
    let Some(form) = app.usuarios_view.form.take() else {
        return Ok(());
    };
    let email = form.form.value(0).trim().to_string();
    let nome = form.form.value(1).trim().to_string();
    if email.is_empty() || nome.is_empty() {
        app.toasts.warning("Email e nome são obrigatórios");
        app.usuarios_view.form = Some(form);
        return Ok(());
    }

    let result = match form.id {
        Some(id) => {
            let mutation = UpdateUserMutation::new(app.api.clone());
            let vars = UpdateUserVars {
                id,
                request: UpdateUserRequest {
                    email: Some(email),
                    nome: Some(nome),
                    roles: Some(form.roles()),
                    ativo: Some(form.ativo),
                },
            };
            app.cache.run(&mutation, vars).await
        }
        None => {
            let senha = form.form.value(2).to_string();
            if senha.is_empty() {
                app.toasts.warning("Senha é obrigatória para novo usuário");
                app.usuarios_view.form = Some(form);
                return Ok(());
            }
            let Some(session) = app.current_session() else {
                return Ok(());
            };
            let mutation = CreateUserMutation::new(app.api.clone());
            let request = CreateUserRequest {
                email,
                nome,
                senha,
                roles: form.roles(),
                tenant_id: session.tenant_id,
            };
            app.cache.run(&mutation, request).await
        }
    };

    match result {
        Ok(user) => {
            app.toasts.success(format!("Usuário {} salvo", user.email));
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}

/// Two-step delete: the first press arms, the second press on the same
/// user confirms.
pub async fn delete_selected(app: &mut App) -> Result<(), TuiError> {
    let Some(id) = app.usuarios_view.selected else {
        app.toasts.warning("Selecione um usuário");
        return Ok(());
    };
    if app.usuarios_view.pending_delete != Some(id) {
        app.usuarios_view.pending_delete = Some(id);
        app.toasts
            .warning("Pressione 'd' novamente para remover o usuário");
        return Ok(());
    }
    app.usuarios_view.pending_delete = None;

    let mutation = DeleteUserMutation::new(app.api.clone());
    match app.cache.run(&mutation, id).await {
        Ok(()) => {
            app.toasts.success("Usuário removido");
            app.usuarios_view.users.retain(|u| u.id != id);
            app.usuarios_view.selected = None;
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}

/// Reset the selected user's password to a server-generated one.
pub async fn reset_password(app: &mut App) -> Result<(), TuiError> {
    let Some(id) = app.usuarios_view.selected else {
        app.toasts.warning("Selecione um usuário");
        return Ok(());
    };
    let mutation = ResetUserPasswordMutation::new(app.api.clone());
    let vars = ResetPasswordVars {
        id,
        request: ResetPasswordRequest::default(),
    };
    match app.cache.run(&mutation, vars).await {
        Ok(()) => {
            app.toasts.success("Senha redefinida");
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}
