//! Tenant management view.

use crate::error::TuiError;
use crate::state::{App, TenantFormState};
use crate::widgets::DetailPanel;
use crossterm::event::{KeyCode, KeyEvent};
use nexusclin_client::mutations::{
    CreateTenantMutation, UpdateTenantMutation, UpdateTenantVars,
};
use nexusclin_core::{CreateTenantRequest, UpdateTenantRequest};
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
        .tenants_view
        .tenants
        .iter()
        .map(|tenant| {
            let line = format!(
                "#{} {} ({})",
                tenant.id,
                tenant.name,
                tenant.cnpj.as_deref().unwrap_or("sem CNPJ")
            );
            ListItem::new(line)
        })
        .collect();

    let mut state = ListState::default();
    if let Some(selected) = app.tenants_view.selected {
        if let Some(index) = app
            .tenants_view
            .tenants
            .iter()
            .position(|t| t.id == selected)
        {
            state.select(Some(index));
        }
    }

    let list = List::new(items)
        .block(Block::default().title("Tenants").borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary));
    f.render_stateful_widget(list, chunks[0], &mut state);

    if let Some(form) = &app.tenants_view.form {
        let title = if form.id.is_some() {
            "Editar tenant"
        } else {
            "Novo tenant"
        };
        form.form.render(
            f,
            chunks[1],
            title,
            Style::default().fg(app.theme.border_focus),
        );
    } else {
        let mut fields = Vec::new();
        if let Some(tenant) = app.tenants_view.selected_tenant() {
            fields.push(("Tenant", format!("#{}", tenant.id)));
            fields.push(("Nome", tenant.name.clone()));
            fields.push(("CNPJ", tenant.cnpj.clone().unwrap_or_default()));
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
    app.tenants_view.form = Some(TenantFormState::create());
}

pub fn open_edit(app: &mut App) {
    if let Some(tenant) = app.tenants_view.selected_tenant() {
        app.tenants_view.form = Some(TenantFormState::edit(tenant));
    }
}

pub async fn handle_form_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match key.code {
        KeyCode::Esc => {
            app.tenants_view.form = None;
            Ok(())
        }
        KeyCode::Enter => submit_form(app).await,
        _ => {
            if let Some(form) = app.tenants_view.form.as_mut() {
                form.form.input(key);
            }
            Ok(())
        }
    }
}

async fn submit_form(app: &mut App) -> Result<(), TuiError> {
    let Some(form) = app.tenants_view.form.take() else {
        return Ok(());
    };
    let name = form.form.value(0).trim().to_string();
    if name.is_empty() {
        app.toasts.warning("Nome é obrigatório");
        app.tenants_view.form = Some(form);
        return Ok(());
    }
    let cnpj = {
        let value = form.form.value(1).trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    };

    let result = match form.id {
        Some(id) => {
            let mutation = UpdateTenantMutation::new(app.api.clone());
            let vars = UpdateTenantVars {
                id,
                request: UpdateTenantRequest {
                    name: Some(name),
                    cnpj,
                },
            };
            app.cache.run(&mutation, vars).await
        }
        None => {
            let mutation = CreateTenantMutation::new(app.api.clone());
            app.cache
                .run(&mutation, CreateTenantRequest { name, cnpj })
                .await
        }
    };

    match result {
        Ok(tenant) => {
            app.toasts.success(format!("Tenant {} salvo", tenant.name));
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}
