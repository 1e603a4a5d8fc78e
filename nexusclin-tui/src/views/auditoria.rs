//! Audit and export workflow.
//!
//! Per-competency state machine: Pending -> Ok | Error. A clean audit
//! (zero procedure errors) unlocks the BPA and APAC export actions; any
//! edit to the competency re-arms the machine and disables them until the
//! audit re-validates.

use crate::error::TuiError;
use crate::state::{App, AuditStatus};
use crate::theme::{audit_status_color, export_status_color};
use crate::widgets::StatusIndicator;
use crossterm::event::{KeyCode, KeyEvent};
use nexusclin_client::cache::stale_time;
use nexusclin_client::mutations::{
    GenerateExportMutation, GenerateExportVars, RetryExportMutation, RetryExportVars,
};
use nexusclin_client::{FetchOptions, QueryKey};
use nexusclin_core::{Competencia, ExportKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.auditoria_view;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(columns[0]);

    // competency picker
    let picker_title = if view.editing_competencia {
        "Competência (AAAAMM) - digitando"
    } else {
        "Competência (AAAAMM) - 'e' edita"
    };
    let picker_style = if Competencia::is_valid(&view.competencia_input) {
        Style::default().fg(app.theme.text)
    } else {
        Style::default().fg(app.theme.error)
    };
    let picker = Paragraph::new(view.competencia_input.clone())
        .style(picker_style)
        .block(
            Block::default()
                .title(picker_title)
                .borders(Borders::ALL)
                .border_style(if view.editing_competencia {
                    Style::default().fg(app.theme.border_focus)
                } else {
                    Style::default().fg(app.theme.border)
                }),
        );
    f.render_widget(picker, left[0]);

    let status_label = if view.loading_audit {
        "auditando...".to_string()
    } else {
        match view.status {
            AuditStatus::Pending => "pendente".to_string(),
            AuditStatus::Ok => "ok - exportação liberada".to_string(),
            AuditStatus::Error => format!("{} procedimento(s) com erro", view.erros.len()),
        }
    };
    StatusIndicator {
        title: "Auditoria".to_string(),
        status: status_label,
        style: Style::default().fg(audit_status_color(view.status, &app.theme)),
    }
    .render(f, left[1]);

    let error_items: Vec<ListItem> = view
        .erros
        .iter()
        .flat_map(|erro| {
            let header = ListItem::new(format!("Procedimento #{}", erro.procedimento_id))
                .style(Style::default().fg(app.theme.error));
            let details = erro.erros.iter().map(|msg| {
                ListItem::new(format!("  - {}", msg))
                    .style(Style::default().fg(app.theme.text_dim))
            });
            std::iter::once(header).chain(details).collect::<Vec<_>>()
        })
        .collect();
    let errors = List::new(error_items).block(
        Block::default()
            .title("Erros da auditoria")
            .borders(Borders::ALL),
    );
    f.render_widget(errors, left[2]);

    // right: export actions, preview, previous exports
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(45),
            Constraint::Min(0),
        ])
        .split(columns[1]);

    let enabled = view.exports_enabled();
    let action_style = |active: bool| {
        if active {
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text_muted)
        }
    };
    let actions_label = match view.loading_export {
        Some(ExportKind::Bpa) => "Gerando BPA-I...".to_string(),
        Some(ExportKind::Apac) => "Gerando APAC...".to_string(),
        None => "[b] Gerar BPA-I   [a] Gerar APAC".to_string(),
    };
    let actions = Paragraph::new(actions_label)
        .style(action_style(enabled))
        .block(Block::default().title("Exportação").borders(Borders::ALL));
    f.render_widget(actions, right[0]);

    let preview_title = match &view.download_path {
        Some(path) => format!("Preview .rem (salvo em {})", path.display()),
        None => "Preview arquivo .rem (primeiras linhas)".to_string(),
    };
    let preview = Paragraph::new(view.preview.clone())
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(app.theme.text_dim))
        .block(Block::default().title(preview_title).borders(Borders::ALL));
    f.render_widget(preview, right[1]);

    let export_items: Vec<ListItem> = view
        .exports
        .iter()
        .map(|export| {
            let line = format!(
                "#{} {} ({})",
                export.id, export.competencia, export.status
            );
            ListItem::new(line)
                .style(Style::default().fg(export_status_color(&export.status, &app.theme)))
        })
        .collect();
    let mut state = ListState::default();
    if let Some(selected) = view.selected_export {
        if let Some(index) = view.exports.iter().position(|e| e.id == selected) {
            state.select(Some(index));
        }
    }
    let listing_title = format!(
        "Exportações {} ('t' alterna, 'y' reprocessa)",
        view.kind_tab.as_str().to_uppercase()
    );
    let listing = List::new(export_items)
        .block(Block::default().title(listing_title).borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary));
    f.render_stateful_widget(listing, right[2], &mut state);
}

pub fn start_editing(app: &mut App) {
    app.auditoria_view.editing_competencia = true;
}

/// Digit entry for the competency field. Commit (Enter) runs the audit.
pub async fn handle_competencia_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match key.code {
        KeyCode::Esc => {
            app.auditoria_view.editing_competencia = false;
        }
        KeyCode::Backspace => {
            let mut value = app.auditoria_view.competencia_input.clone();
            value.pop();
            app.auditoria_view.reset_for(&value);
        }
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let mut value = app.auditoria_view.competencia_input.clone();
            if value.chars().count() < 6 {
                value.push(c);
            }
            app.auditoria_view.reset_for(&value);
        }
        KeyCode::Enter => {
            app.auditoria_view.editing_competencia = false;
            run_audit(app, false).await?;
        }
        _ => {}
    }
    Ok(())
}

/// Run the audit for the entered competency. A malformed code never reaches
/// the network. `force` re-validates even when a cached result is fresh.
pub async fn run_audit(app: &mut App, force: bool) -> Result<(), TuiError> {
    let input = app.auditoria_view.competencia_input.clone();
    let Ok(competencia) = Competencia::parse(&input) else {
        app.toasts.warning("Competência deve ter exatamente 6 dígitos");
        return Ok(());
    };

    let key = QueryKey::audit(&competencia);
    if force {
        app.cache.invalidate(&key);
    }
    app.auditoria_view.loading_audit = true;
    let api = app.api.clone();
    let fetch_competencia = competencia.clone();
    let result = app
        .cache
        .fetch(
            key,
            FetchOptions::stale(stale_time::AUDIT),
            move || async move { api.audit_competencia(&fetch_competencia).await },
        )
        .await;
    app.auditoria_view.loading_audit = false;

    match result {
        Ok(Some(response)) => {
            app.auditoria_view.apply_audit(response.erros);
        }
        Ok(None) => {}
        Err(err) => {
            app.auditoria_view.audit_ran = true;
            app.auditoria_view.status = AuditStatus::Error;
            app.handle_api_error(&err);
        }
    }
    refresh_exports(app).await
}

/// Generate a billing file. The server answers with a URL and a truncated
/// preview; fetching the full content is best-effort - on failure the
/// truncated preview stays, silently.
pub async fn generate(app: &mut App, kind: ExportKind) -> Result<(), TuiError> {
    if !app.auditoria_view.exports_enabled() {
        app.toasts
            .warning("Exportação liberada apenas com auditoria ok");
        return Ok(());
    }
    let Ok(competencia) = Competencia::parse(&app.auditoria_view.competencia_input) else {
        return Ok(());
    };

    app.auditoria_view.loading_export = Some(kind);
    app.auditoria_view.preview.clear();
    let mutation = GenerateExportMutation::new(app.api.clone());
    let vars = GenerateExportVars {
        kind,
        competencia: competencia.clone(),
    };
    let result = app.cache.run(&mutation, vars).await;
    app.auditoria_view.loading_export = None;

    match result {
        Ok(file) => {
            let mut conteudo = file.preview.clone();
            match app.api.fetch_text(&file.url).await {
                Ok(full) => conteudo = full,
                Err(err) => {
                    tracing::debug!(%err, "full export fetch failed, keeping truncated preview");
                }
            }
            let file_name = format!("{}_{}.rem", kind.file_prefix(), competencia);
            let path = app.config.state_dir.join(file_name);
            match std::fs::write(&path, &conteudo) {
                Ok(()) => {
                    app.auditoria_view.download_path = Some(path);
                    app.toasts
                        .success(format!("{} gerado", kind.file_prefix()));
                }
                Err(err) => {
                    app.toasts
                        .error(format!("Falha ao salvar arquivo: {}", err));
                }
            }
            app.auditoria_view.preview = conteudo.chars().take(800).collect();
            app.cache
                .invalidate_prefix(&QueryKey::exports_prefix(kind));
            refresh_exports(app).await?;
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}

pub fn toggle_kind(app: &mut App) {
    app.auditoria_view.kind_tab = match app.auditoria_view.kind_tab {
        ExportKind::Bpa => ExportKind::Apac,
        ExportKind::Apac => ExportKind::Bpa,
    };
    app.auditoria_view.selected_export = None;
}

/// Explicit user-triggered retry of a failed export. Never automatic.
pub async fn retry_selected(app: &mut App) -> Result<(), TuiError> {
    let Some(id) = app.auditoria_view.selected_export else {
        app.toasts.warning("Selecione uma exportação");
        return Ok(());
    };
    let kind = app.auditoria_view.kind_tab;
    let mutation = RetryExportMutation::new(app.api.clone());
    match app.cache.run(&mutation, RetryExportVars { kind, id }).await {
        Ok(()) => {
            app.toasts.success("Reprocessamento solicitado");
            refresh_exports(app).await?;
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}

/// Reload the export listing for the active kind tab through the cache.
pub async fn refresh_exports(app: &mut App) -> Result<(), TuiError> {
    let kind = app.auditoria_view.kind_tab;
    let competencia = Competencia::parse(&app.auditoria_view.competencia_input).ok();
    let key = QueryKey::exports(kind, competencia.as_ref());
    let api = app.api.clone();
    let fetch_competencia = competencia.clone();
    let result = app
        .cache
        .fetch(
            key,
            FetchOptions::stale(stale_time::EXPORTS),
            move || async move {
                api.list_exports(kind, fetch_competencia.as_ref()).await
            },
        )
        .await;
    match result {
        Ok(Some(exports)) => app.auditoria_view.exports = exports,
        Ok(None) => {}
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}
