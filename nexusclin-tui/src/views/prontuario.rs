//! Clinical record: atendimentos, evoluções, and the assistant chat panel.

use crate::error::TuiError;
use crate::state::{App, ChatMessage};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nexusclin_client::cache::stale_time;
use nexusclin_client::mutations::CreateEvolucaoMutation;
use nexusclin_client::{FetchOptions, QueryKey};
use nexusclin_core::{AssistantRequest, CreateEvolucaoRequest};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.prontuario_view;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(area);

    // atendimentos list
    let items: Vec<ListItem> = view
        .atendimentos
        .iter()
        .map(|atendimento| {
            ListItem::new(format!(
                "#{} {} {}",
                atendimento.id,
                atendimento.data,
                atendimento.tipo.as_deref().unwrap_or("")
            ))
        })
        .collect();
    let mut state = ListState::default();
    if let Some(selected) = view.selected {
        if let Some(index) = view.atendimentos.iter().position(|a| a.id == selected) {
            state.select(Some(index));
        }
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title("Atendimentos")
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().fg(app.theme.primary));
    f.render_stateful_widget(list, columns[0], &mut state);

    // evoluções + editor
    if view.editor_open {
        let editor = Paragraph::new(format!("{}█", view.editor))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Nova evolução (Ctrl+S salva, Esc cancela)")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border_focus)),
            );
        f.render_widget(editor, columns[1]);
    } else {
        let evolucao_items: Vec<ListItem> = view
            .evolucoes
            .iter()
            .map(|evolucao| {
                let when = evolucao.criado_em.as_deref().unwrap_or("-");
                let text = evolucao.texto_estruturado.as_deref().unwrap_or("");
                let first_line = text.lines().next().unwrap_or("");
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("#{} {}", evolucao.id, when),
                        Style::default().fg(app.theme.text_dim),
                    )),
                    Line::from(Span::raw(first_line.to_string())),
                ])
            })
            .collect();
        let evolucoes = List::new(evolucao_items).block(
            Block::default()
                .title("Evoluções ('n' nova)")
                .borders(Borders::ALL),
        );
        f.render_widget(evolucoes, columns[1]);
    }

    // assistant chat panel
    let chat_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(columns[2]);

    let mut chat_lines: Vec<Line> = Vec::new();
    for message in &view.chat_log {
        let (label, color) = if message.from_user {
            ("você", app.theme.primary)
        } else {
            ("assistente", app.theme.secondary)
        };
        chat_lines.push(Line::from(Span::styled(
            format!("{}:", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for line in message.text.lines() {
            chat_lines.push(Line::from(Span::raw(format!("  {}", line))));
        }
    }
    if view.chat_waiting {
        chat_lines.push(Line::from(Span::styled(
            "assistente está digitando...",
            Style::default().fg(app.theme.text_muted),
        )));
    }
    let chat = Paragraph::new(chat_lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title("Assistente clínico ('c' abre)")
            .borders(Borders::ALL),
    );
    f.render_widget(chat, chat_chunks[0]);

    let input_style = if view.chat_open {
        Style::default().fg(app.theme.border_focus)
    } else {
        Style::default().fg(app.theme.border)
    };
    let chat_input = Paragraph::new(view.chat_input.clone()).block(
        Block::default()
            .title("Mensagem (Enter envia)")
            .borders(Borders::ALL)
            .border_style(input_style),
    );
    f.render_widget(chat_input, chat_chunks[1]);
}

pub fn open_editor(app: &mut App) {
    if app.prontuario_view.selected.is_none() {
        app.toasts.warning("Selecione um atendimento");
        return;
    }
    app.prontuario_view.editor_open = true;
    app.prontuario_view.editor.clear();
}

pub fn open_chat(app: &mut App) {
    app.prontuario_view.chat_open = true;
}

pub async fn handle_text_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    if app.prontuario_view.editor_open {
        handle_editor_input(app, key).await
    } else if app.prontuario_view.chat_open {
        handle_chat_input(app, key).await
    } else {
        Ok(())
    }
}

async fn handle_editor_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
        return save_evolucao(app).await;
    }
    match key.code {
        KeyCode::Esc => {
            app.prontuario_view.editor_open = false;
        }
        KeyCode::Enter => app.prontuario_view.editor.push('\n'),
        KeyCode::Backspace => {
            app.prontuario_view.editor.pop();
        }
        KeyCode::Char(c) => app.prontuario_view.editor.push(c),
        _ => {}
    }
    Ok(())
}

async fn save_evolucao(app: &mut App) -> Result<(), TuiError> {
    let texto = app.prontuario_view.editor.trim().to_string();
    if texto.is_empty() {
        app.toasts.warning("Evolução vazia");
        return Ok(());
    }
    let Some(atendimento_id) = app.prontuario_view.selected else {
        return Ok(());
    };
    let Some(session) = app.current_session() else {
        return Ok(());
    };

    let mutation = CreateEvolucaoMutation::new(app.api.clone());
    let request = CreateEvolucaoRequest {
        tenant_id: session.tenant_id,
        atendimento_id,
        texto_estruturado: texto,
        assinado: false,
        assinatura_meta: None,
    };
    match app.cache.run(&mutation, request).await {
        Ok(_) => {
            app.prontuario_view.editor_open = false;
            app.prontuario_view.editor.clear();
            app.toasts.success("Evolução registrada");
            refresh_evolucoes(app).await?;
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}

async fn handle_chat_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match key.code {
        KeyCode::Esc => {
            app.prontuario_view.chat_open = false;
        }
        KeyCode::Enter => return send_chat_message(app).await,
        KeyCode::Backspace => {
            app.prontuario_view.chat_input.pop();
        }
        KeyCode::Char(c) => app.prontuario_view.chat_input.push(c),
        _ => {}
    }
    Ok(())
}

/// Send the typed message to the clinical assistant with the selected
/// atendimento as context.
async fn send_chat_message(app: &mut App) -> Result<(), TuiError> {
    let mensagem = app.prontuario_view.chat_input.trim().to_string();
    if mensagem.is_empty() {
        return Ok(());
    }
    app.prontuario_view.chat_input.clear();
    app.prontuario_view.chat_log.push(ChatMessage {
        from_user: true,
        text: mensagem.clone(),
    });

    let atendimento = app.prontuario_view.selected_atendimento();
    let request = AssistantRequest {
        mensagem,
        paciente_id: atendimento.and_then(|a| a.paciente_id),
        atendimento_id: atendimento.map(|a| a.id),
    };

    app.prontuario_view.chat_waiting = true;
    let result = app.api.assistant_message(&request).await;
    app.prontuario_view.chat_waiting = false;

    match result {
        Ok(reply) => {
            app.prontuario_view.chat_log.push(ChatMessage {
                from_user: false,
                text: reply.resposta,
            });
        }
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}

/// Reload the evoluções of the selected atendimento through the cache.
pub async fn refresh_evolucoes(app: &mut App) -> Result<(), TuiError> {
    let Some(atendimento_id) = app.prontuario_view.selected else {
        app.prontuario_view.evolucoes.clear();
        return Ok(());
    };
    let api = app.api.clone();
    let result = app
        .cache
        .fetch(
            QueryKey::evolucoes(Some(atendimento_id)),
            FetchOptions::stale(stale_time::EVOLUCOES),
            move || async move { api.list_evolucoes(Some(atendimento_id)).await },
        )
        .await;
    match result {
        Ok(Some(evolucoes)) => app.prontuario_view.evolucoes = evolucoes,
        Ok(None) => {}
        Err(err) => app.handle_api_error(&err),
    }
    Ok(())
}
