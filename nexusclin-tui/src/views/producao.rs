//! Produção: read-only atendimentos listing for billing follow-up.

use crate::state::App;
use crate::widgets::DetailPanel;
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
        .producao_view
        .atendimentos
        .iter()
        .map(|atendimento| {
            let line = format!(
                "#{} {} {}",
                atendimento.id,
                atendimento.data,
                atendimento.tipo.as_deref().unwrap_or("-")
            );
            ListItem::new(line)
        })
        .collect();

    let mut state = ListState::default();
    if let Some(selected) = app.producao_view.selected {
        if let Some(index) = app
            .producao_view
            .atendimentos
            .iter()
            .position(|a| a.id == selected)
        {
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
    f.render_stateful_widget(list, chunks[0], &mut state);

    let mut fields = Vec::new();
    if let Some(selected) = app.producao_view.selected {
        if let Some(atendimento) = app
            .producao_view
            .atendimentos
            .iter()
            .find(|a| a.id == selected)
        {
            fields.push(("Atendimento", atendimento.id.to_string()));
            fields.push(("Data", atendimento.data.clone()));
            if let Some(paciente) = atendimento.paciente_id {
                fields.push(("Paciente", format!("#{}", paciente)));
            }
            if let Some(profissional) = atendimento.profissional_id {
                fields.push(("Profissional", format!("#{}", profissional)));
            }
            if let Some(status) = &atendimento.status {
                fields.push(("Status", status.clone()));
            }
        }
    }
    let detail = DetailPanel {
        title: "Detalhes",
        fields,
        style: Style::default().fg(app.theme.secondary),
    };
    detail.render(f, chunks[1]);
}
