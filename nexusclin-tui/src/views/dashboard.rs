//! Dashboard: aggregate counters and recent exports.

use crate::state::App;
use crate::theme::export_status_color;
use crate::widgets::DetailPanel;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let mut fields = Vec::new();
    if let Some(data) = &app.dashboard_view.data {
        fields.push(("Competência", data.competencia.clone()));
        fields.push(("Atendimentos", data.total_atendimentos.to_string()));
        fields.push(("Pacientes", data.total_pacientes.to_string()));
        fields.push(("Procedimentos", data.total_procedimentos.to_string()));
        fields.push((
            "Procedimentos com erro",
            data.total_procedimentos_com_erro.to_string(),
        ));
    }
    let detail = DetailPanel {
        title: "Resumo da competência",
        fields,
        style: Style::default().fg(app.theme.primary),
    };
    detail.render(f, chunks[0]);

    let items: Vec<ListItem> = app
        .dashboard_view
        .data
        .as_ref()
        .map(|d| d.ultimas_exportacoes.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|export| {
            let line = format!(
                "#{} {} {} ({})",
                export.id,
                export.tipo.to_uppercase(),
                export.competencia,
                export.status
            );
            ListItem::new(line)
                .style(Style::default().fg(export_status_color(&export.status, &app.theme)))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .title("Últimas exportações")
            .borders(Borders::ALL),
    );
    f.render_widget(list, chunks[1]);
}
