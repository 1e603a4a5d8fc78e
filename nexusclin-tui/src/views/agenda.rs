//! Weekly agenda board with keyboard pick-up/drop rescheduling.
//!
//! The grid is fixed: business hours 08:00-17:00 by the seven days of the
//! displayed week. Rescheduling is an explicit state machine
//! (idle -> picked -> committing -> idle); the server mutation is the only
//! transition that can fail, and failure rolls the board back to the
//! original cell.

use crate::error::TuiError;
use crate::state::{AgendaViewState, App, MoveState};
use crate::theme::agenda_status_color;
use nexusclin_client::mutations::{UpdateAgendaMutation, UpdateAgendaVars};
use nexusclin_client::QueryKey;
use nexusclin_core::schedule::{self, DAYS_PER_WEEK, HOURS_PER_DAY};
use nexusclin_core::{AgendaItem, UpdateAgendaRequest};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.agenda_view;
    let days = view.days();

    let header_cells: Vec<Cell> = std::iter::once(Cell::from("Hora"))
        .chain(days.iter().map(|day| {
            Cell::from(format!("{}", day.format("%a %d/%m")))
                .style(Style::default().fg(app.theme.text_dim))
        }))
        .collect();
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(app.theme.primary)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = (0..HOURS_PER_DAY)
        .map(|row| {
            let hour = AgendaViewState::hour_at(row);
            let mut cells: Vec<Cell> = vec![Cell::from(format!("{:02}:00", hour))
                .style(Style::default().fg(app.theme.text_dim))];
            for (day_idx, day) in days.iter().enumerate() {
                let items = view.items_in_cell(*day, hour);
                let is_cursor = view.cursor_day == day_idx && view.cursor_row == row;
                cells.push(cell_for(app, &items, is_cursor));
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(6)];
    widths.extend(std::iter::repeat(Constraint::Min(12)).take(DAYS_PER_WEEK));

    let title = match view.move_state {
        MoveState::Idle => "Agenda semanal".to_string(),
        MoveState::Picked { id } => format!("Agenda semanal | movendo #{}", id),
        MoveState::Committing { id } => format!("Agenda semanal | salvando #{}...", id),
    };
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(table, area);
}

fn cell_for<'a>(app: &App, items: &[&AgendaItem], is_cursor: bool) -> Cell<'a> {
    let base = if is_cursor {
        Style::default().bg(app.theme.bg_highlight)
    } else {
        Style::default()
    };

    let line = match items.split_first() {
        None => {
            // empty cell: drop-target affordance
            Line::from(Span::styled("·", Style::default().fg(app.theme.text_muted)))
        }
        Some((first, rest)) => {
            let picked = matches!(
                app.agenda_view.move_state,
                MoveState::Picked { id } | MoveState::Committing { id } if id == first.id
            );
            let mut style =
                Style::default().fg(agenda_status_color(first.status, &app.theme));
            if picked {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let mut label = format!("#{} {}", first.id, first.tipo.as_deref().unwrap_or(""));
            if !rest.is_empty() {
                label.push_str(&format!(" +{}", rest.len()));
            }
            Line::from(Span::styled(label, style))
        }
    };
    Cell::from(line).style(base)
}

/// Drop the picked item on the cursor cell: optimistic move, server
/// confirmation, rollback on failure.
pub async fn drop_on_cursor(app: &mut App) -> Result<(), TuiError> {
    let MoveState::Picked { id } = app.agenda_view.move_state else {
        return Ok(());
    };
    let (day, hour) = app.agenda_view.cursor_cell();
    let Some(slot) = schedule::slot_timestamp(day, hour) else {
        return Ok(());
    };

    app.agenda_view.move_state = MoveState::Committing { id };
    let mutation = UpdateAgendaMutation::new(app.api.clone());
    let vars = UpdateAgendaVars {
        id,
        request: UpdateAgendaRequest {
            data: Some(schedule::format_slot(slot)),
            status: None,
        },
    };
    let result = app.cache.run(&mutation, vars).await;
    app.agenda_view.move_state = MoveState::Idle;

    match result {
        Ok(_) => {
            app.toasts.success("Agendamento atualizado");
        }
        Err(err) => {
            app.handle_api_error(&err);
        }
    }
    // The cache holds the truth either way: the optimistic move on success,
    // the restored pre-image on failure.
    if let Some(items) = app.cache.peek::<Vec<AgendaItem>>(&QueryKey::agendas()) {
        app.agenda_view.items = items;
    }
    Ok(())
}
