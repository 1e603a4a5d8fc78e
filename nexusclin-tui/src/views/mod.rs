//! View rendering dispatch.

pub mod agenda;
pub mod auditoria;
pub mod dashboard;
pub mod login;
pub mod perfil;
pub mod producao;
pub mod prontuario;
pub mod tenants;
pub mod usuarios;

use crate::nav::{self, View};
use crate::state::App;
use crate::theme::toast_color;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);

    match app.active_view {
        View::Login => login::render(f, app, layout[1]),
        View::Dashboard => dashboard::render(f, app, layout[1]),
        View::Agenda => agenda::render(f, app, layout[1]),
        View::Prontuario => prontuario::render(f, app, layout[1]),
        View::Producao => producao::render(f, app, layout[1]),
        View::Auditoria => auditoria::render(f, app, layout[1]),
        View::Usuarios => usuarios::render(f, app, layout[1]),
        View::Tenants => tenants::render(f, app, layout[1]),
        View::Perfil => perfil::render(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);

    if app.help_open {
        render_help(f, app);
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let session = app.current_session();
    let mut spans: Vec<Span> = vec![Span::styled(
        "NEXUSCLIN",
        Style::default()
            .fg(app.theme.primary)
            .add_modifier(Modifier::BOLD),
    )];
    for (i, view) in nav::visible_views(session.as_ref()).iter().enumerate() {
        spans.push(Span::raw("  "));
        let label = format!("{}:{}", (i + 1) % 10, view.title());
        let style = if *view == app.active_view {
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(app.theme.text_dim)
        };
        spans.push(Span::styled(label, style));
    }

    let right = match &session {
        Some(session) => format!(
            "Tenant #{} | {}",
            session.tenant_id,
            session
                .roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => "não autenticado".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(Span::styled(right, Style::default().fg(app.theme.text_dim)));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (text, style) = if let Some(toast) = app.toasts.latest() {
        (
            toast.message.clone(),
            Style::default().fg(toast_color(&toast.kind, &app.theme)),
        )
    } else {
        (
            footer_help(app.active_view).to_string(),
            Style::default().fg(app.theme.text_dim),
        )
    };
    let footer = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .style(style);
    f.render_widget(footer, area);
}

fn footer_help(view: View) -> &'static str {
    match view {
        View::Login => "Tab campos • Enter entrar • Ctrl+C sair",
        View::Agenda => {
            "setas mover • espaço pegar • Enter soltar • Esc cancelar • Ctrl+R atualizar"
        }
        View::Auditoria => {
            "e competência • Enter auditar • b BPA • a APAC • t tipo • y reprocessar"
        }
        View::Prontuario => "j/k atendimento • n evolução • c assistente • Ctrl+R atualizar",
        View::Usuarios => "j/k mover • n novo • e editar • p reset senha • d remover",
        View::Tenants => "j/k mover • n novo • e editar • Ctrl+R atualizar",
        View::Perfil => "Tab campos • Enter alterar senha • Ctrl+L sair da sessão",
        _ => "Tab trocar vista • Ctrl+R atualizar • Ctrl+L logout • ? ajuda • q sair",
    }
}

fn render_help(f: &mut Frame<'_>, app: &App) {
    let area = centered_rect(60, 50, f.size());
    let lines = vec![
        Line::from("Tab / Shift+Tab   trocar de vista"),
        Line::from("1-9               ir para a vista"),
        Line::from("h/j/k/l ou setas  mover"),
        Line::from("espaço            pegar item (agenda)"),
        Line::from("Enter             confirmar / soltar"),
        Line::from("Esc               cancelar"),
        Line::from("Ctrl+R            atualizar dados"),
        Line::from("Ctrl+L            encerrar sessão"),
        Line::from("q                 sair"),
    ];
    let widget = Paragraph::new(lines).block(
        Block::default()
            .title("Atalhos")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border_focus)),
    );
    f.render_widget(Clear, area);
    f.render_widget(widget, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
