//! NexusClin TUI entry point.

use crossterm::{
    event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nexusclin_client::cache::stale_time;
use nexusclin_client::{ApiClient, FetchOptions, QueryCache, QueryKey, SessionStore};
use nexusclin_core::ExportKind;
use nexusclin_tui::config::TuiConfig;
use nexusclin_tui::error::TuiError;
use nexusclin_tui::events::TuiEvent;
use nexusclin_tui::keys::{map_key, Action};
use nexusclin_tui::nav::{self, View};
use nexusclin_tui::persistence::{self, PersistedState};
use nexusclin_tui::state::App;
use nexusclin_tui::logging;
use nexusclin_tui::views::{
    agenda, auditoria, login, perfil, prontuario, render_view, tenants, usuarios,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), TuiError> {
    let config = TuiConfig::load()?;
    logging::init(&config.log_path)?;

    let session = Arc::new(SessionStore::open(&config.state_dir));
    let cache = Arc::new(QueryCache::new());
    let api = ApiClient::new(
        &config.api_base_url,
        Duration::from_millis(config.request_timeout_ms),
        Arc::clone(&session),
    )?;
    let persistence_path = config.state_dir.join("ui-state.json");

    let mut app = App::new(config, api, session, cache);
    if let Ok(Some(state)) = persistence::load(&persistence_path) {
        if let Some(competencia) = &state.competencia {
            app.auditoria_view.reset_for(competencia);
        }
        app.activate(state.active_view);
    }

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard {};

    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);
    spawn_input_reader(event_tx.clone());

    if app.session.is_authenticated() {
        if let Err(err) = refresh_view(&mut app).await {
            app.toasts
                .error(format!("Falha na carga inicial: {}", err));
        }
    }

    let tick_rate = Duration::from_millis(app.config.refresh_interval_ms);
    let mut ticker = tokio::time::interval(tick_rate);

    loop {
        terminal.draw(|f| render_view(f, &app))?;

        tokio::select! {
            _ = ticker.tick() => {
                app.toasts.prune_expired();
            }
            Some(event) = event_rx.recv() => {
                if handle_event(&mut app, event).await? {
                    break;
                }
            }
        }
    }

    let persisted = PersistedState {
        active_view: app.active_view,
        competencia: if app.auditoria_view.competencia_input.is_empty() {
            None
        } else {
            Some(app.auditoria_view.competencia_input.clone())
        },
    };
    let _ = persistence::save(&persistence_path, &persisted);

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(evt) = event::read() {
                match evt {
                    CrosstermEvent::Key(key) => {
                        let _ = sender.blocking_send(TuiEvent::Input(key));
                    }
                    CrosstermEvent::Resize(width, height) => {
                        let _ = sender.blocking_send(TuiEvent::Resize { width, height });
                    }
                    _ => {}
                }
            }
        }
    });
}

async fn handle_event(app: &mut App, event: TuiEvent) -> Result<bool, TuiError> {
    match event {
        TuiEvent::Input(key) => {
            if key.kind == KeyEventKind::Release {
                return Ok(false);
            }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                return Ok(true);
            }
            if app.help_open {
                app.help_open = false;
                return Ok(false);
            }
            if app.in_text_input() {
                handle_text_input(app, key).await?;
                return Ok(false);
            }
            match map_key(key) {
                Some(action) => return handle_action(app, action).await,
                None => handle_view_key(app, key).await?,
            }
        }
        TuiEvent::Resize { .. } | TuiEvent::Tick => {}
    }
    Ok(false)
}

/// Route raw keys to whichever form or editor currently owns the input.
async fn handle_text_input(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match app.active_view {
        View::Login => {
            login::handle_input(app, key).await?;
            // a successful login lands on a data view; load it right away
            if app.session.is_authenticated() {
                refresh_view(app).await?;
            }
            Ok(())
        }
        View::Perfil => {
            // Tab keeps switching views; fields cycle with Up/Down.
            match key.code {
                KeyCode::Tab => {
                    app.next_view();
                    refresh_view(app).await
                }
                KeyCode::BackTab => {
                    app.previous_view();
                    refresh_view(app).await
                }
                _ => perfil::handle_input(app, key).await,
            }
        }
        View::Usuarios => usuarios::handle_form_input(app, key).await,
        View::Tenants => tenants::handle_form_input(app, key).await,
        View::Prontuario => prontuario::handle_text_input(app, key).await,
        View::Auditoria => auditoria::handle_competencia_input(app, key).await,
        _ => Ok(()),
    }
}

async fn handle_action(app: &mut App, action: Action) -> Result<bool, TuiError> {
    match action {
        Action::Quit => return Ok(true),
        Action::NextView => {
            app.next_view();
            refresh_view(app).await?;
        }
        Action::PrevView => {
            app.previous_view();
            refresh_view(app).await?;
        }
        Action::SwitchView(index) => {
            let session = app.current_session();
            if let Some(view) = nav::view_at(index, session.as_ref()) {
                app.activate(view);
                refresh_view(app).await?;
            }
        }
        Action::MoveUp => {
            if app.active_view == View::Agenda {
                app.agenda_view.move_cursor(0, -1);
            } else {
                app.select_previous();
                if app.active_view == View::Prontuario {
                    prontuario::refresh_evolucoes(app).await?;
                }
            }
        }
        Action::MoveDown => {
            if app.active_view == View::Agenda {
                app.agenda_view.move_cursor(0, 1);
            } else {
                app.select_next();
                if app.active_view == View::Prontuario {
                    prontuario::refresh_evolucoes(app).await?;
                }
            }
        }
        Action::MoveLeft => {
            if app.active_view == View::Agenda {
                app.agenda_view.move_cursor(-1, 0);
            }
        }
        Action::MoveRight => {
            if app.active_view == View::Agenda {
                app.agenda_view.move_cursor(1, 0);
            }
        }
        Action::Select => {
            if app.active_view == View::Agenda {
                app.agenda_view.pick();
            }
        }
        Action::Confirm => match app.active_view {
            View::Agenda => agenda::drop_on_cursor(app).await?,
            View::Auditoria => auditoria::run_audit(app, true).await?,
            _ => {}
        },
        Action::Cancel => {
            if app.active_view == View::Agenda {
                app.agenda_view.cancel_pick();
            }
        }
        Action::NewItem => match app.active_view {
            View::Usuarios => usuarios::open_create(app),
            View::Tenants => tenants::open_create(app),
            View::Prontuario => prontuario::open_editor(app),
            _ => {}
        },
        Action::EditItem => match app.active_view {
            View::Usuarios => usuarios::open_edit(app),
            View::Tenants => tenants::open_edit(app),
            View::Auditoria => auditoria::start_editing(app),
            _ => {}
        },
        Action::DeleteItem => {
            if app.active_view == View::Usuarios {
                usuarios::delete_selected(app).await?;
            }
        }
        Action::Refresh => refresh_view(app).await?,
        Action::Logout => {
            app.logout();
            app.toasts.info("Sessão encerrada");
        }
        Action::OpenHelp => app.help_open = true,
    }
    Ok(false)
}

/// View-local keys that are not part of the global map.
async fn handle_view_key(app: &mut App, key: KeyEvent) -> Result<(), TuiError> {
    match (app.active_view, key.code) {
        (View::Auditoria, KeyCode::Char('b')) => auditoria::generate(app, ExportKind::Bpa).await,
        (View::Auditoria, KeyCode::Char('a')) => auditoria::generate(app, ExportKind::Apac).await,
        (View::Auditoria, KeyCode::Char('t')) => {
            auditoria::toggle_kind(app);
            auditoria::refresh_exports(app).await
        }
        (View::Auditoria, KeyCode::Char('y')) => auditoria::retry_selected(app).await,
        (View::Prontuario, KeyCode::Char('c')) => {
            prontuario::open_chat(app);
            Ok(())
        }
        (View::Usuarios, KeyCode::Char('p')) => usuarios::reset_password(app).await,
        _ => Ok(()),
    }
}

/// Load the active view's data through the query cache.
async fn refresh_view(app: &mut App) -> Result<(), TuiError> {
    match app.active_view {
        View::Login | View::Perfil => {}
        View::Dashboard => {
            let api = app.api.clone();
            let result = app
                .cache
                .fetch(
                    QueryKey::dashboard(),
                    FetchOptions::stale(stale_time::DASHBOARD),
                    move || async move { api.dashboard().await },
                )
                .await;
            match result {
                Ok(Some(data)) => app.dashboard_view.data = Some(data),
                Ok(None) => {}
                Err(err) => app.handle_api_error(&err),
            }
        }
        View::Agenda => {
            let api = app.api.clone();
            let result = app
                .cache
                .fetch(
                    QueryKey::agendas(),
                    FetchOptions::stale(stale_time::AGENDAS),
                    move || async move { api.list_agendas().await },
                )
                .await;
            match result {
                Ok(Some(items)) => app.agenda_view.items = items,
                Ok(None) => {}
                Err(err) => app.handle_api_error(&err),
            }
        }
        View::Prontuario => {
            let api = app.api.clone();
            let result = app
                .cache
                .fetch(
                    QueryKey::atendimentos(),
                    FetchOptions::stale(stale_time::ATENDIMENTOS),
                    move || async move { api.list_atendimentos().await },
                )
                .await;
            match result {
                Ok(Some(atendimentos)) => app.prontuario_view.atendimentos = atendimentos,
                Ok(None) => {}
                Err(err) => app.handle_api_error(&err),
            }
            prontuario::refresh_evolucoes(app).await?;
        }
        View::Producao => {
            let api = app.api.clone();
            let result = app
                .cache
                .fetch(
                    QueryKey::atendimentos(),
                    FetchOptions::stale(stale_time::ATENDIMENTOS),
                    move || async move { api.list_atendimentos().await },
                )
                .await;
            match result {
                Ok(Some(atendimentos)) => app.producao_view.atendimentos = atendimentos,
                Ok(None) => {}
                Err(err) => app.handle_api_error(&err),
            }
        }
        View::Auditoria => {
            auditoria::refresh_exports(app).await?;
        }
        View::Usuarios => {
            let api = app.api.clone();
            let result = app
                .cache
                .fetch(
                    QueryKey::users(),
                    FetchOptions::stale(stale_time::USERS),
                    move || async move { api.list_users().await },
                )
                .await;
            match result {
                Ok(Some(users)) => app.usuarios_view.users = users,
                Ok(None) => {}
                Err(err) => app.handle_api_error(&err),
            }
        }
        View::Tenants => {
            let api = app.api.clone();
            let result = app
                .cache
                .fetch(
                    QueryKey::tenants(),
                    FetchOptions::stale(stale_time::TENANTS),
                    move || async move { api.list_tenants().await },
                )
                .await;
            match result {
                Ok(Some(tenants)) => app.tenants_view.tenants = tenants,
                Ok(None) => {}
                Err(err) => app.handle_api_error(&err),
            }
        }
    }
    Ok(())
}
