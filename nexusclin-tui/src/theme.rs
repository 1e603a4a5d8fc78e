//! Slate theme and status color utilities.

use crate::notifications::ToastKind;
use crate::state::AuditStatus;
use nexusclin_core::AgendaStatus;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub bg_secondary: Color,
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub text_muted: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl Theme {
    pub fn slate() -> Self {
        Self {
            bg: Color::Rgb(2, 6, 23),
            bg_secondary: Color::Rgb(15, 23, 42),
            bg_highlight: Color::Rgb(30, 41, 59),
            primary: Color::Rgb(56, 189, 248),
            primary_dim: Color::Rgb(14, 116, 144),
            secondary: Color::Rgb(125, 211, 252),
            success: Color::Rgb(74, 222, 128),
            warning: Color::Rgb(250, 204, 21),
            error: Color::Rgb(248, 113, 113),
            info: Color::Rgb(56, 189, 248),
            text: Color::Rgb(241, 245, 249),
            text_dim: Color::Rgb(148, 163, 184),
            text_muted: Color::Rgb(71, 85, 105),
            border: Color::Rgb(51, 65, 85),
            border_focus: Color::Rgb(56, 189, 248),
        }
    }
}

pub fn agenda_status_color(status: Option<AgendaStatus>, theme: &Theme) -> Color {
    match status {
        Some(AgendaStatus::Livre) | None => theme.text_dim,
        Some(AgendaStatus::Agendado) => theme.warning,
        Some(AgendaStatus::Concluido) => theme.success,
        Some(AgendaStatus::Faltou) => theme.error,
    }
}

pub fn audit_status_color(status: AuditStatus, theme: &Theme) -> Color {
    match status {
        AuditStatus::Pending => theme.warning,
        AuditStatus::Ok => theme.success,
        AuditStatus::Error => theme.error,
    }
}

pub fn export_status_color(status: &str, theme: &Theme) -> Color {
    match status.trim().to_ascii_lowercase().as_str() {
        "ok" | "concluido" | "done" => theme.success,
        "pendente" | "pending" | "processando" => theme.warning,
        "erro" | "error" | "failed" => theme.error,
        _ => theme.text_dim,
    }
}

pub fn toast_color(kind: &ToastKind, theme: &Theme) -> Color {
    match kind {
        ToastKind::Success => theme.success,
        ToastKind::Error => theme.error,
        ToastKind::Warning => theme.warning,
        ToastKind::Info => theme.info,
    }
}
