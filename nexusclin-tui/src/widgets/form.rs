//! Simple focused-field form handling shared by the login, admin, and
//! profile views.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    /// Rendered masked (passwords).
    pub secret: bool,
}

impl FormField {
    pub fn new(label: &'static str) -> FormField {
        FormField {
            label,
            value: String::new(),
            secret: false,
        }
    }

    pub fn secret(label: &'static str) -> FormField {
        FormField {
            label,
            value: String::new(),
            secret: true,
        }
    }

    pub fn with_value(label: &'static str, value: impl Into<String>) -> FormField {
        FormField {
            label,
            value: value.into(),
            secret: false,
        }
    }

    fn display_value(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// A stack of text fields with one focused at a time.
#[derive(Debug, Clone)]
pub struct FormState {
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl FormState {
    pub fn new(fields: Vec<FormField>) -> FormState {
        FormState { fields, focus: 0 }
    }

    pub fn value(&self, index: usize) -> &str {
        &self.fields[index].value
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Feed a key into the focused field. Returns true when consumed.
    pub fn input(&mut self, key: KeyEvent) -> bool {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return false;
        };
        match key.code {
            KeyCode::Char(c) => {
                field.value.push(c);
                true
            }
            KeyCode::Backspace => {
                field.value.pop();
                true
            }
            KeyCode::Tab | KeyCode::Down => {
                self.focus_next();
                true
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_previous();
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect, title: &str, focus_style: Style) {
        let lines: Vec<Line> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let marker = if i == self.focus { "> " } else { "  " };
                let label_style = if i == self.focus {
                    focus_style
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{}{}: ", marker, field.label), label_style),
                    Span::raw(field.display_value()),
                ])
            })
            .collect();
        let widget = Paragraph::new(Text::from(lines))
            .block(Block::default().title(title).borders(Borders::ALL));
        f.render_widget(widget, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn typing_fills_the_focused_field() {
        let mut form = FormState::new(vec![FormField::new("email"), FormField::secret("senha")]);
        form.input(key(KeyCode::Char('a')));
        form.input(key(KeyCode::Char('b')));
        assert_eq!(form.value(0), "ab");

        form.input(key(KeyCode::Tab));
        form.input(key(KeyCode::Char('x')));
        assert_eq!(form.value(1), "x");

        form.input(key(KeyCode::Backspace));
        assert_eq!(form.value(1), "");
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut form = FormState::new(vec![FormField::new("a"), FormField::new("b")]);
        form.focus_previous();
        assert_eq!(form.focus, 1);
        form.focus_next();
        assert_eq!(form.focus, 0);
    }

    #[test]
    fn secret_fields_render_masked() {
        let mut field = FormField::secret("senha");
        field.value = "abc".to_string();
        assert_eq!(field.display_value(), "***");
    }
}
