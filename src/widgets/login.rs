//! Login form: username, masked password and the last error.

use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use super::text_input::{TextInput, TextInputEvent};
use crate::config::Theme;

const FORM_WIDTH: u16 = 44;
const FORM_HEIGHT: u16 = 9;
const LABEL_WIDTH: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    User,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    None,
    Submit,
    Cancel,
}

pub struct LoginForm {
    pub user: TextInput,
    pub password: TextInput,
    pub focus: LoginFocus,
    pub error: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginForm {
    pub fn new() -> Self {
        let mut form = Self {
            user: TextInput::new(),
            password: TextInput::new().masked('•'),
            focus: LoginFocus::User,
            error: None,
        };
        form.sync_focus();
        form
    }

    fn sync_focus(&mut self) {
        self.user.set_focused(self.focus == LoginFocus::User);
        self.password.set_focused(self.focus == LoginFocus::Password);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginFocus::User => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::User,
        };
        self.sync_focus();
    }

    /// Enter on the username moves to the password; Enter on the password submits.
    pub fn handle_key(&mut self, event: &KeyEvent) -> LoginAction {
        let input = match self.focus {
            LoginFocus::User => &mut self.user,
            LoginFocus::Password => &mut self.password,
        };
        match input.handle_key(event) {
            TextInputEvent::Cancel => LoginAction::Cancel,
            TextInputEvent::Next => {
                self.toggle_focus();
                LoginAction::None
            }
            TextInputEvent::Submit if self.focus == LoginFocus::User => {
                self.toggle_focus();
                LoginAction::None
            }
            TextInputEvent::Submit => LoginAction::Submit,
            TextInputEvent::None => LoginAction::None,
        }
    }

    pub fn credentials(&self) -> (&str, &str) {
        (self.user.value(), self.password.value())
    }

    /// After a rejected attempt: keep the username, clear the password.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.password.clear();
        self.focus = LoginFocus::Password;
        self.sync_focus();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

pub struct LoginView<'a> {
    pub form: &'a LoginForm,
    pub title: &'a str,
    pub theme: &'a Theme,
}

impl Widget for &LoginView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [row] = Layout::vertical([Constraint::Length(FORM_HEIGHT)])
            .flex(Flex::Center)
            .areas(area);
        let [form_area] = Layout::horizontal([Constraint::Length(FORM_WIDTH)])
            .flex(Flex::Center)
            .areas(row);

        Clear.render(form_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("card_border")))
            .title(Span::styled(
                format!(" {} ", self.title),
                Style::default()
                    .fg(self.theme.get("title"))
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(form_area).inner(ratatui::layout::Margin::new(1, 1));
        block.render(form_area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // username
                Constraint::Length(1),
                Constraint::Length(1), // password
                Constraint::Length(1),
                Constraint::Length(1), // error
            ])
            .split(inner);

        let fields = [
            ("Username", &self.form.user, LoginFocus::User, rows[0]),
            ("Password", &self.form.password, LoginFocus::Password, rows[2]),
        ];
        for (label, input, focus, row) in fields {
            let cols = Layout::horizontal([Constraint::Length(LABEL_WIDTH), Constraint::Fill(1)])
                .split(row);
            let label_style = if self.form.focus == focus {
                Style::default().fg(self.theme.get("filter_focused"))
            } else {
                Style::default().fg(self.theme.get("keybind_labels"))
            };
            Paragraph::new(label).style(label_style).render(cols[0], buf);
            input.render(cols[1], buf);
        }

        if let Some(error) = &self.form.error {
            Paragraph::new(error.as_str())
                .style(Style::default().fg(self.theme.get("error")))
                .render(rows[4], buf);
        }
    }
}
