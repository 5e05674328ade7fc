use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::warn;

pub mod aggregate;
pub mod auth;
pub mod chart_export;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error_display;
pub mod filter;
pub mod logging;
pub mod prepare;
pub mod present;
pub mod source;
pub mod widgets;

pub use auth::{AuthError, CredentialTable, GateState, SessionGate, SessionId};
pub use cli::Args;
pub use config::{AppConfig, ColorParser, ConfigManager, ExportConfig, Theme};
pub use dashboard::{Dashboard, DashboardConfig};
pub use filter::{FilterColumn, FilterSpec};
pub use prepare::{prepare, BookingTable, NullSalesPolicy, PrepareError};
pub use present::{ChartId, DashboardView};
pub use source::{load_table, FileFormat, LoadOptions};

use present::format_count;
use widgets::chart::ChartPanel;
use widgets::controls::{Controls, LOGIN_CONTROLS};
use widgets::debug::DebugState;
use widgets::filter_bar::{FilterBar, FilterSlot};
use widgets::login::{LoginAction, LoginForm, LoginView};
use widgets::summary::SummaryPanel;
use widgets::table::RowTable;

/// Application name used for config, cache and log directories
pub const APP_NAME: &str = "bookdash";

pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Submit the login form.
    Login,
    Logout,
    /// Rebuild the dashboard view for the current filters and page.
    Refresh,
    ExportCsv,
    ExportChart,
    Exit,
    Crash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

pub struct App {
    dashboard: Dashboard,
    gate: SessionGate,
    session: SessionId,
    require_login: bool,
    screen: Screen,
    login_form: LoginForm,
    spec: FilterSpec,
    /// Index into the dashboard's filter columns.
    focus: usize,
    page: usize,
    chart_index: usize,
    view: Option<DashboardView>,
    status: Option<StatusMessage>,
    theme: Theme,
    export: ExportConfig,
    chart_size: (u32, u32),
    debug: DebugState,
}

impl App {
    pub fn new(dashboard: Dashboard, config: &AppConfig) -> color_eyre::Result<App> {
        let mut gate = SessionGate::default();
        let session = gate.open_session();
        let require_login = config.auth.require_login;
        let mut app = App {
            dashboard,
            gate,
            session,
            require_login,
            screen: if require_login {
                Screen::Login
            } else {
                Screen::Dashboard
            },
            login_form: LoginForm::new(),
            spec: FilterSpec::new(),
            focus: 0,
            page: 0,
            chart_index: 0,
            view: None,
            status: None,
            theme: Theme::from_config(&config.theme)?,
            export: config.export.clone(),
            chart_size: (config.chart.export_width, config.chart.export_height),
            debug: DebugState::default(),
        };
        if config.debug.enabled {
            app.enable_debug();
        }
        if app.screen == Screen::Dashboard {
            app.refresh();
        }
        Ok(app)
    }

    /// Start with `spec` selected instead of "All" everywhere.
    pub fn with_filters(mut self, spec: FilterSpec) -> Self {
        self.spec = self.dashboard.effective_spec(&spec);
        self.page = 0;
        if self.screen == Screen::Dashboard {
            self.refresh();
        }
        self
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_form.error.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn chart_index(&self) -> usize {
        self.chart_index
    }

    pub fn focused_filter(&self) -> Option<FilterColumn> {
        self.dashboard.config().filters.get(self.focus).copied()
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&str> {
        self.gate.state(self.session).ok().and_then(GateState::user)
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => {
                self.debug.on_key(key);
                self.key(key)
            }
            AppEvent::Login => {
                self.submit_login();
                None
            }
            AppEvent::Logout => self.logout(),
            AppEvent::Refresh => {
                self.refresh();
                None
            }
            AppEvent::ExportCsv => {
                self.export_csv();
                None
            }
            AppEvent::ExportChart => {
                self.export_chart();
                None
            }
            AppEvent::Resize(_, _) | AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppEvent::Exit);
        }
        match self.screen {
            Screen::Login => match self.login_form.handle_key(event) {
                LoginAction::Submit => Some(AppEvent::Login),
                LoginAction::Cancel => Some(AppEvent::Exit),
                LoginAction::None => None,
            },
            Screen::Dashboard => self.dashboard_key(event),
        }
    }

    fn dashboard_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        let action = match event.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppEvent::Exit),
            KeyCode::Tab => {
                self.move_focus(true);
                "focus_next"
            }
            KeyCode::BackTab => {
                self.move_focus(false);
                "focus_prev"
            }
            KeyCode::Right | KeyCode::Char('l') => return self.cycle_value(true),
            KeyCode::Left | KeyCode::Char('h') => return self.cycle_value(false),
            KeyCode::Backspace | KeyCode::Delete => return self.clear_focused(),
            KeyCode::Char('r') => return self.reset_filters(),
            KeyCode::Char('c') => {
                self.cycle_chart(true);
                "next_chart"
            }
            KeyCode::Char('C') => {
                self.cycle_chart(false);
                "prev_chart"
            }
            KeyCode::Char('n') | KeyCode::PageDown => return self.turn_page(true),
            KeyCode::Char('p') | KeyCode::PageUp => return self.turn_page(false),
            KeyCode::Char('e') => return Some(AppEvent::ExportCsv),
            KeyCode::Char('x') => return Some(AppEvent::ExportChart),
            KeyCode::Char('L') if self.require_login => return Some(AppEvent::Logout),
            _ => return None,
        };
        self.debug.last_action = action.to_string();
        None
    }

    fn move_focus(&mut self, forward: bool) {
        let n = self.dashboard.config().filters.len();
        if n == 0 {
            return;
        }
        self.focus = if forward {
            (self.focus + 1) % n
        } else {
            (self.focus + n - 1) % n
        };
    }

    /// Step the focused control through All -> first value -> ... -> last value -> All.
    fn cycle_value(&mut self, forward: bool) -> Option<AppEvent> {
        let column = self.focused_filter()?;
        let options = self.dashboard.options(column);
        if options.is_empty() {
            return None;
        }
        let current = self
            .spec
            .get(column)
            .and_then(|v| options.iter().position(|o| o == v));
        let next = match (current, forward) {
            (None, true) => Some(0),
            (None, false) => Some(options.len() - 1),
            (Some(i), true) if i + 1 < options.len() => Some(i + 1),
            (Some(i), false) if i > 0 => Some(i - 1),
            _ => None,
        };
        let value = next.map(|i| options[i].clone());
        self.debug.last_action = format!("select {:?}", column);
        self.select(column, value)
    }

    fn clear_focused(&mut self) -> Option<AppEvent> {
        let column = self.focused_filter()?;
        self.spec.get(column)?;
        self.select(column, None)
    }

    fn reset_filters(&mut self) -> Option<AppEvent> {
        if self.spec.is_empty() {
            return None;
        }
        self.spec = FilterSpec::new();
        self.page = 0;
        Some(AppEvent::Refresh)
    }

    /// Every selection change starts again from the first row page.
    fn select(&mut self, column: FilterColumn, value: Option<String>) -> Option<AppEvent> {
        self.spec.set(column, value);
        self.page = 0;
        Some(AppEvent::Refresh)
    }

    fn cycle_chart(&mut self, forward: bool) {
        let n = self.view.as_ref().map_or(0, |v| v.charts.len());
        if n == 0 {
            return;
        }
        self.chart_index = if forward {
            (self.chart_index + 1) % n
        } else {
            (self.chart_index + n - 1) % n
        };
    }

    fn turn_page(&mut self, forward: bool) -> Option<AppEvent> {
        let page_count = self.view.as_ref().map_or(1, |v| v.page.page_count);
        let next = if forward {
            (self.page + 1 < page_count).then_some(self.page + 1)
        } else {
            self.page.checked_sub(1)
        };
        self.page = next?;
        self.debug.last_action = format!("page {}", self.page);
        Some(AppEvent::Refresh)
    }

    fn refresh(&mut self) {
        let started = Instant::now();
        match self.dashboard.view(&self.spec, self.page) {
            Ok(view) => {
                self.page = view.page.page;
                if self.chart_index >= view.charts.len() {
                    self.chart_index = 0;
                }
                self.view = Some(view);
            }
            Err(e) => {
                warn!(error = %e, "failed to build dashboard view");
                self.status = Some(StatusMessage::Error(format!(
                    "Could not update the dashboard: {}",
                    e
                )));
            }
        }
        self.debug.last_view_ms = started.elapsed().as_millis();
    }

    fn submit_login(&mut self) {
        let (user, password) = self.login_form.credentials();
        let result = self.gate.login(self.session, user, password);
        let user = user.to_string();
        match result {
            Ok(()) => {
                self.login_form.reset();
                self.screen = Screen::Dashboard;
                self.status = Some(StatusMessage::Info(format!("Logged in as {}", user)));
                self.refresh();
            }
            Err(e) => self.login_form.reject(e.to_string()),
        }
    }

    /// Back to the login screen; the filter selection is kept.
    fn logout(&mut self) -> Option<AppEvent> {
        if let Err(e) = self.gate.logout(self.session) {
            return Some(AppEvent::Crash(e.to_string()));
        }
        self.screen = Screen::Login;
        self.login_form.reset();
        self.status = None;
        None
    }

    fn export_csv(&mut self) {
        let path = self.export.csv_path();
        let result = ensure_parent_dir(&path)
            .and_then(|_| self.dashboard.export_csv(&self.spec, &path));
        self.status = Some(match result {
            Ok(rows) => StatusMessage::Info(format!(
                "Exported {} rows to {}",
                format_count(rows),
                path.display()
            )),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "CSV export failed");
                StatusMessage::Error(format!("CSV export failed: {}", e))
            }
        });
    }

    fn export_chart(&mut self) {
        let Some(spec) = self
            .view
            .as_ref()
            .and_then(|v| v.charts.get(self.chart_index))
        else {
            self.status = Some(StatusMessage::Error("No chart to export".to_string()));
            return;
        };
        let path = self.export.chart_path(spec.id);
        let result = ensure_parent_dir(&path)
            .and_then(|_| chart_export::write_chart_png(&path, spec, self.chart_size));
        self.status = Some(match result {
            Ok(()) => StatusMessage::Info(format!("Saved chart to {}", path.display())),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "chart export failed");
                StatusMessage::Error(format!("Chart export failed: {}", e))
            }
        });
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let title = Span::styled(
            self.dashboard.config().title.as_str(),
            Style::default()
                .fg(self.theme.get("title"))
                .add_modifier(Modifier::BOLD),
        );
        let cols = Layout::horizontal([Constraint::Fill(1), Constraint::Length(32)]).split(area);
        Paragraph::new(Line::from(title)).render(cols[0], buf);
        if let Some(user) = self.user() {
            Paragraph::new(format!("Logged in as {}", user))
                .style(Style::default().fg(self.theme.get("dimmed")))
                .right_aligned()
                .render(cols[1], buf);
        }
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let (text, color) = match &self.status {
            Some(StatusMessage::Info(msg)) => (msg.as_str(), self.theme.get("success")),
            Some(StatusMessage::Error(msg)) => (msg.as_str(), self.theme.get("error")),
            None => return,
        };
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .render(area, buf);
    }

    fn render_dashboard(&self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(3), // filters
                Constraint::Length(3), // summary cards
                Constraint::Fill(3),   // chart
                Constraint::Fill(2),   // rows
                Constraint::Length(1), // status
            ])
            .split(area);

        self.render_header(layout[0], buf);

        let slots = self
            .dashboard
            .config()
            .filters
            .iter()
            .enumerate()
            .map(|(i, column)| FilterSlot {
                label: column.label(),
                value: self.spec.get(*column),
                option_count: self.dashboard.options(*column).len(),
                focused: i == self.focus,
            })
            .collect();
        FilterBar::new(slots, &self.theme).render(layout[1], buf);

        match &self.view {
            Some(view) => {
                let summary = SummaryPanel {
                    cards: &view.cards,
                    theme: &self.theme,
                };
                summary.render(layout[2], buf);
                let chart = ChartPanel::new(
                    view.charts.get(self.chart_index),
                    (self.chart_index, view.charts.len()),
                    &self.theme,
                );
                chart.render(layout[3], buf);
                let rows = RowTable {
                    page: &view.page,
                    theme: &self.theme,
                };
                rows.render(layout[4], buf);
            }
            None => {
                Paragraph::new("Dashboard unavailable")
                    .style(Style::default().fg(self.theme.get("error")))
                    .centered()
                    .render(layout[3], buf);
            }
        }

        self.render_status(layout[5], buf);
    }
}

fn ensure_parent_dir(path: &Path) -> color_eyre::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![Constraint::Fill(1), Constraint::Length(1)];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::new(Direction::Vertical, constraints).split(area);

        let controls = Controls::from_theme(&self.theme);
        match self.screen {
            Screen::Login => {
                let view = LoginView {
                    form: &self.login_form,
                    title: &self.dashboard.config().title,
                    theme: &self.theme,
                };
                (&view).render(layout[0], buf);
                (&controls.with_custom_controls(LOGIN_CONTROLS.to_vec())).render(layout[1], buf);
            }
            Screen::Dashboard => {
                self.render_dashboard(layout[0], buf);
                let rows = self.view.as_ref().map_or(0, |v| v.filtered_rows);
                (&controls.with_row_count(rows)).render(layout[1], buf);
            }
        }

        if self.debug.enabled {
            (&self.debug).render(layout[2], buf);
        }
    }
}
