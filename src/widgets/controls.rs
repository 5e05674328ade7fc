use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph, Widget},
};

use crate::config::Theme;
use crate::present::format_count;

pub const DASHBOARD_CONTROLS: [(&str, &str); 9] = [
    ("Tab", "Filter"),
    ("←→", "Value"),
    ("c", "Chart"),
    ("n/p", "Page"),
    ("r", "Reset"),
    ("e", "CSV"),
    ("x", "PNG"),
    ("L", "Logout"),
    ("q", "Quit"),
];

pub const LOGIN_CONTROLS: [(&str, &str); 3] =
    [("Tab", "Next field"), ("Enter", "Login"), ("Esc", "Quit")];

pub struct Controls {
    pub row_count: Option<usize>,
    pub dimmed: bool,
    pub custom_controls: Option<Vec<(&'static str, &'static str)>>,
    pub bg_color: Color,
    pub key_color: Color,
    pub label_color: Color,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            row_count: None,
            dimmed: false,
            custom_controls: None,
            bg_color: Color::Indexed(235),
            key_color: Color::Cyan,
            label_color: Color::White,
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            bg_color: theme.get("controls_bg"),
            key_color: theme.get("keybind_hints"),
            label_color: theme.get("keybind_labels"),
            ..Self::default()
        }
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_custom_controls(mut self, controls: Vec<(&'static str, &'static str)>) -> Self {
        self.custom_controls = Some(controls);
        self
    }

    /// How many key/label pairs fit in `width`, leaving room for the row count.
    fn visible_pairs(&self, controls: &[(&str, &str)], width: u16) -> usize {
        let pair_width = |(key, action): &(&str, &str)| -> u16 {
            (key.chars().count() as u16 + 1) + (action.chars().count() as u16 + 1)
        };
        let mut available = width.saturating_sub(if self.row_count.is_some() { 21 } else { 1 });
        let mut n_show = 0;
        for pair in controls {
            let need = pair_width(pair);
            if available < need {
                break;
            }
            available -= need;
            n_show += 1;
        }
        n_show
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let no_bg = self.bg_color == Color::Reset;
        if !no_bg {
            Block::default()
                .style(Style::default().bg(self.bg_color))
                .render(area, buf);
        }

        let controls: Vec<(&str, &str)> = match self.custom_controls {
            Some(ref custom) => custom.to_vec(),
            None => DASHBOARD_CONTROLS.to_vec(),
        };
        let n_show = self.visible_pairs(&controls, area.width);

        let mut constraints: Vec<Constraint> = controls
            .iter()
            .take(n_show)
            .flat_map(|(key, action)| {
                [
                    Constraint::Length(key.chars().count() as u16 + 1),
                    Constraint::Length(action.chars().count() as u16 + 1),
                ]
            })
            .collect();
        constraints.push(Constraint::Fill(1));
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(20));
        }

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let base = if no_bg {
            Style::default()
        } else {
            Style::default().bg(self.bg_color)
        };
        let (key_style, label_style) = if self.dimmed {
            (base.fg(Color::DarkGray), base.fg(Color::DarkGray))
        } else {
            (base.fg(self.key_color), base.fg(self.label_color))
        };

        for (i, (key, action)) in controls.iter().take(n_show).enumerate() {
            let j = i * 2;
            Paragraph::new(*key).style(key_style).render(layout[j], buf);
            Paragraph::new(*action)
                .style(label_style)
                .render(layout[j + 1], buf);
        }

        let fill_idx = n_show * 2;
        Paragraph::new("").style(base).render(layout[fill_idx], buf);
        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", format_count(count)))
                .style(label_style)
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_bar_drops_trailing_pairs() {
        let controls = Controls::new().with_row_count(10);
        assert_eq!(controls.visible_pairs(&DASHBOARD_CONTROLS, 200), 9);
        // "Tab Filter " is 11 wide, the row count reserves 21
        assert_eq!(controls.visible_pairs(&DASHBOARD_CONTROLS, 32), 1);
        assert_eq!(controls.visible_pairs(&DASHBOARD_CONTROLS, 10), 0);
    }

    #[test]
    fn test_render_shows_row_count() {
        let controls = Controls::new().with_row_count(1234);
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        (&controls).render(area, &mut buf);
        let line: String = (0..area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect();
        assert!(line.contains("Rows: 1,234"), "got: {}", line);
        assert!(line.starts_with("Tab Filter"), "got: {}", line);
    }
}
