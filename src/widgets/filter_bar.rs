//! Selection controls: one bordered box per filter column.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::config::Theme;

/// Shown when a control has no value selected.
pub const ALL_LABEL: &str = "All";

pub struct FilterSlot<'a> {
    pub label: &'a str,
    pub value: Option<&'a str>,
    /// Number of selectable values.
    pub option_count: usize,
    pub focused: bool,
}

pub struct FilterBar<'a> {
    slots: Vec<FilterSlot<'a>>,
    theme: &'a Theme,
}

impl<'a> FilterBar<'a> {
    pub fn new(slots: Vec<FilterSlot<'a>>, theme: &'a Theme) -> Self {
        Self { slots, theme }
    }
}

impl Widget for &FilterBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.slots.is_empty() {
            return;
        }
        let constraints = vec![Constraint::Fill(1); self.slots.len()];
        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let focused = self.theme.get("filter_focused");
        let active = self.theme.get("filter_active");
        let border = self.theme.get("card_border");
        let dimmed = self.theme.get("dimmed");

        for (slot, cell) in self.slots.iter().zip(layout.iter()) {
            let border_style = if slot.focused {
                Style::default().fg(focused)
            } else {
                Style::default().fg(border)
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(" {} ({}) ", slot.label, slot.option_count));
            let inner = block.inner(*cell);
            block.render(*cell, buf);

            let value = match slot.value {
                Some(v) => Span::styled(
                    v.to_string(),
                    Style::default().fg(active).add_modifier(Modifier::BOLD),
                ),
                None => Span::styled(ALL_LABEL, Style::default().fg(dimmed)),
            };
            let line = if slot.focused {
                Line::from(vec![Span::raw("◀ "), value, Span::raw(" ▶")])
            } else {
                Line::from(value)
            };
            Paragraph::new(line).render(inner, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_line(bar: &FilterBar, width: u16) -> String {
        let area = Rect::new(0, 0, width, 3);
        let mut buf = Buffer::empty(area);
        bar.render(area, &mut buf);
        (0..width).map(|x| buf[(x, 1)].symbol().to_string()).collect()
    }

    #[test]
    fn test_unset_filter_shows_all() {
        let theme = Theme::default();
        let bar = FilterBar::new(
            vec![
                FilterSlot {
                    label: "Zone",
                    value: Some("North"),
                    option_count: 2,
                    focused: false,
                },
                FilterSlot {
                    label: "Branch",
                    value: None,
                    option_count: 5,
                    focused: true,
                },
            ],
            &theme,
        );
        let line = render_line(&bar, 60);
        assert!(line.contains("North"), "got: {}", line);
        assert!(line.contains("◀ All ▶"), "got: {}", line);
    }
}
