use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Paragraph, Row, Table, Widget},
};

use crate::config::Theme;
use crate::present::{format_count, RowPage};

const MAX_COLUMN_WIDTH: usize = 24;

/// One page of raw rows with a "Rows a-b of n" title.
pub struct RowTable<'a> {
    pub page: &'a RowPage,
    pub theme: &'a Theme,
}

impl RowTable<'_> {
    fn title(&self) -> String {
        let page = self.page;
        format!(
            " Rows {}-{} of {} (page {}/{}) ",
            format_count(page.first_row()),
            format_count(page.last_row()),
            format_count(page.total_rows),
            page.page + 1,
            page.page_count
        )
    }

    /// Widest cell per column, header included.
    fn column_widths(&self) -> Vec<Constraint> {
        self.page
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let widest = self
                    .page
                    .rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(header.chars().count());
                Constraint::Length(widest.min(MAX_COLUMN_WIDTH) as u16)
            })
            .collect()
    }
}

impl Widget for &RowTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("card_border")))
            .title(Span::styled(
                self.title(),
                Style::default().fg(self.theme.get("title")),
            ));

        if self.page.rows.is_empty() {
            Paragraph::new("No rows match the current filters")
                .style(Style::default().fg(self.theme.get("dimmed")))
                .centered()
                .block(block)
                .render(area, buf);
            return;
        }

        let header = Row::new(self.page.headers.iter().map(String::as_str)).style(
            Style::default()
                .fg(self.theme.get("table_header"))
                .bg(self.theme.get("table_header_bg"))
                .add_modifier(Modifier::BOLD),
        );
        let rows = self
            .page
            .rows
            .iter()
            .map(|row| Row::new(row.iter().map(String::as_str)));

        Table::new(rows, self.column_widths())
            .header(header)
            .column_spacing(2)
            .block(block)
            .render(area, buf);
    }
}
