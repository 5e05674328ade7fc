use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::config::Theme;
use crate::present::SummaryCards;

/// Summary cards side by side, label in the border and value centered.
pub struct SummaryPanel<'a> {
    pub cards: &'a SummaryCards,
    pub theme: &'a Theme,
}

impl Widget for &SummaryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cards = &self.cards.cards;
        if cards.is_empty() {
            return;
        }
        let layout = Layout::new(
            Direction::Horizontal,
            vec![Constraint::Fill(1); cards.len()],
        )
        .split(area);

        let border = Style::default().fg(self.theme.get("card_border"));
        let value = Style::default()
            .fg(self.theme.get("card_value"))
            .add_modifier(Modifier::BOLD);

        for (card, cell) in cards.iter().zip(layout.iter()) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!(" {} ", card.label));
            Paragraph::new(card.value.as_str())
                .style(value)
                .centered()
                .block(block)
                .render(*cell, buf);
        }
    }
}
