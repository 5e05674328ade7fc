use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

#[derive(Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub last_key_event_name: String,
    /// Last action taken (e.g. "next_chart") for debugging key handling.
    pub last_action: String,
    /// Time spent building the last dashboard view.
    pub last_view_ms: u128,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(format!(
            "events={} keys={} last_key={} last_action={} frames={} view_ms={}",
            self.num_events,
            self.num_key_events,
            self.last_key_event_name,
            self.last_action,
            self.num_frames,
            self.last_view_ms
        ))
        .style(Style::default().fg(Color::DarkGray))
        .render(area, buf);
    }
}
