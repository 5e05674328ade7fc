use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{Input, Key, TextArea};

/// Event emitted by TextInput widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Submit, // Enter pressed
    Cancel, // Esc pressed
    Next,   // Tab pressed
}

/// Single-line text input wrapping tui-textarea, optionally masked
pub struct TextInput {
    textarea: TextArea<'static>,
    value: String,
    mask: Option<char>,
    text_color: Option<Color>,
    focused: bool,
}

impl TextInput {
    pub fn new() -> Self {
        let mut widget = Self {
            textarea: TextArea::default(),
            value: String::new(),
            mask: None,
            text_color: None,
            focused: false,
        };
        widget.apply_style();
        widget
    }

    /// Render every character as `mask` (password fields).
    pub fn masked(mut self, mask: char) -> Self {
        self.mask = Some(mask);
        self.apply_style();
        self
    }

    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self.apply_style();
        self
    }

    fn apply_style(&mut self) {
        let mut style = Style::default();
        if let Some(color) = self.text_color {
            style = style.fg(color);
        }
        self.textarea.set_style(style);
        self.textarea.set_cursor_line_style(Style::default());
        if let Some(mask) = self.mask {
            self.textarea.set_mask_char(mask);
        }
        self.apply_cursor_style();
    }

    // Same style as the text hides the cursor
    fn apply_cursor_style(&mut self) {
        let cursor_style = if self.focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            self.textarea.style()
        };
        self.textarea.set_cursor_style(cursor_style);
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.apply_cursor_style();
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: &str) {
        let single_line = value.replace(['\n', '\r'], " ");
        self.textarea = TextArea::new(vec![single_line.clone()]);
        self.value = single_line;
        self.apply_style();
        self.textarea.move_cursor(tui_textarea::CursorMove::End);
    }

    pub fn clear(&mut self) {
        self.textarea = TextArea::default();
        self.value.clear();
        self.apply_style();
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> TextInputEvent {
        match event.code {
            KeyCode::Enter => TextInputEvent::Submit,
            KeyCode::Esc => TextInputEvent::Cancel,
            KeyCode::Tab | KeyCode::BackTab => TextInputEvent::Next,
            _ => {
                let input = key_event_to_input(event);
                if input.key == Key::Null {
                    return TextInputEvent::None;
                }
                self.textarea.input(input);
                self.value = self.textarea.lines().first().cloned().unwrap_or_default();
                TextInputEvent::None
            }
        }
    }
}

/// Convert crossterm KeyEvent to tui_textarea::Input
fn key_event_to_input(event: &KeyEvent) -> Input {
    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => Key::Null,
    };
    Input {
        key,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        self.textarea.render(area, buf);

        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let cell = &mut buf[(x, y)];
                let style = cell.style().remove_modifier(Modifier::UNDERLINED);
                cell.set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_updates_value() {
        let mut input = TextInput::new();
        for c in "dhruv".chars() {
            assert_eq!(input.handle_key(&key(KeyCode::Char(c))), TextInputEvent::None);
        }
        assert_eq!(input.value(), "dhruv");
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.value(), "dhru");
    }

    #[test]
    fn test_control_keys() {
        let mut input = TextInput::new().masked('*');
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), TextInputEvent::Submit);
        assert_eq!(input.handle_key(&key(KeyCode::Esc)), TextInputEvent::Cancel);
        assert_eq!(input.handle_key(&key(KeyCode::Tab)), TextInputEvent::Next);
        assert!(input.is_empty());
    }

    #[test]
    fn test_set_value_and_clear() {
        let mut input = TextInput::new();
        input.set_value("hello");
        assert_eq!(input.value(), "hello");
        input.clear();
        assert!(input.is_empty());
    }
}
