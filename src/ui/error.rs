//! Full-screen error display for failures before the recorder can open.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

const ERROR_BACKGROUND: Color = Color::Rgb(255, 0, 0);
const ERROR_FOREGROUND: Color = Color::Rgb(255, 255, 255);

/// Red screen with the message centered, dismissed by any key.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(ErrorScreen {
            terminal,
            active: true,
        })
    }

    /// Shows `error_message` until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering or event polling fails
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal
                .draw(|frame| draw_error(frame, error_message))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Restores the terminal. Safe to call more than once.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Fills the frame red and wraps the message into the middle 80% of the width,
/// starting half way down.
pub fn draw_error(frame: &mut Frame, error_message: &str) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(ERROR_BACKGROUND));

    let text_area = Rect {
        x: area.x + area.width / 10,
        y: area.y + area.height / 2,
        width: area.width * 8 / 10,
        height: area.height - area.height / 2,
    };
    let paragraph = Paragraph::new(error_message)
        .style(Style::default().fg(ERROR_FOREGROUND).bg(ERROR_BACKGROUND))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, text_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_error_is_drawn_on_red() {
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal
            .draw(|frame| draw_error(frame, "Microphone access was denied"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(0u16, 0u16)].bg, ERROR_BACKGROUND);
        let text: String = (0..8u16)
            .flat_map(|y| (0..40u16).map(move |x| (x, y)))
            .map(|pos| buffer[pos].symbol().to_string())
            .collect();
        assert!(text.contains("Microphone"));
    }
}
