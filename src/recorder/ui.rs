//! Terminal user interface for the recorder.
//!
//! Draws the waveform area (live bars while recording, the static waveform
//! with the played part highlighted afterwards), a footer with the state
//! indicator, clock and status message, and maps keys to recorder commands.

use super::controller::{RecorderController, RecorderState};
use super::visualizations::SurfaceMode;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::Span,
    widgets::{Paragraph, Sparkline},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

/// Fraction of the recording moved by one arrow key press.
pub const SEEK_STEP: f64 = 0.05;

/// How long `handle_input` waits for a key, which is also the frame interval.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(50);

const BAR_MAX: u64 = 100;
const BACKGROUND: Color = Color::Rgb(0, 0, 0);
const BAR_COLOR: Color = Color::Rgb(206, 224, 220);
const UNPLAYED_COLOR: Color = Color::Rgb(92, 104, 101);
const MIRROR_COLOR: Color = Color::Rgb(185, 207, 212);

/// User input mapped to a recorder operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecorderCommand {
    /// No key, or a key without a binding
    Continue,
    Record,
    Stop,
    PlayPause,
    Clear,
    Send,
    /// Jump to a fraction of the recording
    SeekTo(f64),
    /// Move relative to the current position
    SeekBy(f64),
    Quit,
}

/// Message shown at the end of the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Everything one frame needs, detached from the terminal.
#[derive(Debug, Clone, Copy)]
pub struct RecorderView<'a> {
    pub state: RecorderState,
    pub bars: &'a [u64],
    /// Playback progress when a finished recording is shown
    pub progress: Option<f64>,
    pub clock: &'a str,
    pub status: Option<&'a StatusMessage>,
}

/// Terminal UI for recording and reviewing a voice message.
pub struct RecorderTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    status: Option<StatusMessage>,
}

impl RecorderTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(RecorderTui {
            terminal,
            status: None,
        })
    }

    /// Current terminal width in columns.
    pub fn width(&self) -> anyhow::Result<usize> {
        Ok(self.terminal.size()?.width as usize)
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Draws one frame for the controller's current state.
    ///
    /// Resizes the waveform surface to the terminal width first so bars map
    /// one to one onto columns.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, controller: &mut RecorderController) -> anyhow::Result<()> {
        let width = self.width()?;
        controller.visualizer_mut().resize(width);

        let surface = controller.visualizer();
        let progress = (surface.mode() == SurfaceMode::Static).then(|| surface.progress());
        let clock = controller.timer().display();
        let view = RecorderView {
            state: controller.state(),
            bars: surface.bars(),
            progress,
            clock: &clock,
            status: self.status.as_ref(),
        };

        self.terminal.draw(|frame| draw_recorder(frame, &view))?;
        Ok(())
    }

    /// Waits up to one frame for a key and maps it to a command.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, state: RecorderState) -> anyhow::Result<RecorderCommand> {
        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(RecorderCommand::Continue);
                }
                let command = command_for_key(key, state);
                if command != RecorderCommand::Continue {
                    tracing::debug!("Key {:?} while {}: {:?}", key.code, state, command);
                }
                return Ok(command);
            }
        }
        Ok(RecorderCommand::Continue)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Key bindings. Enter and Space stop an active recording; otherwise Enter
/// sends and Space toggles playback.
pub fn command_for_key(key: KeyEvent, state: RecorderState) -> RecorderCommand {
    let recording = state == RecorderState::Recording;
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            RecorderCommand::Quit
        }
        KeyCode::Char('q') | KeyCode::Esc => RecorderCommand::Quit,
        KeyCode::Char('r') => RecorderCommand::Record,
        KeyCode::Char('s') => RecorderCommand::Stop,
        KeyCode::Enter | KeyCode::Char(' ') if recording => RecorderCommand::Stop,
        KeyCode::Enter => RecorderCommand::Send,
        KeyCode::Char(' ') => RecorderCommand::PlayPause,
        KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => RecorderCommand::Clear,
        KeyCode::Char(c) if c.is_ascii_digit() => {
            RecorderCommand::SeekTo(f64::from(c as u8 - b'0') / 10.0)
        }
        KeyCode::Left => RecorderCommand::SeekBy(-SEEK_STEP),
        KeyCode::Right => RecorderCommand::SeekBy(SEEK_STEP),
        _ => RecorderCommand::Continue,
    }
}

/// Number of leading bars drawn as already played.
pub fn played_columns(progress: f64, bars: usize) -> usize {
    if !progress.is_finite() {
        return 0;
    }
    ((progress.clamp(0.0, 1.0) * bars as f64).round() as usize).min(bars)
}

/// Renders a full recorder frame.
pub fn draw_recorder(frame: &mut Frame, view: &RecorderView) {
    let area = frame.area();
    let footer_height = 1;

    let content_area = Rect {
        height: area.height.saturating_sub(footer_height),
        ..area
    };
    let top_height = content_area.height / 3 * 2;
    let top_area = Rect {
        height: top_height,
        ..content_area
    };
    let bottom_area = Rect {
        y: content_area.y + top_height,
        height: content_area.height.saturating_sub(top_height),
        ..content_area
    };

    let played = view
        .progress
        .map_or(view.bars.len(), |p| played_columns(p, view.bars.len()));
    let (played_bars, unplayed_bars) = view.bars.split_at(played);
    let played_area = Rect {
        width: (played as u16).min(top_area.width),
        ..top_area
    };
    let unplayed_area = Rect {
        x: top_area.x + played_area.width,
        width: top_area.width.saturating_sub(played_area.width),
        ..top_area
    };

    frame.render_widget(bar_sparkline(played_bars, BAR_COLOR), played_area);
    frame.render_widget(bar_sparkline(unplayed_bars, UNPLAYED_COLOR), unplayed_area);

    let mirrored: Vec<u64> = view
        .bars
        .iter()
        .map(|&v| BAR_MAX.saturating_sub(v))
        .collect();
    let mirror = Sparkline::default()
        .data(&mirrored)
        .max(BAR_MAX)
        .style(Style::default().bg(MIRROR_COLOR).fg(BACKGROUND));
    frame.render_widget(mirror, bottom_area);

    let footer_area = Rect {
        y: area.y + area.height.saturating_sub(footer_height),
        height: footer_height,
        ..area
    };
    frame.render_widget(footer(view), footer_area);
}

fn bar_sparkline(bars: &[u64], color: Color) -> Sparkline<'_> {
    Sparkline::default()
        .data(bars)
        .max(BAR_MAX)
        .style(Style::default().bg(BACKGROUND).fg(color))
}

fn footer<'a>(view: &RecorderView<'a>) -> Paragraph<'a> {
    let indicator = match view.state {
        RecorderState::Recording => Span::styled("● ", Style::default().fg(Color::Red)),
        RecorderState::Playing => Span::styled("▶ ", Style::default().fg(Color::Green)),
        RecorderState::Paused => Span::styled("⏸ ", Style::default().fg(Color::Yellow)),
        RecorderState::Ready => Span::styled("■ ", Style::default().fg(MIRROR_COLOR)),
        RecorderState::Idle => Span::styled("○ ", Style::default().fg(UNPLAYED_COLOR)),
    };

    let mut spans = vec![
        indicator,
        Span::raw(view.clock.to_string()),
        Span::raw(" / "),
        Span::raw(view.state.to_string()),
        Span::raw(" / "),
    ];
    match view.status {
        Some(status) if status.is_error => spans.push(Span::styled(
            status.text.clone(),
            Style::default().bg(Color::Red).fg(Color::Rgb(255, 255, 255)),
        )),
        Some(status) => spans.push(Span::raw(status.text.clone())),
        None => spans.push(Span::styled(
            help_text(view.state),
            Style::default().fg(UNPLAYED_COLOR),
        )),
    }

    Paragraph::new(Line::from(spans)).style(Style::default().fg(MIRROR_COLOR).bg(BACKGROUND))
}

fn help_text(state: RecorderState) -> &'static str {
    match state {
        RecorderState::Idle => "r record, q quit",
        RecorderState::Recording => "s stop, q quit",
        RecorderState::Playing => "space pause, ←/→ seek, enter send, d delete",
        RecorderState::Ready | RecorderState::Paused => {
            "space play, 0-9 jump, enter send, d delete, r re-record"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_enter_stops_recording_and_sends_otherwise() {
        assert_eq!(
            command_for_key(key(KeyCode::Enter), RecorderState::Recording),
            RecorderCommand::Stop
        );
        assert_eq!(
            command_for_key(key(KeyCode::Enter), RecorderState::Ready),
            RecorderCommand::Send
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char(' ')), RecorderState::Paused),
            RecorderCommand::PlayPause
        );
    }

    #[test]
    fn test_digits_and_arrows_seek() {
        assert_eq!(
            command_for_key(key(KeyCode::Char('4')), RecorderState::Ready),
            RecorderCommand::SeekTo(0.4)
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char('0')), RecorderState::Ready),
            RecorderCommand::SeekTo(0.0)
        );
        assert_eq!(
            command_for_key(key(KeyCode::Left), RecorderState::Playing),
            RecorderCommand::SeekBy(-SEEK_STEP)
        );
    }

    #[test]
    fn test_quit_keys() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(
            command_for_key(ctrl_c, RecorderState::Recording),
            RecorderCommand::Quit
        );
        assert_eq!(
            command_for_key(key(KeyCode::Esc), RecorderState::Idle),
            RecorderCommand::Quit
        );
        assert_eq!(
            command_for_key(key(KeyCode::Char('c')), RecorderState::Idle),
            RecorderCommand::Continue
        );
    }

    #[test]
    fn test_played_columns() {
        assert_eq!(played_columns(0.0, 10), 0);
        assert_eq!(played_columns(0.44, 10), 4);
        assert_eq!(played_columns(1.5, 10), 10);
        assert_eq!(played_columns(f64::NAN, 10), 0);
    }

    #[test]
    fn test_footer_shows_clock_state_and_error() {
        let bars = vec![50u64; 20];
        let status = StatusMessage {
            text: "Microphone access was denied".to_string(),
            is_error: true,
        };
        let view = RecorderView {
            state: RecorderState::Idle,
            bars: &bars,
            progress: Some(0.5),
            clock: "0:07",
            status: Some(&status),
        };

        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal.draw(|frame| draw_recorder(frame, &view)).unwrap();

        let buffer = terminal.backend().buffer();
        let footer: String = (0..60u16)
            .map(|x| buffer[(x, 5u16)].symbol().to_string())
            .collect();
        assert!(footer.contains("0:07 / idle / Microphone access was denied"));
    }
}
