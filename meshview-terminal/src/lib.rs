/// Terminal host for the mesh viewer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use meshview_core::{ModelSource, ProjectionMode, RenderBackend, ViewKey, Viewer, ViewerConfig};
use std::io::{self, stdout, Stdout, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub mod config;
pub mod renderer;

pub use config::CliArgs;
pub use renderer::AsciiRenderer;

/// Two left presses on the same cell within this window are a double-click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Approximate pixel size of one terminal cell, so drags rotate about one
/// degree per pixel moved.
const CELL_PIXELS: (f32, f32) = (8.0, 16.0);

/// How long to wait for input before checking for a pending redraw.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a key press asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    View(ViewKey),
    Zoom(f32),
    Reload,
    Clear,
    ToggleAxes,
    Quit,
}

impl Action {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        let action = match code {
            KeyCode::Left => Action::View(ViewKey::Left),
            KeyCode::Right => Action::View(ViewKey::Right),
            KeyCode::Up => Action::View(ViewKey::Up),
            KeyCode::Down => Action::View(ViewKey::Down),
            KeyCode::PageUp => Action::View(ViewKey::PageUp),
            KeyCode::PageDown => Action::View(ViewKey::PageDown),
            KeyCode::Home => Action::View(ViewKey::Home),
            KeyCode::Char('+') | KeyCode::Char('=') => Action::Zoom(1.0),
            KeyCode::Char('-') => Action::Zoom(-1.0),
            KeyCode::Char('r') => Action::Reload,
            KeyCode::Char('c') => Action::Clear,
            KeyCode::Char('a') => Action::ToggleAxes,
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}

/// Recognizes double-clicks from a stream of left-button presses.
#[derive(Debug, Default)]
pub struct ClickTracker {
    last: Option<(Instant, u16, u16)>,
}

impl ClickTracker {
    /// Record a press; returns true if it completes a double-click.
    pub fn press(&mut self, at: Instant, column: u16, row: u16) -> bool {
        let double = matches!(
            self.last,
            Some((when, c, r)) if c == column && r == row
                && at.saturating_duration_since(when) <= DOUBLE_CLICK_WINDOW
        );
        // A third press starts a new pair
        self.last = if double { None } else { Some((at, column, row)) };
        double
    }
}

/// One-line summary of the viewer state shown under the frame.
pub fn status_line<B: RenderBackend>(viewer: &Viewer<B>, last_error: Option<&str>) -> String {
    let mut line = match (viewer.model(), viewer.source()) {
        (Some(model), Some(source)) => {
            let rotation = viewer.view().rotation();
            format!(
                "{source} | {} triangles | rot {:.0} {:.0} {:.0} | zoom {:.2}",
                model.triangle_count(),
                rotation.x,
                rotation.y,
                rotation.z,
                viewer.view().zoom()
            )
        }
        _ => "no model".to_string(),
    };
    match last_error {
        Some(e) => line.push_str(&format!(" | error: {e}")),
        None => line.push_str(" | arrows/drag rotate, +/- zoom, r reload, q quit"),
    }
    line
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    viewer: Viewer<AsciiRenderer<Stdout>>,
    clicks: ClickTracker,
    last_error: Option<String>,
    running: bool,
}

impl TerminalApp {
    pub fn new(config: ViewerConfig, projection: ProjectionMode) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        // The bottom row is kept for the status line
        let rows = height.saturating_sub(1) as usize;
        let mut renderer = AsciiRenderer::new(stdout(), width as usize, rows);
        renderer.set_projection(projection);

        Ok(Self {
            viewer: Viewer::new(renderer, config),
            clicks: ClickTracker::default(),
            last_error: None,
            running: true,
        })
    }

    /// Load a model, remembering the failure for the status line.
    pub fn load(&mut self, source: ModelSource) {
        let result = self.viewer.load(source);
        self.record(result);
    }

    pub fn viewer(&self) -> &Viewer<AsciiRenderer<Stdout>> {
        &self.viewer
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        info!("Viewer started");
        self.viewer.request_redraw();

        while self.running {
            if self.viewer.needs_redraw() {
                self.render()?;
            }

            if event::poll(POLL_INTERVAL)? {
                let event = event::read()?;
                self.handle_event(event);
            }
        }

        info!("Viewer stopped");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                if let Some(action) = Action::from_key(code) {
                    self.apply(action);
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
                self.viewer
                    .backend_mut()
                    .resize(width as usize, height.saturating_sub(1) as usize);
                self.viewer.request_redraw();
            }
            _ => {}
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::View(key) => self.viewer.key(key),
            Action::Zoom(steps) => self.viewer.scroll(steps),
            Action::Reload => {
                let result = self.viewer.reload();
                self.record(result);
            }
            Action::Clear => {
                self.viewer.clear();
                self.last_error = None;
            }
            Action::ToggleAxes => self.viewer.toggle_axes(),
            Action::Quit => self.running = false,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let MouseEvent {
            kind, column, row, ..
        } = mouse;
        let (x, y) = (column as f32 * CELL_PIXELS.0, row as f32 * CELL_PIXELS.1);

        match kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.viewer.pointer_pressed(x, y);
                if self.clicks.press(Instant::now(), column, row) {
                    self.viewer.double_click();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => self.viewer.pointer_moved(x, y),
            MouseEventKind::Up(MouseButton::Left) => self.viewer.pointer_released(x, y),
            MouseEventKind::ScrollUp => self.viewer.scroll(1.0),
            MouseEventKind::ScrollDown => self.viewer.scroll(-1.0),
            _ => {}
        }
    }

    fn record<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        self.last_error = result.err().map(|e| e.to_string());
        self.viewer.request_redraw();
    }

    fn render(&mut self) -> io::Result<()> {
        // Backend failures are logged by the viewer and the frame is dropped
        self.viewer.render_frame();

        let status = status_line(&self.viewer, self.last_error.as_deref());
        let (width, height) = self.viewer.backend().size();
        let color = if self.last_error.is_some() {
            Color::Red
        } else {
            Color::Yellow
        };
        let status: String = status.chars().take(width).collect();

        let out = self.viewer.backend_mut().writer_mut();
        queue!(
            out,
            cursor::MoveTo(0, height as u16),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(color),
            Print(status),
            ResetColor
        )?;
        out.flush()
    }
}
