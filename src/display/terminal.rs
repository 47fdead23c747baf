use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use palette::Srgb;
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::Args;
use crate::engine::animation::Transition;
use crate::engine::{Reconfigure, Timeline};
use crate::face::{Face, TimeChange};
use crate::ipc::{process_ipc_command, IpcCommand, IpcEffect};
use crate::renderer::dial::{render_dial, Label};
use crate::renderer::Canvas;
use crate::state::BluetoothAlert;

/// How long to wait for input when nothing is moving.
const IDLE_POLL: Duration = Duration::from_millis(250);

pub async fn run(
    config: Config,
    args: Args,
    ipc_rx: mpsc::Receiver<IpcCommand>,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, config, &args, ipc_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// A transition in flight, timed from the wall clock.
struct Running {
    timeline: Timeline,
    started: Instant,
}

impl Running {
    fn start(transition: Transition) -> Self {
        Self {
            timeline: Timeline::new(transition),
            started: Instant::now(),
        }
    }
}

fn schedule(outcome: Reconfigure, running: &mut Option<Running>) {
    if let Reconfigure::Scheduled(transition) = outcome {
        *running = Some(Running::start(transition));
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut config: Config,
    args: &Args,
    mut ipc_rx: mpsc::Receiver<IpcCommand>,
) -> Result<()> {
    let mut face = Face::new(&config, Local::now().naive_local());
    let mut canvas = Canvas::new(0, 0);
    let mut running: Option<Running> = None;
    let mut alert: Option<BluetoothAlert> = None;
    let mut needs_draw = true;

    loop {
        match face.time_changed(Local::now().naive_local()) {
            TimeChange::Unchanged => {}
            TimeChange::Minute => needs_draw = true,
            TimeChange::Day(outcome) => schedule(outcome, &mut running),
        }

        // Process IPC commands (non-blocking)
        while let Ok(cmd) = ipc_rx.try_recv() {
            match process_ipc_command(cmd, &mut face, &mut config, args) {
                IpcEffect::None => {}
                IpcEffect::Redraw => needs_draw = true,
                IpcEffect::Animate(transition) => {
                    running = Some(Running::start(transition));
                }
                IpcEffect::Alert(level) => {
                    if level == BluetoothAlert::Loud {
                        execute!(terminal.backend_mut(), Print('\x07'))?;
                    }
                    alert = Some(level);
                    needs_draw = true;
                }
            }
        }
        if face.connected() {
            alert = None;
        }

        if let Some(anim) = &running {
            let (progress, done) = anim.timeline.progress_at(anim.started.elapsed());
            face.tick(progress);
            if done {
                debug!("Transition finished");
                running = None;
            }
        }

        if face.take_dirty() || needs_draw {
            let scene = face.scene();
            canvas.resize(scene.metrics.width as usize, scene.metrics.height as usize);
            let labels = render_dial(&mut canvas, &scene);
            let status = status_line(&face, alert);

            terminal.draw(|frame| {
                let area = frame.area();
                let dial_area = Rect::new(
                    area.x,
                    area.y + 1,
                    area.width,
                    area.height.saturating_sub(1),
                );
                frame.render_widget(
                    DialView {
                        canvas: &canvas,
                        labels: &labels,
                    },
                    dial_area,
                );
                render_status(frame, area, &status, alert.is_some());
            })?;
            needs_draw = false;
        }

        // Handle input
        let wait = if running.is_some() {
            config.animation.frame_interval()
        } else {
            IDLE_POLL
        };
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(key) => match key {
                    KeyEvent {
                        code: KeyCode::Char('q'),
                        ..
                    }
                    | KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => {
                        break;
                    }
                    KeyEvent {
                        code: KeyCode::Char('r'),
                        ..
                    } => {
                        schedule(face.refresh(), &mut running);
                        needs_draw = true;
                    }
                    _ => {}
                },
                Event::Resize(..) => needs_draw = true,
                _ => {}
            }
        }
    }

    Ok(())
}

/// Where the canvas lands inside a cell area, and at what scale.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewport {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    /// Canvas pixels per cell column.
    scale: f64,
}

/// Fit a `width` x `height` canvas into `area`, two pixel rows per cell,
/// never enlarging it.
fn fit(width: usize, height: usize, area: Rect) -> Viewport {
    if width == 0 || height == 0 || area.width == 0 || area.height == 0 {
        return Viewport {
            x: area.x,
            y: area.y,
            width: 0,
            height: 0,
            scale: 1.0,
        };
    }
    let factor = (area.width as f64 / width as f64)
        .min(2.0 * area.height as f64 / height as f64)
        .min(1.0);
    let cols = ((width as f64 * factor).floor() as u16).clamp(1, area.width);
    let rows = ((height as f64 * factor / 2.0).ceil() as u16).clamp(1, area.height);
    Viewport {
        x: area.x + (area.width - cols) / 2,
        y: area.y + (area.height - rows) / 2,
        width: cols,
        height: rows,
        scale: 1.0 / factor,
    }
}

struct DialView<'a> {
    canvas: &'a Canvas,
    labels: &'a [Label],
}

fn term_color(c: Srgb<u8>) -> Color {
    Color::Rgb(c.red, c.green, c.blue)
}

impl Widget for DialView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = fit(self.canvas.width, self.canvas.height, area);
        let sample = |cell: u16, half: f64| ((cell as f64 + half) * view.scale) as usize;

        for row in 0..view.height {
            for col in 0..view.width {
                let px = sample(col, 0.5).min(self.canvas.width - 1);
                let top = sample(2 * row, 0.5).min(self.canvas.height - 1);
                let bottom = sample(2 * row + 1, 0.5).min(self.canvas.height - 1);
                if let Some(cell) = buf.cell_mut((view.x + col, view.y + row)) {
                    cell.set_char('▀');
                    cell.set_fg(term_color(self.canvas.get_pixel(px, top)));
                    cell.set_bg(term_color(self.canvas.get_pixel(px, bottom)));
                }
            }
        }

        // Labels keep the background of the cells they cover.
        for label in self.labels {
            let len = label.text.chars().count() as i32;
            let col = (label.x as f64 / view.scale) as i32 - len / 2;
            let row = (label.y as f64 / view.scale / 2.0) as i32;
            if row < 0 || row >= view.height as i32 {
                continue;
            }
            for (i, ch) in label.text.chars().enumerate() {
                let c = col + i as i32;
                if c < 0 || c >= view.width as i32 {
                    continue;
                }
                if let Some(cell) = buf.cell_mut((view.x + c as u16, view.y + row as u16)) {
                    let below = match cell.bg {
                        Color::Rgb(..) => cell.bg,
                        _ => Color::Reset,
                    };
                    cell.set_char(ch);
                    cell.set_fg(term_color(label.color));
                    cell.set_bg(below);
                    if label.bold {
                        cell.modifier.insert(Modifier::BOLD);
                    }
                }
            }
        }
    }
}

fn status_line(face: &Face, alert: Option<BluetoothAlert>) -> String {
    let fix = face.engine().fix();
    let location = if fix.is_set() {
        fix.to_string()
    } else {
        "waiting for location".to_string()
    };
    let link = match alert {
        Some(_) => "LINK LOST",
        None if face.connected() => "link up",
        None => "link down",
    };
    format!(" {} | {} | [r]efresh [q]uit ", location, link)
}

fn render_status(frame: &mut Frame, area: Rect, status: &str, alerting: bool) {
    let color = if alerting { Color::Red } else { Color::DarkGray };
    for (i, ch) in status.chars().enumerate() {
        if i < area.width as usize {
            let cell = frame.buffer_mut().cell_mut((area.x + i as u16, area.y));
            if let Some(cell) = cell {
                cell.set_char(ch);
                cell.set_fg(color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Palette, Slot};

    #[test]
    fn fit_keeps_small_canvas_at_native_size() {
        let view = fit(180, 180, Rect::new(0, 0, 200, 100));
        assert_eq!(view.scale, 1.0);
        assert_eq!((view.width, view.height), (180, 90));
        assert_eq!((view.x, view.y), (10, 5));
    }

    #[test]
    fn fit_shrinks_to_the_tighter_axis() {
        let view = fit(144, 168, Rect::new(0, 1, 120, 42));
        assert_eq!(view.scale, 2.0);
        assert_eq!((view.width, view.height), (72, 42));
        assert_eq!(view.x, 24);
    }

    #[test]
    fn fit_handles_empty_area() {
        let view = fit(180, 180, Rect::new(0, 0, 0, 10));
        assert_eq!((view.width, view.height), (0, 0));
    }

    #[test]
    fn dial_view_draws_half_blocks_and_labels() {
        let palette = Palette::default();
        let mut canvas = Canvas::new(4, 4);
        canvas.clear(palette.get(Slot::Below));
        canvas.fill_rows(0, 1, palette.get(Slot::Above));
        let labels = [Label {
            x: 2,
            y: 2,
            text: "ab".to_string(),
            color: Srgb::new(0, 0, 0),
            bold: true,
        }];

        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        DialView {
            canvas: &canvas,
            labels: &labels,
        }
        .render(area, &mut buf);

        let corner = &buf[(0, 0)];
        assert_eq!(corner.symbol(), "▀");
        assert_eq!(corner.fg, term_color(palette.get(Slot::Above)));
        assert_eq!(corner.bg, term_color(palette.get(Slot::Below)));

        assert_eq!(buf[(1, 1)].symbol(), "a");
        assert_eq!(buf[(2, 1)].symbol(), "b");
        assert_eq!(buf[(2, 1)].bg, term_color(palette.get(Slot::Below)));
        assert!(buf[(2, 1)].modifier.contains(Modifier::BOLD));
    }
}
