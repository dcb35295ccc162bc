/// Terminal host for the model viewer
use crossterm::{
    cursor,
    event,
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use nalgebra::Vector3;
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use mv3d_core::{AssetSource, GizmoMode, Subscription, Viewer, ViewerRequest};

pub mod config;
pub mod input;
pub mod logging;
pub mod renderer;
pub mod source;

pub use input::{Action, InputState};
pub use renderer::{AsciiRenderer, CELL_ASPECT};
pub use source::FsSource;

/// Gizmo drag per Shift+arrow press, per mode
const TRANSLATE_STEP: f32 = 10.0;
const ROTATE_STEP: f32 = 0.1;
const SCALE_STEP: f32 = 0.1;

/// Main application struct for terminal model viewing
pub struct TerminalApp {
    viewer: Viewer,
    renderer: AsciiRenderer,
    input: InputState,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(source: Rc<dyn AssetSource>) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_renderer(source, AsciiRenderer::new(width as usize, height as usize)))
    }

    pub fn with_renderer(source: Rc<dyn AssetSource>, renderer: AsciiRenderer) -> Self {
        Self {
            viewer: Viewer::new(source),
            renderer,
            input: InputState::new(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn run(&mut self, request: ViewerRequest) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        // Teardown restores the terminal, whichever way the loop ends
        self.viewer.subscribe(Subscription::new("terminal mode", || {
            let _ = terminal::disable_raw_mode();
            let _ = execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show);
        }));

        self.viewer.start(request, &mut self.renderer);
        let result = self.main_loop();
        self.viewer.teardown();

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target
        let mut previous = Instant::now();

        while self.viewer.is_running() {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                for action in self.input.translate(&event) {
                    self.apply(action);
                }
            }

            // Update and render
            let dt = (frame_start - previous).as_secs_f32();
            previous = frame_start;
            if !self.viewer.tick(dt, &mut self.renderer) {
                break;
            }
            self.draw()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    /// Apply one input action to the viewer
    pub fn apply(&mut self, action: Action) {
        debug!("input {:?}", action);
        match action {
            Action::Quit => {
                info!("quit requested");
                self.viewer.teardown();
            }
            Action::KeyDown(key) => {
                self.viewer.handle_key_down(key);
            }
            Action::KeyUp(key) => {
                self.viewer.handle_key_up(key);
            }
            Action::Orbit { dx, dy } => self.viewer.orbit(dx, dy),
            Action::Zoom(delta) => self.viewer.zoom(delta),
            Action::DragGizmo { x, y } => {
                let step = match self.viewer.gizmo().map(|g| g.mode()) {
                    Some(GizmoMode::Translate) => TRANSLATE_STEP,
                    Some(GizmoMode::Rotate) => ROTATE_STEP,
                    Some(GizmoMode::Scale) => SCALE_STEP,
                    None => return,
                };
                self.viewer.drag_gizmo(Vector3::new(x, y, 0.0) * step);
            }
            Action::Resize { columns, rows } => {
                let (width, height) = (columns as u32, rows as u32 * CELL_ASPECT);
                self.viewer.resize(width, height, &mut self.renderer);
            }
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        // Output to terminal
        let mut stdout = stdout();
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        let mode = match self.viewer.gizmo().map(|g| g.mode()) {
            Some(GizmoMode::Translate) => "translate",
            Some(GizmoMode::Rotate) => "rotate",
            Some(GizmoMode::Scale) => "scale",
            None => "off",
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "MV3D | {} | FPS: {:.1} | gizmo: {} | Arrows=Orbit PgUp/PgDn=Zoom Shift+Arrows=Drag W/E/R Q Esc=Quit",
                status_line(&self.viewer),
                self.fps,
                mode
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

fn status_line(viewer: &Viewer) -> String {
    if viewer.is_loading() && viewer.status().is_empty() {
        "LOADING".to_string()
    } else {
        viewer.status().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv3d_core::{Key, LoadState, RenderSurface};

    fn write_fixture(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("mv3d-terminal-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tri.obj"), contents).unwrap();
        dir
    }

    fn loaded_app(name: &str) -> (TerminalApp, std::path::PathBuf) {
        let dir = write_fixture(name, "v 0 0 0\nv 10 0 0\nv 0 10 0\nf 1 2 3\n");
        let mut app = TerminalApp::with_renderer(Rc::new(FsSource::with_root(&dir)), AsciiRenderer::new(80, 24));
        app.viewer.start(ViewerRequest::new("tri.obj"), &mut app.renderer);
        app.viewer.tick(0.0, &mut app.renderer);
        (app, dir)
    }

    #[test]
    fn test_filesystem_load_without_materials() {
        let (app, dir) = loaded_app("load");
        assert_eq!(app.viewer().load_state(), &LoadState::Loaded);
        assert_eq!(app.viewer().status(), "READY");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_drag_step_follows_mode() {
        let (mut app, dir) = loaded_app("drag");
        app.apply(Action::DragGizmo { x: 1.0, y: 0.0 });
        let (_, object) = app.viewer().scene().primary().unwrap();
        assert_eq!(object.transform.translation, Vector3::new(TRANSLATE_STEP, 0.0, 0.0));

        app.apply(Action::KeyDown(Key::Char('e')));
        app.apply(Action::DragGizmo { x: 0.0, y: 1.0 });
        let (_, object) = app.viewer().scene().primary().unwrap();
        assert!((object.transform.rotation.y - ROTATE_STEP).abs() < 1e-6);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_resize_updates_surface_and_camera() {
        let (mut app, dir) = loaded_app("resize");
        app.apply(Action::Resize { columns: 100, rows: 50 });
        assert_eq!(app.renderer.size(), (100, 100));
        assert!((app.viewer().camera().aspect - 1.0).abs() < 1e-6);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_quit_stops_the_loop() {
        let (mut app, dir) = loaded_app("quit");
        app.apply(Action::Quit);
        assert!(!app.viewer().is_running());
        assert!(!app.viewer.tick(0.1, &mut app.renderer));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
