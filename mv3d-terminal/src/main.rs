/// MV3D Terminal Viewer
///
/// Loads an OBJ or FBX asset from disk and renders it as ASCII art.
/// Controls:
///   - Arrow keys: orbit, PgUp/PgDn: zoom
///   - Shift+Arrows: drag the gizmo
///   - W/E/R: translate/rotate/scale, Q: local/world space, +/-: gizmo size
///   - Hold Ctrl: snap
///   - Esc: quit
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use mv3d_terminal::{config::Cli, logging, FsSource, TerminalApp};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_file, &cli.log_level)?;

    let request = cli.request()?;
    tracing::info!(asset = %request.asset_url, gizmo = request.gizmo_enabled, "viewer request");

    let mut app = TerminalApp::new(Rc::new(FsSource::new())).context("Failed to query terminal size")?;
    app.run(request).context("Terminal error")?;

    let viewer = app.viewer();
    if let mv3d_core::LoadState::Failed(reason) = viewer.load_state() {
        eprintln!("{}", reason);
    }
    Ok(())
}
