/// meshview - interactive terminal viewer for STL meshes and volume iso-surfaces
///
/// Controls:
///   - Arrow keys / mouse drag: Rotate
///   - PageUp/PageDown: Roll
///   - Home / double-click: Reset the view
///   - +/- / mouse wheel: Zoom
///   - R: Reload, C: Clear, A: Toggle axes
///   - Q/ESC: Quit
use std::fs::File;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use meshview_core::ViewerConfig;
use meshview_terminal::{CliArgs, TerminalApp};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("meshview_core=debug,meshview_terminal=debug")
    } else {
        EnvFilter::new("meshview_core=info,meshview_terminal=info")
    };
    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let config = ViewerConfig::from(&args);
    let mut app = TerminalApp::new(config, args.projection())
        .context("Failed to query the terminal size")?;
    if let Some(source) = args.model_source() {
        app.load(source);
    }

    app.run().context("Terminal viewer failed")
}
