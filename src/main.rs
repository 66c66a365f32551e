use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zedsong::{App, Args, SilentEngine, SongStore, SynthEngine, ToneEngine, run};

fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = match args.data_dir.clone() {
        Some(dir) => dir,
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zedsong"),
    };

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    init_logging(&data_dir, args.verbose)?;

    info!("Opening the song library in {}..!", data_dir.display());
    let store = SongStore::open(&data_dir)?;

    if args.muted {
        info!("Audio muted, pads will record silently..!");
        run_with(Arc::new(SilentEngine), store, &args)
    } else {
        run_with(Arc::new(SynthEngine::new()), store, &args)
    }
}

fn run_with<E: ToneEngine + 'static>(engine: Arc<E>, store: SongStore, args: &Args) -> Result<()> {
    let mut app = App::new(engine, store, args.tempo);

    let mut terminal = ratatui::init();
    let result = run(&mut app, &mut terminal);
    ratatui::restore();

    result
}

/// The terminal belongs to the UI, so the logger writes to a file in the
/// data directory instead of stderr.
fn init_logging(data_dir: &Path, verbose: bool) -> Result<()> {
    let log_path = data_dir.join("zedsong.log");
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    Ok(())
}
