use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "zedsong",
    about = "Record, replay, and save tiny songs from an eight-note terminal pad"
)]
pub struct Args {
    /// Directory holding the song library and log file. Defaults to the
    /// platform data directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Starting tempo in beats per minute.
    #[arg(short, long, default_value_t = 120)]
    pub tempo: u32,

    /// Run without opening an audio device (pads still record).
    #[arg(short, long, default_value_t = false)]
    pub muted: bool,

    /// Logs extra information to the log file.
    #[arg(short, long)]
    pub verbose: bool,
}
