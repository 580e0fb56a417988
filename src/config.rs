//! Command line configuration for the `midi-timeline` binary

use clap::Parser;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    name = "midi-timeline",
    about = "Decode a Standard MIDI File and summarize its timeline"
)]
pub struct Args {
    /// Path to the MIDI file (.mid or RIFF wrapped .rmi).
    pub midi: PathBuf,

    /// Number of events to list after the summary.
    #[arg(short, long, default_value_t = 0)]
    pub events: usize,

    /// Prints the tempo map.
    #[arg(short, long, default_value_t = false)]
    pub tempo_map: bool,

    /// Enables debug logging of the decode.
    #[arg(short, long)]
    pub verbose: bool,
}
