//! Command line front end: decodes a MIDI file and logs a summary of its timeline

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use midi_timeline::{
    config::Args,
    decode_file,
    display::{bpm, format_duration, key_name},
    EventKind,
};

/// Decodes the file named on the command line and reports on it
fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    info!("Decoding MIDI file: '{}'...", args.midi.display());
    let timeline = decode_file(&args.midi)
        .with_context(|| format!("Failed to load '{}'", args.midi.display()))?;

    info!(
        "Format {:?}, {} track(s), {} ppq ({} timing)",
        timeline.format(),
        timeline.track_count(),
        timeline.ppq(),
        if timeline.is_smpte() { "SMPTE" } else { "metrical" }
    );
    info!(
        "Initial tempo: {} us/qn ({:.2} bpm)",
        timeline.initial_tempo_microseconds(),
        bpm(timeline.initial_tempo_microseconds())
    );

    match timeline.key_signature() {
        Some(key) => info!("Key signature: {}", key_name(key).unwrap_or("<nonstandard>")),
        None => info!("Key signature: <none>"),
    }

    if let Some(gm) = timeline.general_midi() {
        info!("General MIDI: {}", if gm { "on" } else { "off" });
    }

    info!(
        "{} events, last tick {}, duration {}",
        timeline.events().len(),
        timeline.last_tick(),
        format_duration(timeline.total_duration_seconds())
    );

    if args.tempo_map {
        for (seconds, event) in timeline.timed_events() {
            if let EventKind::TempoChange(tempo) = event.kind {
                info!(
                    "Tempo at tick {} ({}): {:.2} bpm",
                    event.tick,
                    format_duration(seconds),
                    bpm(tempo)
                );
            }
        }
    }

    for (seconds, event) in timeline.timed_events().take(args.events) {
        info!(
            "{:>8} {} port {}: {}",
            event.tick,
            format_duration(seconds),
            event.port,
            event.kind
        );
    }

    Ok(())
}
