//! Plays the first hardware MIDI input through the default audio output
//! and prints what it hears.
//!
//! Usage: `igem-monitor [seconds]` (default 30)

use igem::prelude::*;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEFAULT_RUN_SECS: u64 = 30;
const TICK: Duration = Duration::from_millis(5);
const ACCESS_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> igem::Result<()> {
    tracing_subscriber::fmt::init();

    let run_for = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_RUN_SECS));

    for device in MidirAccess::new()?.list_devices()? {
        info!("MIDI input {}: {}", device.index, device.name);
    }

    let mut engine = IgemEngine::builder()
        .mode(InputMode::HardwareOnly)
        .build()?;

    let status = engine.wait_for_midi(ACCESS_TIMEOUT);
    println!("MIDI: {}", engine.hardware_label());
    if status != ConnectionStatus::Ready || !engine.listener().has_device() {
        warn!("No usable MIDI input ({})", status);
        return Ok(());
    }

    match engine.ensure_audio() {
        SynthStatus::Ready => {}
        other => warn!("Audio output {}; notes will be silent", other),
    }

    let deadline = Instant::now() + run_for;
    while Instant::now() < deadline {
        for event in engine.pump() {
            println!("{}", MonitorLine::from(&event));
        }
        std::thread::sleep(TICK);
    }

    engine.stop_all();
    if engine.log().is_empty() {
        println!("{}", igem::monitor::EMPTY_MONITOR_TEXT);
    }
    Ok(())
}
