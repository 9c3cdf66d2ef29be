use std::env;
use std::time::Duration;

use tarmac_engine::{LoopConfig, SimConfig, WatchdogTuning};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MIDI_PORT_ENV_VAR: &str = "TARMAC_MIDI_PORT";
const IDLE_RESET_ENV_VAR: &str = "TARMAC_IDLE_RESET_MS";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) sim: SimConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Tarmac Festival Startup ===");

    let config = LoopConfig {
        midi_port_hint: env::var(MIDI_PORT_ENV_VAR)
            .ok()
            .and_then(|raw| parse_port_hint(&raw)),
        ..LoopConfig::default()
    };
    let mut sim = SimConfig::default();
    if let Some(reset_after) = idle_reset_from_env() {
        sim.watchdog = WatchdogTuning::with_reset_after(reset_after);
        info!(
            reset_after_ms = reset_after.as_millis() as u64,
            warn_after_ms = sim.watchdog.warn_after.as_millis() as u64,
            "idle_reset_overridden"
        );
    }

    AppWiring { config, sim }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn idle_reset_from_env() -> Option<Duration> {
    let raw = env::var(IDLE_RESET_ENV_VAR).ok()?;
    let parsed = parse_idle_reset(&raw);
    if parsed.is_none() {
        warn!(
            env_var = IDLE_RESET_ENV_VAR,
            value = raw.as_str(),
            "invalid idle reset value; keeping default"
        );
    }
    parsed
}

fn parse_idle_reset(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => None,
    }
}

fn parse_port_hint(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
