use std::time::Duration;

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use thiserror::Error;
use tracing::info;

use super::MidiRouter;

const CLIENT_NAME: &str = "tarmac";
const CONNECTION_NAME: &str = "tarmac-pad";
const PREFERRED_PORT_MARKERS: [&str; 2] = ["kaoss", "pro"];

#[derive(Debug, Error)]
pub enum MidiConnectError {
    #[error("failed to initialize MIDI input: {0}")]
    Init(#[source] midir::InitError),
    #[error("no MIDI input ports available")]
    NoPorts,
    #[error("no MIDI input port matches '{hint}'")]
    NoMatchingPort { hint: String },
    #[error("failed to connect to MIDI port '{port}': {message}")]
    Connect { port: String, message: String },
}

/// Keeps the driver callback alive; dropping it closes the port.
pub struct MidiConnection {
    port_name: String,
    _connection: MidiInputConnection<MidiRouter>,
}

impl MidiConnection {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Opens the port whose name contains `port_hint`, or with no hint the first
/// port that looks like a Kaoss pad, falling back to the first port.
pub fn connect_midi_input(
    port_hint: Option<&str>,
    router: MidiRouter,
) -> Result<MidiConnection, MidiConnectError> {
    let mut input = MidiInput::new(CLIENT_NAME).map_err(MidiConnectError::Init)?;
    input.ignore(Ignore::None);

    let ports = input
        .ports()
        .into_iter()
        .filter_map(|port| input.port_name(&port).ok().map(|name| (port, name)))
        .collect::<Vec<_>>();
    info!(
        ports = ?ports.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>(),
        "midi_ports"
    );

    let (port, port_name) = select_port(ports, port_hint)?;
    let connection = input
        .connect(
            &port,
            CONNECTION_NAME,
            |stamp_micros, message, router: &mut MidiRouter| {
                router.handle_message(Duration::from_micros(stamp_micros), message);
            },
            router,
        )
        .map_err(|error| MidiConnectError::Connect {
            port: port_name.clone(),
            message: error.to_string(),
        })?;

    info!(port = port_name.as_str(), "midi_connected");
    Ok(MidiConnection {
        port_name,
        _connection: connection,
    })
}

fn select_port(
    ports: Vec<(MidiInputPort, String)>,
    port_hint: Option<&str>,
) -> Result<(MidiInputPort, String), MidiConnectError> {
    if ports.is_empty() {
        return Err(MidiConnectError::NoPorts);
    }

    let lowered_hint = port_hint.map(str::to_lowercase);
    let position = match lowered_hint.as_deref() {
        Some(hint) => ports
            .iter()
            .position(|(_, name)| name.to_lowercase().contains(hint))
            .ok_or_else(|| MidiConnectError::NoMatchingPort {
                hint: hint.to_string(),
            })?,
        None => ports
            .iter()
            .position(|(_, name)| {
                let lowered = name.to_lowercase();
                PREFERRED_PORT_MARKERS
                    .iter()
                    .any(|marker| lowered.contains(marker))
            })
            .unwrap_or(0),
    };

    ports
        .into_iter()
        .nth(position)
        .ok_or(MidiConnectError::NoPorts)
}
