use log::{error, info};
use mac_address::MacAddress;
use mypppoe::{ConnectionData, ConnectionLifecycle, PppoeError};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("mypppoe failed: {}", e);
        std::process::exit(1);
    }
}

/// `mypppoe <interface> [<session-id> <remote-mac>]`
fn run() -> Result<(), PppoeError> {
    let mut args = std::env::args().skip(1);
    let interface_name = args.next().ok_or(PppoeError::MissingInterface)?;
    let session = match (args.next(), args.next()) {
        (Some(session_id), Some(remote)) => {
            let session_id: u16 = session_id
                .parse()
                .map_err(|_| PppoeError::InvalidSessionId(session_id.into()))?;
            let remote: MacAddress = remote.parse()?;
            Some((session_id, remote))
        }
        _ => None,
    };

    let mut lifecycle = ConnectionLifecycle::open()?;
    let mut conn = ConnectionData::new();

    lifecycle.init(&mut conn, Some(interface_name.as_str()))?;
    if let Some(hardware_address) = conn.hardware_address() {
        info!(target: "mypppoe::main", "Interface {} ready, hardware address {}", interface_name, hardware_address);
    }

    let connected = match session {
        Some((session_id, remote)) => lifecycle.connect(&mut conn, session_id, remote),
        None => Ok(()),
    };

    lifecycle.clear(&mut conn);
    lifecycle.resolver_mut().close();

    connected
}
