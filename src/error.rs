use std::sync::Arc;

use mac_address::MacParseError;
use thiserror::Error;

use crate::connection::ConnectionState;

#[derive(Error, Debug)]
pub enum PppoeError {
    #[error("System IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Interface({interface}) query failed: {source}")]
    InterfaceQuery {
        interface: Arc<str>,
        source: std::io::Error,
    },
    #[error("Mac Address Parsing Error: {0}")]
    MacAddressParse(#[from] MacParseError),
    #[error("Missing interface name")]
    MissingInterface,
    #[error("Interface name is empty")]
    EmptyInterfaceName,
    #[error("Interface name({0}) is longer than {1} bytes")]
    InterfaceNameTooLong(Box<str>, usize),
    #[error("Interface name contains a NUL byte")]
    InterfaceNameContainsNul,
    #[error("Invalid session id: {0}")]
    InvalidSessionId(Box<str>),
    #[error("The control socket is not open")]
    ControlSocketUnset,
    #[error("The connection is {actual} but this operation needs it {expected}")]
    InvalidState {
        expected: ConnectionState,
        actual: ConnectionState,
    },
}
