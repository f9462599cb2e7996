//! Client-side PPPoE connection setup.
//!
//! Resolves an interface, opens and binds the discovery raw socket, opens the
//! `AF_PPPOX` session socket and connects it once the discovery stage has
//! produced a session id and the access concentrator's address.

pub mod connection;
pub mod error;
pub mod helper;

pub use connection::{ConnectionData, ConnectionLifecycle, ConnectionState};
pub use error::PppoeError;
pub use helper::{
    control::{ControlSocket, InterfaceResolver},
    interface::InterfaceName,
    socket::{KernelSockets, PppoeAddress, SocketFactory, SocketFd, discovery_link_address},
};
