//! PPPoE Connection Module
//!
//! `ConnectionData` holds everything one PPPoE session owns: the session socket,
//! the discovery raw socket, the interface name and its hardware address.
//! `ConnectionLifecycle` drives it through `init`, `connect` and `clear`.
//!
//! `init` either leaves the connection fully populated and bound, or releases
//! every socket it opened before returning the error.

use std::{
    fmt,
    os::fd::{AsFd, BorrowedFd},
};

use log::{info, warn};
use mac_address::MacAddress;

use crate::{
    error::PppoeError,
    helper::{
        control::{ControlSocket, InterfaceResolver},
        interface::InterfaceName,
        socket::{KernelSockets, PppoeAddress, SocketFactory, SocketFd},
    },
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Ready,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Ready => "ready",
            ConnectionState::Connected => "connected",
        };
        f.write_str(state)
    }
}

/// Sockets and addressing of a single PPPoE session.
///
/// Handles are closed by [`ConnectionData::clear`] or when the value is dropped.
#[derive(Debug)]
pub struct ConnectionData {
    protocol_socket: Option<SocketFd>,
    raw_socket: Option<SocketFd>,
    interface_name: Option<InterfaceName>,
    hardware_address: Option<MacAddress>,
    state: ConnectionState,
}

impl Default for ConnectionData {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionData {
    pub fn new() -> Self {
        Self {
            protocol_socket: None,
            raw_socket: None,
            interface_name: None,
            hardware_address: None,
            state: ConnectionState::Uninitialized,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn interface_name(&self) -> Option<&InterfaceName> {
        self.interface_name.as_ref()
    }

    /// Hardware address of the local interface, once resolved.
    pub fn hardware_address(&self) -> Option<MacAddress> {
        self.hardware_address
    }

    /// The PPPoE session socket, for the PPP channel layer.
    pub fn protocol_socket(&self) -> Option<BorrowedFd<'_>> {
        self.protocol_socket.as_ref().map(AsFd::as_fd)
    }

    /// The discovery raw socket, for the PADI/PADO/PADR/PADS exchange.
    pub fn raw_socket(&self) -> Option<&SocketFd> {
        self.raw_socket.as_ref()
    }

    /// Hands the established session socket to the caller and clears everything else.
    pub fn into_protocol_socket(mut self) -> Result<SocketFd, PppoeError> {
        if self.state != ConnectionState::Connected {
            return Err(PppoeError::InvalidState {
                expected: ConnectionState::Connected,
                actual: self.state,
            });
        }

        let socket = self.protocol_socket.take().ok_or(PppoeError::InvalidState {
            expected: ConnectionState::Connected,
            actual: ConnectionState::Uninitialized,
        })?;
        self.clear();
        Ok(socket)
    }

    /// Closes whichever sockets are open and resets every field.
    ///
    /// Safe on any state, including a half-initialized one.
    pub fn clear(&mut self) {
        self.protocol_socket = None;
        self.raw_socket = None;
        self.interface_name = None;
        self.hardware_address = None;
        self.state = ConnectionState::Uninitialized;
    }

    fn expect_state(&self, expected: ConnectionState) -> Result<(), PppoeError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PppoeError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}

/// Drives `ConnectionData` through its states using an interface resolver and a socket factory.
#[derive(Debug)]
pub struct ConnectionLifecycle<R, S> {
    resolver: R,
    sockets: S,
}

impl ConnectionLifecycle<ControlSocket, KernelSockets> {
    /// Lifecycle backed by a freshly opened control socket and the kernel socket calls.
    pub fn open() -> Result<Self, PppoeError> {
        Ok(Self::new(ControlSocket::open()?, KernelSockets))
    }
}

impl<R: InterfaceResolver, S: SocketFactory> ConnectionLifecycle<R, S> {
    pub fn new(resolver: R, sockets: S) -> Self {
        Self { resolver, sockets }
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Stores `name` on the connection and resolves its hardware address.
    ///
    /// The name may already be stored when resolution fails; the hardware address is not touched.
    pub fn set_name(&self, conn: &mut ConnectionData, name: &str) -> Result<(), PppoeError> {
        conn.expect_state(ConnectionState::Uninitialized)?;
        let interface = InterfaceName::new(name)?;
        self.store_name(conn, interface)
    }

    fn store_name(
        &self,
        conn: &mut ConnectionData,
        interface: InterfaceName,
    ) -> Result<(), PppoeError> {
        let interface = conn.interface_name.insert(interface);
        let hardware_address = self.resolver.resolve_hardware_address(interface)?;
        conn.hardware_address = Some(hardware_address);

        info!(target: "mypppoe::connection::set_name", "-- Interface {} has hardware address {}", interface, hardware_address);
        Ok(())
    }

    /// Opens and binds both sockets of `conn`.
    ///
    /// Without `name`, the name stored by an earlier [`ConnectionLifecycle::set_name`] is used.
    /// On failure every socket opened here is closed and `conn` is cleared.
    pub fn init(&self, conn: &mut ConnectionData, name: Option<&str>) -> Result<(), PppoeError> {
        conn.expect_state(ConnectionState::Uninitialized)?;

        let interface = name.map(InterfaceName::new).transpose()?;
        if interface.is_none() && conn.interface_name.is_none() {
            return Err(PppoeError::MissingInterface);
        }

        conn.protocol_socket = Some(self.sockets.create_protocol_socket()?);

        if let Err(err) = self.acquire(conn, interface) {
            warn!(target: "mypppoe::connection::init", "- Initialization failed, releasing sockets: {}", err);
            conn.clear();
            return Err(err);
        }

        conn.state = ConnectionState::Ready;
        Ok(())
    }

    fn acquire(
        &self,
        conn: &mut ConnectionData,
        interface: Option<InterfaceName>,
    ) -> Result<(), PppoeError> {
        if let Some(interface) = interface {
            self.store_name(conn, interface)?;
        }

        let raw_socket = conn.raw_socket.insert(self.sockets.create_raw_socket()?);
        let interface = conn
            .interface_name
            .as_ref()
            .ok_or(PppoeError::MissingInterface)?;
        let interface_index =
            self.sockets
                .bind_to_interface(raw_socket, interface, &self.resolver)?;

        info!(target: "mypppoe::connection::init", "-- Discovery socket bound to {} (index {})", interface, interface_index);
        Ok(())
    }

    /// Connects the session socket of a ready connection to session `session_id` with `remote`.
    ///
    /// On failure the connection stays ready and the call may be retried.
    pub fn connect(
        &self,
        conn: &mut ConnectionData,
        session_id: u16,
        remote: MacAddress,
    ) -> Result<(), PppoeError> {
        conn.expect_state(ConnectionState::Ready)?;

        let not_ready = || PppoeError::InvalidState {
            expected: ConnectionState::Ready,
            actual: ConnectionState::Uninitialized,
        };
        let interface = conn.interface_name.as_ref().ok_or_else(not_ready)?;
        let socket = conn.protocol_socket.as_ref().ok_or_else(not_ready)?;

        let address = PppoeAddress::new(session_id, interface, remote);
        self.sockets.connect_protocol_socket(socket, &address)?;

        info!(target: "mypppoe::connection::connect", "-- Session {} established on {} with {}", session_id, interface, remote);
        conn.state = ConnectionState::Connected;
        Ok(())
    }

    pub fn clear(&self, conn: &mut ConnectionData) {
        if conn.state != ConnectionState::Uninitialized {
            info!(target: "mypppoe::connection::clear", "-- Clearing {} connection", conn.state);
        }
        conn.clear();
    }
}
