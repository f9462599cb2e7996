//! Socket Helper Module
//!
//! Provides safe abstractions over the two socket kinds a PPPoE client needs:
//! an AF_PACKET raw socket for the discovery stage and an AF_PPPOX session socket
//! that the kernel turns into a PPPoE virtual circuit.
//!
//! Exposes:
//! - `SocketFd`: A RAII wrapper over `RawFd`, closed exactly once on drop.
//! - `PppoeAddress`: The kernel `sockaddr_pppox` used to connect a session socket.
//! - `SocketFactory`: The seam through which connections create, bind and connect sockets.
//! - `KernelSockets`: The `SocketFactory` that issues the real syscalls.

use std::{
    ops::Deref,
    os::{
        fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd},
        raw::c_void,
    },
};

use libc::{SO_BROADCAST, SOL_SOCKET};
use log::debug;
use mac_address::MacAddress;

use crate::{
    error::PppoeError,
    helper::{control::InterfaceResolver, interface::InterfaceName},
};

/// Ethertype of PPPoE discovery frames (PADI/PADO/PADR/PADS/PADT).
pub const ETH_PPPOE_DISCOVERY: u16 = 0x8863;

/// Address family of PPP over X sockets (`linux/socket.h`).
pub const AF_PPPOX: libc::c_int = 24;
/// PPP over Ethernet protocol of the `AF_PPPOX` family (`linux/if_pppox.h`).
pub const PX_PROTO_OE: libc::c_int = 0;

/// RAII wrapper around a raw socket descriptor.
///
/// The descriptor is closed when the wrapper is dropped. An unset handle is
/// modelled as `Option<SocketFd>::None`, so no descriptor value is reserved.
#[derive(Debug)]
pub struct SocketFd(RawFd);

impl SocketFd {
    /// Switches the socket between blocking and non-blocking mode.
    ///
    /// # Errors
    ///
    /// Returns an error if either `fcntl` call fails.
    pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
        let flags = unsafe { libc::fcntl(self.0, libc::F_GETFL) };
        if flags < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };

        let ret = unsafe { libc::fcntl(self.0, libc::F_SETFL, flags) };
        if ret < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl Deref for SocketFd {
    type Target = RawFd;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRawFd for SocketFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl AsFd for SocketFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.0) }
    }
}

impl IntoRawFd for SocketFd {
    fn into_raw_fd(self) -> RawFd {
        let fd = self.0;
        std::mem::forget(self);
        fd
    }
}

impl From<OwnedFd> for SocketFd {
    fn from(fd: OwnedFd) -> Self {
        SocketFd(fd.into_raw_fd())
    }
}

impl TryFrom<RawFd> for SocketFd {
    type Error = std::io::Error;

    /// Takes ownership of the result of a descriptor creating syscall.
    fn try_from(fd: RawFd) -> Result<Self, Self::Error> {
        if fd < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(SocketFd(fd))
        }
    }
}

impl Drop for SocketFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// Kernel `struct sockaddr_pppox` with its `pppoe_addr` arm.
///
/// The kernel declares the structure packed: family at 0, protocol at 2, sid at 6,
/// remote at 8 and dev at 14.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct PppoeAddress {
    sa_family: libc::sa_family_t,
    sa_protocol: libc::c_uint,
    sid: u16,
    remote: [u8; 6],
    dev: [u8; libc::IFNAMSIZ],
}

impl PppoeAddress {
    pub fn new(session_id: u16, interface: &InterfaceName, remote: MacAddress) -> Self {
        Self {
            sa_family: AF_PPPOX as libc::sa_family_t,
            sa_protocol: PX_PROTO_OE as libc::c_uint,
            sid: session_id.to_be(),
            remote: remote.bytes(),
            dev: interface.to_kernel_bytes(),
        }
    }

    pub fn session_id(&self) -> u16 {
        u16::from_be(self.sid)
    }

    pub fn device(&self) -> &str {
        let dev = &self.dev;
        let len = dev.iter().position(|byte| *byte == 0).unwrap_or(dev.len());
        std::str::from_utf8(&dev[..len]).unwrap_or_default()
    }

    pub fn remote(&self) -> MacAddress {
        MacAddress::new(self.remote)
    }

    pub fn family(&self) -> libc::sa_family_t {
        self.sa_family
    }

    pub fn protocol(&self) -> libc::c_uint {
        self.sa_protocol
    }

    /// The address exactly as the kernel reads it.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                self as *const PppoeAddress as *const u8,
                std::mem::size_of::<PppoeAddress>(),
            )
        }
    }
}

/// Link-layer address of the discovery ethertype on the interface with `interface_index`.
pub fn discovery_link_address(interface_index: u32) -> libc::sockaddr_ll {
    libc::sockaddr_ll {
        sll_family: libc::AF_PACKET as u16,
        sll_protocol: libc::htons(ETH_PPPOE_DISCOVERY),
        sll_ifindex: interface_index as i32,
        sll_hatype: 0,
        sll_pkttype: 0,
        sll_halen: 0u8,
        sll_addr: [0u8; 8],
    }
}

/// Creates, binds and connects the sockets a PPPoE connection owns.
///
/// `KernelSockets` is the production implementation; tests substitute their own.
pub trait SocketFactory {
    /// Opens a stream-oriented `AF_PPPOX`/`PX_PROTO_OE` session socket.
    fn create_protocol_socket(&self) -> Result<SocketFd, PppoeError>;

    /// Opens a broadcast-capable raw socket scoped to the discovery ethertype.
    ///
    /// A socket whose setup fails half-way is closed before the error is returned.
    fn create_raw_socket(&self) -> Result<SocketFd, PppoeError>;

    /// Binds a raw socket to the discovery ethertype on the interface with `interface_index`.
    fn bind_raw_socket(&self, socket: &SocketFd, interface_index: u32) -> Result<(), PppoeError>;

    /// Connects a session socket to the kernel PPPoE session described by `address`.
    fn connect_protocol_socket(
        &self,
        socket: &SocketFd,
        address: &PppoeAddress,
    ) -> Result<(), PppoeError>;

    /// Resolves `interface` to its kernel index and binds the raw socket to it.
    ///
    /// Returns the interface index the socket was bound to.
    fn bind_to_interface<R: InterfaceResolver + ?Sized>(
        &self,
        socket: &SocketFd,
        interface: &InterfaceName,
        resolver: &R,
    ) -> Result<u32, PppoeError> {
        let interface_index = resolver.resolve_index(interface)?;
        self.bind_raw_socket(socket, interface_index)?;
        Ok(interface_index)
    }
}

/// `SocketFactory` backed by the Linux socket syscalls.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelSockets;

impl SocketFactory for KernelSockets {
    fn create_protocol_socket(&self) -> Result<SocketFd, PppoeError> {
        let fd = SocketFd::try_from(unsafe {
            libc::socket(AF_PPPOX, libc::SOCK_STREAM, PX_PROTO_OE)
        })?;

        debug!(target: "mypppoe::socket::create_protocol_socket", "- Opened PPPoE session socket {}", *fd);
        Ok(fd)
    }

    fn create_raw_socket(&self) -> Result<SocketFd, PppoeError> {
        let fd = SocketFd::try_from(unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                libc::htons(ETH_PPPOE_DISCOVERY) as i32,
            )
        })?;

        let optval: libc::c_int = 1;
        let broadcast_result = unsafe {
            libc::setsockopt(
                *fd,
                SOL_SOCKET,
                SO_BROADCAST,
                &optval as *const libc::c_int as *const c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };

        if broadcast_result < 0 {
            // dropping `fd` closes it
            return Err(std::io::Error::last_os_error().into());
        }

        debug!(target: "mypppoe::socket::create_raw_socket", "- Opened discovery raw socket {}", *fd);
        Ok(fd)
    }

    fn bind_raw_socket(&self, socket: &SocketFd, interface_index: u32) -> Result<(), PppoeError> {
        let socket_address = discovery_link_address(interface_index);

        let binding_result = unsafe {
            libc::bind(
                **socket,
                &socket_address as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };

        if binding_result != 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        debug!(target: "mypppoe::socket::bind_raw_socket", "- Bound raw socket {} to interface index {}", **socket, interface_index);
        Ok(())
    }

    fn connect_protocol_socket(
        &self,
        socket: &SocketFd,
        address: &PppoeAddress,
    ) -> Result<(), PppoeError> {
        let connect_result = unsafe {
            libc::connect(
                **socket,
                address as *const PppoeAddress as *const libc::sockaddr,
                std::mem::size_of::<PppoeAddress>() as libc::socklen_t,
            )
        };

        if connect_result != 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        Ok(())
    }
}
