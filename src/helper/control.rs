//! Control Socket Module
//!
//! Interface-table queries (`SIOCGIFINDEX`, `SIOCGIFHWADDR`) are issued through a
//! plain `AF_INET` datagram socket. `ControlSocket` owns that socket; every caller
//! that needs resolution is handed a resolver instead of touching shared state.

use std::os::fd::RawFd;

use libc::ioctl;
use log::debug;
use mac_address::MacAddress;

use crate::{error::PppoeError, helper::interface::InterfaceName, helper::socket::SocketFd};

/// Looks up kernel facts about a network interface by name.
pub trait InterfaceResolver {
    /// Returns the kernel index of `interface`.
    fn resolve_index(&self, interface: &InterfaceName) -> Result<u32, PppoeError>;

    /// Returns the link-layer address of `interface`.
    fn resolve_hardware_address(&self, interface: &InterfaceName)
    -> Result<MacAddress, PppoeError>;
}

impl<R: InterfaceResolver + ?Sized> InterfaceResolver for &R {
    fn resolve_index(&self, interface: &InterfaceName) -> Result<u32, PppoeError> {
        (**self).resolve_index(interface)
    }

    fn resolve_hardware_address(
        &self,
        interface: &InterfaceName,
    ) -> Result<MacAddress, PppoeError> {
        (**self).resolve_hardware_address(interface)
    }
}

/// Owner of the datagram socket used for interface queries.
///
/// Starts unset; [`ControlSocket::init`] opens it and [`ControlSocket::close`] releases it.
/// Both are idempotent.
#[derive(Debug, Default)]
pub struct ControlSocket {
    fd: Option<SocketFd>,
}

impl ControlSocket {
    pub fn new() -> Self {
        Self { fd: None }
    }

    /// Creates a control socket and opens it right away.
    pub fn open() -> Result<Self, PppoeError> {
        let mut control = Self::new();
        control.init()?;
        Ok(control)
    }

    /// Opens the socket unless it is already open and returns its descriptor.
    pub fn init(&mut self) -> Result<RawFd, PppoeError> {
        if let Some(fd) = &self.fd {
            return Ok(**fd);
        }

        let fd = SocketFd::try_from(unsafe {
            libc::socket(libc::AF_INET, libc::SOCK_DGRAM, libc::IPPROTO_IP)
        })?;
        let raw = *fd;
        self.fd = Some(fd);

        debug!(target: "mypppoe::control::init", "- Opened control socket {}", raw);
        Ok(raw)
    }

    /// Closes the socket if it is open.
    pub fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            debug!(target: "mypppoe::control::close", "- Closing control socket {}", *fd);
        }
    }

    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn query(
        &self,
        interface: &InterfaceName,
        request: libc::c_ulong,
    ) -> Result<libc::ifreq, PppoeError> {
        let fd = self.fd.as_ref().ok_or(PppoeError::ControlSocketUnset)?;

        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        for (dst, src) in ifr.ifr_name.iter_mut().zip(interface.to_kernel_bytes()) {
            *dst = src as libc::c_char;
        }

        let op_result = unsafe { ioctl(**fd, request as _, &mut ifr as *mut libc::ifreq) };

        if op_result < 0 {
            return Err(PppoeError::InterfaceQuery {
                interface: interface.shared(),
                source: std::io::Error::last_os_error(),
            });
        }

        Ok(ifr)
    }
}

impl InterfaceResolver for ControlSocket {
    fn resolve_index(&self, interface: &InterfaceName) -> Result<u32, PppoeError> {
        let ifr = self.query(interface, libc::SIOCGIFINDEX as libc::c_ulong)?;
        let index = unsafe { ifr.ifr_ifru.ifru_ifindex };

        Ok(index as u32)
    }

    fn resolve_hardware_address(
        &self,
        interface: &InterfaceName,
    ) -> Result<MacAddress, PppoeError> {
        let ifr = self.query(interface, libc::SIOCGIFHWADDR as libc::c_ulong)?;
        let hwaddr = unsafe { ifr.ifr_ifru.ifru_hwaddr };

        let mut bytes = [0u8; 6];
        for (dst, src) in bytes.iter_mut().zip(hwaddr.sa_data) {
            *dst = src as u8;
        }

        Ok(MacAddress::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_control_socket_refuses_queries() {
        let control = ControlSocket::new();
        let interface = InterfaceName::new("lo").unwrap();

        assert!(matches!(
            control.resolve_index(&interface),
            Err(PppoeError::ControlSocketUnset)
        ));
        assert!(matches!(
            control.resolve_hardware_address(&interface),
            Err(PppoeError::ControlSocketUnset)
        ));
    }

    #[test]
    fn close_without_init_is_a_no_op() {
        let mut control = ControlSocket::new();
        control.close();
        control.close();
        assert!(!control.is_open());
    }
}
