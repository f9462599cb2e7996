//! Interface Name Module
//!
//! Provides `InterfaceName`, a validated network interface name that always fits
//! into the kernel's `IFNAMSIZ` sized name fields together with its terminating NUL.

use std::{fmt, ops::Deref, sync::Arc};

use crate::error::PppoeError;

/// Longest interface name the kernel accepts, leaving room for the terminator.
pub const MAX_INTERFACE_NAME_LEN: usize = libc::IFNAMSIZ - 1;

/// A non-empty interface name of at most [`MAX_INTERFACE_NAME_LEN`] bytes.
///
/// Over-length input is rejected, never truncated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName(Arc<str>);

impl InterfaceName {
    pub fn new(name: &str) -> Result<Self, PppoeError> {
        if name.is_empty() {
            return Err(PppoeError::EmptyInterfaceName);
        }

        if name.len() > MAX_INTERFACE_NAME_LEN {
            return Err(PppoeError::InterfaceNameTooLong(
                name.into(),
                MAX_INTERFACE_NAME_LEN,
            ));
        }

        if name.as_bytes().contains(&0) {
            return Err(PppoeError::InterfaceNameContainsNul);
        }

        Ok(Self(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shared handle to the name, used for error context.
    pub fn shared(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }

    /// Copies the name into a zeroed `IFNAMSIZ` buffer, leaving the NUL terminator in place.
    pub fn to_kernel_bytes(&self) -> [u8; libc::IFNAMSIZ] {
        let mut buffer = [0u8; libc::IFNAMSIZ];
        buffer[..self.0.len()].copy_from_slice(self.0.as_bytes());
        buffer
    }
}

impl Deref for InterfaceName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = PppoeError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}
