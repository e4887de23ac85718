//! Service descriptor.

use std::fmt;

/// A network service the caller wants to see reachable before it proceeds.
///
/// Descriptors are built once by discovery and only read afterwards; every
/// probing task borrows or clones its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Service {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl Service {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
        }
    }

    /// Returns `address:port`, used as the TCP target and the HTTP authority.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.address, self.port)
    }
}
