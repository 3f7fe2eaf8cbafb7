// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI bus addresses.
//!
//! This module provides the [`PciAddress`] type, the canonical
//! `domain:bus:device.function` identifier of a PCI function.
//!
//! # Examples
//!
//! ```
//! use fabtopo_hardware::pci::address::PciAddress;
//!
//! let addr: PciAddress = "0000:18:00.0".parse().unwrap();
//! assert_eq!(addr.bus(), 0x18);
//! assert_eq!(addr.to_string(), "0000:18:00.0");
//! ```

use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Largest legal PCI device number (5 bits).
const MAX_DEVICE: u8 = 0x1f;
/// Largest legal PCI function number (3 bits).
const MAX_FUNCTION: u8 = 0x07;

/// Errors which may occur when parsing a [`PciAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPciAddress {
    /// The string is not of the form `[domain:]bus:device.function`.
    #[error("malformed PCI address {0:?}")]
    Malformed(String),
    /// One of the fields is not a hexadecimal number of the right width.
    #[error("invalid {field} in PCI address {address:?}: {source}")]
    Field {
        /// Name of the offending field.
        field: &'static str,
        /// The address being parsed.
        address: String,
        /// The underlying parse error.
        source: ParseIntError,
    },
    /// The device number does not fit in 5 bits.
    #[error("PCI device number {0:#x} out of range (max {MAX_DEVICE:#x})")]
    DeviceOutOfRange(u8),
    /// The function number does not fit in 3 bits.
    #[error("PCI function number {0:#x} out of range (max {MAX_FUNCTION:#x})")]
    FunctionOutOfRange(u8),
}

/// A PCI bus address in `domain:bus:device.function` form.
///
/// # Display
///
/// Addresses render in the canonical sysfs / hwloc form, e.g. `0000:3d:00.1`.
///
/// # Ordering
///
/// Addresses order by domain, then bus, then device, then function, which is also
/// the lexical order of their canonical string form.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct PciAddress {
    domain: u16,
    bus: u8,
    device: u8,
    function: u8,
}

impl PciAddress {
    /// Creates a new PCI address.
    ///
    /// # Errors
    ///
    /// Returns an error if `device` or `function` exceed the width of their field.
    pub fn new(domain: u16, bus: u8, device: u8, function: u8) -> Result<Self, InvalidPciAddress> {
        if device > MAX_DEVICE {
            return Err(InvalidPciAddress::DeviceOutOfRange(device));
        }
        if function > MAX_FUNCTION {
            return Err(InvalidPciAddress::FunctionOutOfRange(function));
        }
        Ok(Self {
            domain,
            bus,
            device,
            function,
        })
    }

    /// The PCI domain (segment group).
    #[must_use]
    pub fn domain(self) -> u16 {
        self.domain
    }

    /// The bus number.
    #[must_use]
    pub fn bus(self) -> u8 {
        self.bus
    }

    /// The device number on the bus.
    #[must_use]
    pub fn device(self) -> u8 {
        self.device
    }

    /// The function number of the device.
    #[must_use]
    pub fn function(self) -> u8 {
        self.function
    }
}

impl Display for PciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for PciAddress {
    type Err = InvalidPciAddress;

    /// Parses `dddd:bb:dd.f`, or `bb:dd.f` with an implied domain of `0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || InvalidPciAddress::Malformed(s.to_string());
        let field = |field: &'static str| {
            move |source| InvalidPciAddress::Field {
                field,
                address: s.to_string(),
                source,
            }
        };
        let (slot, function) = s.trim().rsplit_once('.').ok_or_else(malformed)?;
        let parts: Vec<&str> = slot.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [domain, bus, device] => (*domain, *bus, *device),
            [bus, device] => ("0", *bus, *device),
            _ => return Err(malformed()),
        };
        Self::new(
            u16::from_str_radix(domain, 16).map_err(field("domain"))?,
            u8::from_str_radix(bus, 16).map_err(field("bus"))?,
            u8::from_str_radix(device, 16).map_err(field("device"))?,
            u8::from_str_radix(function, 16).map_err(field("function"))?,
        )
    }
}

impl TryFrom<String> for PciAddress {
    type Error = InvalidPciAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PciAddress> for String {
    fn from(value: PciAddress) -> Self {
        value.to_string()
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use super::{MAX_DEVICE, MAX_FUNCTION, PciAddress};
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for PciAddress {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(PciAddress {
                domain: driver.produce()?,
                bus: driver.produce()?,
                device: driver.produce::<u8>()? & MAX_DEVICE,
                function: driver.produce::<u8>()? & MAX_FUNCTION,
            })
        }
    }
}
