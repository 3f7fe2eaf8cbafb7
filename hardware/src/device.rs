// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network-relevant devices and their classification.

use crate::pci::address::PciAddress;
use tracing::trace;

/// The classes of device this crate distinguishes.
///
/// Anything which is neither a plain network interface nor an `OpenFabrics`
/// (verbs / RDMA) device is [`DeviceType::Unknown`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    strum::Display,
    strum::EnumIs,
    strum::EnumIter,
)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum DeviceType {
    /// An unrecognized or unclassified device.
    #[default]
    Unknown,
    /// A standard network interface (e.g. `eth0`, `ib0`).
    Network,
    /// An `OpenFabrics` class device (e.g. `hfi1_0`, `mlx4_0`).
    OpenFabrics,
}

/// Classify a raw device record.
///
/// `raw_class` is the device class reported by the hierarchy source (hwloc names
/// these `Network` and `OpenFabrics`).  Matching ignores ASCII case and surrounding
/// whitespace.  A missing or unrecognized class is [`DeviceType::Unknown`]; the
/// device name is never used to guess.
#[must_use]
pub fn classify(raw_class: Option<&str>, raw_name: &str) -> DeviceType {
    let device_type = match raw_class.map(str::trim) {
        Some(class) if class.eq_ignore_ascii_case("network") || class.eq_ignore_ascii_case("net") => {
            DeviceType::Network
        }
        Some(class) if class.eq_ignore_ascii_case("openfabrics") => DeviceType::OpenFabrics,
        _ => DeviceType::Unknown,
    };
    trace!(name = raw_name, class = ?raw_class, %device_type, "classified device");
    device_type
}

/// A device attached to a PCI function.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Device {
    name: String,
    #[cfg_attr(any(test, feature = "serde"), serde(rename = "type"))]
    device_type: DeviceType,
    pci_addr: PciAddress,
}

impl Device {
    /// Create a new device record.
    #[must_use]
    pub fn new(name: impl Into<String>, device_type: DeviceType, pci_addr: PciAddress) -> Self {
        Self {
            name: name.into(),
            device_type,
            pci_addr,
        }
    }

    /// The OS name of the device (e.g. `ib0`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class of the device.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// The PCI function this device belongs to.
    #[must_use]
    pub fn pci_addr(&self) -> PciAddress {
        self.pci_addr
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use super::{Device, DeviceType};
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for DeviceType {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(match driver.produce::<u8>()? % 3 {
                0 => DeviceType::Unknown,
                1 => DeviceType::Network,
                _ => DeviceType::OpenFabrics,
            })
        }
    }

    impl TypeGenerator for Device {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(Device {
                name: driver.produce()?,
                device_type: driver.produce()?,
                pci_addr: driver.produce()?,
            })
        }
    }
}
