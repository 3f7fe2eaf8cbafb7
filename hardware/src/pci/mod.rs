// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI addresses and the per-address device index.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::device::Device;
use crate::pci::address::PciAddress;

pub mod address;

/// An ordered multimap of devices keyed by the PCI function they belong to.
///
/// Several devices may share one PCI function (a multi-port adapter exposes
/// an IP interface and a verbs device for each port, for example).  Within one
/// address devices are kept in the order they were added, so downstream pairing
/// logic may rely on adjacency.
///
/// An address is only present once a device has been added at it; an empty index
/// means "no devices".  Deserialization rejects maps which break either rule (see
/// [`InvalidPciDevices`]).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(
        try_from = "BTreeMap<PciAddress, Vec<Device>>",
        into = "BTreeMap<PciAddress, Vec<Device>>"
    )
)]
pub struct PciDevices(BTreeMap<PciAddress, Vec<Device>>);

/// Reasons a map of devices is not a valid [`PciDevices`] index.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidPciDevices {
    /// An address is listed without any device.
    #[error("no devices listed at {0}")]
    EmptySequence(PciAddress),
    /// A device is listed under an address other than its own.
    #[error("device {name} of {found} is listed under {key}")]
    AddressMismatch {
        /// The address the device is listed under.
        key: PciAddress,
        /// The OS name of the device.
        name: String,
        /// The device's own address.
        found: PciAddress,
    },
}

impl PciDevices {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a device to the sequence at its PCI address.
    ///
    /// Adding `None` does nothing.
    pub fn add(&mut self, device: impl Into<Option<Device>>) {
        let Some(device) = device.into() else {
            return;
        };
        self.0.entry(device.pci_addr()).or_default().push(device);
    }

    /// Append a device to `index`, if there is an index to append to.
    ///
    /// Useful while an index is still being assembled; an absent index or device
    /// is a no-op rather than an error.
    pub fn add_to(index: Option<&mut PciDevices>, device: impl Into<Option<Device>>) {
        if let Some(index) = index {
            index.add(device);
        }
    }

    /// The devices at `addr`, in the order they were added.
    #[must_use]
    pub fn get(&self, addr: &PciAddress) -> Option<&[Device]> {
        self.0.get(addr).map(Vec::as_slice)
    }

    /// Iterate over every address and its devices, in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&PciAddress, &[Device])> {
        self.0.iter().map(|(addr, devices)| (addr, devices.as_slice()))
    }

    /// Iterate over every device in the index.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.0.values().flatten()
    }

    /// The number of distinct PCI addresses with at least one device.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no device has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<PciAddress, Vec<Device>>> for PciDevices {
    type Error = InvalidPciDevices;

    fn try_from(map: BTreeMap<PciAddress, Vec<Device>>) -> Result<Self, Self::Error> {
        for (key, devices) in &map {
            if devices.is_empty() {
                return Err(InvalidPciDevices::EmptySequence(*key));
            }
            if let Some(device) = devices.iter().find(|device| device.pci_addr() != *key) {
                return Err(InvalidPciDevices::AddressMismatch {
                    key: *key,
                    name: device.name().to_string(),
                    found: device.pci_addr(),
                });
            }
        }
        Ok(Self(map))
    }
}

impl From<PciDevices> for BTreeMap<PciAddress, Vec<Device>> {
    fn from(index: PciDevices) -> Self {
        index.0
    }
}

impl Extend<Device> for PciDevices {
    fn extend<T: IntoIterator<Item = Device>>(&mut self, iter: T) {
        for device in iter {
            self.add(device);
        }
    }
}

impl FromIterator<Device> for PciDevices {
    fn from_iter<T: IntoIterator<Item = Device>>(iter: T) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl IntoIterator for PciDevices {
    type Item = (PciAddress, Vec<Device>);
    type IntoIter = btree_map::IntoIter<PciAddress, Vec<Device>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
