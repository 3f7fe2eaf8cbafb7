// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Raw hardware hierarchy facts, as handed over by a [`HierarchySource`].
//!
//! A hierarchy is the already-walked output of a hardware locality tool: a list of
//! NUMA nodes, each with a core count and the raw devices local to it.  Machines
//! without NUMA grouping report their cores and devices at the top level instead.
//!
//! Nothing here is classified or validated yet; see [`crate::numa`] for that.

use std::path::PathBuf;

use crate::context::{Context, ContextError};

/// A raw device descriptor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RawDevice {
    /// OS name of the device (e.g. `ib0`).
    pub name: String,
    /// Device class reported by the source, if any (e.g. `Network`).
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub class: Option<String>,
    /// PCI address of the function the device hangs off.
    pub pci_addr: String,
}

/// A raw NUMA node descriptor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RawNumaNode {
    /// The OS index of the node.
    pub id: u32,
    /// Number of cores local to the node.
    #[cfg_attr(any(test, feature = "serde"), serde(default))]
    pub cores: usize,
    /// Devices local to the node, in discovery order.
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub devices: Vec<RawDevice>,
}

/// The walked hardware hierarchy of one machine.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
#[cfg_attr(any(test, feature = "serde"), serde(deny_unknown_fields))]
pub struct Hierarchy {
    /// NUMA nodes, in discovery order.  Empty on machines without NUMA grouping.
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub numa_nodes: Vec<RawNumaNode>,
    /// Machine-wide core count.
    #[cfg_attr(any(test, feature = "serde"), serde(default))]
    pub cores: usize,
    /// Devices not attributed to any NUMA node, in discovery order.
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub devices: Vec<RawDevice>,
}

/// Errors which may occur while acquiring a [`Hierarchy`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The hierarchy description file could not be read.
    #[error("unable to read hierarchy file {path:?}")]
    Read {
        /// The file which could not be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The hierarchy description file is malformed.
    #[cfg(any(test, feature = "file"))]
    #[error("malformed hierarchy file {path:?}")]
    Parse {
        /// The malformed file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_yaml_ng::Error,
    },
    /// Live (or XML) scanning of the hardware failed.
    #[error("hardware scan failed: {0}")]
    Scan(String),
    /// No hierarchy source is available in this build / environment.
    #[error("no hierarchy source configured")]
    NoSource,
    /// The source gave up because its context was done.
    #[error("hierarchy acquisition interrupted")]
    Interrupted(#[from] ContextError),
}

/// Something which can produce a [`Hierarchy`].
///
/// Implementations may block (they typically talk to the OS or read files) and are
/// run on a blocking thread by [`crate::provider::Provider`].  Any native resource
/// acquired along the way must be released before `acquire` returns.
///
/// The caller waits for `acquire` to return even after `ctx` is done, so long-running
/// sources should check [`Context::err`] between steps and bail out with
/// [`SourceError::Interrupted`].
pub trait HierarchySource: Send + Sync + 'static {
    /// Acquire the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the hierarchy cannot be acquired.
    fn acquire(&self, ctx: &Context) -> Result<Hierarchy, SourceError>;
}

/// A fixed, in-memory hierarchy.
impl HierarchySource for Hierarchy {
    fn acquire(&self, _ctx: &Context) -> Result<Hierarchy, SourceError> {
        Ok(self.clone())
    }
}

impl<S: HierarchySource + ?Sized> HierarchySource for Box<S> {
    fn acquire(&self, ctx: &Context) -> Result<Hierarchy, SourceError> {
        (**self).acquire(ctx)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use super::{Hierarchy, RawDevice, RawNumaNode};
    use crate::device::DeviceType;
    use crate::pci::address::PciAddress;
    use bolero::{Driver, TypeGenerator, ValueGenerator};

    /// Generates raw devices with a valid PCI address and a class recognized (or not) by the
    /// classifier.
    pub struct RawDeviceGenerator;

    impl ValueGenerator for RawDeviceGenerator {
        type Output = RawDevice;

        fn generate<D: Driver>(&self, driver: &mut D) -> Option<RawDevice> {
            let class = match driver.produce::<Option<DeviceType>>()? {
                Some(DeviceType::Unknown) => Some(driver.produce::<String>()?),
                Some(known) => Some(known.to_string()),
                None => None,
            };
            Some(RawDevice {
                name: driver.produce()?,
                class,
                pci_addr: driver.produce::<PciAddress>()?.to_string(),
            })
        }
    }

    fn raw_devices<D: Driver>(driver: &mut D) -> Option<Vec<RawDevice>> {
        let count = driver.produce::<u8>()? % 8;
        (0..count).map(|_| RawDeviceGenerator.generate(driver)).collect()
    }

    impl TypeGenerator for RawNumaNode {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            Some(RawNumaNode {
                id: u32::from(driver.produce::<u8>()?),
                cores: usize::from(driver.produce::<u16>()?),
                devices: raw_devices(driver)?,
            })
        }
    }

    impl TypeGenerator for Hierarchy {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let nodes = driver.produce::<u8>()? % 5;
            Some(Hierarchy {
                numa_nodes: (0..nodes)
                    .map(|_| driver.produce())
                    .collect::<Option<_>>()?,
                cores: usize::from(driver.produce::<u16>()?),
                devices: raw_devices(driver)?,
            })
        }
    }
}

#[cfg(any(test, feature = "bolero"))]
pub use contract::RawDeviceGenerator;
