// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Hardware hierarchy acquisition using the `hwlocality` crate.
//!
//! The topology is either scanned from the running machine or imported from an hwloc
//! XML export (see [`crate::config::HWLOC_XML_ENV`]).  Only the facts needed by
//! [`crate::numa`] are kept: NUMA nodes, their core counts, and the OS devices local
//! to them along with the PCI function each hangs off.

use std::path::{Path, PathBuf};

use hwlocality::Topology;
use hwlocality::object::TopologyObject;
use hwlocality::object::attributes::ObjectAttributes;
use hwlocality::object::types::{OSDeviceType, ObjectType};
use hwlocality::topology::builder::{BuildFlags, TopologyBuilder, TypeFilter};
use tracing::{debug, trace};

use crate::context::Context;
use crate::device::classify;
use crate::hierarchy::{Hierarchy, HierarchySource, RawDevice, RawNumaNode, SourceError};

fn scan_error(err: impl std::fmt::Display) -> SourceError {
    SourceError::Scan(err.to_string())
}

/// A [`HierarchySource`] backed by hwloc.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HwlocSource {
    xml: Option<PathBuf>,
}

impl HwlocSource {
    /// Scan the running machine.
    #[must_use]
    pub fn live() -> Self {
        Self::default()
    }

    /// Import the topology from an hwloc XML export instead of scanning.
    #[must_use]
    pub fn from_xml(path: impl Into<PathBuf>) -> Self {
        Self {
            xml: Some(path.into()),
        }
    }

    /// The XML export this source reads, if any.
    #[must_use]
    pub fn xml(&self) -> Option<&Path> {
        self.xml.as_deref()
    }

    fn builder(&self) -> Result<TopologyBuilder, SourceError> {
        let mut builder = Topology::builder();
        if let Some(xml) = &self.xml {
            builder = builder.from_xml_file(xml).map_err(scan_error)?;
        }
        builder
            .with_type_filter(ObjectType::Core, TypeFilter::KeepAll)
            .map_err(scan_error)?
            .with_type_filter(ObjectType::NUMANode, TypeFilter::KeepAll)
            .map_err(scan_error)?
            .with_type_filter(ObjectType::PCIDevice, TypeFilter::KeepAll)
            .map_err(scan_error)?
            .with_type_filter(ObjectType::OSDevice, TypeFilter::KeepAll)
            .map_err(scan_error)?
            // scan the hardware, not what this process happens to be allowed to use
            .with_flags(BuildFlags::INCLUDE_DISALLOWED)
            .map_err(scan_error)
    }
}

/// The canonical address of the PCI function `object` hangs off, if any.
fn pci_address(object: &TopologyObject) -> Option<String> {
    object
        .ancestors()
        .find_map(|ancestor| match ancestor.attributes() {
            Some(ObjectAttributes::PCIDevice(pci)) => Some(format!(
                "{:04x}:{:02x}:{:02x}.{:x}",
                pci.domain(),
                pci.bus_id(),
                pci.bus_device(),
                pci.function()
            )),
            _ => None,
        })
}

/// The hwloc name of an OS device class (`Network`, `OpenFabrics`, `GPU`, ...).
fn device_class(device_type: OSDeviceType) -> Option<String> {
    match device_type {
        // strum refuses to display this one
        OSDeviceType::Unknown(_) => None,
        known => Some(known.to_string()),
    }
}

fn raw_device(object: &TopologyObject) -> Option<RawDevice> {
    let name = object.name()?.to_string_lossy().to_string();
    let Some(pci_addr) = pci_address(object) else {
        trace!(name = %name, "ignoring OS device which is not behind a PCI function");
        return None;
    };
    let class = match object.attributes() {
        Some(ObjectAttributes::OSDevice(os)) => device_class(os.device_type()),
        _ => None,
    };
    // block devices, GPUs and the like are of no interest for endpoint placement
    if classify(class.as_deref(), &name).is_unknown() {
        trace!(name = %name, class = ?class, "ignoring OS device of no network relevance");
        return None;
    }
    Some(RawDevice {
        name,
        class,
        pci_addr,
    })
}

/// Walk a built hwloc topology into a [`Hierarchy`].
fn walk(topology: &Topology) -> Hierarchy {
    let cores: Vec<&TopologyObject> = topology.objects_with_type(ObjectType::Core).collect();
    // (device, smallest non-I/O ancestor); the ancestor carries the device's locality
    let devices: Vec<(RawDevice, Option<&TopologyObject>)> = topology
        .os_devices()
        .filter_map(|object| {
            let local = object.ancestors().find(|a| a.cpuset().is_some());
            raw_device(object).map(|raw| (raw, local))
        })
        .collect();

    let numa_objects: Vec<&TopologyObject> =
        topology.objects_with_type(ObjectType::NUMANode).collect();
    let numa_nodes = numa_objects
        .iter()
        .filter_map(|numa| {
            let Some(id) = numa.os_index() else {
                debug!("skipping NUMA node without an OS index");
                return None;
            };
            let cpuset = numa.cpuset()?;
            let local_cores = cores
                .iter()
                .filter(|c| c.is_inside_cpuset(&*cpuset))
                .count();
            let local_devices = devices
                .iter()
                .filter(|(_, local)| local.is_some_and(|l| l.is_inside_cpuset(&*cpuset)))
                .map(|(raw, _)| raw.clone())
                .collect();
            Some(RawNumaNode {
                id: u32::try_from(id).ok()?,
                cores: local_cores,
                devices: local_devices,
            })
        })
        .collect();

    // devices whose locality matches no NUMA node are reported machine-wide
    let unattributed = devices
        .into_iter()
        .filter(|(_, local)| {
            !local.is_some_and(|l| {
                numa_objects
                    .iter()
                    .filter_map(|numa| numa.cpuset())
                    .any(|cpuset| l.is_inside_cpuset(&*cpuset))
            })
        })
        .map(|(raw, _)| raw)
        .collect();

    Hierarchy {
        numa_nodes,
        cores: cores.len(),
        devices: unattributed,
    }
}

impl HierarchySource for HwlocSource {
    #[tracing::instrument(level = "debug", skip(self, ctx), fields(xml = ?self.xml), err)]
    fn acquire(&self, ctx: &Context) -> Result<Hierarchy, SourceError> {
        ctx.err()?;
        // the hwloc topology is released when it drops at the end of this scope
        let topology = self.builder()?.build().map_err(scan_error)?;
        // the scan itself cannot be interrupted; give up before walking it instead
        ctx.err()?;
        let hierarchy = walk(&topology);
        debug!(
            numa_nodes = hierarchy.numa_nodes.len(),
            cores = hierarchy.cores,
            devices = hierarchy.devices.len(),
            "scanned hardware hierarchy"
        );
        Ok(hierarchy)
    }
}
