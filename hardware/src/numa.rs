// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! NUMA nodes and the builder which derives them from a raw [`Hierarchy`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::device::{Device, classify};
use crate::hierarchy::{Hierarchy, RawDevice};
use crate::pci::PciDevices;

/// The id given to the single node synthesized for machines without NUMA grouping.
pub const IMPLICIT_NODE_ID: u32 = 0;

/// A NUMA node: its cores and the PCI devices local to it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NumaNode {
    id: u32,
    num_cores: usize,
    devices: PciDevices,
}

impl NumaNode {
    /// Create a NUMA node.
    #[must_use]
    pub fn new(id: u32, num_cores: usize, devices: PciDevices) -> Self {
        Self {
            id,
            num_cores,
            devices,
        }
    }

    /// The OS index of the node.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The number of cores local to this node.
    #[must_use]
    pub fn num_cores(&self) -> usize {
        self.num_cores
    }

    /// The PCI devices local to this node.
    #[must_use]
    pub fn devices(&self) -> &PciDevices {
        &self.devices
    }
}

fn index_devices<'a>(raw: impl IntoIterator<Item = &'a RawDevice>) -> PciDevices {
    raw.into_iter()
        .filter_map(|raw| match raw.pci_addr.parse() {
            Ok(pci_addr) => Some(Device::new(
                raw.name.clone(),
                classify(raw.class.as_deref(), &raw.name),
                pci_addr,
            )),
            Err(err) => {
                warn!(name = %raw.name, "skipping device: {err}");
                None
            }
        })
        .collect()
}

/// Build the NUMA nodes described by `hierarchy`, keyed by node id.
///
/// Every raw device is classified and indexed under the node reporting it.  If the
/// hierarchy reports no NUMA nodes at all, a single node [`IMPLICIT_NODE_ID`] is
/// synthesized holding the machine-wide cores and devices.  Otherwise machine-wide
/// devices have no locality and are left out.
#[must_use]
pub fn build_nodes(hierarchy: &Hierarchy) -> BTreeMap<u32, NumaNode> {
    if hierarchy.numa_nodes.is_empty() {
        let node = NumaNode::new(
            IMPLICIT_NODE_ID,
            hierarchy.cores,
            index_devices(&hierarchy.devices),
        );
        return BTreeMap::from([(IMPLICIT_NODE_ID, node)]);
    }
    if !hierarchy.devices.is_empty() {
        debug!(
            count = hierarchy.devices.len(),
            "ignoring devices without NUMA locality"
        );
    }
    let mut nodes = BTreeMap::new();
    for raw in &hierarchy.numa_nodes {
        let node = NumaNode::new(raw.id, raw.cores, index_devices(&raw.devices));
        if nodes.insert(raw.id, node).is_some() {
            warn!(id = raw.id, "duplicate NUMA node reported; keeping the last");
        }
    }
    nodes
}
