// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The normalized topology of a machine.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::context::{Context, ContextError};
use crate::device::Device;
use crate::hierarchy::{Hierarchy, SourceError};
use crate::numa::{NumaNode, build_nodes};
use crate::pci::address::PciAddress;

/// The NUMA nodes of a machine, keyed by node id.
///
/// A `Topology` is immutable once built; every call to
/// [`TopologyProvider::topology`] builds a fresh one.  A deserialized topology must key
/// every node by its own id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "TopologyFields", into = "TopologyFields")
)]
pub struct Topology {
    numa_nodes: BTreeMap<u32, NumaNode>,
}

/// Reasons a deserialized [`Topology`] is rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidTopology {
    /// A node is keyed by an id other than its own.
    #[error("NUMA node {id} is listed under id {key}")]
    IdMismatch {
        /// The key the node is listed under.
        key: u32,
        /// The node's own id.
        id: u32,
    },
}

/// The serialized shape of a [`Topology`].
#[cfg(any(test, feature = "serde"))]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyFields {
    numa_nodes: BTreeMap<u32, NumaNode>,
}

#[cfg(any(test, feature = "serde"))]
impl TryFrom<TopologyFields> for Topology {
    type Error = InvalidTopology;

    fn try_from(fields: TopologyFields) -> Result<Self, Self::Error> {
        if let Some((key, node)) = fields.numa_nodes.iter().find(|(key, node)| **key != node.id()) {
            return Err(InvalidTopology::IdMismatch {
                key: *key,
                id: node.id(),
            });
        }
        Ok(Self {
            numa_nodes: fields.numa_nodes,
        })
    }
}

#[cfg(any(test, feature = "serde"))]
impl From<Topology> for TopologyFields {
    fn from(topology: Topology) -> Self {
        Self {
            numa_nodes: topology.numa_nodes,
        }
    }
}

impl Topology {
    /// Classify and assemble a raw hierarchy.
    ///
    /// A machine without NUMA grouping yields a single node `0`.
    #[must_use]
    pub fn from_hierarchy(hierarchy: &Hierarchy) -> Self {
        Self {
            numa_nodes: build_nodes(hierarchy),
        }
    }

    /// All NUMA nodes, keyed by id.
    #[must_use]
    pub fn numa_nodes(&self) -> &BTreeMap<u32, NumaNode> {
        &self.numa_nodes
    }

    /// The NUMA node with the given id, if any.
    #[must_use]
    pub fn numa_node(&self, id: u32) -> Option<&NumaNode> {
        self.numa_nodes.get(&id)
    }

    /// The number of NUMA nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.numa_nodes.len()
    }

    /// Returns `true` if the topology has no NUMA nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numa_nodes.is_empty()
    }

    /// Total number of cores across all nodes.
    #[must_use]
    pub fn num_cores(&self) -> usize {
        self.numa_nodes.values().map(NumaNode::num_cores).sum()
    }

    /// The node a PCI function is local to, if it is known.
    #[must_use]
    pub fn node_of(&self, addr: &PciAddress) -> Option<&NumaNode> {
        self.numa_nodes
            .values()
            .find(|node| node.devices().get(addr).is_some())
    }

    /// Find a device by its OS name, along with the node it is local to.
    #[must_use]
    pub fn find_device(&self, name: &str) -> Option<(&NumaNode, &Device)> {
        self.numa_nodes.values().find_map(|node| {
            node.devices()
                .devices()
                .find(|device| device.name() == name)
                .map(|device| (node, device))
        })
    }

    /// Iterate over the nodes in ascending id order.
    pub fn iter(&self) -> btree_map::Values<'_, u32, NumaNode> {
        self.numa_nodes.values()
    }
}

impl<'a> IntoIterator for &'a Topology {
    type Item = &'a NumaNode;
    type IntoIter = btree_map::Values<'a, u32, NumaNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Errors which may occur while producing a [`Topology`].
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// The context was done before the hierarchy was acquired.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// The hierarchy source failed.
    #[error("unable to acquire hardware hierarchy")]
    Source(#[from] SourceError),
    /// The acquisition task panicked or was aborted.
    #[error("hierarchy acquisition task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// Something which can produce the [`Topology`] of the machine.
pub trait TopologyProvider: Send + Sync {
    /// Produce the current topology.
    ///
    /// The context governs hierarchy acquisition only; once the hierarchy has been
    /// acquired the (fast, in-memory) assembly runs to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`TopologyError`] if the context is done before acquisition completes or
    /// if acquisition fails.  No partial topology is ever returned.
    fn topology(
        &self,
        ctx: &Context,
    ) -> impl Future<Output = Result<Topology, TopologyError>> + Send;
}
