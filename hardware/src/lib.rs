// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors
//
// # Hardware topology discovery and normalization

//! The `hardware` crate turns the hardware hierarchy of a machine into a normalized
//! [`Topology`]: the NUMA nodes of the machine, the number of cores local to each, and
//! the network-relevant PCI devices attached to each.
//!
//! ## Overview
//!
//! Binding compute threads and fabric endpoints to the NUMA node closest to the network
//! adapter they use requires a handful of facts about the machine:
//!
//! - **NUMA nodes**: which ones exist, and how many cores each has
//! - **Devices**: which network and `OpenFabrics` devices exist, and which PCI function
//!   each belongs to
//! - **Locality**: which NUMA node each PCI function is attached to
//!
//! This crate computes exactly those facts; it does not make placement decisions.
//!
//! ## Architecture
//!
//! Acquisition and normalization are split:
//!
//! - A [`HierarchySource`] produces a raw [`Hierarchy`] (NUMA nodes, core counts, and raw
//!   device descriptors).  Sources may block and may fail.
//! - [`Topology::from_hierarchy`] classifies every raw device
//!   ([`device::classify`]), indexes devices by PCI address ([`pci::PciDevices`]) and
//!   builds the NUMA nodes ([`numa::build_nodes`]).  This step is pure and cannot fail.
//! - A [`Provider`] ties the two together behind the [`TopologyProvider`] contract,
//!   racing acquisition against a cancellable, deadline-bearing [`Context`].  The
//!   source is handed the same context, and an interrupted call returns only once the
//!   source has let go of whatever it acquired.
//!
//! Machines without NUMA grouping are reported as a single node `0`.
//!
//! ## Sources
//!
//! - `file::FileSource`: a static YAML hierarchy file (see
//!   [`config::HIERARCHY_FILE_ENV`]; requires the `file` feature).
//! - `scan::HwlocSource`: live hardware or an hwloc XML export (requires the `scan`
//!   feature).
//! - [`Hierarchy`] itself, for fixed in-memory hierarchies.
//!
//! ## Features
//!
//! - `file` (default): Enables static YAML hierarchy files as a source.
//! - `scan`: Enables hardware topology scanning using the `hwlocality` crate.
//! - `serde`: Adds serialization support for the topology model using serde.
//!   Deserialized values are validated against the same invariants the builder keeps.
//! - `bolero`: Enables fuzzing support for testing.

#![deny(clippy::pedantic, clippy::unwrap_used)]

pub mod config;
pub mod context;
pub mod device;
#[cfg(feature = "file")]
pub mod file;
pub mod hierarchy;
pub mod numa;
pub mod pci;
pub mod provider;
pub mod topology;

#[cfg(feature = "scan")]
pub mod scan;

pub use context::{Context, ContextError};
pub use device::{Device, DeviceType};
pub use hierarchy::{Hierarchy, HierarchySource, SourceError};
pub use numa::NumaNode;
pub use pci::{InvalidPciDevices, PciDevices};
pub use pci::address::PciAddress;
pub use provider::Provider;
pub use topology::{InvalidTopology, Topology, TopologyError, TopologyProvider};
