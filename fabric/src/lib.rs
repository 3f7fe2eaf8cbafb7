// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors
//
// # libfabric provider discovery

//! Enumerate libfabric providers and find out which HFI each one is bound to.
//!
//! [`list_providers`] asks libfabric (through a [`FabricLibrary`]) for the providers
//! matching a name and returns the resulting chain as an owned [`FiInfoList`].  Each
//! record is inspected through a borrowed [`FiInfo`] view:
//!
//! - [`FiInfo::provider`] and [`FiInfo::domain`] name the provider instance;
//! - [`FiInfo::hfi_unit`] decodes the psm2 endpoint name ([`psm2::Psmx2EpName`]) held in
//!   the record's source address.
//!
//! ## Features
//!
//! - `native`: links the system libfabric and provides [`Libfabric`].

#![deny(clippy::pedantic, clippy::unwrap_used)]

#[cfg(test)]
mod fake;
pub mod info;
pub mod library;
pub mod list;
pub mod psm2;

pub use info::FiInfo;
#[cfg(feature = "native")]
pub use library::Libfabric;
pub use library::FabricLibrary;
pub use list::{FabricError, FiInfoList, list_providers};
pub use psm2::{HfiUnitError, Psmx2EpName};
