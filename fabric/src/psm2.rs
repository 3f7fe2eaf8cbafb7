// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The psm2 provider's endpoint name.
//!
//! The psm2 provider (`psmx2`) advertises the HFI it is bound to inside the source
//! address of each `fi_info` it returns.  The address is a `struct psmx2_ep_name`:
//!
//! | offset | width | field        |
//! |--------|-------|--------------|
//! | 0      | 8     | reserved     |
//! | 8      | 1     | reserved     |
//! | 9      | 1     | `unit` (i8)  |
//! | 10     | 1     | `port`       |
//! | 11     | 1     | reserved     |
//! | 12     | 4     | `service`    |
//!
//! This layout is private to the provider.  If a provider upgrade moves the unit field
//! the fixture test in this module fails.

use core::ffi::c_void;
use core::mem::{offset_of, size_of};

/// Value of the `unit` field when the provider found every HFI unit in use.
pub const ALL_UNITS_USED: i8 = -1;

/// Errors which may occur when decoding the HFI unit of a provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error, strum::EnumIs)]
pub enum HfiUnitError {
    /// The record carries no source address.
    #[error("nil source address")]
    NilSourceAddress,
    /// The provider reported that every HFI unit is already in use.
    #[error("all HFI used")]
    AllHfiUsed,
    /// The source address is too short to hold a psm2 endpoint name.
    #[error("source address of {len} bytes is too short for a psm2 endpoint name")]
    ShortSourceAddress {
        /// The advertised source address length.
        len: usize,
    },
    /// The source address is in a format other than a psm2 endpoint name.
    #[error("source address format {format} is not a psm2 endpoint name")]
    ForeignAddressFormat {
        /// The record's `addr_format`.
        format: u32,
    },
}

/// `struct psmx2_ep_name`
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Psmx2EpName {
    reserved_1: u64,
    reserved_2: u8,
    unit: i8,
    port: u8,
    reserved_3: u8,
    service: u32,
}

const _: () = assert!(size_of::<Psmx2EpName>() == 16);
const _: () = assert!(offset_of!(Psmx2EpName, unit) == 9);
const _: () = assert!(offset_of!(Psmx2EpName, service) == 12);

impl Psmx2EpName {
    /// Size of the endpoint name in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// Decode an endpoint name from its native-endian byte representation.
    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        // SAFETY: every field is a plain integer, so every bit pattern is valid, and the
        // sizes are asserted equal above.
        unsafe { core::mem::transmute::<[u8; Self::SIZE], Self>(bytes) }
    }

    /// Read an endpoint name from a provider source address.
    ///
    /// # Safety
    ///
    /// `addr` must be non-null and point to at least [`Self::SIZE`] readable bytes.  No
    /// alignment is required.
    #[must_use]
    pub unsafe fn read(addr: *const c_void) -> Self {
        unsafe { addr.cast::<Self>().read_unaligned() }
    }

    /// The raw unit field (`-1` when every unit is in use).
    #[must_use]
    pub fn unit(&self) -> i8 {
        self.unit
    }

    /// The HFI port.
    #[must_use]
    pub fn port(&self) -> u8 {
        self.port
    }

    /// The psm2 service id.
    #[must_use]
    pub fn service(&self) -> u32 {
        self.service
    }

    /// The HFI unit this endpoint is bound to.
    ///
    /// The value is not range checked beyond the "all units used" sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`HfiUnitError::AllHfiUsed`] if the provider found every unit in use.
    pub fn hfi_unit(&self) -> Result<i32, HfiUnitError> {
        if self.unit == ALL_UNITS_USED {
            return Err(HfiUnitError::AllHfiUsed);
        }
        Ok(i32::from(self.unit))
    }
}
