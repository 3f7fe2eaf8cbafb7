// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Raw libfabric declarations for provider discovery.
//!
//! Only the part of `rdma/fabric.h` needed to enumerate providers is declared.
//! Attribute structures whose fields are never read are left opaque, and
//! [`fi_domain_attr`] only declares its leading fields; those structures are only ever
//! accessed through pointers handed out by libfabric.
//!
//! The `layout-check` feature generates bindings from the installed `rdma/fabric.h` at
//! build time, and the tests compare these declarations against them.

// We don't need to throw down over differences in name style between C and Rust in the bindings.
#![allow(clippy::all, clippy::pedantic, non_camel_case_types)]

use core::ffi::{c_char, c_int, c_void};

/// Major version of the libfabric API this crate is written against.
pub const FI_MAJOR_VERSION: u32 = 1;
/// Minor version of the libfabric API this crate is written against.
pub const FI_MINOR_VERSION: u32 = 7;

/// `FI_VERSION(major, minor)`.
#[must_use]
pub const fn fi_version(major: u32, minor: u32) -> u32 {
    (major << 16) | minor
}

/// The API version requested from `fi_getinfo`.
pub const FI_VERSION: u32 = fi_version(FI_MAJOR_VERSION, FI_MINOR_VERSION);

/// `FI_ENODATA`: no provider matched the hints.
pub const FI_ENODATA: c_int = 61;

// `fi_info::addr_format` values (the anonymous address format enum).
pub const FI_FORMAT_UNSPEC: u32 = 0;
pub const FI_SOCKADDR: u32 = 1;
pub const FI_SOCKADDR_IN: u32 = 2;
pub const FI_SOCKADDR_IN6: u32 = 3;
pub const FI_SOCKADDR_IB: u32 = 4;
pub const FI_ADDR_PSMX: u32 = 5;
pub const FI_ADDR_GNI: u32 = 6;
pub const FI_ADDR_BGQ: u32 = 7;
pub const FI_ADDR_MLX: u32 = 8;
pub const FI_ADDR_STR: u32 = 9;
pub const FI_ADDR_PSMX2: u32 = 10;

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            #[derive(Debug)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    fid,
    fid_fabric,
    fid_domain,
    fid_nic,
    fi_tx_attr,
    fi_rx_attr,
    fi_ep_attr
);

/// `fid_t`
pub type fid_t = *mut fid;

/// `struct fi_fabric_attr`
#[repr(C)]
#[derive(Debug)]
pub struct fi_fabric_attr {
    pub fabric: *mut fid_fabric,
    pub name: *mut c_char,
    pub prov_name: *mut c_char,
    pub prov_version: u32,
    pub api_version: u32,
}

/// Leading fields of `struct fi_domain_attr`.
#[repr(C)]
#[derive(Debug)]
pub struct fi_domain_attr {
    pub domain: *mut fid_domain,
    pub name: *mut c_char,
}

/// `struct fi_info`
#[repr(C)]
#[derive(Debug)]
pub struct fi_info {
    pub next: *mut fi_info,
    pub caps: u64,
    pub mode: u64,
    pub addr_format: u32,
    pub src_addrlen: usize,
    pub dest_addrlen: usize,
    pub src_addr: *mut c_void,
    pub dest_addr: *mut c_void,
    pub handle: fid_t,
    pub tx_attr: *mut fi_tx_attr,
    pub rx_attr: *mut fi_rx_attr,
    pub ep_attr: *mut fi_ep_attr,
    pub domain_attr: *mut fi_domain_attr,
    pub fabric_attr: *mut fi_fabric_attr,
    pub nic: *mut fid_nic,
}

#[cfg(feature = "link")]
#[link(name = "fabric")]
unsafe extern "C" {
    pub fn fi_getinfo(
        version: u32,
        node: *const c_char,
        service: *const c_char,
        flags: u64,
        hints: *const fi_info,
        info: *mut *mut fi_info,
    ) -> c_int;
    pub fn fi_freeinfo(info: *mut fi_info);
    pub fn fi_dupinfo(info: *const fi_info) -> *mut fi_info;
    pub fn fi_strerror(errnum: c_int) -> *const c_char;
}

/// `fi_allocinfo()`: a zeroed `fi_info` with all attribute structures allocated.
///
/// # Safety
///
/// The result must be released with [`fi_freeinfo`].
#[cfg(feature = "link")]
#[must_use]
pub unsafe fn fi_allocinfo() -> *mut fi_info {
    unsafe { fi_dupinfo(core::ptr::null()) }
}
