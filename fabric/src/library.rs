// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The libfabric entry points used for provider discovery.

use core::ffi::c_int;

use fabric_sys::fi_info;

/// The subset of libfabric needed to enumerate providers.
///
/// # Safety
///
/// Implementations must uphold the libfabric contracts:
///
/// - [`alloc_info`](Self::alloc_info) returns either null or a zeroed `fi_info` whose
///   `fabric_attr` and `domain_attr` are allocated, and whose strings may be replaced by
///   `malloc`ed strings.
/// - On success [`get_info`](Self::get_info) stores a chain of `fi_info` records which
///   stays valid until passed to [`free_info`](Self::free_info).
/// - [`free_info`](Self::free_info) releases a whole chain (or a hint record), including
///   every `malloc`ed string it references.
pub unsafe trait FabricLibrary {
    /// `fi_allocinfo()`
    fn alloc_info(&self) -> *mut fi_info;

    /// `fi_getinfo(version, NULL, NULL, 0, hints, info)`
    ///
    /// # Safety
    ///
    /// `hints` must be null or a record obtained from [`alloc_info`](Self::alloc_info),
    /// and `info` must be valid for writes.
    unsafe fn get_info(&self, version: u32, hints: *const fi_info, info: *mut *mut fi_info)
    -> c_int;

    /// `fi_freeinfo(info)`
    ///
    /// # Safety
    ///
    /// `info` must have been produced by this library and not yet freed.
    unsafe fn free_info(&self, info: *mut fi_info);

    /// A human-readable description of a (negative) libfabric return code.
    fn strerror(&self, code: c_int) -> String {
        format!("libfabric error {code}")
    }
}

/// The system libfabric.
#[cfg(feature = "native")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Libfabric;

#[cfg(feature = "native")]
unsafe impl FabricLibrary for Libfabric {
    fn alloc_info(&self) -> *mut fi_info {
        unsafe { fabric_sys::fi_allocinfo() }
    }

    unsafe fn get_info(
        &self,
        version: u32,
        hints: *const fi_info,
        info: *mut *mut fi_info,
    ) -> c_int {
        unsafe {
            fabric_sys::fi_getinfo(
                version,
                core::ptr::null(),
                core::ptr::null(),
                0,
                hints,
                info,
            )
        }
    }

    unsafe fn free_info(&self, info: *mut fi_info) {
        unsafe { fabric_sys::fi_freeinfo(info) }
    }

    fn strerror(&self, code: c_int) -> String {
        let message = unsafe { fabric_sys::fi_strerror(code.saturating_abs()) };
        if message.is_null() {
            return format!("libfabric error {code}");
        }
        unsafe { core::ffi::CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    }
}
