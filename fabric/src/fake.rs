// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-process stand-in for libfabric.
//!
//! Records are built the way libfabric builds them: structures are heap allocated and
//! strings are `malloc`ed, so the enumeration code can `strdup` into hints and have the
//! library free the result.

#![allow(clippy::unwrap_used)]

use core::cell::{Cell, RefCell};
use core::ffi::{c_char, c_int, c_void};
use std::ffi::{CStr, CString};

use fabric_sys::{
    FI_ADDR_PSMX2, FI_ENODATA, FI_FORMAT_UNSPEC, fi_domain_attr, fi_fabric_attr, fi_info,
};

use crate::info::FiInfo;
use crate::library::FabricLibrary;
use crate::psm2::Psmx2EpName;

/// What one fake provider record looks like.
#[derive(Clone, Debug)]
pub(crate) struct FakeProvider {
    /// Provider (and fabric) name.
    pub name: Option<Vec<u8>>,
    pub domain: Option<Vec<u8>>,
    pub fabric_attr: bool,
    pub domain_attr: bool,
    pub addr_format: u32,
    pub src_addr: Option<Vec<u8>>,
}

impl FakeProvider {
    pub fn psm2(domain: &str, unit: i8) -> Self {
        let mut addr = [0u8; Psmx2EpName::SIZE];
        addr[9] = unit.to_ne_bytes()[0];
        addr[10] = 1;
        Self {
            name: Some(b"psm2".to_vec()),
            domain: Some(domain.as_bytes().to_vec()),
            fabric_attr: true,
            domain_attr: true,
            addr_format: FI_ADDR_PSMX2,
            src_addr: Some(addr.to_vec()),
        }
    }

    pub fn named(name: &str, domain: &str) -> Self {
        Self {
            name: Some(name.as_bytes().to_vec()),
            domain: Some(domain.as_bytes().to_vec()),
            fabric_attr: true,
            domain_attr: true,
            addr_format: FI_FORMAT_UNSPEC,
            src_addr: None,
        }
    }

    fn provider_name(&self) -> Option<&[u8]> {
        if self.fabric_attr {
            self.name.as_deref()
        } else {
            None
        }
    }
}

fn malloc_str(bytes: Option<&[u8]>) -> *mut c_char {
    let Some(bytes) = bytes else {
        return core::ptr::null_mut();
    };
    let owned = CString::new(bytes).unwrap();
    let dup = unsafe { libc::strdup(owned.as_ptr()) };
    assert!(!dup.is_null());
    dup
}

fn malloc_bytes(bytes: &[u8]) -> *mut c_void {
    let buf = unsafe { libc::malloc(bytes.len().max(1)) };
    assert!(!buf.is_null());
    unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len()) };
    buf
}

fn empty_record(fabric_attr: bool, domain_attr: bool) -> *mut fi_info {
    let fabric_attr = if fabric_attr {
        Box::into_raw(Box::new(fi_fabric_attr {
            fabric: core::ptr::null_mut(),
            name: core::ptr::null_mut(),
            prov_name: core::ptr::null_mut(),
            prov_version: 0,
            api_version: 0,
        }))
    } else {
        core::ptr::null_mut()
    };
    let domain_attr = if domain_attr {
        Box::into_raw(Box::new(fi_domain_attr {
            domain: core::ptr::null_mut(),
            name: core::ptr::null_mut(),
        }))
    } else {
        core::ptr::null_mut()
    };
    Box::into_raw(Box::new(fi_info {
        next: core::ptr::null_mut(),
        caps: 0,
        mode: 0,
        addr_format: 0,
        src_addrlen: 0,
        dest_addrlen: 0,
        src_addr: core::ptr::null_mut(),
        dest_addr: core::ptr::null_mut(),
        handle: core::ptr::null_mut(),
        tx_attr: core::ptr::null_mut(),
        rx_attr: core::ptr::null_mut(),
        ep_attr: core::ptr::null_mut(),
        domain_attr,
        fabric_attr,
        nic: core::ptr::null_mut(),
    }))
}

fn build(provider: &FakeProvider) -> *mut fi_info {
    let info = empty_record(provider.fabric_attr, provider.domain_attr);
    let record = unsafe { &mut *info };
    if let Some(attr) = unsafe { record.fabric_attr.as_mut() } {
        attr.name = malloc_str(provider.name.as_deref());
        attr.prov_name = malloc_str(provider.name.as_deref());
    }
    if let Some(attr) = unsafe { record.domain_attr.as_mut() } {
        attr.name = malloc_str(provider.domain.as_deref());
    }
    record.addr_format = provider.addr_format;
    if let Some(addr) = &provider.src_addr {
        record.src_addr = malloc_bytes(addr);
        record.src_addrlen = addr.len();
    }
    info
}

/// Free a single record (not its successors).
unsafe fn destroy(info: *mut fi_info) {
    let record = unsafe { Box::from_raw(info) };
    if !record.fabric_attr.is_null() {
        let attr = unsafe { Box::from_raw(record.fabric_attr) };
        unsafe {
            libc::free(attr.name.cast());
            libc::free(attr.prov_name.cast());
        }
    }
    if !record.domain_attr.is_null() {
        let attr = unsafe { Box::from_raw(record.domain_attr) };
        unsafe { libc::free(attr.name.cast()) };
    }
    unsafe { libc::free(record.src_addr) };
}

/// A single record outside of any list, for exercising [`FiInfo`] directly.
pub(crate) struct Record(*mut fi_info);

impl Record {
    pub fn new(provider: &FakeProvider) -> Self {
        Self(build(provider))
    }

    pub fn view(&self) -> FiInfo<'_> {
        unsafe { FiInfo::from_raw(self.0) }
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        unsafe { destroy(self.0) };
    }
}

/// A fake libfabric which hands out chains built from [`FakeProvider`]s.
///
/// Like libfabric, a hint naming a provider restricts the result to records of that
/// provider, and an empty result is reported as `-FI_ENODATA`.
#[derive(Debug, Default)]
pub(crate) struct FakeLibrary {
    providers: Vec<FakeProvider>,
    fail_alloc: bool,
    fail_with: Option<c_int>,
    /// Hand back a chain even though an error code is returned.
    chain_on_error: bool,
    live: Cell<isize>,
    free_calls: Cell<usize>,
    hint: RefCell<Option<Option<Vec<u8>>>>,
}

impl FakeLibrary {
    pub fn new(providers: impl IntoIterator<Item = FakeProvider>) -> Self {
        Self {
            providers: providers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn failing_alloc(mut self) -> Self {
        self.fail_alloc = true;
        self
    }

    pub fn failing_with(mut self, code: c_int) -> Self {
        self.fail_with = Some(code);
        self
    }

    pub fn with_chain_on_error(mut self) -> Self {
        self.chain_on_error = true;
        self
    }

    /// Records (hints included) allocated and not yet freed.
    pub fn live(&self) -> isize {
        self.live.get()
    }

    /// Number of `free_info` calls.
    pub fn free_calls(&self) -> usize {
        self.free_calls.get()
    }

    /// The provider name carried by the last hint, `Some(None)` if the hint left it unset.
    pub fn last_hint(&self) -> Option<Option<Vec<u8>>> {
        self.hint.borrow().clone()
    }

    fn chain<'a>(
        &self,
        providers: impl DoubleEndedIterator<Item = &'a FakeProvider>,
    ) -> *mut fi_info {
        let mut head: *mut fi_info = core::ptr::null_mut();
        for provider in providers.rev() {
            let info = build(provider);
            unsafe { (*info).next = head };
            head = info;
            self.live.set(self.live.get() + 1);
        }
        head
    }
}

unsafe impl FabricLibrary for FakeLibrary {
    fn alloc_info(&self) -> *mut fi_info {
        if self.fail_alloc {
            return core::ptr::null_mut();
        }
        self.live.set(self.live.get() + 1);
        empty_record(true, true)
    }

    unsafe fn get_info(
        &self,
        version: u32,
        hints: *const fi_info,
        info: *mut *mut fi_info,
    ) -> c_int {
        assert_eq!(version, fabric_sys::FI_VERSION);
        let wanted = unsafe { hints.as_ref() }
            .and_then(|hint| unsafe { hint.fabric_attr.as_ref() })
            .and_then(|attr| {
                if attr.prov_name.is_null() {
                    None
                } else {
                    Some(unsafe { CStr::from_ptr(attr.prov_name) }.to_bytes().to_vec())
                }
            });
        *self.hint.borrow_mut() = Some(wanted.clone());
        let matching: Vec<&FakeProvider> = self
            .providers
            .iter()
            .filter(|p| match &wanted {
                None => true,
                Some(name) => p.provider_name() == Some(name.as_slice()),
            })
            .collect();
        if let Some(code) = self.fail_with {
            if self.chain_on_error {
                unsafe { *info = self.chain(self.providers.iter()) };
            }
            return code;
        }
        if matching.is_empty() {
            return -FI_ENODATA;
        }
        unsafe { *info = self.chain(matching.into_iter()) };
        0
    }

    unsafe fn free_info(&self, info: *mut fi_info) {
        self.free_calls.set(self.free_calls.get() + 1);
        let mut next = info;
        while !next.is_null() {
            let current = next;
            next = unsafe { (*current).next };
            unsafe { destroy(current) };
            self.live.set(self.live.get() - 1);
        }
    }

    fn strerror(&self, code: c_int) -> String {
        if code == -FI_ENODATA {
            "No data available".to_string()
        } else {
            format!("fake error {code}")
        }
    }
}
