// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Provider enumeration.

use core::ffi::c_int;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::ffi::CString;
use std::fmt::{Debug, Formatter};

use fabric_sys::{FI_VERSION, fi_info};
use tracing::{debug, trace};

use crate::info::FiInfo;
use crate::library::FabricLibrary;

/// Errors which may occur while enumerating providers.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error, strum::EnumIs)]
pub enum FabricError {
    /// libfabric could not allocate the hint record (or its provider name).
    #[error("fi_allocinfo failed for hint")]
    HintAllocation,
    /// `fi_getinfo` failed, or matched nothing.
    #[error("fi_getinfo failed for provider {provider:?}: {reason} ({code})")]
    GetInfo {
        /// The requested provider name.
        provider: String,
        /// The libfabric return code (zero if libfabric succeeded but returned no records).
        code: c_int,
        /// libfabric's description of `code`.
        reason: String,
    },
    /// Provider names are passed to libfabric as C strings.
    #[error("provider name {0:?} contains a NUL byte")]
    InteriorNul(String),
}

/// An `fi_info` hint record, freed on drop.
struct Hints<'lib, L: FabricLibrary + ?Sized> {
    lib: &'lib L,
    raw: NonNull<fi_info>,
}

impl<'lib, L: FabricLibrary + ?Sized> Hints<'lib, L> {
    fn new(lib: &'lib L) -> Result<Self, FabricError> {
        let raw = NonNull::new(lib.alloc_info()).ok_or(FabricError::HintAllocation)?;
        Ok(Self { lib, raw })
    }

    /// Restrict discovery to `provider`.  The name is handed over as given, empty or not.
    fn set_provider(&mut self, provider: &str) -> Result<(), FabricError> {
        let name =
            CString::new(provider).map_err(|_| FabricError::InteriorNul(provider.to_string()))?;
        // SAFETY: the hint came from `alloc_info` and is exclusively ours.
        let hints = unsafe { self.raw.as_mut() };
        let attr = unsafe { hints.fabric_attr.as_mut() }.ok_or(FabricError::HintAllocation)?;
        // The library frees this with the rest of the hint.
        let dup = unsafe { libc::strdup(name.as_ptr()) };
        if dup.is_null() {
            return Err(FabricError::HintAllocation);
        }
        unsafe { libc::free(attr.prov_name.cast()) };
        attr.prov_name = dup;
        Ok(())
    }

    fn as_ptr(&self) -> *const fi_info {
        self.raw.as_ptr()
    }
}

impl<L: FabricLibrary + ?Sized> Drop for Hints<'_, L> {
    fn drop(&mut self) {
        unsafe { self.lib.free_info(self.raw.as_ptr()) };
    }
}

/// An owned chain of provider records returned by libfabric.
///
/// The chain is freed exactly once, either by [`FiInfoList::release`] or on drop.  Views
/// handed out by [`FiInfoList::iter`] borrow the list and cannot outlive it.
pub struct FiInfoList<'lib, L: FabricLibrary + ?Sized> {
    lib: &'lib L,
    head: NonNull<fi_info>,
}

impl<'lib, L: FabricLibrary + ?Sized> FiInfoList<'lib, L> {
    /// Walk the chain in the order libfabric returned it.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_ptr(),
            _list: PhantomData,
        }
    }

    /// Number of records in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always `false`; an empty result is reported as an error instead.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The `index`th record of the chain.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<FiInfo<'_>> {
        self.iter().nth(index)
    }

    /// Collect every record of the chain.
    #[must_use]
    pub fn infos(&self) -> Vec<FiInfo<'_>> {
        self.iter().collect()
    }

    /// The library the chain came from.
    #[must_use]
    pub fn library(&self) -> &'lib L {
        self.lib
    }

    /// Free the chain now.
    pub fn release(self) {
        drop(self);
    }
}

impl<L: FabricLibrary + ?Sized> Drop for FiInfoList<'_, L> {
    fn drop(&mut self) {
        trace!("freeing provider list");
        unsafe { self.lib.free_info(self.head.as_ptr()) };
    }
}

impl<L: FabricLibrary + ?Sized> Debug for FiInfoList<'_, L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, L: FabricLibrary + ?Sized> IntoIterator for &'a FiInfoList<'_, L> {
    type Item = FiInfo<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a [`FiInfoList`].
#[derive(Clone)]
pub struct Iter<'a> {
    next: *const fi_info,
    _list: PhantomData<&'a fi_info>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = FiInfo<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: every record in the chain lives as long as the list borrowed for 'a.
        let current: &'a fi_info = unsafe { self.next.as_ref() }?;
        self.next = current.next;
        Some(FiInfo::new(current))
    }
}

impl core::iter::FusedIterator for Iter<'_> {}

/// Enumerate the libfabric providers named `provider`.
///
/// The name is passed to libfabric unchanged; what an empty name matches is up to libfabric.
///
/// # Errors
///
/// - [`FabricError::InteriorNul`] if `provider` cannot be passed as a C string.
/// - [`FabricError::HintAllocation`] if the hint could not be allocated.
/// - [`FabricError::GetInfo`] if `fi_getinfo` fails or returns no records.
#[tracing::instrument(level = "debug", skip(lib), err)]
pub fn list_providers<'lib, L: FabricLibrary + ?Sized>(
    lib: &'lib L,
    provider: &str,
) -> Result<FiInfoList<'lib, L>, FabricError> {
    let mut hints = Hints::new(lib)?;
    hints.set_provider(provider)?;
    let mut info: *mut fi_info = core::ptr::null_mut();
    let code = unsafe { lib.get_info(FI_VERSION, hints.as_ptr(), &raw mut info) };
    drop(hints);
    let head = NonNull::new(info);
    if code != 0 {
        if let Some(head) = head {
            unsafe { lib.free_info(head.as_ptr()) };
        }
        return Err(FabricError::GetInfo {
            provider: provider.to_string(),
            code,
            reason: lib.strerror(code),
        });
    }
    let Some(head) = head else {
        return Err(FabricError::GetInfo {
            provider: provider.to_string(),
            code,
            reason: "no matching provider".to_string(),
        });
    };
    let list = FiInfoList { lib, head };
    debug!(records = list.len(), "listed providers");
    Ok(list)
}
