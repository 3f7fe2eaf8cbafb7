// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Non-owning views of libfabric provider records.

use std::borrow::Cow;
use std::ffi::CStr;
use std::fmt::{Debug, Formatter};

use fabric_sys::{FI_ADDR_PSMX2, FI_FORMAT_UNSPEC, fi_info};

use crate::psm2::{HfiUnitError, Psmx2EpName};

/// A borrowed view of one `fi_info` record.
///
/// A view never owns the record; the [`crate::FiInfoList`] it was obtained from keeps
/// the whole chain alive for as long as the view exists.  Every accessor tolerates
/// absent substructures, reporting absence rather than failing.
#[derive(Clone, Copy)]
pub struct FiInfo<'a> {
    raw: Option<&'a fi_info>,
}

fn lossy(name: Option<&CStr>) -> Cow<'_, str> {
    name.map_or(Cow::Borrowed(""), CStr::to_string_lossy)
}

impl<'a> FiInfo<'a> {
    pub(crate) fn new(raw: &'a fi_info) -> Self {
        Self { raw: Some(raw) }
    }

    /// Wrap a raw record.
    ///
    /// # Safety
    ///
    /// `raw` must be null, or point to an `fi_info` (with valid attribute pointers) which
    /// outlives `'a` and is not mutated during `'a`.
    #[must_use]
    pub unsafe fn from_raw(raw: *const fi_info) -> Self {
        Self {
            raw: unsafe { raw.as_ref() },
        }
    }

    /// The wrapped record, if any.
    #[must_use]
    pub fn raw(&self) -> Option<&'a fi_info> {
        self.raw
    }

    fn domain_name(&self) -> Option<&'a CStr> {
        let info = self.raw?;
        let attr = unsafe { info.domain_attr.as_ref() }?;
        if attr.name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(attr.name) })
    }

    fn provider_name(&self) -> Option<&'a CStr> {
        let info = self.raw?;
        let attr = unsafe { info.fabric_attr.as_ref() }?;
        if attr.prov_name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(attr.prov_name) })
    }

    fn fabric_name(&self) -> Option<&'a CStr> {
        let info = self.raw?;
        let attr = unsafe { info.fabric_attr.as_ref() }?;
        if attr.name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(attr.name) })
    }

    /// Returns `true` if the record names its domain.
    #[must_use]
    pub fn has_domain(&self) -> bool {
        self.domain_name().is_some()
    }

    /// The domain name (e.g. `hfi1_0`), or `""` if the record does not name one.
    #[must_use]
    pub fn domain(&self) -> Cow<'a, str> {
        lossy(self.domain_name())
    }

    /// Returns `true` if the record names its provider.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider_name().is_some()
    }

    /// The provider name (e.g. `psm2`), or `""` if the record does not name one.
    #[must_use]
    pub fn provider(&self) -> Cow<'a, str> {
        lossy(self.provider_name())
    }

    /// The fabric name, or `""` if the record does not name one.
    #[must_use]
    pub fn fabric(&self) -> Cow<'a, str> {
        lossy(self.fabric_name())
    }

    /// The HFI unit the provider instance is bound to.
    ///
    /// Only meaningful for records of the psm2 provider, whose source address is a
    /// [`Psmx2EpName`].  Records which leave `addr_format` unspecified are decoded as psm2.
    ///
    /// # Errors
    ///
    /// - [`HfiUnitError::NilSourceAddress`] if there is no source address.
    /// - [`HfiUnitError::ForeignAddressFormat`] if the address is declared to be in any
    ///   format but `FI_ADDR_PSMX2`.
    /// - [`HfiUnitError::ShortSourceAddress`] if the advertised address length is too
    ///   short for an endpoint name.  A length of zero is taken as "not reported".
    /// - [`HfiUnitError::AllHfiUsed`] if the provider found every unit in use.
    pub fn hfi_unit(&self) -> Result<i32, HfiUnitError> {
        let info = self.raw.ok_or(HfiUnitError::NilSourceAddress)?;
        if info.src_addr.is_null() {
            return Err(HfiUnitError::NilSourceAddress);
        }
        let format = info.addr_format;
        if format != FI_ADDR_PSMX2 && format != FI_FORMAT_UNSPEC {
            return Err(HfiUnitError::ForeignAddressFormat { format });
        }
        let len = info.src_addrlen;
        if len != 0 && len < Psmx2EpName::SIZE {
            return Err(HfiUnitError::ShortSourceAddress { len });
        }
        unsafe { Psmx2EpName::read(info.src_addr) }.hfi_unit()
    }
}

impl Debug for FiInfo<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiInfo")
            .field("provider", &self.provider())
            .field("fabric", &self.fabric())
            .field("domain", &self.domain())
            .field("hfi_unit", &self.hfi_unit())
            .finish()
    }
}
