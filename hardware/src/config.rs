// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Selection of the hierarchy source from the environment.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

use crate::hierarchy::{HierarchySource, SourceError};
use crate::provider::Provider;

/// Names a static YAML hierarchy file to use instead of scanning the hardware.
///
/// Once set, even to an empty value, the file is the only source: an unreadable or
/// malformed file fails acquisition rather than falling back to a scan.
pub const HIERARCHY_FILE_ENV: &str = "FABTOPO_HIERARCHY_FILE";

/// Names an hwloc XML export to import instead of scanning the hardware.
///
/// This is the variable hwloc itself honors.  As with [`HIERARCHY_FILE_ENV`], being set
/// is what counts.
pub const HWLOC_XML_ENV: &str = "HWLOC_XMLFILE";

/// Where the hierarchy comes from.
#[derive(Clone, Debug, Eq, PartialEq, strum::EnumIs)]
pub enum SourceConfig {
    /// A static YAML hierarchy file.
    File(PathBuf),
    /// An hwloc XML export.
    HwlocXml(PathBuf),
    /// The running machine.
    Live,
}

impl SourceConfig {
    /// Resolve the configuration from a variable lookup.
    ///
    /// [`HIERARCHY_FILE_ENV`] wins over [`HWLOC_XML_ENV`]; with neither set the running
    /// machine is scanned.  Values are taken as given, so a variable set to an empty
    /// string selects a path which cannot be read.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        if let Some(path) = lookup(HIERARCHY_FILE_ENV).map(PathBuf::from) {
            SourceConfig::File(path)
        } else if let Some(path) = lookup(HWLOC_XML_ENV).map(PathBuf::from) {
            SourceConfig::HwlocXml(path)
        } else {
            SourceConfig::Live
        }
    }

    /// Resolve the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Construct the configured source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoSource`] if the configuration requires hwloc and this
    /// crate was built without the `scan` feature, or requires a hierarchy file and this
    /// crate was built without the `file` feature.
    pub fn into_source(self) -> Result<Box<dyn HierarchySource>, SourceError> {
        debug!(config = ?self, "selecting hierarchy source");
        match self {
            #[cfg(feature = "file")]
            SourceConfig::File(path) => Ok(Box::new(crate::file::FileSource::new(path))),
            #[cfg(not(feature = "file"))]
            SourceConfig::File(_) => Err(SourceError::NoSource),
            #[cfg(feature = "scan")]
            SourceConfig::HwlocXml(path) => Ok(Box::new(crate::scan::HwlocSource::from_xml(path))),
            #[cfg(feature = "scan")]
            SourceConfig::Live => Ok(Box::new(crate::scan::HwlocSource::live())),
            #[cfg(not(feature = "scan"))]
            SourceConfig::HwlocXml(_) | SourceConfig::Live => Err(SourceError::NoSource),
        }
    }
}

/// A topology provider over the source selected by the process environment.
///
/// # Errors
///
/// See [`SourceConfig::into_source`].
pub fn provider_from_env() -> Result<Provider<Box<dyn HierarchySource>>, SourceError> {
    Ok(Provider::new(SourceConfig::from_env().into_source()?))
}
