// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A [`HierarchySource`] reading a static YAML hierarchy description.
//!
//! ```yaml
//! numa_nodes:
//!   - id: 0
//!     cores: 24
//!     devices:
//!       - { name: ib0, class: Network, pci_addr: "0000:18:00.0" }
//!       - { name: hfi1_0, class: OpenFabrics, pci_addr: "0000:18:00.0" }
//!   - id: 1
//!     cores: 24
//! ```

use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::hierarchy::{Hierarchy, HierarchySource, SourceError};

/// Reads the hierarchy from a YAML file on every acquisition.
///
/// The file is the sole source of truth; an unreadable or malformed file fails the
/// acquisition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// A source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HierarchySource for FileSource {
    #[tracing::instrument(level = "debug", skip(self, ctx), fields(path = ?self.path), err)]
    fn acquire(&self, ctx: &Context) -> Result<Hierarchy, SourceError> {
        ctx.err()?;
        let text = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        ctx.err()?;
        serde_yaml_ng::from_str(&text).map_err(|source| SourceError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}
