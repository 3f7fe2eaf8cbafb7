// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`TopologyProvider`] backed by a [`HierarchySource`].

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::hierarchy::{HierarchySource, SourceError};
use crate::topology::{Topology, TopologyError, TopologyProvider};

/// Produces a [`Topology`] by acquiring a hierarchy from `S`.
///
/// Acquisition runs on tokio's blocking pool and is raced against the [`Context`].  The
/// source sees the same context and is expected to stop once it is done.  Either way
/// the call only returns after the acquisition has finished and its result (and with
/// it anything the source acquired) has been dropped.
#[derive(Debug)]
pub struct Provider<S> {
    source: Arc<S>,
}

impl<S> Clone for Provider<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: HierarchySource> Provider<S> {
    /// Create a provider over `source`.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// The hierarchy source of this provider.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: HierarchySource> From<Arc<S>> for Provider<S> {
    fn from(source: Arc<S>) -> Self {
        Self { source }
    }
}

impl<S: HierarchySource> TopologyProvider for Provider<S> {
    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn topology(&self, ctx: &Context) -> Result<Topology, TopologyError> {
        ctx.err()?;
        let source = Arc::clone(&self.source);
        let scoped = ctx.clone();
        let mut acquisition = tokio::task::spawn_blocking(move || source.acquire(&scoped));
        let hierarchy = tokio::select! {
            biased;
            reason = ctx.done() => {
                debug!(%reason, "interrupting hierarchy acquisition");
                let _ = acquisition.await;
                debug!("interrupted hierarchy acquisition finished");
                return Err(reason.into());
            }
            joined = &mut acquisition => match joined? {
                Err(SourceError::Interrupted(reason)) => return Err(reason.into()),
                acquired => acquired?,
            },
        };
        let topology = Topology::from_hierarchy(&hierarchy);
        debug!(numa_nodes = topology.len(), "topology assembled");
        Ok(topology)
    }
}
