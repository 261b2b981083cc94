//! Versioned, rebuild-coalescing holder for the workspace lineage graph.
//!
//! Hosts fire a rebuild on every batch of file events. Building is the
//! expensive part, so concurrent requests coalesce: while version N is
//! building, a request for M <= N waits for that build instead of
//! starting its own.

use std::sync::{Arc, Condvar, Mutex, RwLock};

#[cfg(feature = "tracing")]
use tracing::debug;

use super::graph::{LineageGraph, LineageGraphBuilder};
use crate::types::{LineageGraphOptions, WorkspaceIndex};

#[derive(Debug, Default)]
struct SessionState {
    /// Highest version whose build has completed.
    built: u64,
    /// Version currently being built, if any.
    building: Option<u64>,
}

/// Shared lineage state for one workspace.
pub struct LineageSession {
    builder: LineageGraphBuilder,
    graph: RwLock<Arc<LineageGraph>>,
    state: Mutex<SessionState>,
    cond: Condvar,
}

impl LineageSession {
    pub fn new(options: LineageGraphOptions) -> Self {
        Self {
            builder: LineageGraphBuilder::new(options),
            graph: RwLock::new(Arc::new(LineageGraph::new())),
            state: Mutex::new(SessionState::default()),
            cond: Condvar::new(),
        }
    }

    /// Current graph snapshot. Readers are never blocked by a rebuild;
    /// they see the previous graph until the swap.
    pub fn snapshot(&self) -> Arc<LineageGraph> {
        self.graph
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Ensures the graph reflects at least `version` of the index.
    ///
    /// Stale requests return immediately; requests overlapping an
    /// in-flight build of the same-or-newer version wait for it and
    /// share its result. The build itself runs without holding either
    /// lock, so readers stay live throughout.
    pub fn rebuild(&self, version: u64, index: &WorkspaceIndex) -> Arc<LineageGraph> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            loop {
                if state.built >= version {
                    return self.snapshot();
                }
                match state.building {
                    Some(in_flight) if in_flight >= version => {
                        state = self
                            .cond
                            .wait(state)
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                    }
                    Some(_) => {
                        // An older build is running; wait for it to
                        // finish before claiming the slot.
                        state = self
                            .cond
                            .wait(state)
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                    }
                    None => {
                        state.building = Some(version);
                        break;
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        debug!(version, files = index.len(), "rebuilding lineage graph");

        let graph = Arc::new(self.builder.build(index));

        {
            let mut current = self
                .graph
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *current = graph.clone();
        }
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.built = state.built.max(version);
            if state.building == Some(version) {
                state.building = None;
            }
            self.cond.notify_all();
        }
        graph
    }

    /// Version of the most recently completed build.
    pub fn built_version(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .built
    }
}

impl Default for LineageSession {
    fn default() -> Self {
        Self::new(LineageGraphOptions::default())
    }
}
