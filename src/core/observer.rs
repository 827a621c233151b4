//! Build progress reporting
//!
//! Core operations report through a [`BuildObserver`] handed to them by the
//! caller instead of a process-wide logger. The CLI uses [`TracingObserver`].

use tracing::Level;

use crate::core::checksum::Checksum;

/// Something noteworthy that happened while building a project
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent<'a> {
    AssemblyEntered {
        path: &'a str,
        depth: usize,
    },
    PartResolved {
        path: &'a str,
        checksum: &'a Checksum,
        variation: u32,
        /// Placement was found in the alignment cache
        cached: bool,
    },
    /// A candidate was rotated onto an existing representative
    SymmetryAligned {
        path: &'a str,
        checksum: &'a Checksum,
    },
    /// A candidate shared a bucket with a representative but did not superimpose
    AlignmentRejected {
        path: &'a str,
        residual: Option<f64>,
    },
    Renamed {
        from: &'a str,
        to: &'a str,
    },
    EmptyAssemblySkipped {
        path: &'a str,
    },
}

impl BuildEvent<'_> {
    /// Level the event is logged at
    pub fn level(&self) -> Level {
        match self {
            BuildEvent::AssemblyEntered { .. } => Level::DEBUG,
            BuildEvent::PartResolved { .. } => Level::TRACE,
            BuildEvent::SymmetryAligned { .. } => Level::DEBUG,
            BuildEvent::AlignmentRejected { .. } => Level::WARN,
            BuildEvent::Renamed { .. } => Level::INFO,
            BuildEvent::EmptyAssemblySkipped { .. } => Level::DEBUG,
        }
    }
}

pub trait BuildObserver {
    fn on_event(&self, event: &BuildEvent<'_>);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl BuildObserver for NullObserver {
    fn on_event(&self, _event: &BuildEvent<'_>) {}
}

/// Forwards events to `tracing`, dropping those more verbose than `max_level`
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    max_level: Level,
}

impl TracingObserver {
    pub fn new(max_level: Level) -> Self {
        Self { max_level }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl BuildObserver for TracingObserver {
    fn on_event(&self, event: &BuildEvent<'_>) {
        // Level orders TRACE as the greatest
        if event.level() > self.max_level {
            return;
        }

        match event {
            BuildEvent::AssemblyEntered { path, depth } => {
                tracing::debug!(path = %path, depth = depth, "Processing assembly");
            }
            BuildEvent::PartResolved {
                path,
                checksum,
                variation,
                cached,
            } => {
                tracing::trace!(
                    path = %path,
                    checksum = %checksum.short(12),
                    variation = variation,
                    cached = cached,
                    "Resolved part"
                );
            }
            BuildEvent::SymmetryAligned { path, checksum } => {
                tracing::debug!(path = %path, checksum = %checksum.short(12), "Aligned part to existing representative");
            }
            BuildEvent::AlignmentRejected { path, residual } => {
                tracing::warn!(path = %path, residual = ?residual, "Part does not superimpose on its group; keeping it distinct");
            }
            BuildEvent::Renamed { from, to } => {
                tracing::info!(from = %from, to = %to, "Renamed part to resolve a name collision");
            }
            BuildEvent::EmptyAssemblySkipped { path } => {
                tracing::debug!(path = %path, "Skipping empty assembly");
            }
        }
    }
}
