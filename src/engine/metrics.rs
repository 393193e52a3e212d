//! Engine run metrics.
//!
//! Small structs used to observe a run: where time went and how many candidates
//! each stage produced.
//!
//! The intended usage is:
//!
//! - `Matcher::run` for normal operation.
//! - `Matcher::run_with_metrics` for profiling, debugging regressions, and
//!   inspecting which candidates lost conflict resolution.
//!
//! Metrics are *opt-in* where they cost anything: candidate lists are always
//! needed for resolution, but copying them out of the run only happens when the
//! caller asks for details.

use crate::api::ResultEntity;
use crate::{Candidate, PatternId};
use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunMetrics {
    /// Total elapsed time for the run.
    pub total: Duration,
    /// Time spent projecting entities onto the text.
    pub projection: Duration,
    /// Time spent running compiled patterns.
    pub matching: Duration,
    /// Time spent resolving conflicts and assembling the output.
    pub resolve: Duration,
    /// Patterns that passed gating and were run.
    pub patterns_run: usize,
    /// Patterns skipped because no placeholder type was present.
    pub patterns_gated: usize,
    /// Candidate matches found before resolution.
    pub candidates: usize,
    /// Candidates accepted as composites.
    pub accepted: usize,
}

/// Matcher output bundled with timing information.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Final, non-overlapping entity list.
    pub results: Vec<ResultEntity>,
    /// Every candidate found, in discovery order.
    pub(crate) candidates: Vec<Candidate>,
    /// Indices into `candidates` that were accepted.
    pub(crate) accepted: Vec<usize>,
    /// Patterns skipped by gating.
    pub(crate) gated: Vec<PatternId>,
    /// Timing and count measurements for the run.
    pub metrics: RunMetrics,
}
