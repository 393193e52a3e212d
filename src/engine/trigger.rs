//! Trigger scanning (per-message pattern gating).
//!
//! Before any pattern runs, the projected entities are scanned for the set of
//! type labels present in the message. A compiled pattern whose placeholders
//! accept none of those labels can only produce entity-less matches, which the
//! matcher discards, so it is not run at all.
//!
//! ## Design notes
//!
//! - Gating is a pure optimization: the result of a run is the same with or
//!   without it.
//! - Only *projected* entities count. Entities skipped for overlap are never
//!   matched and therefore never activate a pattern.

use super::compiled_patterns::CompiledPatterns;
use super::projection::Projection;
use crate::PatternId;
use crate::api::BasicEntity;
use std::collections::HashSet;

/// Signals derived from one message's projection.
#[derive(Debug, Clone)]
pub struct TriggerInfo<'a> {
    pub labels: HashSet<&'a str>,
}

impl<'a> TriggerInfo<'a> {
    /// Collect the type labels of all projected entities.
    pub fn scan(projection: &Projection, entities: &'a [BasicEntity]) -> Self {
        let labels = projection.markers.iter().map(|m| entities[m.entity].label.as_str()).collect();
        TriggerInfo { labels }
    }

    /// Split pattern ids into `(active, gated)`, both in pattern order.
    pub(crate) fn select(&self, compiled: &CompiledPatterns) -> (Vec<PatternId>, Vec<PatternId>) {
        (0..compiled.patterns.len()).partition(|&id| compiled.patterns[id].could_match(&self.labels))
    }
}
