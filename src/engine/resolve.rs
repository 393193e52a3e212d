//! Conflict resolution.
//!
//! The matcher emits every candidate of every pattern independently, so the same
//! entity can be captured by several candidates. Resolution picks a subset in
//! which no entity is claimed twice.
//!
//! ## Policy
//!
//! Candidates are ranked and accepted greedily:
//!
//! ```text
//! sort by  source_length desc   (longer pattern text = more specific)
//!          start asc            (leftmost wins among equals)
//!          discovery asc        (pattern order, then scan order)
//!
//! for each candidate:
//!     any member already claimed?  ──yes──▶ discard
//!                                  └─no───▶ accept, claim all members
//! ```
//!
//! A shorter pattern that shares even one entity with an accepted longer one is
//! dropped; full containment is not required.

use super::compiled_patterns::CompiledPatterns;
use crate::Candidate;
use std::cmp::Reverse;

/// Select non-conflicting candidates.
///
/// Returns indices into `candidates`, ordered by composite start (then
/// discovery) so the assembler can emit them without sorting again.
/// `entity_count` is the length of the caller's entity slice.
pub(crate) fn resolve_conflicts(
    candidates: &[Candidate],
    compiled: &CompiledPatterns,
    entity_count: usize,
) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..candidates.len()).collect();
    ranked.sort_by_key(|&idx| {
        let c = &candidates[idx];
        (Reverse(compiled.patterns[c.pattern].source_length), c.start, c.discovery)
    });

    let mut claimed = vec![false; entity_count];
    let mut accepted = Vec::new();

    for idx in ranked {
        let candidate = &candidates[idx];
        if candidate.members.iter().any(|&id| claimed[id]) {
            tracing::trace!(
                pattern = %compiled.patterns[candidate.pattern].raw,
                start = candidate.start,
                end = candidate.end,
                "discarding candidate that overlaps an accepted match"
            );
            continue;
        }
        for &id in &candidate.members {
            claimed[id] = true;
        }
        accepted.push(idx);
    }

    accepted.sort_by_key(|&idx| (candidates[idx].start, candidates[idx].discovery));
    accepted
}
