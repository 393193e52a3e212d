//! Matching and run orchestration.
//!
//! This module is the operational core of the engine:
//!
//! - Project the message's entities onto its text (see `projection.rs`).
//! - Gate out patterns that cannot fire for the labels present (see
//!   `trigger.rs`).
//! - Run every remaining compiled pattern over the projection and turn each
//!   match into a `Candidate` by mapping its placeholder captures back to the
//!   entities they stand for.
//! - Hand all candidates to conflict resolution (see `resolve.rs`) and the
//!   survivors to assembly (see `assemble.rs`).
//!
//! ## Scan semantics
//!
//! Each pattern scans the projected text leftmost-first and resumes after the
//! end of each match, so one pattern never reports two matches sharing a
//! character. Patterns do not see each other's matches: overlap *between*
//! patterns is resolved afterwards.
//!
//! A placeholder group that did not participate in a match (e.g. under `?`)
//! contributes no entity. A match that captured no entity at all is dropped,
//! since it cannot ground a composite.
//!
//! ```text
//! projected: "a ⟪color⟫ ⟪product⟫ with ⟪pattern⟫"
//! pattern:   "@color @product( with @pattern)?"
//!               │       │             │
//!               ▼       ▼             ▼
//!          marker_at  marker_at   marker_at  ──▶ Candidate { members: [0, 1, 2] }
//! ```

use super::assemble::assemble;
use super::compiled_patterns::CompiledPatterns;
use super::metrics::{RunMetrics, RunResult};
use super::projection::Projection;
use super::resolve::resolve_conflicts;
use super::trigger::TriggerInfo;
use crate::api::{BasicEntity, ResultEntity};
use crate::{Candidate, EntityId, PatternId};
use std::time::{Duration, Instant};

/// Runs a compiled pattern set against one message.
///
/// Usage: create with `Matcher::new(text, &entities, &compiled)` then call
/// `run(extractor_name)`. Create with `Matcher::timed` instead when the run's
/// metrics are wanted from `run_with_metrics`.
///
/// ```text
/// new() -> project + gate -> candidates() -> resolve_conflicts() -> assemble()
/// ```
#[derive(Debug)]
pub struct Matcher<'a> {
    /// Entities of the message, in caller order.
    entities: &'a [BasicEntity],
    /// Compiled patterns (shared reference).
    compiled: &'a CompiledPatterns,
    /// Projection of `entities` onto the message text.
    projection: Projection,
    /// Patterns that passed gating, in pattern order.
    active: Vec<PatternId>,
    /// Patterns skipped by gating.
    gated: Vec<PatternId>,
    /// Time spent projecting and gating; zero unless built with `timed`.
    setup: Duration,
}

impl<'a> Matcher<'a> {
    /// Project `entities` onto `text` and select the patterns worth running.
    pub fn new(text: &str, entities: &'a [BasicEntity], compiled: &'a CompiledPatterns) -> Self {
        let projection = Projection::build(text, entities);
        let trigger = TriggerInfo::scan(&projection, entities);
        let (active, gated) = trigger.select(compiled);

        tracing::debug!(
            entities = entities.len(),
            projected = projection.markers.len(),
            skipped = projection.skipped.len(),
            active = active.len(),
            gated = gated.len(),
            "prepared message for matching"
        );

        Matcher { entities, compiled, projection, active, gated, setup: Duration::ZERO }
    }

    /// Like [`new`](Self::new), recording how long projection and gating took.
    pub fn timed(text: &str, entities: &'a [BasicEntity], compiled: &'a CompiledPatterns) -> Self {
        let start = Instant::now();
        let matcher = Self::new(text, entities, compiled);
        Matcher { setup: start.elapsed(), ..matcher }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Run one pattern and append its candidates to `out`.
    fn match_pattern(&self, id: PatternId, discovery: &mut usize, out: &mut Vec<Candidate>) {
        let pattern = &self.compiled.patterns[id];

        for caps in pattern.regex.captures_iter(&self.projection.text) {
            let mut captured: Vec<(usize, EntityId)> = Vec::with_capacity(pattern.slots.len());
            for &slot in &pattern.slots {
                let Some(group) = caps.get(slot) else {
                    continue;
                };
                match self.projection.marker_at(group.start(), group.end()) {
                    Some(marker) => captured.push((marker.range.start, marker.entity)),
                    None => tracing::trace!(
                        pattern = %pattern.raw,
                        start = group.start(),
                        end = group.end(),
                        "ignoring capture not aligned with a marker"
                    ),
                }
            }

            if captured.is_empty() {
                tracing::trace!(pattern = %pattern.raw, "dropping match without entities");
                continue;
            }

            captured.sort_unstable();
            captured.dedup();
            let members: Vec<EntityId> = captured.into_iter().map(|(_, entity)| entity).collect();

            let start = self.entities[members[0]].start;
            let end = members.iter().map(|&m| self.entities[m].end).max().unwrap_or(start);

            tracing::trace!(pattern = %pattern.raw, start, end, members = members.len(), "candidate");
            out.push(Candidate { pattern: id, start, end, members, discovery: *discovery });
            *discovery += 1;
        }
    }

    /// Candidates of every active pattern, in discovery order.
    fn candidates(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        let mut discovery = 0;
        for &id in &self.active {
            self.match_pattern(id, &mut discovery, &mut out);
        }
        out
    }

    /// Match, resolve and assemble, returning timing details and the
    /// intermediate candidates.
    pub fn run_with_metrics(self, extractor_name: &str) -> RunResult {
        let total_start = Instant::now();

        let candidates = self.candidates();
        let matching = total_start.elapsed();

        let resolve_start = Instant::now();
        let accepted = resolve_conflicts(&candidates, self.compiled, self.entities.len());
        let results =
            assemble(self.entities, &self.projection, &candidates, &accepted, self.compiled, extractor_name);
        let resolve = resolve_start.elapsed();

        let metrics = RunMetrics {
            total: self.setup + total_start.elapsed(),
            projection: self.setup,
            matching,
            resolve,
            patterns_run: self.active.len(),
            patterns_gated: self.gated.len(),
            candidates: candidates.len(),
            accepted: accepted.len(),
        };

        tracing::debug!(
            candidates = metrics.candidates,
            accepted = metrics.accepted,
            results = results.len(),
            "resolved composite entities"
        );

        RunResult { results, candidates, accepted, gated: self.gated, metrics }
    }

    /// Match, resolve and assemble.
    ///
    /// Takes no timings and keeps no candidates. Use
    /// [`run_with_metrics`](Self::run_with_metrics) to inspect them.
    pub fn run(self, extractor_name: &str) -> Vec<ResultEntity> {
        let candidates = self.candidates();
        let accepted = resolve_conflicts(&candidates, self.compiled, self.entities.len());
        assemble(self.entities, &self.projection, &candidates, &accepted, self.compiled, extractor_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite;
    use crate::config::PatternSet;
    use crate::engine::PatternFlags;

    fn compiled(set: Vec<crate::CompositeDefinition>) -> CompiledPatterns {
        CompiledPatterns::new(&PatternSet::new(set), PatternFlags::empty()).unwrap()
    }

    #[test]
    fn candidates_map_captures_back_to_entities() {
        let compiled = compiled(vec![composite!("outfit" => ["@color @product"])]);
        let entities = vec![BasicEntity::new("product", "shirt", 4, 9), BasicEntity::new("color", "red", 0, 3)];
        let matcher = Matcher::new("red shirt", &entities, &compiled);

        let candidates = matcher.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].members, vec![1, 0]);
        assert_eq!((candidates[0].start, candidates[0].end), (0, 9));
    }

    #[test]
    fn one_pattern_reports_non_overlapping_matches() {
        let compiled = compiled(vec![composite!("pair" => ["@color @product"])]);
        let text = "red shirt blue shoes";
        let entities = vec![
            BasicEntity::new("color", "red", 0, 3),
            BasicEntity::new("product", "shirt", 4, 9),
            BasicEntity::new("color", "blue", 10, 14),
            BasicEntity::new("product", "shoes", 15, 20),
        ];
        let candidates = Matcher::new(text, &entities, &compiled).candidates();

        let spans: Vec<(usize, usize)> = candidates.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, vec![(0, 9), (10, 20)]);
        assert_eq!(candidates[1].discovery, 1);
    }

    #[test]
    fn optional_placeholder_that_did_not_participate_adds_nothing() {
        let compiled = compiled(vec![composite!("outfit" => ["(@size )?@color @product"])]);
        let entities = vec![BasicEntity::new("color", "red", 0, 3), BasicEntity::new("product", "shirt", 4, 9)];
        let candidates = Matcher::new("red shirt", &entities, &compiled).candidates();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].members, vec![0, 1]);
    }

    #[test]
    fn matches_without_entities_are_dropped() {
        let compiled = compiled(vec![composite!("maybe" => ["(@color)?shirt"])]);
        let entities = vec![BasicEntity::new("color", "red", 0, 3)];
        // "shirt" alone matches with the placeholder absent.
        let candidates = Matcher::new("red, shirt", &entities, &compiled).candidates();

        assert!(candidates.is_empty());
    }

    #[test]
    fn literal_words_around_placeholders_must_match() {
        let compiled = compiled(vec![composite!("outfit" => ["@product with @pattern"])]);
        let entities = vec![BasicEntity::new("product", "shirt", 0, 5), BasicEntity::new("pattern", "dots", 11, 15)];

        assert!(Matcher::new("shirt sans dots", &entities, &compiled).candidates().is_empty());
        assert_eq!(Matcher::new("shirt with dots", &entities, &compiled).candidates().len(), 1);
    }

    #[test]
    fn run_with_metrics_counts_stages() {
        let compiled = compiled(vec![
            composite!("outfit" => ["@color @product"]),
            composite!("place" => ["@city"]),
        ]);
        let entities = vec![BasicEntity::new("color", "red", 0, 3), BasicEntity::new("product", "shirt", 4, 9)];
        let run = Matcher::timed("red shirt", &entities, &compiled).run_with_metrics("composite-extractor");

        assert_eq!(run.metrics.patterns_run, 1);
        assert_eq!(run.metrics.patterns_gated, 1);
        assert_eq!(run.metrics.candidates, 1);
        assert_eq!(run.metrics.accepted, 1);
        assert!(run.metrics.projection <= run.metrics.total);
        assert_eq!(run.gated, vec![1]);
        assert_eq!(run.results.len(), 1);
    }

    #[test]
    fn plain_run_matches_the_measured_run() {
        let compiled = compiled(vec![
            composite!("outfit" => ["@color @product"]),
            composite!("described" => ["@color @product with @pattern"]),
        ]);
        let text = "red shirt with dots";
        let entities = vec![
            BasicEntity::new("color", "red", 0, 3),
            BasicEntity::new("product", "shirt", 4, 9),
            BasicEntity::new("pattern", "dots", 15, 19),
        ];

        let plain = Matcher::new(text, &entities, &compiled);
        assert_eq!(plain.setup, Duration::ZERO);
        let results = plain.run("composite-extractor");

        let measured = Matcher::timed(text, &entities, &compiled).run_with_metrics("composite-extractor");
        assert_eq!(results, measured.results);
        assert_eq!(results[0].label(), "described");
    }
}
