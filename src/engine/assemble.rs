//! Composite assembly.
//!
//! Turns accepted candidates into [`CompositeEntity`] records and merges them
//! with every entity no accepted candidate claimed. The output is sorted by
//! `start` (stable), composites before basics on equal starts.
//!
//! Assembly is single-pass: composites are final and never fed back into
//! matching, so composites never nest.

use super::compiled_patterns::CompiledPatterns;
use super::projection::Projection;
use crate::Candidate;
use crate::api::{BasicEntity, CompositeEntity, ResultEntity};

pub(crate) fn assemble(
    entities: &[BasicEntity],
    projection: &Projection,
    candidates: &[Candidate],
    accepted: &[usize],
    compiled: &CompiledPatterns,
    extractor_name: &str,
) -> Vec<ResultEntity> {
    let mut claimed = vec![false; entities.len()];
    let mut results = Vec::with_capacity(entities.len());

    for &idx in accepted {
        let candidate = &candidates[idx];
        for &id in &candidate.members {
            claimed[id] = true;
        }
        results.push(ResultEntity::Composite(CompositeEntity {
            name: compiled.patterns[candidate.pattern].name.clone(),
            source: extractor_name.to_string(),
            start: candidate.start,
            end: candidate.end,
            confidence: 1.0,
            members: candidate.members.iter().map(|&id| entities[id].clone()).collect(),
        }));
    }

    for &id in &projection.order {
        if !claimed[id] {
            results.push(ResultEntity::Basic(entities[id].clone()));
        }
    }

    results.sort_by_key(ResultEntity::start);
    results
}
