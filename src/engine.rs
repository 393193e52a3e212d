//! Composite matching engine.
//!
//! This module is the internal entry point of the engine. It is split into
//! focused submodules under `src/engine/`, one per pipeline stage.
//!
//! ## How the parts work together
//!
//! ```text
//! pattern set ──┐
//!               │  CompiledPatterns::new          (compiled_patterns.rs)
//!               └───────────────┬───────────────  once, at load time
//!                               │
//! text + entities ──────────────┼─ Projection::build   (projection.rs)
//!                               │     - sort entities, skip overlaps
//!                               │     - splice type markers into text
//!                               │
//!                               ├─ TriggerInfo::scan   (trigger.rs)
//!                               │     - skip patterns with no present type
//!                               v
//!                     Matcher::run (matcher.rs)
//!                       - scan each pattern over the projection
//!                       - captures -> Candidate (member entities)
//!                               │
//!                               v
//!                     resolve_conflicts (resolve.rs)
//!                       - longest pattern text wins
//!                       - no entity claimed twice
//!                               │
//!                               v
//!                     assemble (assemble.rs)
//!                       - composites + unclaimed basics, by start
//!                               │
//!                               v
//!                        Vec<ResultEntity>
//! ```
//!
//! Compilation is the only fallible stage, and it happens before any message is
//! processed. A run borrows the compiled set immutably, so one compiled set can
//! serve many threads at once.
//!
//! ## Responsibilities by module
//!
//! - `compiled_patterns.rs`: rewrites `@type` placeholders and compiles every
//!   alternative with its precedence metadata.
//! - `projection.rs`: builds the marker text and the marker→entity map.
//! - `trigger.rs`: per-message gating of patterns by present type labels.
//! - `matcher.rs`: scanning, candidate extraction and orchestration.
//! - `resolve.rs`: greedy precedence-ordered conflict resolution.
//! - `assemble.rs`: final output list.
//! - `metrics.rs`: timings and counts for a run.
//!
//! ## Debugging
//!
//! The engine logs through `tracing`: `debug` for per-run summaries, `trace` for
//! every candidate and every skip/discard decision.

#[path = "engine/assemble.rs"]
mod assemble;
#[path = "engine/compiled_patterns.rs"]
mod compiled_patterns;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/projection.rs"]
mod projection;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/trigger.rs"]
mod trigger;

pub use compiled_patterns::{CompiledPatterns, PatternFlags};
pub use matcher::Matcher;
pub use metrics::{RunMetrics, RunResult};
#[allow(unused_imports)]
pub use projection::Projection;
#[allow(unused_imports)]
pub use trigger::TriggerInfo;
