extern crate self as amalgam;

#[macro_use]
mod macros;
mod api;
mod config;
mod engine;
mod error;


pub use api::{
    BasicEntity, CandidateSummary, CompositeEntity, CompositeExtractor, DEFAULT_EXTRACTOR_NAME, ExtractDetails,
    ExtractResult, Options, ResultEntity, extract,
};
pub use config::{COMPOSITE_ENTITIES_FILE_NAME, CompositeDefinition, PatternSet};
pub use engine::{PatternFlags, RunMetrics};
pub use error::{ConfigError, PatternCompileError};

// --- Internal types ---------------------------------------------------------

/// Opening delimiter of an entity marker in the projected text.
///
/// Both delimiters live in the Unicode private use area. The projector replaces
/// any occurrence of them in literal message text, so a marker can only come
/// from a projected entity.
pub(crate) const MARKER_OPEN: char = '\u{E000}';
/// Closing delimiter of an entity marker in the projected text.
pub(crate) const MARKER_CLOSE: char = '\u{E001}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Range {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

/// Index into the compiled pattern list.
pub(crate) type PatternId = usize;

/// Index into the caller's entity slice (original input order).
pub(crate) type EntityId = usize;

/// A projected entity: where its marker sits in the projected text, and which
/// input entity it stands for.
#[derive(Debug, Clone)]
pub(crate) struct Marker {
    pub entity: EntityId,
    pub range: Range,
}

/// A candidate match produced by one compiled pattern, before conflict
/// resolution.
///
/// `start`/`end` are character offsets in the original message (min/max of the
/// member spans). `members` is ordered by entity position.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub pattern: PatternId,
    pub start: usize,
    pub end: usize,
    pub members: Vec<EntityId>,
    /// Discovery sequence number across the whole run, used as the last
    /// tie-breaker during resolution.
    pub discovery: usize,
}
