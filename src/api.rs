use crate::config::PatternSet;
use crate::engine::{self, CompiledPatterns, PatternFlags, RunMetrics};
use crate::error::PatternCompileError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Extractor name written into every composite record unless overridden.
pub const DEFAULT_EXTRACTOR_NAME: &str = "composite-extractor";

/// An entity recognized upstream.
///
/// `start`/`end` are character offsets into the message (half-open). The record
/// round-trips through serde unchanged: keys other than the ones below are kept
/// in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicEntity {
    /// Type label, e.g. `"color"`.
    #[serde(rename = "entity")]
    pub label: String,
    /// Recognized value. Usually a string, but recognizers may emit structured
    /// values.
    #[serde(default)]
    pub value: Value,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Name of the recognizer that produced the entity.
    #[serde(rename = "extractor", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BasicEntity {
    pub fn new(label: impl Into<String>, value: impl Into<Value>, start: usize, end: usize) -> Self {
        BasicEntity {
            label: label.into(),
            value: value.into(),
            start,
            end,
            confidence: None,
            source: None,
            extra: Map::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A group of basic entities bundled by a composite pattern.
///
/// `start`/`end` are the min/max of the member spans; `members` is ordered by
/// position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeEntity {
    /// Name of the composite definition that matched.
    #[serde(rename = "entity")]
    pub name: String,
    #[serde(rename = "extractor")]
    pub source: String,
    pub start: usize,
    pub end: usize,
    /// Always `1.0`.
    pub confidence: f64,
    #[serde(rename = "value")]
    pub members: Vec<BasicEntity>,
}

/// One entry of the output list: either an untouched basic entity or a
/// composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEntity {
    Composite(CompositeEntity),
    Basic(BasicEntity),
}

impl ResultEntity {
    pub fn start(&self) -> usize {
        match self {
            ResultEntity::Composite(c) => c.start,
            ResultEntity::Basic(b) => b.start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            ResultEntity::Composite(c) => c.end,
            ResultEntity::Basic(b) => b.end,
        }
    }

    /// Composite name or basic type label.
    pub fn label(&self) -> &str {
        match self {
            ResultEntity::Composite(c) => &c.name,
            ResultEntity::Basic(b) => &b.label,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, ResultEntity::Composite(_))
    }

    pub fn as_composite(&self) -> Option<&CompositeEntity> {
        match self {
            ResultEntity::Composite(c) => Some(c),
            ResultEntity::Basic(_) => None,
        }
    }

    pub fn as_basic(&self) -> Option<&BasicEntity> {
        match self {
            ResultEntity::Basic(b) => Some(b),
            ResultEntity::Composite(_) => None,
        }
    }
}

/// Options that affect compilation and output.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Value written to the `extractor` field of composite records.
    pub extractor_name: String,
    /// Regular-expression flags applied to every pattern.
    pub flags: PatternFlags,
}

impl Default for Options {
    fn default() -> Self {
        Options { extractor_name: DEFAULT_EXTRACTOR_NAME.to_string(), flags: PatternFlags::empty() }
    }
}

/// A compact view of one candidate match, accepted or not.
#[derive(Debug, Clone)]
pub struct CandidateSummary {
    /// Composite name.
    pub name: String,
    /// Raw text of the alternative that matched.
    pub pattern: String,
    pub source_length: usize,
    pub start: usize,
    pub end: usize,
    pub members: Vec<BasicEntity>,
    pub accepted: bool,
}

/// Additional details returned by [`CompositeExtractor::process_verbose`].
///
/// Meant for debugging pattern sets: what the patterns actually ran against and
/// which candidates lost conflict resolution.
#[derive(Debug, Clone)]
pub struct ExtractDetails {
    /// Projected text with markers rendered as `@label`.
    pub projected_text: String,
    /// Every candidate, in discovery order.
    pub candidates: Vec<CandidateSummary>,
    /// Raw text of patterns skipped because none of their types was present.
    pub gated_patterns: Vec<String>,
    /// Entities left out of matching (overlapping or invalid spans).
    pub skipped: Vec<BasicEntity>,
    pub metrics: RunMetrics,
}

/// Result from [`CompositeExtractor::process_verbose`].
#[derive(Debug, Clone)]
pub struct ExtractResult {
    /// The processed message text.
    pub text: String,
    /// Final entity list.
    pub results: Vec<ResultEntity>,
    /// Total elapsed time.
    pub elapsed: Duration,
    pub details: ExtractDetails,
}

/// A compiled pattern set ready to process messages.
///
/// Construction compiles every pattern and fails on the first invalid one, so a
/// successfully built extractor never fails afterwards. It holds no mutable
/// state: share it by reference across threads.
#[derive(Debug, Clone)]
pub struct CompositeExtractor {
    compiled: CompiledPatterns,
    options: Options,
}

impl CompositeExtractor {
    /// Compile `patterns` with `options`.
    pub fn new(patterns: &PatternSet, options: Options) -> Result<Self, PatternCompileError> {
        let compiled = CompiledPatterns::new(patterns, options.flags)?;
        Ok(CompositeExtractor { compiled, options })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of compiled alternatives.
    pub fn pattern_count(&self) -> usize {
        self.compiled.patterns.len()
    }

    /// Group `entities` of `text` into composites.
    ///
    /// # Example
    /// ```
    /// use amalgam::{BasicEntity, CompositeExtractor, Options, PatternSet, composite};
    ///
    /// let set = PatternSet::new(vec![composite!("outfit" => ["@color @product"])]);
    /// let extractor = CompositeExtractor::new(&set, Options::default()).unwrap();
    ///
    /// let entities = vec![BasicEntity::new("color", "red", 0, 3), BasicEntity::new("product", "shirt", 4, 9)];
    /// let results = extractor.process("red shirt", &entities);
    ///
    /// assert_eq!(results.len(), 1);
    /// assert_eq!(results[0].label(), "outfit");
    /// ```
    pub fn process(&self, text: &str, entities: &[BasicEntity]) -> Vec<ResultEntity> {
        if entities.is_empty() {
            return Vec::new();
        }
        engine::Matcher::new(text, entities, &self.compiled).run(&self.options.extractor_name)
    }

    /// Like [`process`](Self::process), but also returns candidates, gating and
    /// timing details.
    pub fn process_verbose(&self, text: &str, entities: &[BasicEntity]) -> ExtractResult {
        let start = Instant::now();
        let matcher = engine::Matcher::timed(text, entities, &self.compiled);
        let projected_text = matcher.projection().readable();
        let skipped: Vec<BasicEntity> =
            matcher.projection().skipped.iter().map(|&id| entities[id].clone()).collect();

        let run = matcher.run_with_metrics(&self.options.extractor_name);

        let candidates = run
            .candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                let pattern = &self.compiled.patterns[c.pattern];
                CandidateSummary {
                    name: pattern.name.clone(),
                    pattern: pattern.raw.clone(),
                    source_length: pattern.source_length,
                    start: c.start,
                    end: c.end,
                    members: c.members.iter().map(|&id| entities[id].clone()).collect(),
                    accepted: run.accepted.contains(&idx),
                }
            })
            .collect();
        let gated_patterns = run.gated.iter().map(|&id| self.compiled.patterns[id].raw.clone()).collect();

        let details = ExtractDetails { projected_text, candidates, gated_patterns, skipped, metrics: run.metrics };

        ExtractResult { text: text.to_string(), results: run.results, elapsed: start.elapsed(), details }
    }
}

/// Compile `patterns` and process one message with default [`Options`].
///
/// Use [`CompositeExtractor`] to compile once and process many messages.
pub fn extract(
    text: &str,
    entities: &[BasicEntity],
    patterns: &PatternSet,
) -> Result<Vec<ResultEntity>, PatternCompileError> {
    Ok(CompositeExtractor::new(patterns, Options::default())?.process(text, entities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite;
    use serde_json::json;

    fn outfit_extractor() -> CompositeExtractor {
        let set = PatternSet::new(vec![composite!("outfit" => ["@color @product"])]);
        CompositeExtractor::new(&set, Options::default()).unwrap()
    }

    #[test]
    fn basic_entity_deserializes_wire_record_and_keeps_extra_keys() {
        let record = json!({
            "entity": "color",
            "value": "red",
            "start": 0,
            "end": 3,
            "confidence": 0.87,
            "extractor": "CRFEntityExtractor",
            "processors": ["EntitySynonymMapper"]
        });
        let entity: BasicEntity = serde_json::from_value(record.clone()).unwrap();

        assert_eq!(entity.label, "color");
        assert_eq!(entity.source.as_deref(), Some("CRFEntityExtractor"));
        assert_eq!(entity.confidence, Some(0.87));
        assert!(entity.extra.contains_key("processors"));
        assert_eq!(serde_json::to_value(&entity).unwrap(), record);
    }

    #[test]
    fn basic_entity_accepts_structured_values_and_missing_optionals() {
        let entity: BasicEntity =
            serde_json::from_value(json!({"entity": "amount", "value": {"value": 3, "unit": "kg"}, "start": 0, "end": 4}))
                .unwrap();

        assert_eq!(entity.value["unit"], "kg");
        assert_eq!(entity.confidence, None);
        assert_eq!(entity.source, None);
    }

    #[test]
    fn composite_serializes_as_output_record() {
        let results = outfit_extractor().process("red shirt", &[
            BasicEntity::new("color", "red", 0, 3),
            BasicEntity::new("product", "shirt", 4, 9),
        ]);

        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(
            value,
            json!([{
                "entity": "outfit",
                "extractor": "composite-extractor",
                "start": 0,
                "end": 9,
                "confidence": 1.0,
                "value": [
                    {"entity": "color", "value": "red", "start": 0, "end": 3},
                    {"entity": "product", "value": "shirt", "start": 4, "end": 9}
                ]
            }])
        );
    }

    #[test]
    fn extractor_name_is_configurable() {
        let set = PatternSet::new(vec![composite!("outfit" => ["@color @product"])]);
        let options = Options { extractor_name: "composite".to_string(), ..Options::default() };
        let extractor = CompositeExtractor::new(&set, options).unwrap();

        let results = extractor.process("red shirt", &[
            BasicEntity::new("color", "red", 0, 3),
            BasicEntity::new("product", "shirt", 4, 9),
        ]);
        assert_eq!(results[0].as_composite().unwrap().source, "composite");
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let set = PatternSet::new(vec![composite!("outfit" => ["@color )"])]);
        let err = CompositeExtractor::new(&set, Options::default()).unwrap_err();
        assert_eq!(err.name(), "outfit");
    }

    #[test]
    fn empty_inputs_are_not_errors() {
        let extractor = outfit_extractor();
        assert!(extractor.process("red shirt", &[]).is_empty());

        let none = CompositeExtractor::new(&PatternSet::default(), Options::default()).unwrap();
        let entities = vec![BasicEntity::new("product", "shirt", 4, 9), BasicEntity::new("color", "red", 0, 3)];
        let results = none.process("red shirt", &entities);
        let labels: Vec<&str> = results.iter().map(ResultEntity::label).collect();
        assert_eq!(labels, vec!["color", "product"]);
    }

    #[test]
    fn process_verbose_reports_candidates_and_gating() {
        let set = PatternSet::new(vec![
            composite!("outfit" => ["@color @product", "@product"]),
            composite!("place" => ["@city"]),
        ]);
        let extractor = CompositeExtractor::new(&set, Options::default()).unwrap();
        let entities = vec![BasicEntity::new("color", "red", 0, 3), BasicEntity::new("product", "shirt", 4, 9)];

        let res = extractor.process_verbose("red shirt", &entities);

        assert_eq!(res.text, "red shirt");
        assert_eq!(res.details.projected_text, "@color @product");
        assert_eq!(res.details.gated_patterns, vec!["@city".to_string()]);
        assert_eq!(res.details.candidates.len(), 2);
        assert!(res.details.candidates[0].accepted);
        assert!(!res.details.candidates[1].accepted);
        assert_eq!(res.details.metrics.candidates, 2);
        assert_eq!(res.results, extractor.process("red shirt", &entities));
    }

    #[test]
    fn process_verbose_lists_skipped_entities() {
        let extractor = outfit_extractor();
        let entities = vec![BasicEntity::new("color", "red", 0, 3), BasicEntity::new("shade", "re", 0, 2)];

        let res = extractor.process_verbose("red", &entities);
        assert_eq!(res.details.skipped, vec![entities[0].clone()]);
        assert_eq!(res.results.len(), 2);
    }

    #[test]
    fn extract_compiles_and_processes_in_one_call() {
        let set = PatternSet::new(vec![composite!("outfit" => ["@color @product"])]);
        let results = extract("red shirt", &[
            BasicEntity::new("color", "red", 0, 3),
            BasicEntity::new("product", "shirt", 4, 9),
        ], &set)
        .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].is_composite());
    }

    #[test]
    fn builder_fields_survive_into_composite_members() {
        let extractor = outfit_extractor();
        assert_eq!(extractor.options().extractor_name, DEFAULT_EXTRACTOR_NAME);
        assert_eq!(extractor.pattern_count(), 1);

        let color = BasicEntity::new("color", "red", 0, 3).with_confidence(0.5).with_source("crf");
        let results = extractor.process("red shirt", &[color.clone(), BasicEntity::new("product", "shirt", 4, 9)]);

        let outfit = results[0].as_composite().unwrap();
        assert_eq!(outfit.members[0], color);
        assert_eq!(outfit.confidence, 1.0);
    }

    #[test]
    fn extractor_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompositeExtractor>();
    }
}
