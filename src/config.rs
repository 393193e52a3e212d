//! Pattern-set configuration.
//!
//! A pattern set is plain data: a list of named composite definitions, each with
//! one or more alternative pattern strings. It is compiled once by
//! [`CompositeExtractor::new`](crate::CompositeExtractor::new).
//!
//! Three JSON shapes are accepted when loading:
//!
//! ```text
//! { "composite_entities": [ {name, patterns}, ... ] }                  bare set
//! { "rasa_nlu_data": { "composite_entities": [ ... ], ... } }          training data
//! [ {name, patterns}, ... ]                                            persisted list
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name used by [`PatternSet::persist`] and [`PatternSet::load`].
pub const COMPOSITE_ENTITIES_FILE_NAME: &str = "composite_entities.json";

/// One named composite entity and its alternative patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeDefinition {
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// The full set of composite definitions handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    #[serde(default)]
    pub composite_entities: Vec<CompositeDefinition>,
}

#[derive(Deserialize)]
struct TrainingFile {
    rasa_nlu_data: PatternSet,
}

/// The bare shape holds nothing but definitions, so a misspelled key is an
/// error rather than an empty set.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BareFile {
    #[serde(default)]
    composite_entities: Vec<CompositeDefinition>,
}

impl PatternSet {
    pub fn new(composite_entities: Vec<CompositeDefinition>) -> Self {
        Self { composite_entities }
    }

    pub fn is_empty(&self) -> bool {
        self.composite_entities.is_empty()
    }

    /// Total number of alternative pattern strings across all definitions.
    pub fn pattern_count(&self) -> usize {
        self.composite_entities.iter().map(|c| c.patterns.len()).sum()
    }

    /// Parse a pattern set from any of the accepted JSON shapes.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        // The shape is picked up front, so a malformed definition reports its
        // own serde error instead of falling through to another shape.
        let value: serde_json::Value = serde_json::from_str(json)?;
        let set = if value.is_array() {
            PatternSet::new(serde_json::from_value(value)?)
        } else if value.get("rasa_nlu_data").is_some() {
            serde_json::from_value::<TrainingFile>(value)?.rasa_nlu_data
        } else {
            PatternSet::new(serde_json::from_value::<BareFile>(value)?.composite_entities)
        };

        if set.is_empty() {
            tracing::warn!("pattern set defines no composite entities");
        }
        Ok(set)
    }

    /// Read and parse a pattern set from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), "loading pattern set");
        Self::from_json_str(&json)
    }

    /// Append the definitions of `other`, keeping order (several training files
    /// may each contribute composite definitions).
    pub fn merge(&mut self, other: PatternSet) {
        self.composite_entities.extend(other.composite_entities);
    }

    /// Serialize the definitions in the persisted list shape.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.composite_entities)?)
    }

    /// Write the definitions to `dir/composite_entities.json`.
    ///
    /// Nothing is written for an empty set; `Ok(None)` is returned instead.
    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>, ConfigError> {
        if self.is_empty() {
            return Ok(None);
        }
        let path = dir.as_ref().join(COMPOSITE_ENTITIES_FILE_NAME);
        std::fs::write(&path, self.to_json()?).map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        Ok(Some(path))
    }

    /// Load definitions previously written by [`persist`](Self::persist).
    ///
    /// A missing file is not an error: the result is an empty set and a warning.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(COMPOSITE_ENTITIES_FILE_NAME);
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "failed to load composite entities file");
            return Ok(PatternSet::default());
        }
        Self::from_path(path)
    }
}

impl From<Vec<CompositeDefinition>> for PatternSet {
    fn from(composite_entities: Vec<CompositeDefinition>) -> Self {
        Self { composite_entities }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_set() {
        let set = PatternSet::from_json_str(
            r#"{"composite_entities": [{"name": "outfit", "patterns": ["@color @product"]}]}"#,
        )
        .unwrap();

        assert_eq!(set.composite_entities.len(), 1);
        assert_eq!(set.composite_entities[0].name, "outfit");
        assert_eq!(set.pattern_count(), 1);
    }

    #[test]
    fn parses_training_data_wrapper() {
        let json = r#"{
            "rasa_nlu_data": {
                "common_examples": [],
                "composite_entities": [
                    {"name": "outfit", "patterns": ["@color @product", "@product in @color"]}
                ]
            }
        }"#;
        let set = PatternSet::from_json_str(json).unwrap();

        assert_eq!(set.pattern_count(), 2);
    }

    #[test]
    fn training_data_without_composites_is_empty() {
        let set = PatternSet::from_json_str(r#"{"rasa_nlu_data": {"common_examples": []}}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn definition_without_patterns_defaults_to_empty_list() {
        let set = PatternSet::from_json_str(r#"[{"name": "outfit"}]"#).unwrap();
        assert_eq!(set.composite_entities[0].patterns, Vec::<String>::new());
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = PatternSet::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn malformed_definition_inside_wrapper_is_reported() {
        let json = r#"{"rasa_nlu_data": {"composite_entities": [{"name": "outfit", "patterns": "@color"}]}}"#;
        let err = PatternSet::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn misspelled_key_in_bare_set_is_reported() {
        let err = PatternSet::from_json_str(r#"{"composite_entites": [{"name": "outfit"}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn malformed_definition_in_list_is_reported() {
        let err = PatternSet::from_json_str(r#"[{"patterns": ["@color"]}]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn persist_then_load_restores_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let set = PatternSet::new(vec![crate::composite!("outfit" => ["@color @product", "@product"])]);

        let path = set.persist(dir.path()).unwrap().unwrap();
        assert!(path.ends_with(COMPOSITE_ENTITIES_FILE_NAME));

        let loaded = PatternSet::load(dir.path()).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn empty_set_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PatternSet::default().persist(dir.path()).unwrap().is_none());
        assert!(!dir.path().join(COMPOSITE_ENTITIES_FILE_NAME).exists());
    }

    #[test]
    fn loading_missing_file_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PatternSet::load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PatternSet::from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn merge_keeps_definition_order() {
        let mut set = PatternSet::new(vec![crate::composite!("a" => ["@x"])]);
        set.merge(PatternSet::new(vec![crate::composite!("b" => ["@y"])]));

        let names: Vec<&str> = set.composite_entities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
