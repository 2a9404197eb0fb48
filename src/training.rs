//! Training payload: labeled examples plus optional entity rules and
//! synonym tables.
//!
//! Payloads are validated before any trainer is constructed, so a malformed
//! payload is rejected with no side effects.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::extractors::RegexRule;

/// One labeled text example.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Annotated entity spans, kept opaque for components that need them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Value>,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: Some(intent.into()),
            entities: Vec::new(),
        }
    }
}

/// The full training payload handed to a
/// [`Trainer`](crate::pipeline::Trainer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingData {
    #[serde(default)]
    pub training_examples: Vec<TrainingExample>,

    /// Named regex rules consumed by the extractor components.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regex_features: Vec<RegexRule>,

    /// Canonical value to accepted synonyms.
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    pub entity_synonyms: FxHashMap<String, Vec<String>>,
}

impl TrainingData {
    /// Schema check run before trainer construction. Labeled examples are
    /// required; entity rules and synonym tables are optional.
    pub fn validate(&self) -> Result<()> {
        if self.training_examples.is_empty() {
            return Err(Error::validation(
                "training payload needs at least one labeled example",
            ));
        }
        for (i, example) in self.training_examples.iter().enumerate() {
            if example.text.trim().is_empty() {
                return Err(Error::validation(format!(
                    "training example {i} has empty text"
                )));
            }
        }
        for rule in &self.regex_features {
            if rule.name.is_empty() {
                return Err(Error::validation("regex rule with empty name"));
            }
        }
        Ok(())
    }

    /// Fold another payload into this one. Used when retraining merges an
    /// archived snapshot with fresh data; archived entries come after fresh
    /// ones so fresh declarations win rule ordering.
    pub fn merge(&mut self, other: TrainingData) {
        self.training_examples.extend(other.training_examples);
        self.regex_features.extend(other.regex_features);
        for (canonical, synonyms) in other.entity_synonyms {
            self.entity_synonyms
                .entry(canonical)
                .or_default()
                .extend(synonyms);
        }
    }

    /// Distinct intent labels in first-seen order.
    pub fn intents(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for example in &self.training_examples {
            if let Some(intent) = example.intent.as_deref() {
                if !seen.contains(&intent) {
                    seen.push(intent);
                }
            }
        }
        seen
    }

    /// All example texts labeled with the given intent.
    pub fn examples_for_intent(&self, intent: &str) -> Vec<&str> {
        self.training_examples
            .iter()
            .filter(|e| e.intent.as_deref() == Some(intent))
            .map(|e| e.text.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> TrainingData {
        serde_json::from_value(json!({
            "training_examples": [
                { "text": "turn on the light", "intent": "light_on" },
                { "text": "lights on please", "intent": "light_on" },
                { "text": "switch off the fan", "intent": "fan_off" }
            ],
            "regex_features": [
                { "name": "room", "pattern": "\\w+" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn test_empty_examples_rejected() {
        let data = TrainingData::default();
        let err = data.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_blank_example_text_rejected() {
        let mut data = payload();
        data.training_examples.push(TrainingExample {
            text: "   ".into(),
            ..Default::default()
        });
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_intents_first_seen_order() {
        assert_eq!(payload().intents(), vec!["light_on", "fan_off"]);
    }

    #[test]
    fn test_examples_for_intent() {
        let data = payload();
        assert_eq!(
            data.examples_for_intent("light_on"),
            vec!["turn on the light", "lights on please"]
        );
        assert!(data.examples_for_intent("unknown").is_empty());
    }

    #[test]
    fn test_merge_appends_archived_after_fresh() {
        let mut fresh = payload();
        let mut archived = TrainingData::default();
        archived
            .training_examples
            .push(TrainingExample::new("old example", "light_on"));
        archived.regex_features.push(RegexRule::new("old", "\\d+"));

        fresh.merge(archived);
        assert_eq!(fresh.training_examples.len(), 4);
        assert_eq!(fresh.regex_features.last().unwrap().name, "old");
    }
}
