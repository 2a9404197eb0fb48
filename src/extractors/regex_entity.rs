//! Whole-text regex entity extractor.
//!
//! [`RegexEntityExtractor`] matches its rule patterns anywhere in the input
//! text and emits one entity per match. At training time it consumes the
//! declared rules and additionally synthesizes a pattern per entity type
//! from the annotated example values, so entities with a regular surface
//! form (ids, hostnames, build artifacts) are matched without hand-written
//! rules.

use std::path::Path;

use regex::RegexBuilder;
use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::constants::{ENTITIES, INTENT};
use crate::errors::Result;
use crate::extractors::regex_rule::load_patterns;
use crate::extractors::RegexRule;
use crate::pattern::AutoPattern;
use crate::pipeline::{Component, ComponentClass, ComponentConfig, Context, Message};
use crate::training::TrainingData;

pub const NAME: &str = "RegexEntityExtractor";
const CLASS_PATH: &str = "simatch::extractors::RegexEntityExtractor";

const PATTERN_FILE: &str = "regex_patterns.json";
const REGEX_FILE_KEY: &str = "entity_regex_file";

/// Matches rule patterns anywhere in the text, one entity per match.
pub struct RegexEntityExtractor {
    case_sensitive: bool,
    /// Generality threshold for synthesized patterns.
    epsilon: f64,
    /// Recursion trigger for synthesized patterns.
    tau: f64,
    /// Refinement depth for synthesized patterns.
    depth: usize,
    patterns: Vec<RegexRule>,
}

impl RegexEntityExtractor {
    pub fn new(config: &ComponentConfig, known_patterns: Vec<RegexRule>) -> Self {
        Self {
            case_sensitive: config.get_bool("case_sensitive", false),
            epsilon: config.get("epsilon").and_then(Value::as_f64).unwrap_or(0.3),
            tau: config.get("tau").and_then(Value::as_f64).unwrap_or(0.8),
            depth: config
                .get("depth")
                .and_then(Value::as_u64)
                .unwrap_or(1) as usize,
            patterns: known_patterns,
        }
    }

    fn defaults() -> Map<String, Value> {
        let mut defaults = Map::new();
        defaults.insert("case_sensitive".into(), json!(false));
        defaults.insert("epsilon".into(), json!(0.3));
        defaults.insert("tau".into(), json!(0.8));
        defaults.insert("depth".into(), json!(1));
        defaults
    }

    /// Synthesize one rule per entity type from the annotated example
    /// values. Entity types with a single observed value are skipped; a
    /// literal rule would just re-match the training data.
    fn synthesize(&self, data: &TrainingData) -> Vec<RegexRule> {
        let mut values_by_entity: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for example in &data.training_examples {
            for entity in &example.entities {
                let (Some(name), Some(value)) = (
                    entity.get("entity").and_then(Value::as_str),
                    entity.get("value").and_then(Value::as_str),
                ) else {
                    continue;
                };
                values_by_entity
                    .entry(name.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        let mut rules = Vec::new();
        for (entity, values) in values_by_entity {
            let distinct: Vec<&String> = {
                let mut seen = Vec::new();
                for v in &values {
                    if !seen.contains(&v) {
                        seen.push(v);
                    }
                }
                seen
            };
            if distinct.len() < 2 {
                continue;
            }

            let mut synth = AutoPattern::new(values, self.epsilon, self.tau);
            synth.generate(self.depth);
            let pattern = synth.build();
            if pattern.is_empty() {
                continue;
            }
            debug!(entity = %entity, pattern = %pattern, "synthesized entity pattern");
            rules.push(RegexRule::new(entity, pattern));
        }
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    fn extract(&self, message: &Message) -> Result<Vec<Value>> {
        let intent_name = message
            .get(INTENT)
            .and_then(|i| i.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut entities = Vec::new();
        for rule in &self.patterns {
            if rule
                .usage
                .as_deref()
                .is_some_and(|usage| usage != intent_name)
            {
                continue;
            }
            let pattern = RegexBuilder::new(&rule.pattern)
                .case_insensitive(!self.case_sensitive)
                .build()?;
            for found in pattern.find_iter(&message.text) {
                entities.push(json!({
                    "entity": rule.name,
                    "start": found.start(),
                    "end": found.end(),
                    "value": found.as_str(),
                    "extractor": NAME,
                }));
            }
        }
        Ok(entities)
    }
}

impl Component for RegexEntityExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn class_path(&self) -> &str {
        CLASS_PATH
    }

    fn provides(&self) -> &'static [&'static str] {
        &[ENTITIES]
    }

    fn requires(&self) -> &'static [&'static str] {
        &[INTENT]
    }

    fn train(
        &mut self,
        data: &mut TrainingData,
        _previous: &[Box<dyn Component>],
        _context: &Context,
    ) -> Result<Option<Context>> {
        self.patterns.extend(data.regex_features.iter().cloned());
        self.patterns.extend(self.synthesize(data));
        if self.patterns.is_empty() {
            warn!("no regex rules declared or synthesizable");
        }
        Ok(None)
    }

    fn process(&self, message: &mut Message, _context: &Context) -> Result<()> {
        if self.patterns.is_empty() {
            return Ok(());
        }
        let extracted = self.extract(message)?;
        if extracted.is_empty() {
            return Ok(());
        }
        let mut entities = message
            .get(ENTITIES)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        entities.extend(extracted);
        message.set(ENTITIES, Value::Array(entities), true);
        Ok(())
    }

    fn persist(&self, model_dir: &Path) -> Result<Option<Map<String, Value>>> {
        if self.patterns.is_empty() {
            return Ok(None);
        }
        std::fs::write(
            model_dir.join(PATTERN_FILE),
            serde_json::to_string_pretty(&self.patterns)?,
        )?;
        let mut fragment = Map::new();
        fragment.insert(REGEX_FILE_KEY.into(), json!(PATTERN_FILE));
        Ok(Some(fragment))
    }
}

/// Registry entry for this component.
pub fn component_class() -> ComponentClass {
    ComponentClass {
        name: NAME,
        class_path: CLASS_PATH,
        create: |metadata| {
            let config = metadata.for_component(NAME, RegexEntityExtractor::defaults());
            Ok(Box::new(RegexEntityExtractor::new(&config, Vec::new())))
        },
        load: |model_dir, metadata, _context| {
            let mut config_defaults = RegexEntityExtractor::defaults();
            config_defaults.insert(REGEX_FILE_KEY.into(), json!(PATTERN_FILE));
            let config = metadata.for_component(NAME, config_defaults);
            let patterns = load_patterns(model_dir, &config)?;
            Ok(Box::new(RegexEntityExtractor::new(&config, patterns)))
        },
        cache_key: |_| None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::TrainingExample;

    fn extractor(patterns: Vec<RegexRule>) -> RegexEntityExtractor {
        let config = ComponentConfig::new(RegexEntityExtractor::defaults());
        RegexEntityExtractor::new(&config, patterns)
    }

    fn message_with_intent(text: &str, name: &str) -> Message {
        let mut msg = Message::new(text);
        msg.set(INTENT, json!({ "id": name, "name": name, "utterance": "" }), false);
        msg
    }

    #[test]
    fn test_every_match_becomes_an_entity() {
        let ex = extractor(vec![RegexRule::new("num", r"\d+")]);
        let mut msg = message_with_intent("move 12 boxes to bay 7", "move");

        ex.process(&mut msg, &Context::default()).unwrap();
        let entities = msg.get(ENTITIES).unwrap().as_array().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0]["value"], "12");
        assert_eq!(entities[1]["value"], "7");
        assert_eq!(entities[1]["start"], json!(21));
        assert_eq!(entities[0]["extractor"], NAME);
    }

    #[test]
    fn test_usage_scoping_by_intent_name() {
        let ex = extractor(vec![RegexRule::new("num", r"\d+").scoped("order")]);
        let mut msg = message_with_intent("take 5", "cancel");

        ex.process(&mut msg, &Context::default()).unwrap();
        assert!(msg.get(ENTITIES).is_none());
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let ex = extractor(vec![RegexRule::new("env", "prod")]);
        let mut msg = message_with_intent("deploy to PROD", "deploy");

        ex.process(&mut msg, &Context::default()).unwrap();
        let entities = msg.get(ENTITIES).unwrap().as_array().unwrap();
        assert_eq!(entities[0]["value"], "PROD");
    }

    #[test]
    fn test_no_match_leaves_prior_entities_untouched() {
        let ex = extractor(vec![RegexRule::new("num", r"\d+").scoped("order")]);
        let mut msg = message_with_intent("take 5", "cancel");
        msg.set(ENTITIES, json!([{ "name": "prior" }]), true);

        ex.process(&mut msg, &Context::default()).unwrap();
        let entities = msg.get(ENTITIES).unwrap().as_array().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0]["name"], "prior");
    }

    #[test]
    fn test_no_patterns_is_a_noop() {
        let ex = extractor(Vec::new());
        let mut msg = message_with_intent("anything", "any");
        ex.process(&mut msg, &Context::default()).unwrap();
        assert!(msg.get(ENTITIES).is_none());
    }

    #[test]
    fn test_train_synthesizes_pattern_from_annotated_values() {
        let mut data = TrainingData::default();
        for (text, value) in [("build 001", "001"), ("build 002", "002"), ("build 003", "003")] {
            let mut example = TrainingExample::new(text, "build");
            example.entities = vec![json!({ "entity": "build_id", "value": value })];
            data.training_examples.push(example);
        }

        let mut ex = extractor(Vec::new());
        ex.train(&mut data, &[], &Context::default()).unwrap();
        let rule = ex
            .patterns
            .iter()
            .find(|r| r.name == "build_id")
            .expect("synthesized rule");
        assert_eq!(rule.pattern, "(00)(1|2|3)");

        let mut msg = message_with_intent("promote build 002 now", "build");
        ex.process(&mut msg, &Context::default()).unwrap();
        let entities = msg.get(ENTITIES).unwrap().as_array().unwrap();
        assert_eq!(entities[0]["value"], "002");
    }

    #[test]
    fn test_train_skips_single_valued_entities() {
        let mut data = TrainingData::default();
        let mut example = TrainingExample::new("restart gateway", "restart");
        example.entities = vec![json!({ "entity": "service", "value": "gateway" })];
        data.training_examples.push(example);

        let mut ex = extractor(Vec::new());
        ex.train(&mut data, &[], &Context::default()).unwrap();
        assert!(ex.patterns.is_empty());
    }

    #[test]
    fn test_train_keeps_declared_rules_before_synthesized() {
        let mut data = TrainingData::default();
        data.regex_features.push(RegexRule::new("declared", r"\d+"));

        let mut ex = extractor(Vec::new());
        ex.train(&mut data, &[], &Context::default()).unwrap();
        assert_eq!(ex.patterns[0].name, "declared");
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let patterns = vec![RegexRule::new("num", r"\d+")];
        let ex = extractor(patterns.clone());

        let fragment = ex.persist(dir.path()).unwrap().unwrap();
        assert_eq!(fragment[REGEX_FILE_KEY], PATTERN_FILE);

        let mut defaults = RegexEntityExtractor::defaults();
        defaults.insert(REGEX_FILE_KEY.into(), json!(PATTERN_FILE));
        let config = ComponentConfig::new(defaults);
        let loaded = load_patterns(Some(dir.path()), &config).unwrap();
        assert_eq!(loaded, patterns);
    }
}
