//! Greedy rule-based slot filler.
//!
//! [`RegexRuleEntityExtractor`] fills an ordered list of named rules from a
//! candidate pool of tokens derived from the input text. Rules are filled in
//! declaration order with a greedy longest-match policy, and a consumed
//! candidate token is removed from the pool so no later rule can reuse it.

use std::collections::VecDeque;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::constants::{
    ENTITIES, ENTITY_REGEX_FILE, INTENT, REGEX_FEATURES, SYS_PLACEHOLDER_VALUES,
};
use crate::errors::Result;
use crate::extractors::RegexRule;
use crate::pipeline::{Component, ComponentClass, ComponentConfig, Context, Message};
use crate::training::TrainingData;

pub const NAME: &str = "RegexRuleEntityExtractor";
const CLASS_PATH: &str = "simatch::extractors::RegexRuleEntityExtractor";

/// Metadata key recording the persisted artifact file name.
const REGEX_FILE_KEY: &str = "entity_regex_file";

/// Fills named rules from the input text with a greedy longest-match scan
/// over a shared candidate pool.
pub struct RegexRuleEntityExtractor {
    case_sensitive: bool,
    /// Rule values treated as system-injected and accepted as-is.
    sys_values: Vec<String>,
    patterns: Vec<RegexRule>,
    /// Token boundary for building the candidate pool: runs of `?` (the
    /// non-ASCII placeholder) or whitespace.
    delimiter: Regex,
}

impl RegexRuleEntityExtractor {
    pub fn new(config: &ComponentConfig, known_patterns: Vec<RegexRule>) -> Result<Self> {
        Ok(Self {
            case_sensitive: config.get_bool("case_sensitive", false),
            sys_values: config.get_str_list("sys_pattern_value"),
            patterns: known_patterns,
            delimiter: Regex::new(r"\?+|\s+")?,
        })
    }

    fn defaults() -> Map<String, Value> {
        let mut defaults = Map::new();
        defaults.insert("case_sensitive".into(), json!(false));
        defaults.insert("sys_pattern_value".into(), json!(SYS_PLACEHOLDER_VALUES));
        defaults
    }

    /// Build the ordered candidate queue the rules consume from.
    ///
    /// When every configured pattern is a degenerate wildcard the rules are
    /// purely positional, so the pool is just the text's tokens minus the
    /// first one (the triggering keyword). Otherwise non-ASCII characters
    /// become placeholders, and tokens that are empty or literally contained
    /// in the intent's utterance template are dropped so boilerplate words
    /// are never re-extracted as entity values.
    fn preprocess(&self, message: &Message, patterns: &[RegexRule]) -> VecDeque<String> {
        if patterns.iter().all(RegexRule::is_degenerate) {
            return self
                .delimiter
                .split(&message.text)
                .skip(1)
                .map(str::to_string)
                .collect();
        }

        let ascii: String = message
            .text
            .chars()
            .map(|c| if c.is_ascii() { c } else { '?' })
            .collect();
        let utterance = message
            .get(INTENT)
            .and_then(|i| i.get("utterance"))
            .and_then(Value::as_str)
            .unwrap_or("");

        self.delimiter
            .split(&ascii)
            .map(str::trim)
            .filter(|token| !token.is_empty() && !utterance.contains(token))
            .map(str::to_string)
            .collect()
    }

    /// Fill the rules in declaration order. Consumed candidates are removed
    /// from the pool, so one matched token never fills two rules.
    fn extract(&self, message: &Message, patterns: &[RegexRule]) -> Result<Vec<RegexRule>> {
        let mut candidates = self.preprocess(message, patterns);
        let intent_id = message
            .get(INTENT)
            .and_then(|i| i.get("id"))
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut entities = Vec::new();
        for rule in patterns {
            let mut rule = rule.clone();
            if rule
                .usage
                .as_deref()
                .is_some_and(|usage| usage != intent_id)
            {
                continue;
            }

            // System-injected value, not text-derived.
            if rule
                .value
                .as_deref()
                .is_some_and(|v| self.sys_values.iter().any(|s| s == v))
            {
                entities.push(rule);
                continue;
            }

            if rule.is_degenerate() {
                match candidates.pop_front() {
                    Some(token) => rule.value = Some(token),
                    None => warn!(rule = %rule.name, "no candidate text left for rule"),
                }
                entities.push(rule);
                continue;
            }

            let pattern = RegexBuilder::new(&rule.pattern)
                .case_insensitive(!self.case_sensitive)
                .build()?;
            let mut best: Option<(usize, usize, usize)> = None; // (index, start, end)
            let mut max_len = 0;
            for (i, token) in candidates.iter().enumerate() {
                if let Some(found) = pattern.find(token) {
                    let len = found.as_str().chars().count();
                    if len > max_len {
                        best = Some((i, found.start(), found.end()));
                        max_len = len;
                    }
                }
            }
            if let Some((index, start, end)) = best {
                let token = &candidates[index];
                rule.value = Some(token[start..end].to_string());
                rule.start = Some(start);
                rule.end = Some(end);
                candidates.remove(index);
            }
            entities.push(rule);
        }

        for entity in &mut entities {
            entity.extractor = Some(NAME.to_string());
        }
        Ok(entities)
    }
}

impl Component for RegexRuleEntityExtractor {
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
        &[INTENT, REGEX_FEATURES]
    }

    fn train(
        &mut self,
        data: &mut TrainingData,
        _previous: &[Box<dyn Component>],
        _context: &Context,
    ) -> Result<Option<Context>> {
        self.patterns.extend(data.regex_features.iter().cloned());
        if self.patterns.is_empty() {
            warn!("no regex rules in training payload");
        }
        Ok(None)
    }

    fn process(&self, message: &mut Message, _context: &Context) -> Result<()> {
        // Rules may arrive per-request instead of at training time.
        let seeded: Vec<RegexRule>;
        let patterns = if self.patterns.is_empty() {
            seeded = message
                .get(REGEX_FEATURES)
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            &seeded
        } else {
            &self.patterns
        };
        if patterns.is_empty() {
            warn!("no regex rules configured, nothing to extract");
            return Ok(());
        }

        let extracted = self.extract(message, patterns)?;
        let mut entities = message
            .get(ENTITIES)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for entity in extracted {
            entities.push(serde_json::to_value(entity)?);
        }
        message.set(ENTITIES, Value::Array(entities), true);
        Ok(())
    }

    fn persist(&self, model_dir: &Path) -> Result<Option<Map<String, Value>>> {
        if self.patterns.is_empty() {
            return Ok(None);
        }
        std::fs::write(
            model_dir.join(ENTITY_REGEX_FILE),
            serde_json::to_string_pretty(&self.patterns)?,
        )?;
        let mut fragment = Map::new();
        fragment.insert(REGEX_FILE_KEY.into(), json!(ENTITY_REGEX_FILE));
        Ok(Some(fragment))
    }
}

/// Registry entry for this component.
pub fn component_class() -> ComponentClass {
    ComponentClass {
        name: NAME,
        class_path: CLASS_PATH,
        create: |metadata| {
            let config = metadata.for_component(NAME, RegexRuleEntityExtractor::defaults());
            Ok(Box::new(RegexRuleEntityExtractor::new(&config, Vec::new())?))
        },
        load: |model_dir, metadata, _context| {
            let config = metadata.for_component(NAME, RegexRuleEntityExtractor::defaults());
            let patterns = load_patterns(model_dir, &config)?;
            Ok(Box::new(RegexRuleEntityExtractor::new(&config, patterns)?))
        },
        cache_key: |_| None,
    }
}

/// Read the persisted rule artifact when the model directory carries one.
pub(crate) fn load_patterns(
    model_dir: Option<&Path>,
    config: &ComponentConfig,
) -> Result<Vec<RegexRule>> {
    let file_name = config.get_str(REGEX_FILE_KEY).unwrap_or(ENTITY_REGEX_FILE);
    let Some(dir) = model_dir else {
        return Ok(Vec::new());
    };
    let path = dir.join(file_name);
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}
