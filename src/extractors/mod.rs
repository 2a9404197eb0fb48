//! Entity extractor components and the rule type they share.

pub mod regex_entity;
pub mod regex_rule;

use serde::{Deserialize, Serialize};

pub use regex_entity::RegexEntityExtractor;
pub use regex_rule::RegexRuleEntityExtractor;

/// One named regex rule: a slot definition scoped by intent.
///
/// `value` doubles as the default fill before extraction and the extracted
/// text afterwards; `start`/`end` record the matched span within the winning
/// candidate token. `extractor` is stamped by whichever component produced
/// the final entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexRule {
    pub name: String,
    pub pattern: String,

    /// Intent scope; a rule with `usage` set only applies when the current
    /// intent matches it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
}

impl RegexRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            usage: None,
            value: None,
            start: None,
            end: None,
            extractor: None,
        }
    }

    /// Restrict this rule to one intent scope.
    pub fn scoped(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Whether the pattern is a degenerate wildcard (matches anything), in
    /// which case the rule is filled positionally instead of searched.
    pub fn is_degenerate(&self) -> bool {
        crate::constants::DEGENERATE_PATTERNS.contains(&self.pattern.as_str())
    }
}
