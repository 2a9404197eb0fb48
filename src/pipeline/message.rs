//! The per-request state carrier.
//!
//! A [`Message`] is the mutable bag of named artifacts that flows through
//! every pipeline component during inference. Components read what earlier
//! components wrote and add their own results under documented keys (see
//! [`crate::constants`]). Keys are never removed, only overwritten; the last
//! writer wins.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};

use crate::constants::TEXT;

/// Mutable per-request bag of named artifacts.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Original input text of the request.
    pub text: String,
    /// Optional request timestamp.
    pub time: Option<DateTime<Utc>>,
    data: FxHashMap<String, Value>,
    output_keys: FxHashSet<String>,
}

impl Message {
    /// Create a message for the given input text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Request specific keys for the external projection in addition to any
    /// keys components mark visible themselves.
    pub fn with_output_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Seed caller-supplied values (a candidate pool, extra rules) before
    /// the pipeline runs. Seeds are not marked visible.
    pub fn with_seeds(mut self, seeds: Map<String, Value>) -> Self {
        for (key, value) in seeds {
            self.set(key, value, false);
        }
        self
    }

    /// Attach a request timestamp.
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Look up an artifact by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Look up an artifact, falling back to `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.data.get(key).unwrap_or(default)
    }

    /// Store an artifact. `add_to_output` marks the key for inclusion in the
    /// external projection even when the caller's requested filter omits it.
    pub fn set(&mut self, key: impl Into<String>, value: Value, add_to_output: bool) {
        let key = key.into();
        if add_to_output {
            self.output_keys.insert(key.clone());
        }
        self.data.insert(key, value);
    }

    /// Render the message as a JSON object.
    ///
    /// With `only_output_properties` the projection contains the text plus
    /// only the requested and visible keys; otherwise the full internal
    /// state is rendered.
    pub fn as_dict(&self, only_output_properties: bool) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(TEXT.to_string(), Value::String(self.text.clone()));
        for (key, value) in &self.data {
            if only_output_properties && !self.output_keys.contains(key) {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }
        out
    }
}
