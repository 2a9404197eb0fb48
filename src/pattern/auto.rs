//! Automatic pattern synthesis from example strings.
//!
//! The algorithm repeatedly splits the examples on the longest substring
//! common to all of them (the *delimiter*). The delimiter becomes a closed
//! literal segment ([`FullPattern`]); the text on either side becomes a
//! free-varying segment ([`HalfPattern`]) that is later rendered as a
//! character-class wildcard. Segments whose content is too information-dense
//! to generalize safely are frozen as literal alternations instead.
//!
//! Refinement is recursive up to a caller-chosen depth: each extra round
//! picks the free segment with the highest content entropy and splits it
//! again. A delimiter that cannot serve as a literal match target stops
//! refinement early; the best sequence built so far is kept rather than
//! failing the whole synthesis.

use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

use super::entropy::shannon_entropy;

// ============================================================================
// Segment nodes
// ============================================================================

/// A free-varying segment: the per-example raw values plus the entropy of
/// their length distribution and of their content distribution.
#[derive(Debug, Clone)]
pub struct HalfPattern {
    values: Vec<String>,
    lengths: Vec<usize>,
    length_entropy: f64,
    content_entropy: f64,
}

impl HalfPattern {
    /// Build a segment from the per-example raw values.
    pub fn new(values: Vec<String>) -> Self {
        let lengths: Vec<usize> = values.iter().map(|v| v.chars().count()).collect();
        let length_entropy = shannon_entropy(&lengths);
        let content_entropy = shannon_entropy(&values);
        Self {
            values,
            lengths,
            length_entropy,
            content_entropy,
        }
    }

    /// Entropy of the length distribution across examples.
    pub fn length_entropy(&self) -> f64 {
        self.length_entropy
    }

    /// Entropy of the content distribution across examples.
    pub fn content_entropy(&self) -> f64 {
        self.content_entropy
    }

    /// Per-example raw values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Classify the concatenated content of all examples.
    ///
    /// Returns `None` for an empty segment, `\d` when every character is a
    /// digit, `\w` when every character is alphanumeric, `.` otherwise.
    fn char_class(&self) -> Option<&'static str> {
        let mut chars = self.values.iter().flat_map(|v| v.chars()).peekable();
        chars.peek()?;

        let mut all_digit = true;
        let mut all_alnum = true;
        for c in chars {
            all_digit &= c.is_numeric();
            all_alnum &= c.is_alphanumeric();
        }
        if all_digit {
            Some(r"\d")
        } else if all_alnum {
            Some(r"\w")
        } else {
            Some(".")
        }
    }

    /// Render the segment under generality threshold `epsilon`.
    ///
    /// Length entropy above `epsilon` renders an unbounded repetition;
    /// positive entropy at or below it renders observed `{min,max}` bounds;
    /// zero entropy renders an exact count.
    fn render(&self, epsilon: f64) -> String {
        let Some(class) = self.char_class() else {
            return String::new();
        };

        if self.length_entropy > epsilon {
            format!("{class}+")
        } else if self.length_entropy > 0.0 {
            // min <= max by construction: both come from the same multiset.
            let min = self.lengths.iter().min().copied().unwrap_or(0);
            let max = self.lengths.iter().max().copied().unwrap_or(0);
            format!("{class}{{{min},{max}}}")
        } else {
            format!("{class}{{{}}}", self.lengths.first().copied().unwrap_or(0))
        }
    }
}

/// A closed segment: an enumerated set of literal values, entropy fixed at 0.
#[derive(Debug, Clone)]
pub struct FullPattern {
    values: Vec<String>,
}

impl FullPattern {
    /// Build a closed segment over the given literal values.
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Render as a parenthesized alternation of the distinct values.
    ///
    /// Distinct values keep first-seen insertion order so the rendering is
    /// deterministic for a given input order.
    fn render(&self) -> String {
        let mut seen = FxHashSet::default();
        let mut parts = Vec::new();
        for v in &self.values {
            if seen.insert(v.as_str()) {
                parts.push(v.as_str());
            }
        }
        format!("({})", parts.join("|"))
    }
}

/// One node of the working sentence. The in-order concatenation of node
/// contents reconstructs every original example.
#[derive(Debug, Clone)]
pub enum PatternNode {
    /// Free-varying segment, still eligible for further splitting.
    Half(HalfPattern),
    /// Closed literal enumeration, never split again.
    Full(FullPattern),
}

impl PatternNode {
    /// Content entropy used to pick refinement targets. `Full` nodes are
    /// closed and report 0.
    pub fn content_entropy(&self) -> f64 {
        match self {
            Self::Half(h) => h.content_entropy(),
            Self::Full(_) => 0.0,
        }
    }

    fn render(&self, epsilon: f64) -> String {
        match self {
            Self::Half(h) => h.render(epsilon),
            Self::Full(f) => f.render(),
        }
    }
}

// ============================================================================
// AutoPattern — the synthesis driver
// ============================================================================

/// Entropy-driven pattern synthesizer.
///
/// # Parameters
///
/// - `epsilon` — generality threshold: controls when a free segment renders
///   as an unbounded repetition versus length-bounded.
/// - `tau` — recursion trigger: a free segment whose content entropy exceeds
///   `tau` is frozen as a literal alternation instead of being generalized.
///
/// # Example
///
/// ```rust,ignore
/// let mut ap = AutoPattern::new(vec!["001".into(), "002".into(), "003".into()], 0.3, 0.8);
/// ap.generate(1);
/// assert_eq!(ap.build(), "(00)(1|2|3)");
/// ```
#[derive(Debug, Clone)]
pub struct AutoPattern {
    values: Vec<String>,
    epsilon: f64,
    tau: f64,
    sentence: Vec<PatternNode>,
}

impl AutoPattern {
    /// Create a synthesizer over a list of example strings.
    pub fn new(values: Vec<String>, epsilon: f64, tau: f64) -> Self {
        Self {
            values,
            epsilon,
            tau,
            sentence: Vec::new(),
        }
    }

    /// Longest substring common to every example.
    ///
    /// Scans outward from the first example: for each start position, the
    /// window grows while it remains a substring of all examples. The
    /// longest window found wins; the first occurrence wins on ties.
    /// Char-based so multi-byte input never splits a code point.
    fn longest_common_substring(values: &[String]) -> String {
        let Some(first) = values.first() else {
            return String::new();
        };
        let chars: Vec<char> = first.chars().collect();

        let mut best_start = 0;
        let mut best_len = 0;
        for start in 0..chars.len() {
            let mut len = 0;
            let mut window = String::new();
            for &c in &chars[start..] {
                window.push(c);
                if values.iter().all(|v| v.contains(&window)) {
                    len += 1;
                } else {
                    break;
                }
            }
            if len > best_len {
                best_start = start;
                best_len = len;
            }
        }

        chars[best_start..best_start + best_len].iter().collect()
    }

    /// Demote a free segment to a closed one when its content is too
    /// information-dense to generalize safely.
    fn classify(half: HalfPattern, tau: f64) -> PatternNode {
        if half.content_entropy() > tau {
            PatternNode::Full(FullPattern::new(half.values().to_vec()))
        } else {
            PatternNode::Half(half)
        }
    }

    /// Split `values` on their longest common substring into
    /// prefix / delimiter / suffix nodes.
    ///
    /// Returns `None` when no usable delimiter exists: the examples share no
    /// substring, or the shared substring cannot serve as a literal match
    /// target (it fails to compile as a pattern on its own).
    fn split(values: &[String], tau: f64) -> Option<Vec<PatternNode>> {
        let delimiter = Self::longest_common_substring(values);
        if delimiter.is_empty() {
            return None;
        }
        if Regex::new(&delimiter).is_err() {
            debug!(delimiter = %delimiter, "delimiter unusable as a match target, keeping current sequence");
            return None;
        }

        let mut prefixes = Vec::with_capacity(values.len());
        let mut suffixes = Vec::with_capacity(values.len());
        for v in values {
            // The delimiter is a substring of every value by construction.
            let at = v.find(&delimiter)?;
            prefixes.push(v[..at].to_string());
            suffixes.push(v[at + delimiter.len()..].to_string());
        }

        Some(vec![
            Self::classify(HalfPattern::new(prefixes), tau),
            PatternNode::Full(FullPattern::new(vec![delimiter; values.len()])),
            Self::classify(HalfPattern::new(suffixes), tau),
        ])
    }

    /// Run up to `depth` refinement rounds.
    ///
    /// Round one seeds the sentence by splitting the raw examples. Every
    /// further round picks the free segment with the highest content entropy
    /// and splits it in place. Stops early when no eligible segment remains
    /// or a chosen delimiter is unusable; the partially refined sequence is
    /// kept in both cases.
    pub fn generate(&mut self, depth: usize) -> &mut Self {
        for _ in 0..depth {
            if self.sentence.is_empty() {
                match Self::split(&self.values, self.tau) {
                    Some(nodes) => {
                        self.sentence = nodes;
                        continue;
                    }
                    None => {
                        // No shared substring: the whole input is one
                        // segment and further rounds cannot improve it.
                        self.sentence =
                            vec![Self::classify(HalfPattern::new(self.values.clone()), self.tau)];
                        break;
                    }
                }
            }

            let mut target = None;
            let mut target_entropy = 0.0;
            for (i, node) in self.sentence.iter().enumerate() {
                let e = node.content_entropy();
                if e > target_entropy {
                    target = Some(i);
                    target_entropy = e;
                }
            }
            let Some(idx) = target else {
                break;
            };

            let sub = match &self.sentence[idx] {
                PatternNode::Half(half) => Self::split(half.values(), self.tau),
                PatternNode::Full(_) => None,
            };
            match sub {
                Some(nodes) => {
                    self.sentence.splice(idx..=idx, nodes);
                }
                None => break,
            }
        }
        self
    }

    /// Render the synthesized sentence as a single pattern string.
    pub fn build(&self) -> String {
        self.sentence
            .iter()
            .map(|node| node.render(self.epsilon))
            .collect()
    }
}
