//! Well-known message keys, artifact file names, and placeholder tokens.
//!
//! Components communicate through a shared key/value bag
//! ([`Message`](crate::pipeline::Message)); the keys below are the documented
//! vocabulary. Using the constants instead of string literals keeps producers
//! and consumers of an artifact in agreement.

/// Original input text of the request.
pub const TEXT: &str = "text";

/// Dense feature vector(s) computed for the input text.
pub const TEXT_FEATURES: &str = "text_features";

/// Tokenized representation of the input text.
pub const TOKENS: &str = "tokens";

/// The winning intent: an object with at least `id`, `name` and `utterance`.
pub const INTENT: &str = "intent";

/// Ranked list of intent candidates.
pub const INTENT_RANKING: &str = "intent_ranking";

/// Extracted entities accumulated across extractor components.
pub const ENTITIES: &str = "entities";

/// Candidate pool the classifier matches against.
pub const POOL: &str = "pool";

/// Feature vectors for the candidate pool.
pub const POOL_FEATURES: &str = "pool_features";

/// Named regex rules available to the extractors.
pub const REGEX_FEATURES: &str = "regex_features";

/// Artifact file holding persisted regex rules.
pub const ENTITY_REGEX_FILE: &str = "entity_regex.json";

/// Optional snapshot of the training payload inside a model directory.
pub const TRAINING_DATA_FILE: &str = "training_data.json";

/// Pipeline metadata file inside a model directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Patterns that match arbitrary content. A rule carrying one of these is a
/// positional placeholder rather than a real matcher: it consumes the next
/// candidate token instead of being searched.
pub const DEGENERATE_PATTERNS: &[&str] = &[".*", "^.+$", ""];

/// Rule values injected by the calling system rather than derived from text.
/// A rule whose current value is one of these is accepted as-is.
pub const SYS_PLACEHOLDER_VALUES: &[&str] = &["${}", "$?"];

/// Format version stamped into persisted pipeline metadata. Loading a model
/// persisted under any other version is refused.
pub const MODEL_FORMAT_VERSION: &str = "1.0.0";
