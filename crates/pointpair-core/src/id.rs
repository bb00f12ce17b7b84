//! Point identifier generation.
//!
//! Generated ids look like `point_1718000000000_k3x9q`: a stable
//! prefix, the wall-clock time in milliseconds, and five random
//! base-36 characters. Uniqueness is probabilistic; collisions are not
//! detected.
//!
//! Wall-clock time comes from the `web-time` crate, which reads
//! `Date.now()` on WASM and [`std::time::SystemTime`] on native.

use web_time::{SystemTime, UNIX_EPOCH};

use crate::types::{EditorConfig, PointId};

/// Number of random base-36 characters in a generated id.
pub const RANDOM_SUFFIX_LEN: usize = 5;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Largest multiple of 36 that fits in a byte.
const UNBIASED_LIMIT: u8 = 252;

/// Source of fresh point identifiers.
pub trait IdGenerator {
    /// Produce the next identifier.
    fn next_id(&mut self) -> PointId;
}

/// Timestamp plus random suffix generator used by editing sessions.
#[derive(Debug, Clone)]
pub struct TimestampIds {
    prefix: String,
    fallback_counter: u64,
}

impl TimestampIds {
    /// Create a generator with the given prefix.
    ///
    /// Prefixes that would make an invalid id (empty is fine, but a
    /// leading `#`, whitespace, or line breaks are not) are replaced with
    /// [`EditorConfig::DEFAULT_ID_PREFIX`].
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: sanitize_prefix(prefix.into()),
            fallback_counter: 0,
        }
    }

    /// Create a generator from editor configuration.
    #[must_use]
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.id_prefix.clone())
    }

    /// The prefix prepended to every id.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn random_suffix(&mut self, millis: u128) -> String {
        let mut suffix = String::with_capacity(RANDOM_SUFFIX_LEN);
        let mut bytes = [0_u8; 2 * RANDOM_SUFFIX_LEN];
        let mut fallback_seed: Option<u64> = None;
        while suffix.len() < RANDOM_SUFFIX_LEN {
            if fallback_seed.is_none()
                && let Err(err) = getrandom::fill(&mut bytes)
            {
                log::warn!("random source unavailable ({err}), using counter-derived id suffix");
                self.fallback_counter = self.fallback_counter.wrapping_add(1);
                fallback_seed = Some(
                    u64::try_from(millis).unwrap_or(u64::MAX)
                        ^ self.fallback_counter.wrapping_mul(0x9E37_79B9_7F4A_7C15),
                );
            }
            if let Some(seed) = fallback_seed.as_mut() {
                for byte in &mut bytes {
                    *seed = seed.rotate_left(13).wrapping_mul(0x2545_F491_4F6C_DD1D);
                    *byte = seed.to_le_bytes()[7];
                }
            }
            let missing = RANDOM_SUFFIX_LEN - suffix.len();
            suffix.extend(bytes.iter().copied().filter_map(base36_char).take(missing));
        }
        suffix
    }
}

/// Map a random byte to a base-36 digit, rejecting the bytes that would
/// make the low digits more likely.
fn base36_char(byte: u8) -> Option<char> {
    (byte < UNBIASED_LIMIT).then(|| char::from(BASE36[usize::from(byte) % BASE36.len()]))
}

impl Default for TimestampIds {
    fn default() -> Self {
        Self::new(EditorConfig::DEFAULT_ID_PREFIX)
    }
}

impl IdGenerator for TimestampIds {
    fn next_id(&mut self) -> PointId {
        // Clocks set before the epoch yield 0.
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis());
        let suffix = self.random_suffix(millis);
        build_id(&self.prefix, &format!("{millis}_{suffix}"))
    }
}

/// Deterministic generator producing `<prefix>1`, `<prefix>2`, ...
///
/// Useful for tests and reproducible scripts.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    /// Create a generator starting at 1.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: sanitize_prefix(prefix.into()),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new(EditorConfig::DEFAULT_ID_PREFIX)
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> PointId {
        let n = self.next;
        self.next = self.next.wrapping_add(1);
        build_id(&self.prefix, &n.to_string())
    }
}

/// Keep a prefix only if it forms a valid id when followed by a body.
fn sanitize_prefix(prefix: String) -> String {
    if prefix.is_empty() || PointId::new(format!("{prefix}0")).is_ok() {
        prefix
    } else {
        log::warn!(
            "invalid id prefix {prefix:?}, using {:?}",
            EditorConfig::DEFAULT_ID_PREFIX
        );
        EditorConfig::DEFAULT_ID_PREFIX.to_owned()
    }
}

/// Join a sanitized prefix with a body of digits, `_`, and base-36 characters.
fn build_id(prefix: &str, body: &str) -> PointId {
    let raw = format!("{prefix}{body}");
    // The prefix was validated against a digit body and the body is
    // ASCII alphanumerics and '_', so this cannot fail in practice.
    PointId::new(raw).unwrap_or_else(|_| PointId::from_trusted(body.to_owned()))
}
