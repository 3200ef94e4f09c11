//! Key sequences for enumerating a work space.
//!
//! Every key is a pure function of its absolute index, so a run over
//! `[min, max)` can be resumed by starting the next run at `max`.

use std::fmt;
use std::sync::Arc;

/// Digits of the base-36 alphabet, in value order.
const ALPHABET_36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Custom generator signature: `(min, max) -> keys`.
pub type SequenceFn = Arc<dyn Fn(u64, u64) -> Vec<String> + Send + Sync>;

/// Strategy for turning an index range into work keys.
#[derive(Clone, Default)]
pub enum Sequence {
    /// Base-10 keys: `0, 1, 2, ...`
    #[default]
    Numeric,
    /// Base-36 keys over `0-9a-z`: `0, ..., z, 10, ...`
    AlphaNumeric36,
    /// Caller-provided generator.
    Custom(SequenceFn),
}

impl Sequence {
    /// Wrap a closure as a custom sequence.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u64, u64) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Produce the ordered keys for `[min, max)`. Empty when `min >= max`.
    pub fn generate(&self, min: u64, max: u64) -> Vec<String> {
        match self {
            Self::Numeric => numeric(min, max),
            Self::AlphaNumeric36 => alphanumeric36(min, max),
            Self::Custom(f) => {
                if min >= max {
                    return Vec::new();
                }
                f(min, max)
            }
        }
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("Numeric"),
            Self::AlphaNumeric36 => f.write_str("AlphaNumeric36"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Decimal keys for `[min, max)`.
pub fn numeric(min: u64, max: u64) -> Vec<String> {
    (min..max).map(|i| i.to_string()).collect()
}

/// Base-36 keys for `[min, max)`.
pub fn alphanumeric36(min: u64, max: u64) -> Vec<String> {
    (min..max).map(key_for_index36).collect()
}

/// Base-36 representation of `index` using digits then lowercase letters.
pub fn key_for_index36(index: u64) -> String {
    if index == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(13);
    let mut n = index;
    while n > 0 {
        digits.push(ALPHABET_36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    // Only ASCII bytes from ALPHABET_36 were pushed.
    digits.into_iter().map(char::from).collect()
}

/// Inverse of [`key_for_index36`].
///
/// Returns `None` for the empty string, any character outside `0-9a-z`, or a
/// value that does not fit in a `u64`. Useful for picking a start index from a
/// known key.
pub fn index_for_alpha36(key: &str) -> Option<u64> {
    if key.is_empty() {
        return None;
    }

    key.bytes().try_fold(0u64, |acc, b| {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'z' => b - b'a' + 10,
            _ => return None,
        };
        acc.checked_mul(36)?.checked_add(u64::from(digit))
    })
}
