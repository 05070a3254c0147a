//! Sequential product identifiers
//!
//! Product ids have the shape `DP` + zero-padded sequence (`DP0007`).
//! [`IdAllocator`] hands out the next free id for records that arrive
//! without one.
//!
//! # Policy
//! Generation is max-based and monotonic: the next sequence is one past the
//! largest suffix among the existing ids and the persisted high-water mark.
//! Gaps left by deleted records are never refilled, so an id is never
//! reissued once it has been observed.
//!
//! Ids that do not match the pattern are still valid when supplied by a
//! caller; they simply do not take part in sequence derivation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix shared by every generated id
pub const ID_PREFIX: &str = "DP";

/// Minimum digit count of the numeric suffix
pub const ID_WIDTH: usize = 4;

/// Modulus applied to the clock when the stored-id scan is unavailable
pub const FALLBACK_MODULUS: u64 = 10_000;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DP(\d+)$").expect("id pattern is a valid regex"));

/// Numeric suffix of a generated-style id (`DP0042` → 42)
///
/// Returns `None` for ids outside the `DP<digits>` pattern or whose suffix
/// does not fit in `u64`.
#[must_use]
pub fn sequence_of(id: &str) -> Option<u64> {
    ID_PATTERN
        .captures(id)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Render a sequence number as an id; wider numbers are not truncated
#[inline]
#[must_use]
pub fn format_id(sequence: u64) -> String {
    format!("{ID_PREFIX}{sequence:0width$}", width = ID_WIDTH)
}

/// Largest sequence among `ids`, ignoring non-pattern ids
#[must_use]
pub fn max_sequence<I, S>(ids: I) -> Option<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().filter_map(|id| sequence_of(id.as_ref())).max()
}

/// Allocator for one replace-all batch
///
/// Seed it with every id that must not be handed out: ids already stored
/// plus ids explicitly supplied anywhere in the incoming batch. Each
/// allocated id is reserved immediately, so repeated calls never collide.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    taken: HashSet<String>,
    next: u64,
}

impl IdAllocator {
    /// Seed from existing ids and the persisted high-water mark
    #[must_use]
    pub fn seeded<I, S>(existing: I, high_water: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let taken: HashSet<String> = existing.into_iter().map(Into::into).collect();
        let floor = max_sequence(&taken).unwrap_or(0).max(high_water);
        Self {
            taken,
            next: floor.saturating_add(1),
        }
    }

    /// Seed from a clock-derived counter
    ///
    /// Used only when the stored ids cannot be scanned. The counter carries
    /// a real collision risk against stored ids the scan could not see;
    /// callers are expected to log it.
    #[must_use]
    pub fn fallback<I, S>(batch_ids: I, now: SystemTime) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let mut allocator = Self::seeded(batch_ids, 0);
        allocator.next = allocator.next.max((secs % FALLBACK_MODULUS).max(1));
        allocator
    }

    /// Sequence the next call to [`Self::next_id`] will try first
    #[inline]
    #[must_use]
    pub fn peek_sequence(&self) -> u64 {
        self.next
    }

    /// Whether `id` is already reserved
    #[inline]
    #[must_use]
    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    /// Allocate and reserve the next free id
    pub fn next_id(&mut self) -> String {
        loop {
            let candidate = format_id(self.next);
            self.next = self.next.saturating_add(1);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
