// crates/flag-gate-core/src/runtime/bucketing.rs
// ============================================================================
// Module: Flag Gate Bucketing Engine
// Description: Hash-based percentage splits and progressive rollouts.
// Purpose: Assign subjects to weighted variations deterministically.
// Dependencies: crate::core::{hashing, rule}, thiserror, time
// ============================================================================

//! ## Overview
//! Percentages are scaled by 1000 so bucket arithmetic stays in `u32` and
//! keeps three fractional digits (0.001% granularity).
//!
//! A percentage split lays its variations out in descending lexicographic
//! order as contiguous half-open buckets starting at 0. Bucket ends are the
//! rounded running totals, so the buckets partition `[0, width)` exactly,
//! where `width = round(sum * 1000)`. The subject hash modulo `width` picks
//! the bucket.
//!
//! A progressive rollout always hashes modulo `100 * 1000`. Before its start
//! the initial variation is served; afterwards the end-variation share grows
//! linearly with elapsed time and stays at the end percentage once the end
//! instant has passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::hashing::subject_hash;
use crate::core::rule::FULL_PERCENTAGE;
use crate::core::rule::ProgressiveRollout;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scale factor from percentages to bucket units.
pub const BUCKET_SCALE: f64 = 1000.0;

/// Hash modulus for progressive rollouts (100% in bucket units).
pub const PROGRESSIVE_BUCKET_WIDTH: u32 = 100 * 1000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Evaluation-time bucketing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketingError {
    /// The split has zero total width.
    #[error("percentage split has zero total width")]
    ZeroWidth,
    /// The split contains an unusable percentage.
    #[error("invalid percentage split: {0}")]
    InvalidSplit(String),
    /// No bucket contains the hash.
    #[error("no bucket contains hash {hash} (width {width})")]
    NoBucket {
        /// Reduced hash value.
        hash: u32,
        /// Bucket width used as modulus.
        width: u32,
    },
    /// The progressive rollout is incomplete or inverted.
    #[error("invalid progressive rollout: {0}")]
    InvalidRollout(String),
}

// ============================================================================
// SECTION: Percentage Buckets
// ============================================================================

/// Half-open bucket `[start, end)` owned by one variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket<'a> {
    /// Variation name.
    pub variation: &'a str,
    /// Inclusive start in bucket units.
    pub start: u32,
    /// Exclusive end in bucket units.
    pub end: u32,
}

impl Bucket<'_> {
    /// Returns true when `hash` falls inside the bucket.
    #[must_use]
    pub const fn contains(&self, hash: u32) -> bool {
        self.start <= hash && hash < self.end
    }
}

/// Lays out the buckets of a percentage split in descending variation order.
///
/// The last bucket's end is the split width.
///
/// # Errors
///
/// Returns [`BucketingError::InvalidSplit`] for negative or non-finite
/// percentages.
pub fn percentage_buckets(split: &BTreeMap<String, f64>) -> Result<Vec<Bucket<'_>>, BucketingError> {
    let mut buckets = Vec::with_capacity(split.len());
    let mut total = 0.0;
    let mut cursor = 0u32;
    for (variation, percentage) in split.iter().rev() {
        if !percentage.is_finite() || *percentage < 0.0 {
            return Err(BucketingError::InvalidSplit(format!(
                "{variation} has percentage {percentage}"
            )));
        }
        total += percentage;
        let end = to_bucket_units(total)?;
        buckets.push(Bucket {
            variation: variation.as_str(),
            start: cursor,
            end,
        });
        cursor = end;
    }
    Ok(buckets)
}

/// Selects the variation of a percentage split for a subject.
///
/// # Errors
///
/// Returns [`BucketingError`] when the split is empty, zero-width, or malformed.
pub fn evaluate_percentage<'a>(
    split: &'a BTreeMap<String, f64>,
    flag_name: &str,
    subject_key: &str,
) -> Result<&'a str, BucketingError> {
    let buckets = percentage_buckets(split)?;
    let width = buckets.last().map_or(0, |bucket| bucket.end);
    if width == 0 {
        return Err(BucketingError::ZeroWidth);
    }
    let hash = subject_hash(flag_name, subject_key) % width;
    buckets
        .iter()
        .find(|bucket| bucket.contains(hash))
        .map(|bucket| bucket.variation)
        .ok_or(BucketingError::NoBucket {
            hash,
            width,
        })
}

// ============================================================================
// SECTION: Progressive Rollout
// ============================================================================

/// Selects the variation of a progressive rollout for a subject at `now`.
///
/// Missing percentages default to 0 for the initial step and 100 for the end.
///
/// # Errors
///
/// Returns [`BucketingError::InvalidRollout`] when a step lacks a variation
/// or date, the dates are not increasing, or the end percentage is below the
/// initial percentage.
pub fn evaluate_progressive<'a>(
    rollout: &'a ProgressiveRollout,
    flag_name: &str,
    subject_key: &str,
    now: OffsetDateTime,
) -> Result<&'a str, BucketingError> {
    let (Some(initial), Some(end)) = (&rollout.initial, &rollout.end) else {
        return Err(BucketingError::InvalidRollout("initial and end steps are required".to_string()));
    };
    let (Some(initial_variation), Some(end_variation)) = (&initial.variation, &end.variation) else {
        return Err(BucketingError::InvalidRollout("steps must name a variation".to_string()));
    };
    let (Some(initial_date), Some(end_date)) = (initial.date, end.date) else {
        return Err(BucketingError::InvalidRollout("steps must define a date".to_string()));
    };
    if end_date <= initial_date {
        return Err(BucketingError::InvalidRollout("end date must be after initial date".to_string()));
    }

    let initial_percentage = initial.percentage.unwrap_or(0.0);
    let end_percentage = end.percentage.unwrap_or(FULL_PERCENTAGE);
    if end_percentage < initial_percentage {
        return Err(BucketingError::InvalidRollout(
            "end percentage must not be below initial percentage".to_string(),
        ));
    }

    if now < initial_date {
        return Ok(initial_variation.as_str());
    }

    let threshold = rollout_threshold(
        initial_percentage,
        end_percentage,
        (now - initial_date).as_seconds_f64(),
        (end_date - initial_date).as_seconds_f64(),
    );
    let hash = subject_hash(flag_name, subject_key) % PROGRESSIVE_BUCKET_WIDTH;
    if f64::from(hash) < threshold * BUCKET_SCALE {
        Ok(end_variation.as_str())
    } else {
        Ok(initial_variation.as_str())
    }
}

/// Interpolates the end-variation percentage after `elapsed` of `total` seconds.
#[must_use]
pub fn rollout_threshold(initial: f64, end: f64, elapsed: f64, total: f64) -> f64 {
    let fraction = if total > 0.0 { (elapsed / total).clamp(0.0, 1.0) } else { 1.0 };
    (end - initial).mul_add(fraction, initial)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a percentage total into rounded bucket units.
fn to_bucket_units(percentage: f64) -> Result<u32, BucketingError> {
    let scaled = (percentage * BUCKET_SCALE).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > f64::from(u32::MAX) {
        return Err(BucketingError::InvalidSplit(format!(
            "percentage total {percentage} is out of range"
        )));
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Value is rounded and range-checked against u32 above."
    )]
    let units = scaled as u32;
    Ok(units)
}
