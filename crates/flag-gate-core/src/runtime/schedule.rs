// crates/flag-gate-core/src/runtime/schedule.rs
// ============================================================================
// Module: Flag Gate Scheduled Rollout Resolver
// Description: Folds time-gated scheduled steps into a flag.
// Purpose: Produce the effective flag definition at an evaluation instant.
// Dependencies: crate::core, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! Steps are applied in declaration order, not date order, for every step
//! whose date is on or before the evaluation instant. The shared base flag is
//! never mutated: the first applied step clones it and later steps edit the
//! private copy. A flag without active steps is returned borrowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::trace;

use crate::core::Flag;
use crate::core::ScheduledStep;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scheduled rollout resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A scheduled step has no activation date.
    #[error("scheduled step {index} has no date")]
    MissingStepDate {
        /// Step index in declaration order.
        index: usize,
    },
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Returns the effective flag at `now`.
///
/// # Errors
///
/// Returns [`ResolveError`] when any scheduled step lacks a date.
pub fn resolve_flag(flag: &Flag, now: OffsetDateTime) -> Result<Cow<'_, Flag>, ResolveError> {
    let steps = flag.scheduled_steps();
    if steps.is_empty() {
        return Ok(Cow::Borrowed(flag));
    }
    let active = active_steps(steps, now)?;
    if active.is_empty() {
        return Ok(Cow::Borrowed(flag));
    }

    let mut effective = flag.clone();
    for (index, step) in active {
        trace!(step = index, "applying scheduled step");
        effective.apply_changes(&step.changes);
    }
    Ok(Cow::Owned(effective))
}

/// Applies every step dated on or before `now` to `flag` in declaration order.
///
/// Applying the same steps again at the same instant leaves the flag unchanged.
///
/// # Errors
///
/// Returns [`ResolveError`] when any step lacks a date; `flag` is untouched.
pub fn apply_scheduled_steps(
    flag: &mut Flag,
    steps: &[ScheduledStep],
    now: OffsetDateTime,
) -> Result<(), ResolveError> {
    for (_, step) in active_steps(steps, now)? {
        flag.apply_changes(&step.changes);
    }
    Ok(())
}

/// Lists the steps active at `now`, checking every step for a date first.
fn active_steps(
    steps: &[ScheduledStep],
    now: OffsetDateTime,
) -> Result<Vec<(usize, &ScheduledStep)>, ResolveError> {
    let mut active = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let date = step.date.ok_or(ResolveError::MissingStepDate {
            index,
        })?;
        if date <= now {
            active.push((index, step));
        }
    }
    Ok(active)
}
