//! Drift detection and assertions against the store.

use crate::compare::{is_equal_with_diff, Comparison};
use crate::error::Error;
use crate::object::ObjectKey;
use crate::store::{ObjectStore, StoreError};
use crate::value::Map;
use tracing::debug;

/// Drift reports whether the stored object differs from what `desired` would
/// make it.
#[derive(Debug, Clone, PartialEq)]
pub struct Drift {
    pub is_drifted: bool,
    /// Differences from the stored object to the dry-run result.
    pub diff: Comparison,
}

/// Checks the stored object against a dry run of `desired`.
///
/// Fails with a not-found store error when there is no stored object.
pub fn has_drifted<S>(store: &S, desired: &Map) -> Result<Drift, Error>
where
    S: ObjectStore + ?Sized,
{
    let key = ObjectKey::from_object(desired)?;
    let observed = store.get(&key)?.ok_or_else(|| StoreError::not_found(&key))?;
    let dry_run = store.dry_run(desired)?;

    let (equal, diff) = is_equal_with_diff(&observed, &dry_run)?;
    debug!(%key, drifted = !equal, "checked drift");
    Ok(Drift {
        is_drifted: !equal,
        diff,
    })
}

/// AssertKind selects what [`assert`] checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertKind {
    Equals,
    NotEquals,
    IsFound,
    IsNotFound,
}

/// AssertOutcome is the verdict of an [`assert`] call. `diff` explains a
/// failure, or what differs for the equality kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertOutcome {
    pub passed: bool,
    pub diff: String,
}

impl AssertOutcome {
    fn new(passed: bool, diff: impl Into<String>) -> Self {
        AssertOutcome {
            passed,
            diff: diff.into(),
        }
    }
}

/// Asserts a property of the stored counterpart of `expected`.
///
/// Equality uses the same merge-based comparison as reconciliation, so
/// `expected` only needs to carry the fields it cares about. A missing object
/// is never equal to `expected`.
pub fn assert<S>(store: &S, expected: &Map, kind: AssertKind) -> Result<AssertOutcome, Error>
where
    S: ObjectStore + ?Sized,
{
    let key = ObjectKey::from_object(expected)?;
    let actual = store.get(&key)?;

    let outcome = match (kind, actual) {
        (AssertKind::IsFound, Some(_)) => AssertOutcome::new(true, ""),
        (AssertKind::IsFound, None) => {
            AssertOutcome::new(false, "resource was not found while expecting one")
        }
        (AssertKind::IsNotFound, None) => AssertOutcome::new(true, ""),
        (AssertKind::IsNotFound, Some(_)) => {
            AssertOutcome::new(false, "found a resource while expecting none")
        }
        (AssertKind::Equals, None) => {
            AssertOutcome::new(false, "resource was not found while expecting one")
        }
        (AssertKind::NotEquals, None) => AssertOutcome::new(true, "resource was not found"),
        (AssertKind::Equals, Some(actual)) => {
            let (equal, diff) = is_equal_with_diff(&actual, expected)?;
            AssertOutcome::new(equal, diff.to_string())
        }
        (AssertKind::NotEquals, Some(actual)) => {
            let (equal, diff) = is_equal_with_diff(&actual, expected)?;
            AssertOutcome::new(!equal, diff.to_string())
        }
    };
    debug!(%key, ?kind, passed = outcome.passed, "asserted object");
    Ok(outcome)
}
