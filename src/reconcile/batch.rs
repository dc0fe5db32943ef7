//! Operations over every object of a manifest.

use super::drift::{assert, AssertKind, AssertOutcome};
use super::operation::{create_or_merge, OperationResult};
use super::options::ApplyOptions;
use crate::error::Error;
use crate::object::{describe, read_objects, sort_by_kind};
use crate::store::ObjectStore;
use crate::value::Map;
use tracing::{debug, warn};

/// ObjectOutcome is the result of running an operation on one object.
#[derive(Debug)]
pub struct ObjectOutcome<T> {
    /// The object, as rendered by [`describe`].
    pub object: String,
    pub result: Result<T, Error>,
}

/// BatchOutcome holds one outcome per object, in processing order. A failed
/// object does not stop the objects after it.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub objects: Vec<ObjectOutcome<T>>,
}

impl<T> BatchOutcome<T> {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns true if no object failed.
    pub fn is_success(&self) -> bool {
        self.objects.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.objects
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|t| (o.object.as_str(), t)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.objects
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.object.as_str(), e)))
    }

    /// Returns every object's result, or a single [`Error::Batch`] naming each
    /// object that failed.
    pub fn into_result(self) -> Result<Vec<T>, Error> {
        let total = self.objects.len();
        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in self.objects {
            match outcome.result {
                Ok(result) => results.push(result),
                Err(e) => failures.push(format!("{}: {}", outcome.object, e)),
            }
        }
        if failures.is_empty() {
            Ok(results)
        } else {
            Err(Error::Batch { total, failures })
        }
    }
}

impl BatchOutcome<AssertOutcome> {
    /// Returns true if every assertion ran and passed.
    pub fn all_passed(&self) -> bool {
        self.objects
            .iter()
            .all(|o| matches!(&o.result, Ok(outcome) if outcome.passed))
    }
}

/// Runs `operation` on each object in turn and collects the outcomes.
pub fn invoke_for_all<T, F>(objects: &[Map], mut operation: F) -> BatchOutcome<T>
where
    F: FnMut(&Map) -> Result<T, Error>,
{
    let objects = objects
        .iter()
        .map(|obj| {
            let object = describe(obj);
            let result = operation(obj);
            if let Err(e) = &result {
                warn!(%object, error = %e, "operation failed");
            }
            ObjectOutcome { object, result }
        })
        .collect();
    BatchOutcome { objects }
}

/// Reconciles every object with [`create_or_merge`], namespaces and other
/// dependencies first.
pub fn create_or_merge_all<S>(
    store: &S,
    objects: &[Map],
    options: &ApplyOptions,
) -> BatchOutcome<OperationResult>
where
    S: ObjectStore + ?Sized,
{
    let mut ordered = objects.to_vec();
    sort_by_kind(&mut ordered);

    let outcome = invoke_for_all(&ordered, |obj| create_or_merge(store, obj, options));
    debug!(
        objects = outcome.len(),
        failed = outcome.failed().count(),
        "reconciled objects"
    );
    outcome
}

/// Decodes a manifest and reconciles all of its objects.
///
/// Nothing is written when the manifest does not decode or holds no object.
pub fn create_or_merge_manifest<S>(
    store: &S,
    manifest: &str,
    options: &ApplyOptions,
) -> Result<BatchOutcome<OperationResult>, Error>
where
    S: ObjectStore + ?Sized,
{
    let objects = manifest_objects(manifest)?;
    Ok(create_or_merge_all(store, &objects, options))
}

/// Runs [`assert`] for every object.
pub fn assert_all<S>(store: &S, objects: &[Map], kind: AssertKind) -> BatchOutcome<AssertOutcome>
where
    S: ObjectStore + ?Sized,
{
    invoke_for_all(objects, |obj| assert(store, obj, kind))
}

/// Decodes a manifest and runs [`assert`] for each of its objects.
pub fn assert_manifest<S>(
    store: &S,
    manifest: &str,
    kind: AssertKind,
) -> Result<BatchOutcome<AssertOutcome>, Error>
where
    S: ObjectStore + ?Sized,
{
    let objects = manifest_objects(manifest)?;
    Ok(assert_all(store, &objects, kind))
}

fn manifest_objects(manifest: &str) -> Result<Vec<Map>, Error> {
    let objects = read_objects(manifest)?;
    if objects.is_empty() {
        return Err(Error::invalid_object("no kubernetes objects found in manifest"));
    }
    Ok(objects)
}
