//! Reconcile module - brings stored objects in line with desired state.
//!
//! Everything here works against an [`ObjectStore`](crate::store::ObjectStore)
//! and takes its options explicitly; there is no process-wide configuration.

mod batch;
mod drift;
mod operation;
mod options;

#[cfg(test)]
mod batch_test;


pub use batch::*;
pub use drift::*;
pub use operation::*;
pub use options::*;
