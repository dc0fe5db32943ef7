//! Field path representation.
//!
//! Paths locate a node inside a document. The merge engine threads one through
//! its recursion so errors and diffs can name the offending field.

mod path;

pub use path::*;
