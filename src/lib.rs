//! # Structured Apply
//!
//! Client-side apply for Kubernetes objects.
//!
//! This library merges a desired object into the object observed in a store,
//! using the previously applied state to tell removed fields from fields that
//! other writers own. It works on generic JSON/YAML documents with no schema:
//! lists of maps are merged by a key detected from their contents, every other
//! list is replaced wholesale.
//!
//! ## Modules
//!
//! - [`value`] - In-memory representation of JSON/YAML documents
//! - [`fieldpath`] - Paths into documents, used in errors and diffs
//! - [`apply`] - Null stripping, merge key detection, three-way merge and system field overlay
//! - [`compare`] - Equality and structural diff of observed and merged objects
//! - [`object`] - Object identity and apply ordering
//! - [`store`] - The object store seam and an in-memory implementation
//! - [`reconcile`] - Create-or-merge, drift detection and assertions against a store

pub mod apply;
pub mod compare;
pub mod error;
pub mod fieldpath;
pub mod object;
pub mod reconcile;
pub mod store;
pub mod value;

pub use apply::{detect_merge_key, merge, override_system_fields, strip_null_fields};
pub use compare::{is_equal, is_equal_with_diff, Comparison};
pub use error::{Error, Result};
pub use fieldpath::{Path, PathElement};
pub use object::ObjectKey;
pub use reconcile::{create_or_merge, create_or_merge_all, ApplyOptions, BatchOutcome, OperationResult};
pub use store::{InMemoryStore, ObjectStore, StoreError};
pub use value::{Map, Value};
