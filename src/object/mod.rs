//! Object module - identity, description and apply ordering of whole objects.

mod key;
mod manifest;
mod sort;

pub use key::*;
pub use manifest::*;
pub use sort::*;
