//! Value module - In-memory representation of YAML/JSON documents.
//!
//! Every other module pattern-matches on [`Value`]; this module owns decoding
//! from and encoding to the external representations.

mod convert;
mod value;

pub use convert::*;
pub use value::*;
