//! Compare module - decides whether an observed object already matches a
//! desired state, and reports what would change if it does not.

mod comparison;
mod equality;

pub use comparison::*;
pub use equality::*;
