//! Apply module - client-side substitute for server-side apply.
//!
//! Merges a desired document into the observed one without any type-specific
//! knowledge, so that the result can be sent back as a full object with its
//! resource version intact.

mod last_applied;
mod merge;
mod merge_key;
mod strip;
mod system_fields;




pub use last_applied::*;
pub use merge::*;
pub use merge_key::*;
pub use strip::*;
pub use system_fields::*;
