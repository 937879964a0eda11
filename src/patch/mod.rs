//! SCIM PATCH (RFC 7644 §3.5.2, spec.md §4.6): parsing PATCH paths and
//! applying PATCH operations to a resource.

pub mod apply;
pub mod op;
pub mod path;

pub use apply::apply;
pub use op::{PatchOp, PatchOperation, PatchRequest};
pub use path::parse_patch_path;
