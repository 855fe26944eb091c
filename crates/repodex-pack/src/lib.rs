//! Publishing the index as a baseline file plus incremental chunks, and
//! rebuilding or updating a store from them.

pub mod checksum;
pub mod error;
pub mod format;
pub mod manifest;
pub mod packer;
pub mod unpacker;

pub use error::{PackError, Result};
pub use manifest::{BaselineDescriptor, ChunkDescriptor, ChunkManifest, RetentionPolicy};
pub use packer::{pack, pack_directory, PackOutcome, PackagingRequest};
pub use unpacker::{
    apply_chunks, plan_update, unpack, unpack_published, update_from_published, UpdatePlan,
};
