//! Storage gateway for the Mixcut backend.
//!
//! The core consumes object storage through the narrow [`StorageGateway`]
//! trait: fetch an opaque reference into a local file, store a local file
//! and get a reference back. Durability and the actual backing store are
//! the collaborator's concern; the dispatcher wraps calls with its own
//! retry policy.

pub mod error;
pub mod fs;
pub mod gateway;

pub use error::{StorageError, StorageResult};
pub use fs::FsStorage;
pub use gateway::StorageGateway;
