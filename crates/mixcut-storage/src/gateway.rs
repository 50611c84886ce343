//! The storage gateway trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Narrow interface to the object store.
///
/// References are opaque strings minted by `store`; the gateway carries no
/// retry or backoff responsibility.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Download the object behind `reference` into `dest`.
    async fn fetch(&self, reference: &str, dest: &Path) -> StorageResult<()>;

    /// Upload the file at `src` and return its reference.
    async fn store(&self, src: &Path) -> StorageResult<String>;
}
