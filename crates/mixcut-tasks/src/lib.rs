//! Task lifecycle persistence and mediation for the Mixcut backend.
//!
//! This crate provides:
//! - The [`TaskRepository`] trait: atomic claim, state-machine-guarded
//!   updates, and the append-only operation log
//! - An in-memory implementation with compare-and-swap claim semantics
//! - A Redis-backed implementation (stream-delivered claims, JSON records)
//! - The [`ProgressReporter`], the single mediator for progress/result
//!   writes
//! - The [`TaskService`] facade: submit, get, cancel

pub mod error;
pub mod memory;
pub mod redis_repo;
pub mod reporter;
pub mod repository;
pub mod service;

pub use error::{TaskStoreError, TaskStoreResult};
pub use memory::InMemoryRepository;
pub use redis_repo::{RedisRepoConfig, RedisRepository};
pub use reporter::ProgressReporter;
pub use repository::TaskRepository;
pub use service::{SubmitError, TaskService};
