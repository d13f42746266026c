//! Store adapters.
//!
//! The relational store is an external collaborator; every domain crate
//! defines the repository traits it needs and this module provides the
//! in-memory implementation used by tests, benches, and local development.

pub mod in_memory;

pub use in_memory::InMemoryStore;
