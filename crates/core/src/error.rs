//! Error models shared across the workspace.

use thiserror::Error;

/// Failure of a domain rule.
///
/// Deliberately small: services carry their own error enums (cart, catalog,
/// checkout) and wrap this one where a rule from the shared primitives is
/// violated. Transport and storage failures are never expressed here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An aggregate invariant would be broken (illegal status transition,
    /// variant sold under a foreign product, ...).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier string did not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Error surfaced by the persistent-store contract.
///
/// The relational store is an external collaborator; repositories expose this
/// error shape regardless of the backing implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("record not found: {0}")]
    NotFound(&'static str),

    /// A write conflicted with current state (e.g. cart no longer active).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A multi-write transaction aborted; no partial state was persisted.
    #[error("transaction aborted: {0}")]
    Transaction(String),

    /// Backend-level failure.
    #[error("storage error: {0}")]
    Storage(String),
}
