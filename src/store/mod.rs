//! Durable storage for completed reviews.
//!
//! The `ReviewStore` trait abstracts the storage backend so the webhook
//! orchestration stays testable. `SqliteReviewStore` is the production
//! backend; `InMemoryReviewStore` backs tests.

mod memory;
mod sqlite;

pub use memory::InMemoryReviewStore;
pub use sqlite::SqliteReviewStore;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A persisted review. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: i64,
    pub contact_number: String,
    pub user_name: String,
    pub product_name: String,
    pub product_review: String,
    pub created_at: DateTime<Utc>,
}

/// A review ready to be written. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub contact_number: String,
    pub user_name: String,
    pub product_name: String,
    pub product_review: String,
}

/// Errors from the durable store.
#[derive(Debug)]
pub enum StorageError {
    /// The backend failed (unreachable, constraint violation, I/O).
    Storage { operation: String, message: String },
    /// A stored row could not be read back sensibly.
    Corruption { what: String },
}

impl StorageError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { operation, message } => {
                write!(f, "storage error during {}: {}", operation, message)
            }
            Self::Corruption { what } => write!(f, "corrupt stored data: {}", what),
        }
    }
}

impl std::error::Error for StorageError {}

/// Storage backend for reviews. Append-only writes, ordered reads.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Write a review, assigning its id and creation timestamp.
    ///
    /// The write must be durable before this returns: the caller clears the
    /// sender's dialogue state only on success, so a failure leaves the
    /// sender able to resend and retry.
    async fn append(&self, review: NewReview) -> Result<i64, StorageError>;

    /// All reviews, newest first, fully materialized. An empty store yields
    /// an empty vec, never an error.
    async fn list_all(&self) -> Result<Vec<Review>, StorageError>;
}
