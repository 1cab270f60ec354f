//! In-memory implementation of `ReviewStore`.
//!
//! Backs tests and has the same observable ordering semantics as the
//! SQLite store. All data is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NewReview, Review, ReviewStore, StorageError};

/// In-memory review store.
pub struct InMemoryReviewStore {
    rows: RwLock<Vec<Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn append(&self, review: NewReview) -> Result<i64, StorageError> {
        let mut rows = self.rows.write().await;
        let id = rows.last().map(|r| r.id + 1).unwrap_or(1);
        rows.push(Review {
            id,
            contact_number: review.contact_number,
            user_name: review.user_name,
            product_name: review.product_name,
            product_review: review.product_review,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<Review>, StorageError> {
        let rows = self.rows.read().await;
        let mut reviews: Vec<Review> = rows.clone();
        reviews.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(reviews)
    }
}
