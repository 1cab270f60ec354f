//! Read API for the presentation frontend.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::error;

use crate::store::Review;
use crate::AppState;

/// One review as exposed to the frontend.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub contact_number: String,
    pub user_name: String,
    pub product_name: String,
    pub product_review: String,
    /// ISO-8601 timestamp.
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            contact_number: review.contact_number,
            user_name: review.user_name,
            product_name: review.product_name,
            product_review: review.product_review,
            created_at: review
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/reviews", get(list_reviews_handler))
}

/// All persisted reviews, newest first.
pub async fn list_reviews_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReviewResponse>>, StatusCode> {
    match state.review_store.list_all().await {
        Ok(reviews) => Ok(Json(
            reviews.into_iter().map(ReviewResponse::from).collect(),
        )),
        Err(e) => {
            error!("failed to list reviews: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_review_response_timestamp_is_iso8601() {
        let review = Review {
            id: 7,
            contact_number: "+15551234".into(),
            user_name: "Alice".into(),
            product_name: "Widget".into(),
            product_review: "Great product!".into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };

        let response = ReviewResponse::from(review);
        assert_eq!(response.created_at, "2026-01-02T03:04:05.000000Z");
    }
}
