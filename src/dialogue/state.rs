//! State types for the review dialogue.
//!
//! Following the principle of "make illegal states unrepresentable", each
//! variant carries exactly the fields that have been collected by the time
//! it is reached. A sender with no entry in the store is implicitly at
//! `Start`; the store never holds `Start` itself.

/// Where a sender is in the review conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    /// No dialogue in progress. Synthesized when a sender has no stored
    /// state; the first message only triggers the greeting, its content
    /// is discarded.
    Start,

    /// Greeting sent, waiting for the product name.
    AwaitingProduct,

    /// Product captured, waiting for the sender's name.
    AwaitingName { product_name: String },

    /// Product and name captured, waiting for the review text.
    AwaitingReview {
        product_name: String,
        user_name: String,
    },
}

impl DialogueState {
    /// Short name of the current step, for logging.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitingProduct => "awaiting_product",
            Self::AwaitingName { .. } => "awaiting_name",
            Self::AwaitingReview { .. } => "awaiting_review",
        }
    }

    /// Returns the product name if it has been collected.
    pub fn product_name(&self) -> Option<&str> {
        match self {
            Self::Start | Self::AwaitingProduct => None,
            Self::AwaitingName { product_name } => Some(product_name),
            Self::AwaitingReview { product_name, .. } => Some(product_name),
        }
    }
}
