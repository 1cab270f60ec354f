//! Pure dialogue transition function.
//!
//! `advance` maps the current state and one inbound message to the reply
//! text and either the next state or a completed review. It has NO side
//! effects; persistence and state storage are the webhook handler's job.

use super::state::DialogueState;

/// A fully collected review, ready to be persisted.
///
/// This is the terminal signal of the dialogue: once `advance` returns it,
/// the sender's state should be cleared after the review is durably written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedReview {
    pub product_name: String,
    pub user_name: String,
    pub review_text: String,
}

/// What the dialogue does after a message: keep going or finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dialogue continues; store this state for the sender.
    Continue(DialogueState),
    /// Dialogue finished; persist the review, then clear the sender's state.
    Complete(CompletedReview),
}

/// Result of advancing the dialogue by one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Reply to send back to the sender.
    pub reply: String,
    pub outcome: Outcome,
}

/// Advance the dialogue by one inbound message.
///
/// Input is trimmed of surrounding whitespace before capture. Empty input
/// is accepted as valid content at every step; there is no validation.
/// The first message's content is discarded: only its arrival triggers
/// the greeting.
pub fn advance(state: DialogueState, input: &str) -> Turn {
    let input = input.trim();

    match state {
        DialogueState::Start => Turn {
            reply: "Hi! Which product is this review for?".to_string(),
            outcome: Outcome::Continue(DialogueState::AwaitingProduct),
        },
        DialogueState::AwaitingProduct => Turn {
            reply: "Got it. What's your name?".to_string(),
            outcome: Outcome::Continue(DialogueState::AwaitingName {
                product_name: input.to_string(),
            }),
        },
        DialogueState::AwaitingName { product_name } => Turn {
            reply: format!(
                "Thanks {}. Please send your review for {}.",
                input, product_name
            ),
            outcome: Outcome::Continue(DialogueState::AwaitingReview {
                product_name,
                user_name: input.to_string(),
            }),
        },
        DialogueState::AwaitingReview {
            product_name,
            user_name,
        } => Turn {
            reply: format!(
                "Thanks {} -- your review for {} has been recorded.",
                user_name, product_name
            ),
            outcome: Outcome::Complete(CompletedReview {
                product_name,
                user_name,
                review_text: input.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_discards_input_and_greets() {
        for input in ["hello", "Widget", "", "   "] {
            let turn = advance(DialogueState::Start, input);
            assert_eq!(turn.reply, "Hi! Which product is this review for?");
            assert_eq!(
                turn.outcome,
                Outcome::Continue(DialogueState::AwaitingProduct)
            );
        }
    }

    #[test]
    fn test_awaiting_product_captures_product() {
        let turn = advance(DialogueState::AwaitingProduct, "Widget");
        assert_eq!(turn.reply, "Got it. What's your name?");
        assert_eq!(
            turn.outcome,
            Outcome::Continue(DialogueState::AwaitingName {
                product_name: "Widget".into()
            })
        );
    }

    #[test]
    fn test_awaiting_name_captures_name_and_echoes_product() {
        let state = DialogueState::AwaitingName {
            product_name: "Widget".into(),
        };
        let turn = advance(state, "Alice");
        assert_eq!(turn.reply, "Thanks Alice. Please send your review for Widget.");
        assert_eq!(
            turn.outcome,
            Outcome::Continue(DialogueState::AwaitingReview {
                product_name: "Widget".into(),
                user_name: "Alice".into(),
            })
        );
    }

    #[test]
    fn test_awaiting_review_completes() {
        let state = DialogueState::AwaitingReview {
            product_name: "Widget".into(),
            user_name: "Alice".into(),
        };
        let turn = advance(state, "Great product!");
        assert_eq!(
            turn.reply,
            "Thanks Alice -- your review for Widget has been recorded."
        );
        assert_eq!(
            turn.outcome,
            Outcome::Complete(CompletedReview {
                product_name: "Widget".into(),
                user_name: "Alice".into(),
                review_text: "Great product!".into(),
            })
        );
    }

    #[test]
    fn test_input_is_trimmed() {
        let turn = advance(DialogueState::AwaitingProduct, "  Widget  ");
        assert_eq!(
            turn.outcome,
            Outcome::Continue(DialogueState::AwaitingName {
                product_name: "Widget".into()
            })
        );
    }

    /// Empty input is accepted as content at every capturing step.
    #[test]
    fn test_empty_input_accepted() {
        let turn = advance(DialogueState::AwaitingProduct, "   ");
        assert_eq!(
            turn.outcome,
            Outcome::Continue(DialogueState::AwaitingName {
                product_name: String::new()
            })
        );

        let state = DialogueState::AwaitingReview {
            product_name: "Widget".into(),
            user_name: "Alice".into(),
        };
        let turn = advance(state, "");
        match turn.outcome {
            Outcome::Complete(review) => assert_eq!(review.review_text, ""),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    /// Walking all four steps yields the full triple exactly once.
    #[test]
    fn test_full_walk() {
        let turn = advance(DialogueState::Start, "hi");
        let Outcome::Continue(state) = turn.outcome else {
            panic!("unexpected completion");
        };
        let turn = advance(state, "Widget");
        let Outcome::Continue(state) = turn.outcome else {
            panic!("unexpected completion");
        };
        let turn = advance(state, "Alice");
        let Outcome::Continue(state) = turn.outcome else {
            panic!("unexpected completion");
        };
        let turn = advance(state, "Great product!");
        assert_eq!(
            turn.outcome,
            Outcome::Complete(CompletedReview {
                product_name: "Widget".into(),
                user_name: "Alice".into(),
                review_text: "Great product!".into(),
            })
        );
    }
}
