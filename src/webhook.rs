//! Inbound messaging webhook.
//!
//! One handler orchestrates a single inbound message: look up the sender's
//! dialogue slot, advance the dialogue, persist the review on completion,
//! and reply in the transport's TwiML envelope.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::dialogue::{advance, DialogueState, Outcome};
use crate::store::{NewReview, StorageError};
use crate::twiml::MessagingResponse;
use crate::AppState;

/// Twilio-style form payload. Missing fields are rejected by the `Form`
/// extractor before any dialogue logic runs.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    /// Sender identifier (e.g. `whatsapp:+15551234567`).
    #[serde(rename = "From")]
    pub from: String,
    /// Message text. Treated as opaque content.
    #[serde(rename = "Body")]
    pub body: String,
}

pub fn webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/whatsapp", post(whatsapp_handler))
}

pub async fn whatsapp_handler(
    State(state): State<Arc<AppState>>,
    Form(message): Form<IncomingMessage>,
) -> Response {
    match handle_message(&state, &message.from, &message.body).await {
        Ok(reply) => (
            [(header::CONTENT_TYPE, "application/xml")],
            MessagingResponse::new().message(&reply).to_xml(),
        )
            .into_response(),
        Err(e) => {
            error!("failed to handle message from {}: {}", message.from, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Process one inbound message and produce the reply text.
///
/// The sender's slot stays locked for the whole turn, including the durable
/// write, so concurrent messages from the same sender are serialized and a
/// dialogue run completes at most once.
pub async fn handle_message(
    state: &AppState,
    sender: &str,
    body: &str,
) -> Result<String, StorageError> {
    let slot = state.dialogues.slot(sender);
    let mut slot = slot.lock().await;

    let current = slot.take_state().unwrap_or(DialogueState::Start);
    info!("message from {} at step {}", sender, current.step_name());

    let turn = advance(current, body);
    match turn.outcome {
        Outcome::Continue(next) => {
            slot.put_state(next);
        }
        Outcome::Complete(completed) => {
            let review = NewReview {
                contact_number: sender.to_string(),
                user_name: completed.user_name.clone(),
                product_name: completed.product_name.clone(),
                product_review: completed.review_text,
            };

            // The durable write must succeed before the state is cleared.
            // On failure the sender stays in AwaitingReview and can resend
            // their review to retry.
            match state.review_store.append(review).await {
                Ok(id) => {
                    info!("recorded review {} for {}", id, sender);
                    slot.clear_state();
                }
                Err(e) => {
                    slot.put_state(DialogueState::AwaitingReview {
                        product_name: completed.product_name,
                        user_name: completed.user_name,
                    });
                    return Err(e);
                }
            }
        }
    }

    Ok(turn.reply)
}
