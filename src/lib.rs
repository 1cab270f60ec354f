pub mod api;
pub mod config;
pub mod dialogue;
pub mod store;
pub mod twiml;
pub mod webhook;

use std::sync::Arc;

use dialogue::DialogueStore;
use store::ReviewStore;

/// Shared application state handed to every handler.
pub struct AppState {
    pub review_store: Arc<dyn ReviewStore>,
    pub dialogues: Arc<DialogueStore>,
}
