//! Per-sender review dialogue.
//!
//! This module implements the four-step conversation that collects a
//! product review over a messaging channel. The design separates:
//! - **State**: where a sender is in the conversation (`DialogueState`)
//! - **Transition**: pure function `(State, input) -> Turn` with no side effects
//! - **Store**: per-sender slots with serialized access (`DialogueStore`)
//!
//! The webhook handler drives the store and transition together and owns
//! all persistence side effects.

pub mod state;
pub mod store;
pub mod transition;

pub use state::*;
pub use store::*;
pub use transition::*;
