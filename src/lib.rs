//! Suggestion and learning layer of a predictive keyboard.
//!
//! `DictionaryFacilitator` is what the IME talks to: it serves ranked
//! suggestions from every enabled locale's dictionaries and routes commit
//! and revert events into the learned dictionaries. The dictionaries
//! themselves live in `dicta_core`.

mod async_worker;
pub mod facilitator;
pub mod factory;
mod group;
pub mod session_pool;
pub mod suggestion_results;

#[cfg(test)]
mod tests;

pub use dicta_core;
pub use facilitator::{
    DictionaryFacilitator, DictionaryInitializationListener, InputEventType, InputStyle,
    LoadError, ResetOptions,
};
pub use factory::{DictionaryFactory, FileDictionaryFactory};
pub use session_pool::{SessionGuard, SessionPool, SpellChecker};
pub use suggestion_results::SuggestionResults;
