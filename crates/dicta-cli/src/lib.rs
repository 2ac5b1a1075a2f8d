//! Debug and build tooling for dicta dictionaries.

pub mod commands;
pub mod logging;
pub mod word_list;
