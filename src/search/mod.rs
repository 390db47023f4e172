//! School registry search
//!
//! Query normalization, shorthand extraction, accent variants, exact
//! type + number validation and the orchestrating engine.

pub mod engine;
pub mod normalize;
pub mod pattern;
pub mod ranking;
pub mod validator;
pub mod vocabulary;

pub use engine::SearchEngine;
