//! Utilities shared by the adapters.
//!
//! - [`ResponseCache`]: file-backed cache of normalized responses
//! - [`pick`], [`pick_str`], [`map_array`], [`into_record`]: JSON to record helpers

mod cache;
mod json;

pub use cache::ResponseCache;
pub use json::{into_record, map_array, pick, pick_str};
