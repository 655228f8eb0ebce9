//! Rendering of analysis results as JSON, anchored text and outlines.

mod anchored;
mod json;

pub use anchored::{anchored_text, outline};
pub use json::{to_json, JsonFormat};
