//! CLI-facing outcome shaping.

pub(crate) mod outcome;
mod response;

pub use response::{format_status_message, outcome_from_error, to_json_response};
