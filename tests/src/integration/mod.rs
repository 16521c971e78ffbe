//! Cross-crate integration scenarios.

pub mod ordering;
pub mod request_reply;
