//! Output formatting
//!
//! - `text`: console report
//! - `json`: machine-readable report file

pub mod json;
pub mod text;
