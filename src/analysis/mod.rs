//! Per-track analysis modules
//!
//! - Result types
//! - Feature extractor seam
//! - Track analyzer and outcomes

pub mod extractor;
pub mod result;
pub mod track;
