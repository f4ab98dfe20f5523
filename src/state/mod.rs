//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `DocumentState`: Final outcome of each document (written, empty, skipped, failed, ...)
//! - `PageIndexState`: Pagination cursor used while walking one index section

mod document_state;
mod index_state;

// Re-export main types
pub use document_state::DocumentState;
pub use index_state::PageIndexState;
