//! Text handling for harvested documents
//!
//! Paragraph text pulled out of article pages still carries citation markers,
//! pronunciation asides and stray markup. This module turns it into corpus-ready
//! plain text.

mod normalize;

pub use normalize::{normalize, Normalizer};
