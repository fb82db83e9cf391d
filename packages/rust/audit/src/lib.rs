//! Degree-audit text parsing.
//!
//! Turns an unstructured audit export (already extracted to plain text) into a
//! [`ParsedAudit`]:
//! 1. [`tokenizer`] splits metadata, summary, and sections
//! 2. [`course_line`] parses each course line with ordered fallback patterns
//! 3. [`assembler`] builds the document and checks unit totals
//!
//! [`render`] writes a parsed audit back to text in the same grammar.

pub mod assembler;
pub mod course_line;
pub mod render;
pub mod tokenizer;

use tracing::instrument;

use coursepath_shared::{ParsedAudit, Result};

pub use assembler::{AssembleOptions, assemble};
pub use course_line::{LineParse, parse_course_line};
pub use render::{render_audit, render_course};
pub use tokenizer::{TokenizedAudit, tokenize};

/// Parse raw audit text into a [`ParsedAudit`].
#[instrument(skip_all, fields(bytes = text.len()))]
pub fn parse_audit(text: &str, options: &AssembleOptions) -> Result<ParsedAudit> {
    assemble(tokenize(text), options)
}
