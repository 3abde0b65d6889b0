//! codeshift: a source-to-source transformation engine.
//!
//! Parse Python source into a syntax tree, run a registered set of
//! analysis/transformation rules over it in a well-defined order, and
//! re-emit source text with formatting preserved.

// Core infrastructure - re-exported from codeshift-core
pub use codeshift_core::error;
pub use codeshift_core::output;
pub use codeshift_core::span;
pub use codeshift_core::text;
pub use codeshift_core::types;

// Language support
pub use codeshift_python as python;

// CLI front door
pub mod cli;
