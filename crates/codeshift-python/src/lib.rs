//! Python source-to-source transformation for codeshift.
//!
//! This crate parses Python source into an arena syntax tree, runs
//! registered analysis/transformation rules over it in pre-order, and
//! regenerates source text with untouched regions preserved verbatim.
//!
//! # Quick Start
//!
//! ```
//! use codeshift_python::parse_module;
//!
//! let tree = parse_module("x = 1\n").expect("parse error");
//! // Round-trip: a clean tree regenerates the original text.
//! assert_eq!(tree.to_source(), "x = 1\n");
//! ```
//!
//! # Analysis
//!
//! ```
//! use codeshift_python::Analyzer;
//!
//! let analyzer = Analyzer::new();
//! assert_eq!(analyzer.analyze_code("x = 1\n"), "No issues found");
//! assert_eq!(
//!     analyzer.analyze_code("def f():\n    pass\n"),
//!     "Empty function found: f"
//! );
//! ```
//!
//! # Refactoring
//!
//! ```
//! use codeshift_python::RefactorEngine;
//!
//! let engine = RefactorEngine::new();
//! assert_eq!(engine.refactor_code("print(1)\n"), "logging.info(1)\n");
//! ```

use codeshift_core::text::line_start_offset;

/// Tokenizer for Python source code.
pub mod tokenizer;

/// Arena syntax tree and node kinds.
pub mod nodes;

/// Recursive-descent parser.
pub mod parser;

/// Code regeneration.
pub mod codegen;

/// Visitor infrastructure for tree traversal.
pub mod visitor;

/// Analysis and transformation rules.
pub mod rules;

/// Analyzer service.
pub mod analyzer;

/// RefactorEngine service.
pub mod refactor;

pub use analyzer::{AnalysisError, AnalyzeSourceError, Analyzer};
pub use codegen::CodegenState;
pub use nodes::{
    ArgStar, ComprehensionKind, ImportAlias, Node, NodeId, NodeKind, ReplaceError, SyntaxTree,
};
pub use parser::{parse_module, ParserError};
pub use refactor::{RefactorEngine, RefactorError, RefactorOutcome, RefactorSourceError};
pub use rules::{
    AnalysisRule, EmptyFunctionRule, PredicateRule, PrintToLoggingRule, RuleError, TransformRule,
};
pub use tokenizer::{tokenize, TokError, TokType, Token};
pub use visitor::{walk, walk_from, VisitResult, Visitor};

// ============================================================================
// Error formatting
// ============================================================================

/// Format a parser error into a human-readable string with source context.
///
/// Syntax errors render as an annotated snippet with the offending span
/// highlighted; tokenizer errors and errors without a usable span fall
/// back to a plain one-line message.
///
/// # Example
///
/// ```
/// use codeshift_python::{parse_module, prettify_error};
///
/// if let Err(e) = parse_module("def f(:\n    pass\n") {
///     let formatted = prettify_error(&e, "def f(:\n    pass\n", "example.py");
///     assert!(formatted.contains("example.py"));
/// }
/// ```
pub fn prettify_error(err: &ParserError, source: &str, label: &str) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let (Some((line, _)), Some(span)) = (err.position(), err.span()) else {
        return format!("Parse error for {}: {}", label, err);
    };

    let context = 1u32;
    let first_line = line.saturating_sub(context).max(1);
    let start_offset = line_start_offset(source, first_line);
    let end_offset = line_start_offset(source, line + context + 1);
    let snippet = &source[start_offset..end_offset.max(start_offset)];

    let start = (span.start as usize)
        .saturating_sub(start_offset)
        .min(snippet.len());
    let mut end = (span.end as usize)
        .saturating_sub(start_offset)
        .min(snippet.len());
    if start == end && end < snippet.len() {
        end += 1;
        while end < snippet.len() && !snippet.is_char_boundary(end) {
            end += 1;
        }
    }
    if start >= end {
        return format!("Parse error for {}: {}", label, err);
    }

    let message = err.to_string();
    let rendered = Renderer::styled()
        .render(
            Level::Error.title(label).snippet(
                Snippet::source(snippet)
                    .line_start(first_line as usize)
                    .fold(false)
                    .annotations(vec![Level::Error.span(start..end).label(&message)]),
            ),
        )
        .to_string();
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeshift_core::span::Span;

    #[test]
    fn prettify_error_includes_label_and_expectation() {
        let source = "def f(:\n    pass\n";
        let err = parse_module(source).unwrap_err();
        let formatted = prettify_error(&err, source, "example.py");
        assert!(formatted.contains("example.py"));
        assert!(formatted.contains("def f(:"));
    }

    #[test]
    fn prettify_error_handles_tokenizer_errors() {
        let source = "x = 'oops";
        let err = parse_module(source).unwrap_err();
        let formatted = prettify_error(&err, source, "bad.py");
        assert!(formatted.contains("bad.py"));
        assert!(formatted.contains("unterminated string"));
    }

    #[test]
    fn prettify_error_handles_eof_errors() {
        // Error at the very end of input: no panic, fall back or annotate.
        let source = "if x";
        let err = parse_module(source).unwrap_err();
        let formatted = prettify_error(&err, source, "eof.py");
        assert!(formatted.contains("eof.py"));
    }

    #[test]
    fn span_helper_on_parser_error() {
        let err = parse_module("x = = 1\n").unwrap_err();
        let span = err.span().expect("span");
        assert_eq!(span, Span::new(4, 5));
    }
}
