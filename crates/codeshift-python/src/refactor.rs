//! RefactorEngine service: apply transform rules and regenerate source.
//!
//! The engine traverses the tree in pre-order collecting matches, builds
//! each replacement, and reattaches it **in place within its parent**
//! via [`SyntaxTree::replace`] so the new node is reachable from the
//! root. After all rewrites the source is regenerated, preserving
//! non-rewritten code verbatim, and the result is re-parsed as a syntax
//! verification step.
//!
//! The string boundary [`RefactorEngine::refactor_code`] never fails and
//! never panics; all errors are rendered into the returned string.

use codeshift_core::error::ShiftError;
use thiserror::Error;
use tracing::debug;

use crate::nodes::{NodeId, ReplaceError, SyntaxTree};
use crate::parser::{parse_module, ParserError};
use crate::rules::{PrintToLoggingRule, RuleError, TransformRule};
use crate::visitor::{walk, VisitResult, Visitor};

/// Transformation or regeneration failure.
#[derive(Debug, Error)]
pub enum RefactorError {
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("replacement failed: {0}")]
    Replace(#[from] ReplaceError),
    #[error("regenerated source failed to re-parse: {0}")]
    Verification(ParserError),
}

/// Failure of the structured refactor entry point.
#[derive(Debug, Error)]
pub enum RefactorSourceError {
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Refactor(#[from] RefactorError),
}

impl From<RefactorSourceError> for ShiftError {
    fn from(err: RefactorSourceError) -> Self {
        match err {
            RefactorSourceError::Parse(e) => {
                let (line, col) = e.position().unwrap_or((0, 0));
                ShiftError::parse(e.to_string(), line, col)
            }
            RefactorSourceError::Refactor(RefactorError::Verification(e)) => {
                ShiftError::Verification {
                    message: e.to_string(),
                }
            }
            RefactorSourceError::Refactor(e) => ShiftError::refactor(e.to_string()),
        }
    }
}

/// Outcome of a successful refactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorOutcome {
    /// The regenerated source text.
    pub code: String,
    /// Number of nodes rewritten.
    pub rewrites: usize,
}

/// The refactor engine service.
///
/// Holds the transform rule registry. Rules are registered before
/// [`initialize`](RefactorEngine::initialize) and read-only afterwards;
/// each call builds its own tree, so no state is shared between calls.
pub struct RefactorEngine {
    rules: Vec<Box<dyn TransformRule>>,
    initialized: bool,
}

impl Default for RefactorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RefactorEngine {
    /// Create an engine with the built-in rule set.
    pub fn new() -> Self {
        RefactorEngine {
            rules: vec![Box::new(PrintToLoggingRule)],
            initialized: false,
        }
    }

    /// Create an engine with no rules at all.
    pub fn empty() -> Self {
        RefactorEngine {
            rules: Vec::new(),
            initialized: false,
        }
    }

    /// Register a transform rule. Fails after `initialize`.
    pub fn register_rule(&mut self, rule: Box<dyn TransformRule>) -> Result<(), RuleError> {
        if self.initialized {
            return Err(RuleError::RegistryFrozen);
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Freeze the rule registry. Idempotent; reserved for future
    /// resource acquisition.
    pub fn initialize(&mut self) {
        if !self.initialized {
            debug!(rules = self.rules.len(), "refactor engine initialized");
            self.initialized = true;
        }
    }

    /// Release resources. Idempotent and safe without a prior
    /// `initialize`; re-opens the rule registry.
    pub fn shutdown(&mut self) {
        if self.initialized {
            debug!("refactor engine shut down");
            self.initialized = false;
        }
    }

    /// Apply all transform rules to the tree in place.
    ///
    /// Matches are collected in pre-order (first matching rule wins per
    /// node), then each replacement is built and reattached. Returns the
    /// number of rewrites.
    pub fn refactor(&self, tree: &mut SyntaxTree) -> Result<usize, RefactorError> {
        struct Matches<'a> {
            rules: &'a [Box<dyn TransformRule>],
            matched: Vec<(NodeId, usize)>,
        }

        impl Visitor for Matches<'_> {
            fn visit_node(&mut self, tree: &SyntaxTree, id: NodeId) -> VisitResult {
                for (index, rule) in self.rules.iter().enumerate() {
                    if rule.matches(tree, id) {
                        self.matched.push((id, index));
                        break;
                    }
                }
                VisitResult::Continue
            }
        }

        let mut collector = Matches {
            rules: &self.rules,
            matched: Vec::new(),
        };
        walk(tree, &mut collector);

        let mut rewrites = 0usize;
        for (node, rule_index) in collector.matched {
            let rule = &self.rules[rule_index];
            if let Some(replacement) = rule.build_replacement(tree, node)? {
                tree.replace(node, replacement)?;
                debug!(rule = rule.name(), node = %node, "node rewritten");
                rewrites += 1;
            }
        }
        Ok(rewrites)
    }

    /// Parse, refactor, regenerate, and verify source.
    ///
    /// When at least one rewrite happened, the regenerated text is
    /// re-parsed to confirm it is still syntactically valid.
    pub fn refactor_source(&self, source: &str) -> Result<RefactorOutcome, RefactorSourceError> {
        let mut tree = parse_module(source)?;
        let rewrites = self.refactor(&mut tree).map_err(RefactorSourceError::from)?;
        let code = tree.to_source();
        if rewrites > 0 {
            if let Err(err) = parse_module(&code) {
                return Err(RefactorSourceError::Refactor(RefactorError::Verification(
                    err,
                )));
            }
        }
        debug!(rewrites, "refactor complete");
        Ok(RefactorOutcome { code, rewrites })
    }

    /// The external string boundary.
    ///
    /// Returns the regenerated source text (unchanged when no rule
    /// matched), or `"Refactoring error: <message>"` on failure. Never
    /// panics and never propagates an error.
    pub fn refactor_code(&self, source: &str) -> String {
        match self.refactor_source(source) {
            Ok(outcome) => outcome.code,
            Err(err) => format!("Refactoring error: {}", err),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_call_rewritten_in_place() {
        let engine = RefactorEngine::new();
        assert_eq!(
            engine.refactor_code("print(x, y)\n"),
            "logging.info(x, y)\n"
        );
    }

    #[test]
    fn argument_text_preserved_verbatim() {
        let engine = RefactorEngine::new();
        assert_eq!(
            engine.refactor_code("print( x ,  y )\n"),
            "logging.info( x ,  y )\n"
        );
    }

    #[test]
    fn keyword_and_star_args_survive() {
        let engine = RefactorEngine::new();
        assert_eq!(
            engine.refactor_code("print('a', sep=', ', *rest, **kw)\n"),
            "logging.info('a', sep=', ', *rest, **kw)\n"
        );
    }

    #[test]
    fn surrounding_code_untouched() {
        let engine = RefactorEngine::new();
        let src = "import os\n\n# report\ndef report(x):\n    print(x)\n    return x\n";
        let out = engine.refactor_source(src).unwrap();
        assert_eq!(out.rewrites, 1);
        assert_eq!(
            out.code,
            "import os\n\n# report\ndef report(x):\n    logging.info(x)\n    return x\n"
        );
    }

    #[test]
    fn no_print_calls_returns_input_unchanged() {
        let engine = RefactorEngine::new();
        let src = "def f():\n    return 'print'\nobj.print(1)\n";
        let out = engine.refactor_source(src).unwrap();
        assert_eq!(out.rewrites, 0);
        assert_eq!(out.code, src);
    }

    #[test]
    fn refactor_is_idempotent() {
        let engine = RefactorEngine::new();
        let once = engine.refactor_code("print(1)\nprint(2)\n");
        let twice = engine.refactor_code(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "logging.info(1)\nlogging.info(2)\n");
    }

    #[test]
    fn nested_print_calls_both_rewritten() {
        let engine = RefactorEngine::new();
        assert_eq!(
            engine.refactor_code("print(print(1))\n"),
            "logging.info(logging.info(1))\n"
        );
    }

    #[test]
    fn print_in_expression_context_rewritten() {
        let engine = RefactorEngine::new();
        assert_eq!(
            engine.refactor_code("x = [print(i) for i in y]\n"),
            "x = [logging.info(i) for i in y]\n"
        );
    }

    #[test]
    fn invalid_source_reports_refactoring_error() {
        let engine = RefactorEngine::new();
        let report = engine.refactor_code("def f(:\n");
        assert!(
            report.starts_with("Refactoring error:"),
            "unexpected report: {}",
            report
        );
    }

    #[test]
    fn rewritten_output_reparses() {
        let engine = RefactorEngine::new();
        let out = engine.refactor_code("if x:\n    print(a, b)\n");
        parse_module(&out).expect("refactored output must stay valid");
    }

    #[test]
    fn registration_rejected_after_initialize() {
        let mut engine = RefactorEngine::new();
        engine.initialize();
        let err = engine
            .register_rule(Box::new(PrintToLoggingRule))
            .unwrap_err();
        assert!(matches!(err, RuleError::RegistryFrozen));
    }

    #[test]
    fn lifecycle_is_idempotent() {
        let mut engine = RefactorEngine::new();
        engine.shutdown();
        engine.initialize();
        engine.initialize();
        engine.shutdown();
        engine.shutdown();
    }
}
