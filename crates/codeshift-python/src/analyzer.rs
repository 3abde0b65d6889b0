//! Analyzer service: run analysis rules over a tree and report findings.
//!
//! The analyzer traverses every node exactly once in document (pre-order)
//! order and applies every registered rule at each node, so finding order
//! matches node visitation order. The string boundary [`Analyzer::analyze_code`]
//! never fails and never panics; all errors are rendered into the
//! returned report, preserving at-most-one-report-per-call semantics.

use codeshift_core::error::ShiftError;
use codeshift_core::types::Finding;
use thiserror::Error;
use tracing::debug;

use crate::nodes::{NodeId, SyntaxTree};
use crate::parser::{parse_module, ParserError};
use crate::rules::{AnalysisRule, EmptyFunctionRule, PredicateRule, RuleError};
use crate::visitor::{walk, VisitResult, Visitor};

/// Rule evaluation failure during analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Failure of the structured analysis entry point.
#[derive(Debug, Error)]
pub enum AnalyzeSourceError {
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl From<AnalyzeSourceError> for ShiftError {
    fn from(err: AnalyzeSourceError) -> Self {
        match err {
            AnalyzeSourceError::Parse(e) => {
                let (line, col) = e.position().unwrap_or((0, 0));
                ShiftError::parse(e.to_string(), line, col)
            }
            AnalyzeSourceError::Analysis(e) => ShiftError::analysis(e.to_string()),
        }
    }
}

/// The analyzer service.
///
/// Holds the rule registry. Rules are registered before
/// [`initialize`](Analyzer::initialize) and read-only afterwards; each
/// call builds its own tree, so no state is shared between calls.
pub struct Analyzer {
    rules: Vec<Box<dyn AnalysisRule>>,
    initialized: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Create an analyzer with the built-in rule set.
    pub fn new() -> Self {
        Analyzer {
            rules: vec![Box::new(EmptyFunctionRule)],
            initialized: false,
        }
    }

    /// Create an analyzer with no rules at all.
    pub fn empty() -> Self {
        Analyzer {
            rules: Vec::new(),
            initialized: false,
        }
    }

    /// Register an analysis rule. Fails after `initialize`.
    pub fn register_rule(&mut self, rule: Box<dyn AnalysisRule>) -> Result<(), RuleError> {
        if self.initialized {
            return Err(RuleError::RegistryFrozen);
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Register a predicate + message pair as a rule. Fails after
    /// `initialize`.
    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&SyntaxTree, NodeId) -> bool + Send + Sync + 'static,
    ) -> Result<(), RuleError> {
        self.register_rule(Box::new(PredicateRule::new(name, message, predicate)))
    }

    /// Freeze the rule registry. Idempotent; reserved for future
    /// resource acquisition.
    pub fn initialize(&mut self) {
        if !self.initialized {
            debug!(rules = self.rules.len(), "analyzer initialized");
            self.initialized = true;
        }
    }

    /// Release resources. Idempotent and safe without a prior
    /// `initialize`; re-opens the rule registry.
    pub fn shutdown(&mut self) {
        if self.initialized {
            debug!("analyzer shut down");
            self.initialized = false;
        }
    }

    /// Run all rules over the tree in pre-order.
    ///
    /// Finding order matches node visitation order. If any rule fails,
    /// the whole call fails with an [`AnalysisError`].
    pub fn analyze(&self, tree: &SyntaxTree) -> Result<Vec<Finding>, AnalysisError> {
        struct Run<'a> {
            rules: &'a [Box<dyn AnalysisRule>],
            findings: Vec<Finding>,
            error: Option<RuleError>,
        }

        impl Visitor for Run<'_> {
            fn visit_node(&mut self, tree: &SyntaxTree, id: NodeId) -> VisitResult {
                for rule in self.rules {
                    match rule.check(tree, id) {
                        Ok(Some(finding)) => self.findings.push(finding),
                        Ok(None) => {}
                        Err(err) => {
                            self.error = Some(err);
                            return VisitResult::Stop;
                        }
                    }
                }
                VisitResult::Continue
            }
        }

        let mut run = Run {
            rules: &self.rules,
            findings: Vec::new(),
            error: None,
        };
        walk(tree, &mut run);
        match run.error {
            Some(err) => Err(AnalysisError::Rule(err)),
            None => Ok(run.findings),
        }
    }

    /// Parse and analyze source, returning structured findings.
    pub fn analyze_source(&self, source: &str) -> Result<Vec<Finding>, AnalyzeSourceError> {
        let tree = parse_module(source)?;
        let findings = self.analyze(&tree)?;
        debug!(findings = findings.len(), "analysis complete");
        Ok(findings)
    }

    /// The external string boundary.
    ///
    /// Returns newline-joined finding messages, `"No issues found"` when
    /// there are none, or `"Analysis error: <message>"` on any failure.
    /// Never panics and never propagates an error.
    pub fn analyze_code(&self, source: &str) -> String {
        match self.analyze_source(source) {
            Ok(findings) if findings.is_empty() => "No issues found".to_string(),
            Ok(findings) => findings
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Err(err) => format!("Analysis error: {}", err),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
