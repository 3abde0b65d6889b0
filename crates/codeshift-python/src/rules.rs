//! Analysis and transformation rules.
//!
//! Rules are the unit of logic both engines run during traversal. An
//! [`AnalysisRule`] inspects a node and may produce a
//! [`Finding`](codeshift_core::types::Finding); a [`TransformRule`]
//! matches a node and builds a replacement subtree for the engine to
//! reattach. Rules are registered before `initialize` and read-only
//! afterwards, so no locking is needed across calls.

use codeshift_core::text::location_at;
use codeshift_core::types::Finding;
use thiserror::Error;

use crate::nodes::{NodeId, NodeKind, SyntaxTree};

/// Errors raised by rule evaluation or registration.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule failed while evaluating a node.
    #[error("rule '{rule}' failed: {message}")]
    Failed { rule: String, message: String },

    /// Registration attempted after the owning engine was initialized.
    #[error("rules are frozen after initialize; register rules first")]
    RegistryFrozen,
}

impl RuleError {
    /// Create a failure for the named rule.
    pub fn failed(rule: impl Into<String>, message: impl Into<String>) -> Self {
        RuleError::Failed {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Analysis rules
// ============================================================================

/// A unit of analysis logic applied to every node during traversal.
pub trait AnalysisRule: Send + Sync {
    /// Rule name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Inspect `id`; return a finding when the rule matches.
    fn check(&self, tree: &SyntaxTree, id: NodeId) -> Result<Option<Finding>, RuleError>;
}

/// Built-in rule: report function definitions with empty bodies.
///
/// A body counts as empty when every statement in it is `pass` or `...`.
#[derive(Debug, Default)]
pub struct EmptyFunctionRule;

impl AnalysisRule for EmptyFunctionRule {
    fn name(&self) -> &str {
        "empty-function"
    }

    fn check(&self, tree: &SyntaxTree, id: NodeId) -> Result<Option<Finding>, RuleError> {
        if let NodeKind::FunctionDef {
            name,
            name_span,
            body,
            ..
        } = tree.kind(id)
        {
            if suite_is_empty(tree, *body) {
                let location = location_at(tree.source(), name_span.start as usize);
                return Ok(Some(
                    Finding::new(format!("Empty function found: {}", name))
                        .with_location(location),
                ));
            }
        }
        Ok(None)
    }
}

/// Whether a suite consists only of `pass` / `...` statements.
fn suite_is_empty(tree: &SyntaxTree, suite: NodeId) -> bool {
    let NodeKind::Suite { body, .. } = tree.kind(suite) else {
        return false;
    };
    body.iter().all(|stmt| statement_is_trivial(tree, *stmt))
}

fn statement_is_trivial(tree: &SyntaxTree, stmt: NodeId) -> bool {
    match tree.kind(stmt) {
        NodeKind::SimpleStatementLine { body } => {
            body.iter().all(|small| statement_is_trivial(tree, *small))
        }
        NodeKind::Pass => true,
        NodeKind::ExprStmt { value } => matches!(tree.kind(*value), NodeKind::Ellipsis),
        _ => false,
    }
}

/// An analysis rule built from a predicate and a fixed message.
///
/// This is the registration surface for ad-hoc rules: match nodes with a
/// predicate, report the message at the matched node's location.
pub struct PredicateRule {
    name: String,
    message: String,
    predicate: Box<dyn Fn(&SyntaxTree, NodeId) -> bool + Send + Sync>,
}

impl PredicateRule {
    /// Create a predicate rule.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&SyntaxTree, NodeId) -> bool + Send + Sync + 'static,
    ) -> Self {
        PredicateRule {
            name: name.into(),
            message: message.into(),
            predicate: Box::new(predicate),
        }
    }
}

impl AnalysisRule for PredicateRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, tree: &SyntaxTree, id: NodeId) -> Result<Option<Finding>, RuleError> {
        if !(self.predicate)(tree, id) {
            return Ok(None);
        }
        let mut finding = Finding::new(self.message.clone());
        if let Some(span) = tree.node(id).span {
            finding = finding.with_location(location_at(tree.source(), span.start as usize));
        }
        Ok(Some(finding))
    }
}

// ============================================================================
// Transform rules
// ============================================================================

/// A unit of transformation logic.
///
/// The engine traverses the tree, asks each rule whether it `matches` a
/// node, builds the replacement subtree via `build_replacement`, and
/// reattaches it with [`SyntaxTree::replace`]. Rules never reattach
/// nodes themselves.
pub trait TransformRule: Send + Sync {
    /// Rule name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether this rule rewrites `id`.
    fn matches(&self, tree: &SyntaxTree, id: NodeId) -> bool;

    /// Build the replacement subtree for a matched node. Returns the new
    /// node id, or None when the node should be left alone after all.
    fn build_replacement(
        &self,
        tree: &mut SyntaxTree,
        id: NodeId,
    ) -> Result<Option<NodeId>, RuleError>;
}

/// Built-in rule: rewrite bare `print(...)` calls to `logging.info(...)`.
///
/// Only calls whose callee is the bare name `print` match; attribute
/// calls such as `obj.print(...)` or the already-rewritten
/// `logging.info(...)` are left alone, which makes the rewrite
/// idempotent. Arguments are adopted unchanged, in order; only the
/// callee identifier is discarded.
#[derive(Debug, Default)]
pub struct PrintToLoggingRule;

impl TransformRule for PrintToLoggingRule {
    fn name(&self) -> &str {
        "print-to-logging"
    }

    fn matches(&self, tree: &SyntaxTree, id: NodeId) -> bool {
        if let NodeKind::Call { func, .. } = tree.kind(id) {
            return matches!(tree.kind(*func), NodeKind::Name { id } if id == "print");
        }
        false
    }

    fn build_replacement(
        &self,
        tree: &mut SyntaxTree,
        id: NodeId,
    ) -> Result<Option<NodeId>, RuleError> {
        let (args, args_span) = match tree.kind(id) {
            NodeKind::Call {
                args, args_span, ..
            } => (args.clone(), *args_span),
            other => {
                return Err(RuleError::failed(
                    self.name(),
                    format!("expected a call node, got {:?}", other),
                ))
            }
        };
        let logging = tree.add(
            NodeKind::Name {
                id: "logging".to_string(),
            },
            None,
        );
        let info = tree.add(
            NodeKind::Attribute {
                value: logging,
                attr: "info".to_string(),
            },
            None,
        );
        let call = tree.add(
            NodeKind::Call {
                func: info,
                args,
                args_span,
            },
            None,
        );
        Ok(Some(call))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use crate::visitor::{walk, VisitResult, Visitor};

    fn find_nodes(tree: &SyntaxTree, pred: impl Fn(&SyntaxTree, NodeId) -> bool) -> Vec<NodeId> {
        struct Finder<'p> {
            pred: &'p dyn Fn(&SyntaxTree, NodeId) -> bool,
            found: Vec<NodeId>,
        }
        impl Visitor for Finder<'_> {
            fn visit_node(&mut self, tree: &SyntaxTree, id: NodeId) -> VisitResult {
                if (self.pred)(tree, id) {
                    self.found.push(id);
                }
                VisitResult::Continue
            }
        }
        let mut finder = Finder {
            pred: &pred,
            found: Vec::new(),
        };
        walk(tree, &mut finder);
        finder.found
    }

    #[test]
    fn empty_function_rule_reports_pass_body() {
        let tree = parse_module("def f():\n    pass\n").unwrap();
        let defs = find_nodes(&tree, |t, id| {
            matches!(t.kind(id), NodeKind::FunctionDef { .. })
        });
        let finding = EmptyFunctionRule
            .check(&tree, defs[0])
            .unwrap()
            .expect("finding");
        assert_eq!(finding.message, "Empty function found: f");
        let loc = finding.location.expect("location");
        assert_eq!(loc.line, 1);
        assert_eq!(loc.col, 5);
    }

    #[test]
    fn empty_function_rule_accepts_ellipsis_and_inline_bodies() {
        for src in &["def g(): ...\n", "def g(): pass\n", "def g():\n    ...\n"] {
            let tree = parse_module(src).unwrap();
            let defs = find_nodes(&tree, |t, id| {
                matches!(t.kind(id), NodeKind::FunctionDef { .. })
            });
            assert!(
                EmptyFunctionRule.check(&tree, defs[0]).unwrap().is_some(),
                "expected finding for '{}'",
                src
            );
        }
    }

    #[test]
    fn empty_function_rule_ignores_real_bodies() {
        for src in &[
            "def g():\n    return 1\n",
            "def g():\n    'docstring'\n",
            "def g():\n    pass\n    x = 1\n",
        ] {
            let tree = parse_module(src).unwrap();
            let defs = find_nodes(&tree, |t, id| {
                matches!(t.kind(id), NodeKind::FunctionDef { .. })
            });
            assert!(
                EmptyFunctionRule.check(&tree, defs[0]).unwrap().is_none(),
                "unexpected finding for '{}'",
                src
            );
        }
    }

    #[test]
    fn predicate_rule_reports_with_location() {
        let tree = parse_module("x = 1\n").unwrap();
        let rule = PredicateRule::new("no-assign", "Assignment found", |t, id| {
            matches!(t.kind(id), NodeKind::Assign { .. })
        });
        let assigns = find_nodes(&tree, |t, id| matches!(t.kind(id), NodeKind::Assign { .. }));
        let finding = rule.check(&tree, assigns[0]).unwrap().expect("finding");
        assert_eq!(finding.message, "Assignment found");
        assert!(finding.location.is_some());
    }

    #[test]
    fn print_rule_matches_only_bare_print() {
        let tree =
            parse_module("print(1)\nobj.print(2)\nlogging.info(3)\nprinted(4)\n").unwrap();
        let calls = find_nodes(&tree, |t, id| matches!(t.kind(id), NodeKind::Call { .. }));
        let rule = PrintToLoggingRule;
        let matched: Vec<bool> = calls.iter().map(|c| rule.matches(&tree, *c)).collect();
        assert_eq!(matched, vec![true, false, false, false]);
    }

    #[test]
    fn print_rule_builds_attribute_call_with_adopted_args() {
        let mut tree = parse_module("print(x, y)\n").unwrap();
        let calls = find_nodes(&tree, |t, id| matches!(t.kind(id), NodeKind::Call { .. }));
        let original_args = match tree.kind(calls[0]) {
            NodeKind::Call { args, .. } => args.clone(),
            _ => unreachable!(),
        };
        let replacement = PrintToLoggingRule
            .build_replacement(&mut tree, calls[0])
            .unwrap()
            .expect("replacement");
        match tree.kind(replacement) {
            NodeKind::Call { func, args, .. } => {
                assert_eq!(args, &original_args);
                match tree.kind(*func) {
                    NodeKind::Attribute { value, attr } => {
                        assert_eq!(attr, "info");
                        assert!(
                            matches!(tree.kind(*value), NodeKind::Name { id } if id == "logging")
                        );
                    }
                    other => panic!("expected Attribute callee, got {:?}", other),
                }
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }
}
