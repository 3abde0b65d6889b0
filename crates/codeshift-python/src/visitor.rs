//! Visitor infrastructure for tree traversal.
//!
//! # Traversal Order
//!
//! - **Depth-first, pre-order** for `visit_node` (parent before children)
//! - **Post-order** for `leave_node` (after all children)
//! - Children are visited in source order (left-to-right, top-to-bottom)
//!
//! Every reachable node is visited exactly once.

use crate::nodes::{NodeId, SyntaxTree};

/// Result of visiting a node — controls traversal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    /// Continue traversal into children.
    ///
    /// After visiting children, `leave_node` is called for this node.
    #[default]
    Continue,

    /// Skip children, continue with siblings.
    ///
    /// The walker will not descend into this node's children, but
    /// `leave_node` is still called for this node.
    SkipChildren,

    /// Stop traversal entirely.
    ///
    /// No further `visit_node` or `leave_node` calls are made.
    Stop,
}

/// Read-only traversal hooks.
pub trait Visitor {
    /// Called before descending into children. Return a [`VisitResult`]
    /// to control traversal.
    #[allow(unused_variables)]
    fn visit_node(&mut self, tree: &SyntaxTree, id: NodeId) -> VisitResult {
        VisitResult::Continue
    }

    /// Called after all children have been visited. Called even when
    /// `SkipChildren` was returned.
    #[allow(unused_variables)]
    fn leave_node(&mut self, tree: &SyntaxTree, id: NodeId) {}
}

/// Walk the whole tree from the root in pre-order.
pub fn walk<V: Visitor>(tree: &SyntaxTree, visitor: &mut V) {
    walk_from(tree, tree.root(), visitor);
}

/// Walk the subtree rooted at `id`. Returns false when the visitor
/// stopped traversal.
pub fn walk_from<V: Visitor>(tree: &SyntaxTree, id: NodeId, visitor: &mut V) -> bool {
    match visitor.visit_node(tree, id) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => {
            visitor.leave_node(tree, id);
            return true;
        }
        VisitResult::Continue => {}
    }
    for child in tree.children(id) {
        if !walk_from(tree, child, visitor) {
            return false;
        }
    }
    visitor.leave_node(tree, id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeKind;
    use crate::parser::parse_module;

    /// Collects visited node ids in order.
    struct Collector {
        visited: Vec<NodeId>,
        left: Vec<NodeId>,
        stop_at: Option<NodeId>,
        skip_functions: bool,
    }

    impl Collector {
        fn new() -> Self {
            Collector {
                visited: Vec::new(),
                left: Vec::new(),
                stop_at: None,
                skip_functions: false,
            }
        }
    }

    impl Visitor for Collector {
        fn visit_node(&mut self, tree: &SyntaxTree, id: NodeId) -> VisitResult {
            self.visited.push(id);
            if self.stop_at == Some(id) {
                return VisitResult::Stop;
            }
            if self.skip_functions && matches!(tree.kind(id), NodeKind::FunctionDef { .. }) {
                return VisitResult::SkipChildren;
            }
            VisitResult::Continue
        }

        fn leave_node(&mut self, _tree: &SyntaxTree, id: NodeId) {
            self.left.push(id);
        }
    }

    #[test]
    fn visits_every_node_exactly_once_in_preorder() {
        let tree = parse_module("def f():\n    pass\n\nx = f()\n").unwrap();
        let mut collector = Collector::new();
        walk(&tree, &mut collector);

        // Root first.
        assert_eq!(collector.visited[0], tree.root());
        // No duplicates.
        let mut sorted = collector.visited.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), collector.visited.len());
        // Parents before children.
        for (i, id) in collector.visited.iter().enumerate() {
            if let Some(parent) = tree.node(*id).parent {
                let parent_pos = collector
                    .visited
                    .iter()
                    .position(|v| v == &parent)
                    .expect("parent visited");
                assert!(parent_pos < i, "parent visited after child");
            }
        }
        // leave_node fired for every visited node.
        assert_eq!(collector.left.len(), collector.visited.len());
    }

    #[test]
    fn skip_children_prunes_subtree_but_still_leaves() {
        let tree = parse_module("def f():\n    x = 1\n").unwrap();
        let mut collector = Collector::new();
        collector.skip_functions = true;
        walk(&tree, &mut collector);

        let func = collector
            .visited
            .iter()
            .find(|id| matches!(tree.kind(**id), NodeKind::FunctionDef { .. }))
            .copied()
            .expect("function visited");
        // The function body was not descended into.
        for id in &collector.visited {
            assert!(
                !matches!(tree.kind(*id), NodeKind::Assign { .. }),
                "skipped subtree was visited"
            );
        }
        // leave_node still fired for the function.
        assert!(collector.left.contains(&func));
    }

    #[test]
    fn stop_halts_traversal() {
        let tree = parse_module("a = 1\nb = 2\n").unwrap();
        let mut probe = Collector::new();
        walk(&tree, &mut probe);
        let third = probe.visited[2];

        let mut collector = Collector::new();
        collector.stop_at = Some(third);
        walk(&tree, &mut collector);
        assert_eq!(collector.visited.len(), 3);
        // No leave_node after Stop.
        assert!(!collector.left.contains(&third));
    }
}
