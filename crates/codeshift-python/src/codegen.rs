//! Code regeneration from the arena syntax tree.
//!
//! Regeneration preserves untouched source verbatim:
//!
//! - A node whose subtree is clean emits its original span unchanged.
//! - A dirty node with a span splices the original text *between* its
//!   children (comments, separators, indentation) and recurses into the
//!   children, so only replaced regions are actually regenerated.
//! - A node without usable spans (rule-built replacements) is emitted
//!   structurally with canonical formatting; clean descendants still
//!   emit verbatim.
//!
//! A rewritten call keeps the original argument-list text via the
//! [`NodeKind::Call`] `args_span` field when none of the arguments were
//! themselves replaced.

use codeshift_core::span::Span;

use crate::nodes::{ArgStar, ComprehensionKind, NodeId, NodeKind, SyntaxTree};

/// Mutable state threaded through code generation.
#[derive(Debug, Default)]
pub struct CodegenState {
    out: String,
    /// Current statement depth for canonical block formatting.
    indent: usize,
}

impl CodegenState {
    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn indent_str(&self) -> String {
        "    ".repeat(self.indent)
    }

    /// The generated source.
    pub fn into_string(self) -> String {
        self.out
    }
}

impl SyntaxTree {
    /// Regenerate source text from the tree.
    ///
    /// For a tree with no replacements this returns the original source
    /// byte-for-byte.
    pub fn to_source(&self) -> String {
        let mut state = CodegenState::default();
        emit(self, self.root(), &mut state);
        state.into_string()
    }
}

/// Emit one node.
pub fn emit(tree: &SyntaxTree, id: NodeId, state: &mut CodegenState) {
    let node = tree.node(id);
    if !node.dirty {
        if let Some(span) = node.span {
            state.push(span.slice(tree.source()));
            return;
        }
    }
    if let Some(span) = node.span {
        if emit_gap_spliced(tree, id, span, state) {
            return;
        }
    }
    emit_canonical(tree, id, state);
}

/// Emit a dirty node by splicing original text between its children.
///
/// Returns false when the children's spans cannot reproduce the node's
/// layout (missing spans, replaced structure, out-of-order spans); the
/// caller falls back to canonical emission.
fn emit_gap_spliced(
    tree: &SyntaxTree,
    id: NodeId,
    span: Span,
    state: &mut CodegenState,
) -> bool {
    let children = tree.children(id);
    if children.is_empty() {
        return false;
    }
    let mut cursor = span.start;
    for child in &children {
        match tree.node(*child).span {
            Some(cs) if cs.start >= cursor && cs.end <= span.end => cursor = cs.end,
            _ => return false,
        }
    }

    let source = tree.source();
    let mut cursor = span.start;
    for child in children {
        let cs = tree.node(child).span.unwrap_or(span);
        state.push(Span::new(cursor, cs.start).slice(source));
        emit(tree, child, state);
        cursor = cs.end;
    }
    state.push(Span::new(cursor, span.end).slice(source));
    true
}

/// Emit a comma-separated child list.
fn emit_joined(tree: &SyntaxTree, ids: &[NodeId], sep: &str, state: &mut CodegenState) {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            state.push(sep);
        }
        emit(tree, *id, state);
    }
}

/// Emit a suite with canonical formatting: inline suites on the same
/// line, block suites indented one level below the current depth.
fn emit_suite(tree: &SyntaxTree, id: NodeId, state: &mut CodegenState) {
    let NodeKind::Suite { body, is_block } = tree.kind(id) else {
        emit(tree, id, state);
        return;
    };
    if !*is_block {
        state.push(" ");
        emit_joined(tree, body, "; ", state);
        return;
    }
    state.indent += 1;
    for stmt in body {
        state.push("\n");
        let indent = state.indent_str();
        state.push(&indent);
        emit(tree, *stmt, state);
    }
    state.indent -= 1;
}

/// `label:` plus an indented suite, for `else:` / `finally:` clauses.
fn emit_labeled_suite(tree: &SyntaxTree, label: &str, id: NodeId, state: &mut CodegenState) {
    state.push("\n");
    let indent = state.indent_str();
    state.push(&indent);
    state.push(label);
    state.push(":");
    emit_suite(tree, id, state);
}

fn emit_opt_prefixed(
    tree: &SyntaxTree,
    prefix: &str,
    id: Option<NodeId>,
    state: &mut CodegenState,
) {
    if let Some(id) = id {
        state.push(prefix);
        emit(tree, id, state);
    }
}

/// Structural emission with canonical formatting.
fn emit_canonical(tree: &SyntaxTree, id: NodeId, state: &mut CodegenState) {
    use NodeKind::*;

    match tree.kind(id) {
        Module { body } => {
            for stmt in body {
                emit(tree, *stmt, state);
                state.push("\n");
            }
        }
        Suite { .. } => emit_suite(tree, id, state),
        SimpleStatementLine { body } => emit_joined(tree, body, "; ", state),
        FunctionDef {
            name,
            params,
            returns,
            body,
            decorators,
            is_async,
            ..
        } => {
            for dec in decorators {
                state.push("@");
                emit(tree, *dec, state);
                state.push("\n");
                let indent = state.indent_str();
                state.push(&indent);
            }
            if *is_async {
                state.push("async ");
            }
            state.push("def ");
            state.push(name);
            state.push("(");
            emit_joined(tree, params, ", ", state);
            state.push(")");
            emit_opt_prefixed(tree, " -> ", *returns, state);
            state.push(":");
            emit_suite(tree, *body, state);
        }
        ClassDef {
            name,
            bases,
            body,
            decorators,
            ..
        } => {
            for dec in decorators {
                state.push("@");
                emit(tree, *dec, state);
                state.push("\n");
                let indent = state.indent_str();
                state.push(&indent);
            }
            state.push("class ");
            state.push(name);
            if !bases.is_empty() {
                state.push("(");
                emit_joined(tree, bases, ", ", state);
                state.push(")");
            }
            state.push(":");
            emit_suite(tree, *body, state);
        }
        If {
            test,
            body,
            orelse,
            is_elif,
        } => {
            state.push(if *is_elif { "elif " } else { "if " });
            emit(tree, *test, state);
            state.push(":");
            emit_suite(tree, *body, state);
            if let Some(orelse) = orelse {
                if matches!(tree.kind(*orelse), If { .. }) {
                    state.push("\n");
                    let indent = state.indent_str();
                    state.push(&indent);
                    emit(tree, *orelse, state);
                } else {
                    emit_labeled_suite(tree, "else", *orelse, state);
                }
            }
        }
        While { test, body, orelse } => {
            state.push("while ");
            emit(tree, *test, state);
            state.push(":");
            emit_suite(tree, *body, state);
            if let Some(orelse) = orelse {
                emit_labeled_suite(tree, "else", *orelse, state);
            }
        }
        For {
            target,
            iter,
            body,
            orelse,
            is_async,
        } => {
            if *is_async {
                state.push("async ");
            }
            state.push("for ");
            emit(tree, *target, state);
            state.push(" in ");
            emit(tree, *iter, state);
            state.push(":");
            emit_suite(tree, *body, state);
            if let Some(orelse) = orelse {
                emit_labeled_suite(tree, "else", *orelse, state);
            }
        }
        With {
            items,
            body,
            is_async,
        } => {
            if *is_async {
                state.push("async ");
            }
            state.push("with ");
            emit_joined(tree, items, ", ", state);
            state.push(":");
            emit_suite(tree, *body, state);
        }
        WithItem { context, alias } => {
            emit(tree, *context, state);
            emit_opt_prefixed(tree, " as ", *alias, state);
        }
        Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            state.push("try:");
            emit_suite(tree, *body, state);
            for handler in handlers {
                state.push("\n");
                let indent = state.indent_str();
                state.push(&indent);
                emit(tree, *handler, state);
            }
            if let Some(orelse) = orelse {
                emit_labeled_suite(tree, "else", *orelse, state);
            }
            if let Some(finalbody) = finalbody {
                emit_labeled_suite(tree, "finally", *finalbody, state);
            }
        }
        ExceptHandler { kind, name, body } => {
            state.push("except");
            emit_opt_prefixed(tree, " ", *kind, state);
            if let Some(name) = name {
                state.push(" as ");
                state.push(name);
            }
            state.push(":");
            emit_suite(tree, *body, state);
        }
        ExprStmt { value } => emit(tree, *value, state),
        Assign { targets, value } => {
            for target in targets {
                emit(tree, *target, state);
                state.push(" = ");
            }
            emit(tree, *value, state);
        }
        AugAssign { target, op, value } => {
            emit(tree, *target, state);
            state.push(" ");
            state.push(op);
            state.push(" ");
            emit(tree, *value, state);
        }
        AnnAssign {
            target,
            annotation,
            value,
        } => {
            emit(tree, *target, state);
            state.push(": ");
            emit(tree, *annotation, state);
            emit_opt_prefixed(tree, " = ", *value, state);
        }
        Return { value } => {
            state.push("return");
            emit_opt_prefixed(tree, " ", *value, state);
        }
        Raise { exc, cause } => {
            state.push("raise");
            emit_opt_prefixed(tree, " ", *exc, state);
            emit_opt_prefixed(tree, " from ", *cause, state);
        }
        Assert { test, msg } => {
            state.push("assert ");
            emit(tree, *test, state);
            emit_opt_prefixed(tree, ", ", *msg, state);
        }
        Del { targets } => {
            state.push("del ");
            emit_joined(tree, targets, ", ", state);
        }
        Global { names } => {
            state.push("global ");
            state.push(&names.join(", "));
        }
        Nonlocal { names } => {
            state.push("nonlocal ");
            state.push(&names.join(", "));
        }
        Import { names } => {
            state.push("import ");
            emit_import_aliases(names, state);
        }
        ImportFrom {
            module,
            names,
            star,
        } => {
            state.push("from ");
            state.push(module);
            state.push(" import ");
            if *star {
                state.push("*");
            } else {
                emit_import_aliases(names, state);
            }
        }
        Pass => state.push("pass"),
        Break => state.push("break"),
        Continue => state.push("continue"),
        Name { id } => state.push(id),
        Attribute { value, attr } => {
            emit(tree, *value, state);
            state.push(".");
            state.push(attr);
        }
        Call {
            func,
            args,
            args_span,
        } => {
            emit(tree, *func, state);
            // Re-emit the original argument list verbatim when none of
            // the arguments were replaced.
            if let Some(asp) = args_span {
                if subtree_clean(tree, args) {
                    state.push(asp.slice(tree.source()));
                    return;
                }
            }
            state.push("(");
            emit_joined(tree, args, ", ", state);
            state.push(")");
        }
        Arg { value, name, star } => {
            match star {
                ArgStar::Star => state.push("*"),
                ArgStar::DoubleStar => state.push("**"),
                ArgStar::None => {}
            }
            if let Some(name) = name {
                state.push(name);
                state.push("=");
            }
            emit(tree, *value, state);
        }
        Subscript { value, index } => {
            emit(tree, *value, state);
            state.push("[");
            emit(tree, *index, state);
            state.push("]");
        }
        Slice { lower, upper, step } => {
            if let Some(lower) = lower {
                emit(tree, *lower, state);
            }
            state.push(":");
            if let Some(upper) = upper {
                emit(tree, *upper, state);
            }
            emit_opt_prefixed(tree, ":", *step, state);
        }
        Starred { value } => {
            state.push("*");
            emit(tree, *value, state);
        }
        BinaryOperation { left, op, right } | BooleanOperation { left, op, right } => {
            emit(tree, *left, state);
            state.push(" ");
            state.push(op);
            state.push(" ");
            emit(tree, *right, state);
        }
        UnaryOperation { op, operand } => {
            state.push(op);
            if op == "not" {
                state.push(" ");
            }
            emit(tree, *operand, state);
        }
        Comparison {
            left,
            ops,
            comparators,
        } => {
            emit(tree, *left, state);
            for (op, comparator) in ops.iter().zip(comparators) {
                state.push(" ");
                state.push(op);
                state.push(" ");
                emit(tree, *comparator, state);
            }
        }
        IfExp { body, test, orelse } => {
            emit(tree, *body, state);
            state.push(" if ");
            emit(tree, *test, state);
            state.push(" else ");
            emit(tree, *orelse, state);
        }
        Lambda { params, body } => {
            state.push("lambda");
            if !params.is_empty() {
                state.push(" ");
                emit_joined(tree, params, ", ", state);
            }
            state.push(": ");
            emit(tree, *body, state);
        }
        Param {
            name,
            annotation,
            default,
            star,
        } => {
            match star {
                ArgStar::Star => state.push("*"),
                ArgStar::DoubleStar => state.push("**"),
                ArgStar::None => {}
            }
            state.push(name);
            emit_opt_prefixed(tree, ": ", *annotation, state);
            if annotation.is_some() {
                emit_opt_prefixed(tree, " = ", *default, state);
            } else {
                emit_opt_prefixed(tree, "=", *default, state);
            }
        }
        Tuple {
            elements,
            parenthesized,
        } => {
            if *parenthesized {
                state.push("(");
            }
            emit_joined(tree, elements, ", ", state);
            if elements.len() == 1 {
                state.push(",");
            }
            if *parenthesized {
                state.push(")");
            }
        }
        List { elements } => {
            state.push("[");
            emit_joined(tree, elements, ", ", state);
            state.push("]");
        }
        Set { elements } => {
            state.push("{");
            emit_joined(tree, elements, ", ", state);
            state.push("}");
        }
        Dict { entries } => {
            state.push("{");
            emit_joined(tree, entries, ", ", state);
            state.push("}");
        }
        DictEntry { key, value } => {
            if let Some(key) = key {
                emit(tree, *key, state);
                state.push(": ");
                emit(tree, *value, state);
            } else {
                state.push("**");
                emit(tree, *value, state);
            }
        }
        Comprehension {
            kind,
            element,
            value,
            generators,
        } => {
            let (open, close) = match kind {
                ComprehensionKind::List => ("[", "]"),
                ComprehensionKind::Set | ComprehensionKind::Dict => ("{", "}"),
                ComprehensionKind::Generator => ("(", ")"),
            };
            state.push(open);
            emit(tree, *element, state);
            emit_opt_prefixed(tree, ": ", *value, state);
            for generator in generators {
                state.push(" ");
                emit(tree, *generator, state);
            }
            state.push(close);
        }
        CompFor {
            target,
            iter,
            ifs,
            is_async,
        } => {
            if *is_async {
                state.push("async ");
            }
            state.push("for ");
            emit(tree, *target, state);
            state.push(" in ");
            emit(tree, *iter, state);
            for cond in ifs {
                state.push(" if ");
                emit(tree, *cond, state);
            }
        }
        Await { value } => {
            state.push("await ");
            emit(tree, *value, state);
        }
        Yield { value, from } => {
            state.push("yield");
            if *from {
                emit_opt_prefixed(tree, " from ", *value, state);
            } else {
                emit_opt_prefixed(tree, " ", *value, state);
            }
        }
        Integer { raw } | Float { raw } | Str { raw } => state.push(raw),
        Ellipsis => state.push("..."),
    }
}

/// Whether every node in the subtrees rooted at `ids` is clean.
fn subtree_clean(tree: &SyntaxTree, ids: &[NodeId]) -> bool {
    let mut stack: Vec<NodeId> = ids.to_vec();
    while let Some(id) = stack.pop() {
        if tree.node(id).dirty {
            return false;
        }
        stack.extend(tree.children(id));
    }
    true
}

fn emit_import_aliases(names: &[crate::nodes::ImportAlias], state: &mut CodegenState) {
    for (i, alias) in names.iter().enumerate() {
        if i > 0 {
            state.push(", ");
        }
        state.push(&alias.name);
        if let Some(as_name) = &alias.alias {
            state.push(" as ");
            state.push(as_name);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn roundtrip(src: &str) {
        let tree = parse_module(src).unwrap_or_else(|e| panic!("'{}': {}", src, e));
        assert_eq!(tree.to_source(), src);
    }

    #[test]
    fn clean_tree_roundtrips_verbatim() {
        roundtrip("x = 1\n");
        roundtrip("def f(a, b=2):  # comment\n    return a + b\n\n\nf(1)\n");
        roundtrip("if x:\n\n    # leading comment\n    pass\nelse:\n    pass\n");
    }

    #[test]
    fn canonical_expression_emission() {
        // Build `logging.info(x)` by hand without spans and emit it.
        let mut tree = crate::nodes::SyntaxTree::with_source("");
        let logging = tree.add(
            NodeKind::Name {
                id: "logging".into(),
            },
            None,
        );
        let attr = tree.add(
            NodeKind::Attribute {
                value: logging,
                attr: "info".into(),
            },
            None,
        );
        let x = tree.add(NodeKind::Name { id: "x".into() }, None);
        let arg = tree.add(
            NodeKind::Arg {
                value: x,
                name: None,
                star: ArgStar::None,
            },
            None,
        );
        let call = tree.add(
            NodeKind::Call {
                func: attr,
                args: vec![arg],
                args_span: None,
            },
            None,
        );
        let mut state = CodegenState::default();
        emit(&tree, call, &mut state);
        assert_eq!(state.into_string(), "logging.info(x)");
    }

    #[test]
    fn canonical_statement_emission() {
        let mut tree = crate::nodes::SyntaxTree::with_source("");
        let pass = tree.add(NodeKind::Pass, None);
        let suite = tree.add(
            NodeKind::Suite {
                body: vec![pass],
                is_block: true,
            },
            None,
        );
        let test = tree.add(NodeKind::Name { id: "x".into() }, None);
        let if_node = tree.add(
            NodeKind::If {
                test,
                body: suite,
                orelse: None,
                is_elif: false,
            },
            None,
        );
        let mut state = CodegenState::default();
        emit(&tree, if_node, &mut state);
        assert_eq!(state.into_string(), "if x:\n    pass");
    }

    #[test]
    fn canonical_function_def() {
        let mut tree = crate::nodes::SyntaxTree::with_source("");
        let a = tree.add(
            NodeKind::Param {
                name: "a".into(),
                annotation: None,
                default: None,
                star: ArgStar::None,
            },
            None,
        );
        let ret = tree.add(NodeKind::Return { value: None }, None);
        let line = tree.add(NodeKind::SimpleStatementLine { body: vec![ret] }, None);
        let suite = tree.add(
            NodeKind::Suite {
                body: vec![line],
                is_block: true,
            },
            None,
        );
        let def = tree.add(
            NodeKind::FunctionDef {
                name: "f".into(),
                name_span: codeshift_core::span::Span::new(0, 0),
                params: vec![a],
                returns: None,
                body: suite,
                decorators: vec![],
                is_async: false,
            },
            None,
        );
        let mut state = CodegenState::default();
        emit(&tree, def, &mut state);
        assert_eq!(state.into_string(), "def f(a):\n    return");
    }
}
