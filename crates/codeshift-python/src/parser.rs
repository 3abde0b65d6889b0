//! Recursive-descent parser producing an arena [`SyntaxTree`].
//!
//! The parser consumes the token stream from [`crate::tokenizer`] and
//! builds nodes bottom-up, so children always exist before their parent.
//! Every parsed node records the byte span it came from; code
//! regeneration relies on those spans to re-emit untouched regions
//! verbatim.
//!
//! The accepted grammar is the Python subset needed for statement- and
//! expression-level transformation: definitions, control flow, imports,
//! assignments, and the full expression precedence chain including calls,
//! attributes, subscripts, comprehensions, and literals.

use codeshift_core::span::Span;
use thiserror::Error;

use crate::nodes::{ArgStar, ComprehensionKind, ImportAlias, NodeId, NodeKind, SyntaxTree};
use crate::tokenizer::{tokenize, TokError, TokType, Token};

/// Errors produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("tokenizer error: {0}")]
    Tokenize(#[from] TokError),
    #[error("parser error: expected {expected}, found {found} at line {line}, column {col}")]
    Syntax {
        expected: String,
        found: String,
        line: u32,
        col: u32,
        span: Span,
    },
}

impl ParserError {
    /// Best-effort position of the error.
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            ParserError::Tokenize(e) => e.position(),
            ParserError::Syntax { line, col, .. } => Some((*line, *col)),
        }
    }

    /// Byte span of the offending token, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            ParserError::Tokenize(_) => None,
            ParserError::Syntax { span, .. } => Some(*span),
        }
    }
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Parse Python source into a [`SyntaxTree`].
pub fn parse_module(source: &str) -> Result<SyntaxTree> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).parse_module()
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Keywords that can begin an expression.
const EXPR_KEYWORDS: &[&str] = &["False", "None", "True", "await", "lambda", "not", "yield"];

const AUG_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "//=", "%=", "**=", ">>=", "<<=", "&=", "|=", "^=", "@=",
];

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

struct Parser<'a> {
    toks: Vec<Token<'a>>,
    pos: usize,
    tree: SyntaxTree,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, toks: Vec<Token<'a>>) -> Self {
        debug_assert!(matches!(
            toks.last().map(|t| t.kind),
            Some(TokType::EndMarker)
        ));
        Parser {
            toks,
            pos: 0,
            tree: SyntaxTree::with_source(source),
        }
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn cur(&self) -> Token<'a> {
        self.toks[self.pos.min(self.toks.len() - 1)]
    }

    fn kind(&self) -> TokType {
        self.cur().kind
    }

    fn text(&self) -> &'a str {
        self.cur().text
    }

    fn next_tok(&self) -> Token<'a> {
        self.toks[(self.pos + 1).min(self.toks.len() - 1)]
    }

    fn bump(&mut self) -> Token<'a> {
        let tok = self.cur();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn prev_end(&self) -> u64 {
        self.toks[self.pos.saturating_sub(1)].span.end
    }

    fn at_op(&self, s: &str) -> bool {
        self.kind() == TokType::Op && self.text() == s
    }

    fn at_name(&self, s: &str) -> bool {
        self.kind() == TokType::Name && self.text() == s
    }

    fn eat_op(&mut self, s: &str) -> bool {
        if self.at_op(s) {
            self.bump();
            return true;
        }
        false
    }

    fn eat_name(&mut self, s: &str) -> bool {
        if self.at_name(s) {
            self.bump();
            return true;
        }
        false
    }

    fn expect_op(&mut self, s: &str) -> Result<Token<'a>> {
        if self.at_op(s) {
            return Ok(self.bump());
        }
        Err(self.err(&format!("'{}'", s)))
    }

    fn expect_name(&mut self, s: &str) -> Result<Token<'a>> {
        if self.at_name(s) {
            return Ok(self.bump());
        }
        Err(self.err(&format!("'{}'", s)))
    }

    fn expect_newline(&mut self) -> Result<()> {
        match self.kind() {
            TokType::Newline => {
                self.bump();
                Ok(())
            }
            TokType::EndMarker => Ok(()),
            _ => Err(self.err("end of line")),
        }
    }

    /// Expect a non-keyword identifier; returns its text and span.
    fn expect_ident(&mut self) -> Result<(String, Span)> {
        if self.kind() == TokType::Name && !is_keyword(self.text()) {
            let tok = self.bump();
            return Ok((tok.text.to_string(), tok.span));
        }
        Err(self.err("an identifier"))
    }

    fn err(&self, expected: &str) -> ParserError {
        let tok = self.cur();
        let found = match tok.kind {
            TokType::Name | TokType::Number | TokType::String | TokType::Op => {
                format!("'{}'", tok.text)
            }
            TokType::Newline => "end of line".to_string(),
            TokType::Indent => "indent".to_string(),
            TokType::Dedent => "dedent".to_string(),
            TokType::EndMarker => "end of file".to_string(),
        };
        ParserError::Syntax {
            expected: expected.to_string(),
            found,
            line: tok.line,
            col: tok.col,
            span: tok.span,
        }
    }

    // ------------------------------------------------------------------
    // Tree helpers
    // ------------------------------------------------------------------

    fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.tree.add(kind, Some(span))
    }

    fn end_of(&self, id: NodeId) -> u64 {
        // Parser-built nodes always carry a span.
        self.tree.node(id).span.map(|s| s.end).unwrap_or(0)
    }

    /// True when the current token can begin an expression.
    fn can_start_expr(&self) -> bool {
        match self.kind() {
            TokType::Name => {
                !is_keyword(self.text()) || EXPR_KEYWORDS.contains(&self.text())
            }
            TokType::Number | TokType::String => true,
            TokType::Op => matches!(
                self.text(),
                "(" | "[" | "{" | "-" | "+" | "~" | "*" | "**" | "..."
            ),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Module and statements
    // ------------------------------------------------------------------

    fn parse_module(mut self) -> Result<SyntaxTree> {
        let len = self.tree.source().len() as u64;
        let mut body = Vec::new();
        while self.kind() != TokType::EndMarker {
            if self.kind() == TokType::Newline {
                self.bump();
                continue;
            }
            body.push(self.parse_statement()?);
        }
        let module = self.add(NodeKind::Module { body }, Span::new(0, len));
        self.tree.set_root(module);
        self.tree.link_parents();
        Ok(self.tree)
    }

    fn parse_statement(&mut self) -> Result<NodeId> {
        if self.at_op("@") {
            return self.parse_decorated();
        }
        if self.kind() == TokType::Name {
            match self.text() {
                "def" => return self.parse_function_def(Vec::new(), None, false),
                "class" => return self.parse_class_def(Vec::new(), None),
                "if" => return self.parse_if("if", false),
                "while" => return self.parse_while(),
                "for" => return self.parse_for(None),
                "try" => return self.parse_try(),
                "with" => return self.parse_with(None),
                "async" => {
                    let start = self.cur().span.start;
                    self.bump();
                    if self.at_name("def") {
                        return self.parse_function_def(Vec::new(), Some(start), true);
                    }
                    if self.at_name("for") {
                        return self.parse_for(Some(start));
                    }
                    if self.at_name("with") {
                        return self.parse_with(Some(start));
                    }
                    return Err(self.err("'def', 'for', or 'with' after 'async'"));
                }
                _ => {}
            }
        }
        self.parse_simple_statement_line()
    }

    fn parse_decorated(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let mut decorators = Vec::new();
        while self.eat_op("@") {
            decorators.push(self.parse_test()?);
            self.expect_newline()?;
        }
        let is_async = if self.at_name("async") {
            self.bump();
            true
        } else {
            false
        };
        if self.at_name("def") {
            self.parse_function_def(decorators, Some(start), is_async)
        } else if !is_async && self.at_name("class") {
            self.parse_class_def(decorators, Some(start))
        } else {
            Err(self.err("'def' or 'class' after decorators"))
        }
    }

    fn parse_function_def(
        &mut self,
        decorators: Vec<NodeId>,
        start_override: Option<u64>,
        is_async: bool,
    ) -> Result<NodeId> {
        let start = start_override.unwrap_or_else(|| self.cur().span.start);
        self.expect_name("def")?;
        let (name, name_span) = self.expect_ident()?;
        self.expect_op("(")?;
        let params = self.parse_params(")", true)?;
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(self.parse_test()?)
        } else {
            None
        };
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let end = self.end_of(body);
        Ok(self.add(
            NodeKind::FunctionDef {
                name,
                name_span,
                params,
                returns,
                body,
                decorators,
                is_async,
            },
            Span::new(start, end),
        ))
    }

    fn parse_class_def(
        &mut self,
        decorators: Vec<NodeId>,
        start_override: Option<u64>,
    ) -> Result<NodeId> {
        let start = start_override.unwrap_or_else(|| self.cur().span.start);
        self.expect_name("class")?;
        let (name, name_span) = self.expect_ident()?;
        let mut bases = Vec::new();
        if self.eat_op("(") {
            bases = self.parse_call_args(")")?;
            self.expect_op(")")?;
        }
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let end = self.end_of(body);
        Ok(self.add(
            NodeKind::ClassDef {
                name,
                name_span,
                bases,
                body,
                decorators,
            },
            Span::new(start, end),
        ))
    }

    fn parse_if(&mut self, kw: &str, is_elif: bool) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_name(kw)?;
        let test = self.parse_test()?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let orelse = if self.at_name("elif") {
            Some(self.parse_if("elif", true)?)
        } else if self.eat_name("else") {
            self.expect_op(":")?;
            Some(self.parse_suite()?)
        } else {
            None
        };
        let end = orelse.map(|o| self.end_of(o)).unwrap_or(self.end_of(body));
        Ok(self.add(
            NodeKind::If {
                test,
                body,
                orelse,
                is_elif,
            },
            Span::new(start, end),
        ))
    }

    fn parse_while(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_name("while")?;
        let test = self.parse_test()?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let orelse = self.parse_loop_else()?;
        let end = orelse.map(|o| self.end_of(o)).unwrap_or(self.end_of(body));
        Ok(self.add(
            NodeKind::While { test, body, orelse },
            Span::new(start, end),
        ))
    }

    fn parse_for(&mut self, async_start: Option<u64>) -> Result<NodeId> {
        let start = async_start.unwrap_or_else(|| self.cur().span.start);
        self.expect_name("for")?;
        let target = self.parse_target_list()?;
        self.expect_name("in")?;
        let iter = self.parse_testlist()?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let orelse = self.parse_loop_else()?;
        let end = orelse.map(|o| self.end_of(o)).unwrap_or(self.end_of(body));
        Ok(self.add(
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
                is_async: async_start.is_some(),
            },
            Span::new(start, end),
        ))
    }

    fn parse_loop_else(&mut self) -> Result<Option<NodeId>> {
        if self.eat_name("else") {
            self.expect_op(":")?;
            return Ok(Some(self.parse_suite()?));
        }
        Ok(None)
    }

    fn parse_with(&mut self, async_start: Option<u64>) -> Result<NodeId> {
        let start = async_start.unwrap_or_else(|| self.cur().span.start);
        self.expect_name("with")?;
        let mut items = Vec::new();
        loop {
            let item_start = self.cur().span.start;
            let context = self.parse_test()?;
            let alias = if self.eat_name("as") {
                Some(self.parse_target()?)
            } else {
                None
            };
            let item_end = alias
                .map(|a| self.end_of(a))
                .unwrap_or(self.end_of(context));
            items.push(self.add(
                NodeKind::WithItem { context, alias },
                Span::new(item_start, item_end),
            ));
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let end = self.end_of(body);
        Ok(self.add(
            NodeKind::With {
                items,
                body,
                is_async: async_start.is_some(),
            },
            Span::new(start, end),
        ))
    }

    fn parse_try(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_name("try")?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while self.at_name("except") {
            let h_start = self.cur().span.start;
            self.bump();
            let kind = if self.at_op(":") {
                None
            } else {
                Some(self.parse_test()?)
            };
            let name = if self.eat_name("as") {
                Some(self.expect_ident()?.0)
            } else {
                None
            };
            self.expect_op(":")?;
            let h_body = self.parse_suite()?;
            let h_end = self.end_of(h_body);
            handlers.push(self.add(
                NodeKind::ExceptHandler {
                    kind,
                    name,
                    body: h_body,
                },
                Span::new(h_start, h_end),
            ));
        }
        let orelse = if self.eat_name("else") {
            self.expect_op(":")?;
            Some(self.parse_suite()?)
        } else {
            None
        };
        let finalbody = if self.eat_name("finally") {
            self.expect_op(":")?;
            Some(self.parse_suite()?)
        } else {
            None
        };
        if handlers.is_empty() && finalbody.is_none() {
            return Err(self.err("'except' or 'finally' after try block"));
        }
        let end = finalbody
            .or(orelse)
            .or(handlers.last().copied())
            .map(|n| self.end_of(n))
            .unwrap_or(self.end_of(body));
        Ok(self.add(
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            Span::new(start, end),
        ))
    }

    /// Parse the suite after a `:` — either an inline simple-statement
    /// list or an indented block.
    fn parse_suite(&mut self) -> Result<NodeId> {
        if self.kind() == TokType::Newline {
            self.bump();
            if self.kind() != TokType::Indent {
                return Err(self.err("an indented block"));
            }
            self.bump();
            let mut body = Vec::new();
            while self.kind() != TokType::Dedent {
                if self.kind() == TokType::EndMarker {
                    break;
                }
                body.push(self.parse_statement()?);
            }
            if self.kind() == TokType::Dedent {
                self.bump();
            }
            if body.is_empty() {
                return Err(self.err("a statement"));
            }
            let span = self.span_over(&body);
            Ok(self.tree.add(
                NodeKind::Suite {
                    body,
                    is_block: true,
                },
                Some(span),
            ))
        } else {
            let body = self.parse_small_list()?;
            self.expect_newline()?;
            let span = self.span_over(&body);
            Ok(self.tree.add(
                NodeKind::Suite {
                    body,
                    is_block: false,
                },
                Some(span),
            ))
        }
    }

    /// Covering span of a non-empty id list.
    fn span_over(&self, ids: &[NodeId]) -> Span {
        let first = self.tree.node(ids[0]).span.unwrap_or(Span::new(0, 0));
        ids.iter()
            .filter_map(|id| self.tree.node(*id).span)
            .fold(first, Span::cover)
    }

    fn parse_simple_statement_line(&mut self) -> Result<NodeId> {
        let body = self.parse_small_list()?;
        self.expect_newline()?;
        let span = self.span_over(&body);
        Ok(self.tree.add(
            NodeKind::SimpleStatementLine { body },
            Some(span),
        ))
    }

    /// `small_stmt (';' small_stmt)* [';']`
    fn parse_small_list(&mut self) -> Result<Vec<NodeId>> {
        let mut body = vec![self.parse_small_statement()?];
        while self.eat_op(";") {
            if matches!(self.kind(), TokType::Newline | TokType::EndMarker) {
                break;
            }
            body.push(self.parse_small_statement()?);
        }
        Ok(body)
    }

    fn parse_small_statement(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        if self.kind() == TokType::Name {
            match self.text() {
                "pass" => {
                    self.bump();
                    return Ok(self.add(NodeKind::Pass, Span::new(start, self.prev_end())));
                }
                "break" => {
                    self.bump();
                    return Ok(self.add(NodeKind::Break, Span::new(start, self.prev_end())));
                }
                "continue" => {
                    self.bump();
                    return Ok(self.add(NodeKind::Continue, Span::new(start, self.prev_end())));
                }
                "return" => {
                    self.bump();
                    let value = if self.can_start_expr() {
                        Some(self.parse_testlist()?)
                    } else {
                        None
                    };
                    return Ok(self.add(
                        NodeKind::Return { value },
                        Span::new(start, self.prev_end()),
                    ));
                }
                "raise" => {
                    self.bump();
                    let exc = if self.can_start_expr() {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    let cause = if exc.is_some() && self.eat_name("from") {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    return Ok(self.add(
                        NodeKind::Raise { exc, cause },
                        Span::new(start, self.prev_end()),
                    ));
                }
                "assert" => {
                    self.bump();
                    let test = self.parse_test()?;
                    let msg = if self.eat_op(",") {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    return Ok(self.add(
                        NodeKind::Assert { test, msg },
                        Span::new(start, self.prev_end()),
                    ));
                }
                "del" => {
                    self.bump();
                    let mut targets = vec![self.parse_target()?];
                    while self.eat_op(",") {
                        targets.push(self.parse_target()?);
                    }
                    return Ok(self.add(
                        NodeKind::Del { targets },
                        Span::new(start, self.prev_end()),
                    ));
                }
                "global" | "nonlocal" => {
                    let is_global = self.text() == "global";
                    self.bump();
                    let mut names = vec![self.expect_ident()?.0];
                    while self.eat_op(",") {
                        names.push(self.expect_ident()?.0);
                    }
                    let kind = if is_global {
                        NodeKind::Global { names }
                    } else {
                        NodeKind::Nonlocal { names }
                    };
                    return Ok(self.add(kind, Span::new(start, self.prev_end())));
                }
                "import" => return self.parse_import(start),
                "from" => return self.parse_import_from(start),
                _ => {}
            }
        }
        self.parse_expr_statement(start)
    }

    fn parse_import(&mut self, start: u64) -> Result<NodeId> {
        self.expect_name("import")?;
        let mut names = Vec::new();
        loop {
            let name = self.parse_dotted_name()?;
            let alias = if self.eat_name("as") {
                Some(self.expect_ident()?.0)
            } else {
                None
            };
            names.push(ImportAlias { name, alias });
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(self.add(
            NodeKind::Import { names },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_import_from(&mut self, start: u64) -> Result<NodeId> {
        self.expect_name("from")?;
        let mut module = String::new();
        loop {
            if self.at_op(".") {
                self.bump();
                module.push('.');
            } else if self.at_op("...") {
                self.bump();
                module.push_str("...");
            } else {
                break;
            }
        }
        if self.kind() == TokType::Name && !is_keyword(self.text()) {
            module.push_str(&self.parse_dotted_name()?);
        } else if module.is_empty() {
            return Err(self.err("a module name"));
        }
        self.expect_name("import")?;
        if self.eat_op("*") {
            return Ok(self.add(
                NodeKind::ImportFrom {
                    module,
                    names: Vec::new(),
                    star: true,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        let parenthesized = self.eat_op("(");
        let mut names = Vec::new();
        loop {
            let (name, _) = self.expect_ident()?;
            let alias = if self.eat_name("as") {
                Some(self.expect_ident()?.0)
            } else {
                None
            };
            names.push(ImportAlias { name, alias });
            if !self.eat_op(",") {
                break;
            }
            if parenthesized && self.at_op(")") {
                break;
            }
        }
        if parenthesized {
            self.expect_op(")")?;
        }
        Ok(self.add(
            NodeKind::ImportFrom {
                module,
                names,
                star: false,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_dotted_name(&mut self) -> Result<String> {
        let mut name = self.expect_ident()?.0;
        while self.at_op(".") {
            self.bump();
            name.push('.');
            name.push_str(&self.expect_ident()?.0);
        }
        Ok(name)
    }

    /// Expression statement, assignment, augmented assignment, or
    /// annotated assignment.
    fn parse_expr_statement(&mut self, start: u64) -> Result<NodeId> {
        let first = self.parse_testlist()?;

        if self.at_op(":") {
            self.bump();
            let annotation = self.parse_test()?;
            let value = if self.eat_op("=") {
                Some(self.parse_testlist()?)
            } else {
                None
            };
            return Ok(self.add(
                NodeKind::AnnAssign {
                    target: first,
                    annotation,
                    value,
                },
                Span::new(start, self.prev_end()),
            ));
        }

        if self.kind() == TokType::Op && AUG_OPS.contains(&self.text()) {
            let op = self.bump().text.to_string();
            let value = self.parse_testlist()?;
            return Ok(self.add(
                NodeKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
                Span::new(start, self.prev_end()),
            ));
        }

        if self.at_op("=") {
            let mut chain = vec![first];
            while self.eat_op("=") {
                chain.push(self.parse_testlist()?);
            }
            let value = chain.pop().unwrap_or(first);
            return Ok(self.add(
                NodeKind::Assign {
                    targets: chain,
                    value,
                },
                Span::new(start, self.prev_end()),
            ));
        }

        Ok(self.add(
            NodeKind::ExprStmt { value: first },
            Span::new(start, self.prev_end()),
        ))
    }

    // ------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------

    /// Assignment/loop target list: `target (',' target)* [',']`.
    fn parse_target_list(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let first = self.parse_target()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if !self.can_start_expr() {
                break;
            }
            elements.push(self.parse_target()?);
        }
        Ok(self.add(
            NodeKind::Tuple {
                elements,
                parenthesized: false,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    /// A single target: name, attribute, subscript, starred target, or a
    /// parenthesized/bracketed target list.
    fn parse_target(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        if self.eat_op("*") {
            let value = self.parse_target()?;
            return Ok(self.add(
                NodeKind::Starred { value },
                Span::new(start, self.prev_end()),
            ));
        }
        if self.eat_op("(") {
            let inner = self.parse_target_list()?;
            self.expect_op(")")?;
            return Ok(inner);
        }
        if self.eat_op("[") {
            let mut elements = Vec::new();
            while !self.at_op("]") {
                elements.push(self.parse_target()?);
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op("]")?;
            return Ok(self.add(
                NodeKind::List { elements },
                Span::new(start, self.prev_end()),
            ));
        }
        self.parse_atom_trailers()
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// `test (',' test)* [',']` — a tuple when a comma appears.
    fn parse_testlist(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let first = self.parse_test_or_star()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if !self.can_start_expr() {
                break;
            }
            elements.push(self.parse_test_or_star()?);
        }
        Ok(self.add(
            NodeKind::Tuple {
                elements,
                parenthesized: false,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_test_or_star(&mut self) -> Result<NodeId> {
        if self.at_op("*") {
            let start = self.cur().span.start;
            self.bump();
            let value = self.parse_or()?;
            return Ok(self.add(
                NodeKind::Starred { value },
                Span::new(start, self.prev_end()),
            ));
        }
        self.parse_test()
    }

    /// Conditional expression or lambda.
    fn parse_test(&mut self) -> Result<NodeId> {
        if self.at_name("lambda") {
            return self.parse_lambda();
        }
        let start = self.cur().span.start;
        let body = self.parse_or()?;
        if self.at_name("if") {
            self.bump();
            let test = self.parse_or()?;
            self.expect_name("else")?;
            let orelse = self.parse_test()?;
            return Ok(self.add(
                NodeKind::IfExp { body, test, orelse },
                Span::new(start, self.prev_end()),
            ));
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_name("lambda")?;
        let params = self.parse_params(":", false)?;
        self.expect_op(":")?;
        let body = self.parse_test()?;
        Ok(self.add(
            NodeKind::Lambda { params, body },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_or(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let mut left = self.parse_and()?;
        while self.at_name("or") {
            self.bump();
            let right = self.parse_and()?;
            left = self.add(
                NodeKind::BooleanOperation {
                    left,
                    op: "or".to_string(),
                    right,
                },
                Span::new(start, self.prev_end()),
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let mut left = self.parse_not()?;
        while self.at_name("and") {
            self.bump();
            let right = self.parse_not()?;
            left = self.add(
                NodeKind::BooleanOperation {
                    left,
                    op: "and".to_string(),
                    right,
                },
                Span::new(start, self.prev_end()),
            );
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<NodeId> {
        if self.at_name("not") {
            let start = self.cur().span.start;
            self.bump();
            let operand = self.parse_not()?;
            return Ok(self.add(
                NodeKind::UnaryOperation {
                    op: "not".to_string(),
                    operand,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let left = self.parse_bit_or()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = if self.kind() == TokType::Op
                && matches!(self.text(), "<" | ">" | "<=" | ">=" | "==" | "!=")
            {
                self.bump().text.to_string()
            } else if self.at_name("in") {
                self.bump();
                "in".to_string()
            } else if self.at_name("not") && self.next_tok().text == "in" {
                self.bump();
                self.bump();
                "not in".to_string()
            } else if self.at_name("is") {
                self.bump();
                if self.eat_name("not") {
                    "is not".to_string()
                } else {
                    "is".to_string()
                }
            } else {
                break;
            };
            ops.push(op);
            comparators.push(self.parse_bit_or()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(self.add(
            NodeKind::Comparison {
                left,
                ops,
                comparators,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_bit_or(&mut self) -> Result<NodeId> {
        self.parse_binary_chain(&["|"], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self) -> Result<NodeId> {
        self.parse_binary_chain(&["^"], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self) -> Result<NodeId> {
        self.parse_binary_chain(&["&"], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<NodeId> {
        self.parse_binary_chain(&["<<", ">>"], Self::parse_arith)
    }

    fn parse_arith(&mut self) -> Result<NodeId> {
        self.parse_binary_chain(&["+", "-"], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<NodeId> {
        self.parse_binary_chain(&["*", "/", "//", "%", "@"], Self::parse_factor)
    }

    fn parse_binary_chain(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Result<NodeId>,
    ) -> Result<NodeId> {
        let start = self.cur().span.start;
        let mut left = next(self)?;
        while self.kind() == TokType::Op && ops.contains(&self.text()) {
            let op = self.bump().text.to_string();
            let right = next(self)?;
            left = self.add(
                NodeKind::BinaryOperation { left, op, right },
                Span::new(start, self.prev_end()),
            );
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        if self.kind() == TokType::Op && matches!(self.text(), "+" | "-" | "~") {
            let op = self.bump().text.to_string();
            let operand = self.parse_factor()?;
            return Ok(self.add(
                NodeKind::UnaryOperation { op, operand },
                Span::new(start, self.prev_end()),
            ));
        }
        if self.at_name("await") {
            self.bump();
            let value = self.parse_factor()?;
            return Ok(self.add(
                NodeKind::Await { value },
                Span::new(start, self.prev_end()),
            ));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let base = self.parse_atom_trailers()?;
        if self.at_op("**") {
            self.bump();
            let right = self.parse_factor()?;
            return Ok(self.add(
                NodeKind::BinaryOperation {
                    left: base,
                    op: "**".to_string(),
                    right,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        Ok(base)
    }

    /// Atom followed by call, subscript, and attribute trailers.
    fn parse_atom_trailers(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let mut expr = self.parse_atom()?;
        loop {
            if self.at_op("(") {
                let lpar = self.bump();
                let args = self.parse_call_args(")")?;
                let rpar = self.expect_op(")")?;
                expr = self.add(
                    NodeKind::Call {
                        func: expr,
                        args,
                        args_span: Some(Span::new(lpar.span.start, rpar.span.end)),
                    },
                    Span::new(start, self.prev_end()),
                );
            } else if self.at_op("[") {
                self.bump();
                let index = self.parse_subscript_index()?;
                self.expect_op("]")?;
                expr = self.add(
                    NodeKind::Subscript { value: expr, index },
                    Span::new(start, self.prev_end()),
                );
            } else if self.at_op(".") {
                self.bump();
                let (attr, _) = self.expect_ident()?;
                expr = self.add(
                    NodeKind::Attribute { value: expr, attr },
                    Span::new(start, self.prev_end()),
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// Call argument list, stopping before `terminator`.
    fn parse_call_args(&mut self, terminator: &str) -> Result<Vec<NodeId>> {
        let mut args = Vec::new();
        while !self.at_op(terminator) {
            let start = self.cur().span.start;
            let arg = if self.at_op("*") {
                self.bump();
                let value = self.parse_test()?;
                self.add(
                    NodeKind::Arg {
                        value,
                        name: None,
                        star: ArgStar::Star,
                    },
                    Span::new(start, self.prev_end()),
                )
            } else if self.at_op("**") {
                self.bump();
                let value = self.parse_test()?;
                self.add(
                    NodeKind::Arg {
                        value,
                        name: None,
                        star: ArgStar::DoubleStar,
                    },
                    Span::new(start, self.prev_end()),
                )
            } else if self.kind() == TokType::Name
                && !is_keyword(self.text())
                && self.next_tok().kind == TokType::Op
                && self.next_tok().text == "="
            {
                let (name, _) = self.expect_ident()?;
                self.expect_op("=")?;
                let value = self.parse_test()?;
                self.add(
                    NodeKind::Arg {
                        value,
                        name: Some(name),
                        star: ArgStar::None,
                    },
                    Span::new(start, self.prev_end()),
                )
            } else {
                let mut value = self.parse_test()?;
                if args.is_empty() && self.at_name("for") {
                    // Bare generator expression argument: f(x for x in y)
                    let generators = self.parse_comp_clauses()?;
                    value = self.add(
                        NodeKind::Comprehension {
                            kind: ComprehensionKind::Generator,
                            element: value,
                            value: None,
                            generators,
                        },
                        Span::new(start, self.prev_end()),
                    );
                }
                self.add(
                    NodeKind::Arg {
                        value,
                        name: None,
                        star: ArgStar::None,
                    },
                    Span::new(start, self.prev_end()),
                )
            };
            args.push(arg);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(args)
    }

    fn parse_subscript_index(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let first = self.parse_slice_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elements.push(self.parse_slice_item()?);
        }
        Ok(self.add(
            NodeKind::Tuple {
                elements,
                parenthesized: false,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_slice_item(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        let lower = if self.at_op(":") {
            None
        } else {
            Some(self.parse_test()?)
        };
        if !self.at_op(":") {
            return lower.ok_or_else(|| self.err("an expression or ':'"));
        }
        self.bump();
        let upper = if self.at_op(":") || self.at_op("]") || self.at_op(",") {
            None
        } else {
            Some(self.parse_test()?)
        };
        let step = if self.eat_op(":") {
            if self.at_op("]") || self.at_op(",") {
                None
            } else {
                Some(self.parse_test()?)
            }
        } else {
            None
        };
        Ok(self.add(
            NodeKind::Slice { lower, upper, step },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_atom(&mut self) -> Result<NodeId> {
        let tok = self.cur();
        let start = tok.span.start;
        match tok.kind {
            TokType::Name => {
                if self.at_name("yield") {
                    self.bump();
                    let from = self.eat_name("from");
                    let value = if from {
                        Some(self.parse_test()?)
                    } else if self.can_start_expr() {
                        Some(self.parse_testlist()?)
                    } else {
                        None
                    };
                    return Ok(self.add(
                        NodeKind::Yield { value, from },
                        Span::new(start, self.prev_end()),
                    ));
                }
                if is_keyword(tok.text) && !matches!(tok.text, "True" | "False" | "None") {
                    return Err(self.err("an expression"));
                }
                self.bump();
                Ok(self.add(
                    NodeKind::Name {
                        id: tok.text.to_string(),
                    },
                    tok.span,
                ))
            }
            TokType::Number => {
                self.bump();
                let raw = tok.text.to_string();
                let lower = raw.to_ascii_lowercase();
                let is_float = !lower.starts_with("0x")
                    && !lower.starts_with("0o")
                    && !lower.starts_with("0b")
                    && (lower.contains('.') || lower.contains('e') || lower.ends_with('j'));
                let kind = if is_float {
                    NodeKind::Float { raw }
                } else {
                    NodeKind::Integer { raw }
                };
                Ok(self.add(kind, tok.span))
            }
            TokType::String => {
                self.bump();
                let mut end = tok.span.end;
                while self.kind() == TokType::String {
                    end = self.cur().span.end;
                    self.bump();
                }
                let span = Span::new(start, end);
                let raw = span.slice(self.tree.source()).to_string();
                Ok(self.tree.add(NodeKind::Str { raw }, Some(span))
                    )
            }
            TokType::Op => match tok.text {
                "..." => {
                    self.bump();
                    Ok(self.add(NodeKind::Ellipsis, tok.span))
                }
                "(" => self.parse_paren_atom(),
                "[" => self.parse_list_atom(),
                "{" => self.parse_brace_atom(),
                _ => Err(self.err("an expression")),
            },
            _ => Err(self.err("an expression")),
        }
    }

    fn parse_paren_atom(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_op("(")?;
        if self.at_op(")") {
            self.bump();
            return Ok(self.add(
                NodeKind::Tuple {
                    elements: Vec::new(),
                    parenthesized: true,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        let first = self.parse_test_or_star()?;
        if self.at_name("for") {
            let generators = self.parse_comp_clauses()?;
            self.expect_op(")")?;
            return Ok(self.add(
                NodeKind::Comprehension {
                    kind: ComprehensionKind::Generator,
                    element: first,
                    value: None,
                    generators,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        if self.at_op(",") {
            let mut elements = vec![first];
            while self.eat_op(",") {
                if self.at_op(")") {
                    break;
                }
                elements.push(self.parse_test_or_star()?);
            }
            self.expect_op(")")?;
            return Ok(self.add(
                NodeKind::Tuple {
                    elements,
                    parenthesized: true,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        self.expect_op(")")?;
        // A plain parenthesized expression keeps its inner span; the
        // parentheses live in the surrounding text.
        Ok(first)
    }

    fn parse_list_atom(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_op("[")?;
        if self.at_op("]") {
            self.bump();
            return Ok(self.add(
                NodeKind::List {
                    elements: Vec::new(),
                },
                Span::new(start, self.prev_end()),
            ));
        }
        let first = self.parse_test_or_star()?;
        if self.at_name("for") {
            let generators = self.parse_comp_clauses()?;
            self.expect_op("]")?;
            return Ok(self.add(
                NodeKind::Comprehension {
                    kind: ComprehensionKind::List,
                    element: first,
                    value: None,
                    generators,
                },
                Span::new(start, self.prev_end()),
            ));
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elements.push(self.parse_test_or_star()?);
        }
        self.expect_op("]")?;
        Ok(self.add(
            NodeKind::List { elements },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_brace_atom(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        self.expect_op("{")?;
        if self.at_op("}") {
            self.bump();
            return Ok(self.add(
                NodeKind::Dict {
                    entries: Vec::new(),
                },
                Span::new(start, self.prev_end()),
            ));
        }

        if self.at_op("**") {
            // Dict with an unpacked first entry.
            let entries = vec![self.parse_dict_entry()?];
            return self.finish_dict(start, entries);
        }

        let first = self.parse_test_or_star()?;
        if self.at_op(":") {
            self.bump();
            let value = self.parse_test()?;
            if self.at_name("for") {
                let generators = self.parse_comp_clauses()?;
                self.expect_op("}")?;
                return Ok(self.add(
                    NodeKind::Comprehension {
                        kind: ComprehensionKind::Dict,
                        element: first,
                        value: Some(value),
                        generators,
                    },
                    Span::new(start, self.prev_end()),
                ));
            }
            let entry_span = Span::new(
                self.tree.node(first).span.map(|s| s.start).unwrap_or(start),
                self.prev_end(),
            );
            let entries = vec![self.tree.add(
                NodeKind::DictEntry {
                    key: Some(first),
                    value,
                },
                Some(entry_span),
            )];
            return self.finish_dict(start, entries);
        }

        if self.at_name("for") {
            let generators = self.parse_comp_clauses()?;
            self.expect_op("}")?;
            return Ok(self.add(
                NodeKind::Comprehension {
                    kind: ComprehensionKind::Set,
                    element: first,
                    value: None,
                    generators,
                },
                Span::new(start, self.prev_end()),
            ));
        }

        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            elements.push(self.parse_test_or_star()?);
        }
        self.expect_op("}")?;
        Ok(self.add(
            NodeKind::Set { elements },
            Span::new(start, self.prev_end()),
        ))
    }

    fn finish_dict(&mut self, start: u64, mut entries: Vec<NodeId>) -> Result<NodeId> {
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            entries.push(self.parse_dict_entry()?);
        }
        self.expect_op("}")?;
        Ok(self.add(
            NodeKind::Dict { entries },
            Span::new(start, self.prev_end()),
        ))
    }

    fn parse_dict_entry(&mut self) -> Result<NodeId> {
        let start = self.cur().span.start;
        if self.eat_op("**") {
            let value = self.parse_or()?;
            return Ok(self.add(
                NodeKind::DictEntry { key: None, value },
                Span::new(start, self.prev_end()),
            ));
        }
        let key = self.parse_test()?;
        self.expect_op(":")?;
        let value = self.parse_test()?;
        Ok(self.add(
            NodeKind::DictEntry {
                key: Some(key),
                value,
            },
            Span::new(start, self.prev_end()),
        ))
    }

    /// One or more `for ... in ... [if ...]` comprehension clauses.
    fn parse_comp_clauses(&mut self) -> Result<Vec<NodeId>> {
        let mut generators = Vec::new();
        loop {
            let start = self.cur().span.start;
            let is_async = if self.at_name("async") && self.next_tok().text == "for" {
                self.bump();
                true
            } else {
                false
            };
            if !self.at_name("for") {
                break;
            }
            self.bump();
            let target = self.parse_target_list()?;
            self.expect_name("in")?;
            let iter = self.parse_or()?;
            let mut ifs = Vec::new();
            while self.at_name("if") {
                self.bump();
                ifs.push(self.parse_or()?);
            }
            generators.push(self.add(
                NodeKind::CompFor {
                    target,
                    iter,
                    ifs,
                    is_async,
                },
                Span::new(start, self.prev_end()),
            ));
            if !self.at_name("for") && !(self.at_name("async") && self.next_tok().text == "for")
            {
                break;
            }
        }
        if generators.is_empty() {
            return Err(self.err("'for'"));
        }
        Ok(generators)
    }

    /// Parameter list for `def` (terminated by `)`) or `lambda`
    /// (terminated by `:`). Annotations are only legal in `def`.
    fn parse_params(&mut self, terminator: &str, allow_annotations: bool) -> Result<Vec<NodeId>> {
        let mut params = Vec::new();
        while !self.at_op(terminator) {
            let start = self.cur().span.start;
            let param = if self.at_op("*") {
                self.bump();
                if self.kind() == TokType::Name && !is_keyword(self.text()) {
                    let (name, _) = self.expect_ident()?;
                    let annotation = if allow_annotations && self.eat_op(":") {
                        Some(self.parse_test()?)
                    } else {
                        None
                    };
                    self.add(
                        NodeKind::Param {
                            name,
                            annotation,
                            default: None,
                            star: ArgStar::Star,
                        },
                        Span::new(start, self.prev_end()),
                    )
                } else {
                    // Bare `*`: keyword-only marker.
                    self.add(
                        NodeKind::Param {
                            name: String::new(),
                            annotation: None,
                            default: None,
                            star: ArgStar::Star,
                        },
                        Span::new(start, self.prev_end()),
                    )
                }
            } else if self.at_op("**") {
                self.bump();
                let (name, _) = self.expect_ident()?;
                let annotation = if allow_annotations && self.eat_op(":") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                self.add(
                    NodeKind::Param {
                        name,
                        annotation,
                        default: None,
                        star: ArgStar::DoubleStar,
                    },
                    Span::new(start, self.prev_end()),
                )
            } else if self.at_op("/") {
                // Positional-only marker.
                self.bump();
                self.add(
                    NodeKind::Param {
                        name: "/".to_string(),
                        annotation: None,
                        default: None,
                        star: ArgStar::None,
                    },
                    Span::new(start, self.prev_end()),
                )
            } else {
                let (name, _) = self.expect_ident()?;
                let annotation = if allow_annotations && self.eat_op(":") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                let default = if self.eat_op("=") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                self.add(
                    NodeKind::Param {
                        name,
                        annotation,
                        default,
                        star: ArgStar::None,
                    },
                    Span::new(start, self.prev_end()),
                )
            };
            params.push(param);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(params)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        parse_module(source).unwrap_or_else(|e| panic!("'{}' doesn't parse: {}", source, e))
    }

    fn module_body(tree: &SyntaxTree) -> Vec<NodeId> {
        match tree.kind(tree.root()) {
            NodeKind::Module { body } => body.clone(),
            other => panic!("expected Module, got {:?}", other),
        }
    }

    #[test]
    fn bare_minimum_funcdef() {
        parse("def f(): ...");
    }

    #[test]
    fn funcdef_params() {
        parse("def g(a, b): ...");
    }

    #[test]
    fn statements_parse() {
        for src in &[
            "x = 1",
            "x = y = 2",
            "x += 1",
            "x: int = 5",
            "a, b = b, a",
            "del x, y",
            "assert x, 'msg'",
            "raise ValueError('bad') from err",
            "global a, b",
            "import os, sys as system",
            "from os.path import join, dirname as dn",
            "from . import sibling",
            "from ..pkg import thing",
            "from mod import (a, b,\n    c)",
            "pass; pass",
            "def f():\n    return",
            "def f():\n    yield 1",
        ] {
            parse(src);
        }
    }

    #[test]
    fn compound_statements_parse() {
        for src in &[
            "if x:\n    pass",
            "if x:\n    pass\nelif y:\n    pass\nelse:\n    pass",
            "while x:\n    break\nelse:\n    pass",
            "for i in range(10):\n    continue",
            "async def f():\n    await g()",
            "with open(p) as f:\n    pass",
            "with a as x, b as y:\n    pass",
            "try:\n    pass\nexcept ValueError as e:\n    pass\nelse:\n    pass\nfinally:\n    pass",
            "@deco\n@mod.deco(arg)\ndef f():\n    pass",
            "class C(Base, metaclass=Meta):\n    pass",
            "def f(a, b=1, *args, c, **kwargs):\n    pass",
            "def f(a: int, b: str = 'x') -> bool:\n    pass",
            "lambda_result = lambda x, y=2: x + y",
        ] {
            parse(src);
        }
    }

    #[test]
    fn expressions_parse() {
        for src in &[
            "x = a + b * c ** -d",
            "x = (a + b) * c",
            "x = a.b.c(d)[e]",
            "x = a if b else c",
            "x = not a or b and c",
            "x = a < b <= c != d",
            "x = a is not b",
            "x = b not in c",
            "x = [1, 2, 3]",
            "x = (1,)",
            "x = ()",
            "x = {1, 2}",
            "x = {'k': v, **rest}",
            "x = {}",
            "x = [i for i in y if i]",
            "x = {k: v for k, v in items}",
            "x = (i for i in y)",
            "t = f(x for x in y)",
            "x = a[1:2, ::3]",
            "x = f'{name}!'",
            "x = 'a' 'b'",
            "x = ...",
            "f(*args, **kwargs)",
            "f(x, key=1)",
        ] {
            parse(src);
        }
    }

    #[test]
    fn invalid_source_is_rejected() {
        for src in &[
            "def f(:",
            "def f():",
            "if x",
            "x = = 1",
            "f(",
            "class : pass",
            "1 +",
        ] {
            assert!(
                parse_module(src).is_err(),
                "expected parse failure for '{}'",
                src
            );
        }
    }

    #[test]
    fn function_def_structure() {
        let tree = parse("def hello(name):\n    print(name)\n");
        let body = module_body(&tree);
        assert_eq!(body.len(), 1);
        match tree.kind(body[0]) {
            NodeKind::FunctionDef {
                name,
                name_span,
                params,
                ..
            } => {
                assert_eq!(name, "hello");
                assert_eq!(name_span.slice(tree.source()), "hello");
                assert_eq!(params.len(), 1);
            }
            other => panic!("expected FunctionDef, got {:?}", other),
        }
    }

    #[test]
    fn call_structure_records_args_span() {
        let tree = parse("print( x ,  y )\n");
        let body = module_body(&tree);
        let line = tree.children(body[0]);
        let stmt = line[0];
        let call = match tree.kind(stmt) {
            NodeKind::ExprStmt { value } => *value,
            other => panic!("expected ExprStmt, got {:?}", other),
        };
        match tree.kind(call) {
            NodeKind::Call {
                func,
                args,
                args_span,
            } => {
                assert!(matches!(tree.kind(*func), NodeKind::Name { id } if id == "print"));
                assert_eq!(args.len(), 2);
                let asp = args_span.expect("args span");
                assert_eq!(asp.slice(tree.source()), "( x ,  y )");
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn every_parsed_node_has_a_span() {
        let tree = parse("def f(a, b=1):\n    return a + b\n\nf(1, b=2)\n");
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            assert!(
                tree.node(id).span.is_some(),
                "node {} ({:?}) has no span",
                id,
                tree.kind(id)
            );
            stack.extend(tree.children(id));
        }
    }

    #[test]
    fn statement_spans_nest() {
        let src = "if x:\n    a = 1\n    b = 2\n";
        let tree = parse(src);
        let body = module_body(&tree);
        let if_span = tree.node(body[0]).span.unwrap();
        assert_eq!(if_span.slice(src), "if x:\n    a = 1\n    b = 2");
    }

    #[test]
    fn elif_chain_nests_in_orelse() {
        let tree = parse("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");
        let body = module_body(&tree);
        match tree.kind(body[0]) {
            NodeKind::If { orelse, is_elif, .. } => {
                assert!(!is_elif);
                let nested = orelse.expect("orelse");
                match tree.kind(nested) {
                    NodeKind::If { is_elif, orelse, .. } => {
                        assert!(*is_elif);
                        assert!(orelse.is_some());
                    }
                    other => panic!("expected elif If, got {:?}", other),
                }
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn error_position_points_at_offender() {
        let err = parse_module("def f(:\n    pass").unwrap_err();
        match err {
            ParserError::Syntax { line, col, .. } => {
                assert_eq!(line, 1);
                assert_eq!(col, 7);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn tokenizer_errors_bubble_up() {
        let err = parse_module("x = 'unterminated").unwrap_err();
        assert!(matches!(err, ParserError::Tokenize(_)));
    }
}
