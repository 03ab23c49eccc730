//! Well-formedness check for every logical line.
//!
//! The model only reads a few top-level statements, but a script is a
//! candidate only if the whole file would compile. Each line is parsed far
//! enough to reject dangling operators, missing operands, misplaced keywords
//! and assignments to expressions. Nothing is built; the check either
//! accepts the line or reports where it stops making sense.

use crate::{
    Result, SourceContext,
    keywords::{is_identifier, is_keyword},
    lexer::{Token, TokenKind},
    parser::import_line,
};

pub(crate) fn check_line(ctx: &SourceContext, tokens: &[Token]) -> Result<()> {
    Grammar::new(ctx, tokens).line()
}

/// What an expression can stand for on the left of `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Name,
    /// Attribute or subscript
    Target,
    /// Tuple, list or starred target
    Unpack,
    Value,
}

impl Form {
    fn assignable(self) -> bool {
        self != Form::Value
    }

    fn single(self) -> bool {
        matches!(self, Form::Name | Form::Target)
    }
}

const AUGMENTED: &[&str] = &[
    "+=", "-=", "*=", "/=", "//=", "%=", "@=", "&=", "|=", "^=", ">>=", "<<=", "**=",
];

const BINARY: &[&str] = &["|", "^", "&", "<<", ">>", "+", "-", "*", "/", "//", "%", "@"];

const COMPARISON: &[&str] = &["==", "!=", "<", ">", "<=", ">="];

struct Grammar<'t> {
    ctx: &'t SourceContext,
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Grammar<'t> {
    fn new(ctx: &'t SourceContext, tokens: &'t [Token]) -> Self {
        Self { ctx, tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn is_op(&self, op: &str) -> bool {
        self.peek().is_some_and(|token| token.is_op(op))
    }

    fn is_name(&self, name: &str) -> bool {
        self.peek().is_some_and(|token| token.is_name(name))
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.is_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn eat_name(&mut self, name: &str) -> bool {
        let found = self.is_name(name);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Result<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", op)))
        }
    }

    fn expect_name(&mut self, name: &str) -> Result<()> {
        if self.eat_name(name) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", name)))
        }
    }

    fn identifier(&mut self) -> Result<()> {
        match self.peek().and_then(Token::name) {
            Some(name) if is_identifier(name) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn at_identifier(&self) -> bool {
        self.peek().and_then(Token::name).is_some_and(is_identifier)
    }

    fn error(&self, message: &str) -> Box<crate::Error> {
        match self.peek() {
            Some(token) => self.ctx.syntax_error(message, token.span.clone()),
            None => {
                let end = self.tokens.last().map_or(0, |t| t.span.end);
                self.ctx.syntax_error(message, end..end)
            }
        }
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("invalid syntax"))
        }
    }

    fn at_statement_end(&self) -> bool {
        self.at_end() || self.is_op(";")
    }

    /// Check if the current token can open an expression.
    fn starts_expression(&self) -> bool {
        match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Name(name)) => {
                !is_keyword(name)
                    || matches!(name.as_str(), "True" | "False" | "None" | "not" | "lambda" | "await")
            }
            Some(TokenKind::Number(_) | TokenKind::Str(_)) => true,
            Some(TokenKind::Op(op)) => {
                matches!(*op, "(" | "[" | "{" | "-" | "+" | "~" | "*" | "...")
            }
            None => false,
        }
    }

    // statements

    fn line(&mut self) -> Result<()> {
        if self.eat_op("@") {
            self.named_expression()?;
            return self.finish();
        }

        match self.peek().and_then(Token::name) {
            Some("if" | "elif" | "while") => {
                self.advance();
                self.named_expression()?;
                self.block_header()
            }
            Some("else" | "try" | "finally") => {
                self.advance();
                self.block_header()
            }
            Some("for") => {
                self.advance();
                self.for_header()
            }
            Some("with") => {
                self.advance();
                self.with_header()
            }
            Some("except") => {
                self.advance();
                self.except_header()
            }
            Some("def") => {
                self.advance();
                self.def_header()
            }
            Some("class") => {
                self.advance();
                self.class_header()
            }
            Some("async") => {
                self.advance();
                match self.peek().and_then(Token::name) {
                    Some("def") => {
                        self.advance();
                        self.def_header()
                    }
                    Some("for") => {
                        self.advance();
                        self.for_header()
                    }
                    Some("with") => {
                        self.advance();
                        self.with_header()
                    }
                    _ => Err(self.error("expected 'def', 'for' or 'with' after 'async'")),
                }
            }
            Some("match") if self.soft_keyword_header(true) => {
                self.advance();
                self.star_named_expressions()?;
                self.block_header()
            }
            Some("case") if self.soft_keyword_header(false) => {
                self.advance();
                self.case_header()
            }
            _ => self.simple_statements(),
        }
    }

    /// `match` and `case` are plain names unless a pattern header follows:
    /// a `match` line ends its header with `:`, a `case` line has a `:`
    /// outside brackets.
    fn soft_keyword_header(&self, must_end_block: bool) -> bool {
        let opens = match self.peek_at(1).map(|token| &token.kind) {
            Some(TokenKind::Op(op)) => {
                matches!(*op, "(" | "[" | "{" | "-" | "*" | "~" | "...")
            }
            Some(TokenKind::Name(name)) => !matches!(name.as_str(), "in" | "is" | "and" | "or" | "if"),
            Some(_) => true,
            None => false,
        };
        if !opens {
            return false;
        }
        if must_end_block {
            return self.tokens.last().is_some_and(|token| token.is_op(":"));
        }

        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match &token.kind {
                TokenKind::Op("(" | "[" | "{") => depth += 1,
                TokenKind::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
                TokenKind::Op(":") if depth == 0 => return true,
                _ => {}
            }
        }
        false
    }

    /// A `:` closing a compound header, optionally followed by simple
    /// statements on the same line.
    fn block_header(&mut self) -> Result<()> {
        self.expect_op(":")?;
        if self.at_end() {
            return Ok(());
        }
        self.simple_statements()
    }

    fn for_header(&mut self) -> Result<()> {
        self.targets()?;
        self.expect_name("in")?;
        self.star_expressions()?;
        self.block_header()
    }

    fn with_header(&mut self) -> Result<()> {
        if self.is_op("(") {
            let start = self.pos;
            if self.parenthesized_with_items().is_ok() && self.is_op(":") {
                return self.block_header();
            }
            self.pos = start;
        }

        loop {
            self.with_item()?;
            if !self.eat_op(",") {
                break;
            }
        }
        self.block_header()
    }

    fn parenthesized_with_items(&mut self) -> Result<()> {
        self.expect_op("(")?;
        loop {
            self.with_item()?;
            if !self.eat_op(",") || self.is_op(")") {
                break;
            }
        }
        self.expect_op(")")
    }

    fn with_item(&mut self) -> Result<()> {
        self.expression()?;
        if self.eat_name("as") {
            self.target()?;
        }
        Ok(())
    }

    fn except_header(&mut self) -> Result<()> {
        self.eat_op("*");
        if !self.is_op(":") {
            self.star_expressions()?;
            if self.eat_name("as") {
                self.identifier()?;
            }
        }
        self.block_header()
    }

    fn def_header(&mut self) -> Result<()> {
        self.identifier()?;
        if self.is_op("[") {
            self.type_parameters()?;
        }
        self.expect_op("(")?;
        self.parameters(")", true)?;
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.expression()?;
        }
        self.block_header()
    }

    fn class_header(&mut self) -> Result<()> {
        self.identifier()?;
        if self.is_op("[") {
            self.type_parameters()?;
        }
        if self.eat_op("(") {
            self.arguments()?;
        }
        self.block_header()
    }

    /// Patterns are only checked for being present; brackets are already
    /// balanced by the lexer.
    fn case_header(&mut self) -> Result<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Op("(" | "[" | "{") => depth += 1,
                TokenKind::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
                TokenKind::Op(":") if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
        if self.pos == start {
            return Err(self.error("expected a pattern"));
        }
        self.block_header()
    }

    fn type_parameters(&mut self) -> Result<()> {
        self.expect_op("[")?;
        loop {
            if !self.eat_op("**") {
                self.eat_op("*");
            }
            self.identifier()?;
            if self.eat_op(":") {
                self.expression()?;
            }
            if self.eat_op("=") {
                self.expression()?;
            }
            if !self.eat_op(",") || self.is_op("]") {
                break;
            }
        }
        self.expect_op("]")
    }

    /// Parameters up to, but not including, `close`.
    fn parameters(&mut self, close: &str, annotated: bool) -> Result<()> {
        loop {
            if self.is_op(close) {
                return Ok(());
            }

            if self.eat_op("**") {
                self.parameter(annotated, false)?;
            } else if self.eat_op("*") {
                if self.at_identifier() {
                    self.parameter(annotated, false)?;
                }
            } else if !self.eat_op("/") {
                self.parameter(annotated, true)?;
            }

            if !self.eat_op(",") {
                return if self.is_op(close) {
                    Ok(())
                } else {
                    Err(self.error("invalid syntax"))
                };
            }
        }
    }

    fn parameter(&mut self, annotated: bool, default: bool) -> Result<()> {
        self.identifier()?;
        if annotated && self.eat_op(":") {
            self.star_expression()?;
        }
        if default && self.eat_op("=") {
            self.expression()?;
        }
        Ok(())
    }

    fn simple_statements(&mut self) -> Result<()> {
        loop {
            self.simple_statement()?;
            if !self.eat_op(";") {
                return self.finish();
            }
            if self.at_end() {
                return Ok(());
            }
        }
    }

    fn simple_statement(&mut self) -> Result<()> {
        match self.peek().and_then(Token::name) {
            Some("pass" | "break" | "continue") => {
                self.advance();
                Ok(())
            }
            Some("return") => {
                self.advance();
                if !self.at_statement_end() {
                    self.star_expressions()?;
                }
                Ok(())
            }
            Some("raise") => {
                self.advance();
                if !self.at_statement_end() {
                    self.expression()?;
                    if self.eat_name("from") {
                        self.expression()?;
                    }
                }
                Ok(())
            }
            Some("global" | "nonlocal") => {
                self.advance();
                loop {
                    self.identifier()?;
                    if !self.eat_op(",") {
                        return Ok(());
                    }
                }
            }
            Some("del") => {
                self.advance();
                self.targets()
            }
            Some("assert") => {
                self.advance();
                self.expression()?;
                if self.eat_op(",") {
                    self.expression()?;
                }
                Ok(())
            }
            Some("import" | "from") => self.import(),
            Some("type") if self.type_alias_ahead() => {
                self.advance();
                self.identifier()?;
                if self.is_op("[") {
                    self.type_parameters()?;
                }
                self.expect_op("=")?;
                self.expression().map(|_| ())
            }
            _ => self.expression_statement(),
        }
    }

    fn type_alias_ahead(&self) -> bool {
        let named = self.peek_at(1).and_then(Token::name).is_some_and(is_identifier);
        let follows = self
            .peek_at(2)
            .is_some_and(|token| token.is_op("=") || token.is_op("["));
        named && follows
    }

    fn import(&mut self) -> Result<()> {
        let end = self.tokens[self.pos..]
            .iter()
            .position(|token| token.is_op(";"))
            .map_or(self.tokens.len(), |offset| self.pos + offset);
        import_line(self.ctx, &self.tokens[self.pos..end])?;
        self.pos = end;
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<()> {
        let first = self.assigned_value()?;

        if self.is_op(":") {
            if !first.single() {
                return Err(self.error("only single target can be annotated"));
            }
            self.advance();
            self.expression()?;
            if self.eat_op("=") {
                self.assigned_value()?;
            }
            return Ok(());
        }

        if let Some(op) = self.peek().filter(|token| AUGMENTED.iter().any(|op| token.is_op(op))) {
            if !first.single() {
                return Err(self
                    .ctx
                    .syntax_error("illegal expression for augmented assignment", op.span.clone()));
            }
            self.advance();
            self.assigned_value()?;
            return Ok(());
        }

        let mut last = first;
        while let Some(op) = self.peek().filter(|token| token.is_op("=")) {
            if !last.assignable() {
                return Err(self.ctx.syntax_error("cannot assign to expression", op.span.clone()));
            }
            self.advance();
            last = self.assigned_value()?;
        }
        Ok(())
    }

    fn assigned_value(&mut self) -> Result<Form> {
        if self.is_name("yield") {
            self.yield_expression()?;
            return Ok(Form::Value);
        }
        self.star_expressions()
    }

    fn yield_expression(&mut self) -> Result<()> {
        self.expect_name("yield")?;
        if self.eat_name("from") {
            self.expression()?;
        } else if self.starts_expression() {
            self.star_expressions()?;
        }
        Ok(())
    }

    /// Comma-separated assignment targets, as after `for` or `del`.
    fn targets(&mut self) -> Result<()> {
        loop {
            self.target()?;
            if !self.eat_op(",") || !self.starts_expression() {
                return Ok(());
            }
        }
    }

    fn target(&mut self) -> Result<()> {
        let token = self.peek();
        self.eat_op("*");
        if !self.bitwise()?.assignable() {
            let span = token.map(|t| t.span.clone()).unwrap_or(0..0);
            return Err(self.ctx.syntax_error("cannot assign to expression", span));
        }
        Ok(())
    }

    // expressions

    fn star_expressions(&mut self) -> Result<Form> {
        let first = self.star_expression()?;
        if !self.is_op(",") {
            return Ok(first);
        }

        let mut assignable = first.assignable();
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            assignable &= self.star_expression()?.assignable();
        }
        Ok(if assignable { Form::Unpack } else { Form::Value })
    }

    fn star_expression(&mut self) -> Result<Form> {
        if self.eat_op("*") {
            return Ok(match self.bitwise()? {
                form if form.assignable() => Form::Unpack,
                _ => Form::Value,
            });
        }
        self.expression()
    }

    fn star_named_expressions(&mut self) -> Result<Form> {
        let first = self.star_named_expression()?;
        if !self.is_op(",") {
            return Ok(first);
        }

        let mut assignable = first.assignable();
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            assignable &= self.star_named_expression()?.assignable();
        }
        Ok(if assignable { Form::Unpack } else { Form::Value })
    }

    fn star_named_expression(&mut self) -> Result<Form> {
        if self.is_op("*") {
            return self.star_expression();
        }
        self.named_expression()
    }

    fn named_expression(&mut self) -> Result<Form> {
        let form = self.expression()?;
        if let Some(op) = self.peek().filter(|token| token.is_op(":=")) {
            if form != Form::Name {
                return Err(self.ctx.syntax_error(
                    "cannot use assignment expressions with this target",
                    op.span.clone(),
                ));
            }
            self.advance();
            self.expression()?;
            return Ok(Form::Value);
        }
        Ok(form)
    }

    fn expression(&mut self) -> Result<Form> {
        if self.eat_name("lambda") {
            self.parameters(":", false)?;
            self.expect_op(":")?;
            self.expression()?;
            return Ok(Form::Value);
        }

        let form = self.disjunction()?;
        if self.eat_name("if") {
            self.disjunction()?;
            self.expect_name("else")?;
            self.expression()?;
            return Ok(Form::Value);
        }
        Ok(form)
    }

    fn disjunction(&mut self) -> Result<Form> {
        let mut form = self.conjunction()?;
        while self.eat_name("or") {
            self.conjunction()?;
            form = Form::Value;
        }
        Ok(form)
    }

    fn conjunction(&mut self) -> Result<Form> {
        let mut form = self.inversion()?;
        while self.eat_name("and") {
            self.inversion()?;
            form = Form::Value;
        }
        Ok(form)
    }

    fn inversion(&mut self) -> Result<Form> {
        if self.eat_name("not") {
            self.inversion()?;
            return Ok(Form::Value);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Form> {
        let mut form = self.bitwise()?;
        loop {
            if COMPARISON.iter().any(|op| self.is_op(op)) || self.is_name("in") {
                self.advance();
            } else if self.is_name("is") {
                self.advance();
                self.eat_name("not");
            } else if self.is_name("not") && self.peek_at(1).is_some_and(|t| t.is_name("in")) {
                self.pos += 2;
            } else {
                return Ok(form);
            }
            self.bitwise()?;
            form = Form::Value;
        }
    }

    /// Arithmetic, shift and bitwise operators share one level: only the
    /// presence of an operand on both sides matters here.
    fn bitwise(&mut self) -> Result<Form> {
        let mut form = self.unary()?;
        while BINARY.iter().any(|op| self.is_op(op)) {
            self.advance();
            self.unary()?;
            form = Form::Value;
        }
        Ok(form)
    }

    fn unary(&mut self) -> Result<Form> {
        if self.eat_op("-") || self.eat_op("+") || self.eat_op("~") {
            self.unary()?;
            return Ok(Form::Value);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Form> {
        let awaited = self.eat_name("await");
        let mut form = self.primary()?;
        if awaited {
            form = Form::Value;
        }
        if self.eat_op("**") {
            self.unary()?;
            form = Form::Value;
        }
        Ok(form)
    }

    fn primary(&mut self) -> Result<Form> {
        let mut form = self.atom()?;
        loop {
            if self.eat_op(".") {
                self.identifier()?;
                form = Form::Target;
            } else if self.eat_op("(") {
                self.arguments()?;
                form = Form::Value;
            } else if self.eat_op("[") {
                self.subscript()?;
                form = Form::Target;
            } else {
                return Ok(form);
            }
        }
    }

    fn atom(&mut self) -> Result<Form> {
        let Some(token) = self.peek() else {
            return Err(self.error("unexpected end of statement"));
        };

        match &token.kind {
            TokenKind::Name(name) => match name.as_str() {
                "True" | "False" | "None" => {
                    self.advance();
                    Ok(Form::Value)
                }
                name if is_keyword(name) => Err(self.error("invalid syntax")),
                _ => {
                    self.advance();
                    Ok(Form::Name)
                }
            },
            TokenKind::Number(_) => {
                self.advance();
                Ok(Form::Value)
            }
            TokenKind::Str(_) => {
                while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Str(_))) {
                    self.advance();
                }
                Ok(Form::Value)
            }
            TokenKind::Op("...") => {
                self.advance();
                Ok(Form::Value)
            }
            TokenKind::Op("(") => {
                self.advance();
                self.parenthesized()
            }
            TokenKind::Op("[") => {
                self.advance();
                self.list_display()
            }
            TokenKind::Op("{") => {
                self.advance();
                self.brace_display()
            }
            TokenKind::Op(_) => Err(self.error("invalid syntax")),
        }
    }

    fn parenthesized(&mut self) -> Result<Form> {
        if self.eat_op(")") {
            return Ok(Form::Unpack);
        }
        if self.is_name("yield") {
            self.yield_expression()?;
            self.expect_op(")")?;
            return Ok(Form::Value);
        }

        let first = self.star_named_expression()?;
        if self.at_comprehension() {
            self.comprehension()?;
            self.expect_op(")")?;
            return Ok(Form::Value);
        }
        if !self.is_op(",") {
            self.expect_op(")")?;
            return Ok(first);
        }

        let form = self.display_items(first)?;
        self.expect_op(")")?;
        Ok(form)
    }

    fn list_display(&mut self) -> Result<Form> {
        if self.eat_op("]") {
            return Ok(Form::Unpack);
        }

        let first = self.star_named_expression()?;
        if self.at_comprehension() {
            self.comprehension()?;
            self.expect_op("]")?;
            return Ok(Form::Value);
        }

        let form = self.display_items(first)?;
        self.expect_op("]")?;
        Ok(form)
    }

    /// The items following the first one of a tuple or list display.
    fn display_items(&mut self, first: Form) -> Result<Form> {
        let mut assignable = first.assignable();
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            assignable &= self.star_named_expression()?.assignable();
        }
        Ok(if assignable { Form::Unpack } else { Form::Value })
    }

    fn brace_display(&mut self) -> Result<Form> {
        if self.eat_op("}") {
            return Ok(Form::Value);
        }

        let dict = if self.eat_op("**") {
            self.bitwise()?;
            true
        } else {
            self.star_named_expression()?;
            if self.eat_op(":") {
                self.expression()?;
                true
            } else {
                false
            }
        };

        if self.at_comprehension() {
            self.comprehension()?;
            self.expect_op("}")?;
            return Ok(Form::Value);
        }

        while self.eat_op(",") {
            if self.is_op("}") {
                break;
            }
            if dict {
                self.dict_entry()?;
            } else {
                self.star_named_expression()?;
            }
        }
        self.expect_op("}")?;
        Ok(Form::Value)
    }

    fn dict_entry(&mut self) -> Result<()> {
        if self.eat_op("**") {
            self.bitwise()?;
            return Ok(());
        }
        self.expression()?;
        self.expect_op(":")?;
        self.expression()?;
        Ok(())
    }

    fn at_comprehension(&self) -> bool {
        self.is_name("for")
            || (self.is_name("async") && self.peek_at(1).is_some_and(|t| t.is_name("for")))
    }

    fn comprehension(&mut self) -> Result<()> {
        while self.at_comprehension() {
            self.eat_name("async");
            self.expect_name("for")?;
            self.targets()?;
            self.expect_name("in")?;
            self.disjunction()?;
            while self.eat_name("if") {
                self.disjunction()?;
            }
        }
        Ok(())
    }

    /// Call arguments after an opening `(`, including the closing `)`.
    fn arguments(&mut self) -> Result<()> {
        loop {
            if self.eat_op(")") {
                return Ok(());
            }

            if self.eat_op("*") || self.eat_op("**") {
                self.expression()?;
            } else if self.at_identifier() && self.peek_at(1).is_some_and(|t| t.is_op("=")) {
                self.pos += 2;
                self.expression()?;
            } else {
                self.named_expression()?;
                if self.at_comprehension() {
                    self.comprehension()?;
                }
            }

            if !self.eat_op(",") {
                return self.expect_op(")");
            }
        }
    }

    /// Subscript items after an opening `[`, including the closing `]`.
    fn subscript(&mut self) -> Result<()> {
        loop {
            self.slice()?;
            if !self.eat_op(",") || self.is_op("]") {
                break;
            }
        }
        self.expect_op("]")
    }

    fn slice(&mut self) -> Result<()> {
        if self.eat_op("*") {
            self.bitwise()?;
            return Ok(());
        }
        if !self.is_op(":") {
            self.named_expression()?;
            if !self.is_op(":") {
                return Ok(());
            }
        }

        self.expect_op(":")?;
        if self.starts_expression() {
            self.expression()?;
        }
        if self.eat_op(":") && self.starts_expression() {
            self.expression()?;
        }
        Ok(())
    }
}
