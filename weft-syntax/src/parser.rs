//! Statement-level parser over logical lines.
//!
//! Only top-level imports, constant assignments and class headers are
//! read into the model, plus the direct body of each top-level class.
//! Every other line is checked for well-formedness and indentation and then
//! skipped.

use std::ops::Range;

use crate::{
    Class, Constant, Import, Module, Result, SourceContext,
    grammar::check_line,
    keywords::{is_identifier, is_keyword},
    lexer::{Lexer, Line, Token, TokenKind},
};

pub(crate) fn parse(ctx: &SourceContext) -> Result<Module> {
    let lines = Lexer::new(ctx).tokenize()?;
    for line in &lines {
        check_line(ctx, &line.tokens)?;
    }
    let depths = block_depths(ctx, &lines)?;

    let mut module = Module::default();
    // top-level class whose body is being read, and whether its next
    // statement is the first one
    let mut open_class: Option<(usize, bool)> = None;

    for (line, depth) in lines.iter().zip(depths) {
        match depth {
            0 => {
                open_class = None;
                let first = line.tokens.first();
                if first.is_some_and(|t| t.is_name("class")) {
                    if let Some(index) = top_level(ctx, &mut module, &line.tokens)? {
                        open_class = Some((index, true));
                    }
                } else if !starts_compound(&line.tokens) {
                    for statement in split_statements(&line.tokens) {
                        top_level(ctx, &mut module, statement)?;
                    }
                }
            }
            1 => {
                let Some((index, first)) = open_class.as_mut() else {
                    continue;
                };
                if starts_compound(&line.tokens) {
                    *first = false;
                    continue;
                }
                for statement in split_statements(&line.tokens) {
                    class_body(ctx, &mut module.classes[*index], statement, *first)?;
                    *first = false;
                }
            }
            _ => {}
        }
    }

    Ok(module)
}

/// Check if a line starts with a keyword other than an import, so it is a
/// compound or flow statement the screening model does not look into.
fn starts_compound(tokens: &[Token]) -> bool {
    match tokens.first().and_then(Token::name) {
        Some("import" | "from" | "True" | "False" | "None") => false,
        Some(name) => is_keyword(name),
        None => tokens.first().is_some_and(|t| t.is_op("@")),
    }
}

/// Validate indentation and compute the block depth of every line.
fn block_depths(ctx: &SourceContext, lines: &[Line]) -> Result<Vec<usize>> {
    let mut stack = vec![0];
    let mut depths = Vec::with_capacity(lines.len());
    let mut expect_block = false;

    for line in lines {
        let top = stack.last().copied().unwrap_or(0);
        if expect_block {
            if line.indent <= top {
                return Err(ctx.syntax_error("expected an indented block", line.span()));
            }
            stack.push(line.indent);
        } else if line.indent > top {
            return Err(ctx.syntax_error("unexpected indent", line.span()));
        } else if line.indent < top {
            while stack.last().is_some_and(|&indent| indent > line.indent) {
                stack.pop();
            }
            if stack.last() != Some(&line.indent) {
                return Err(ctx.syntax_error(
                    "unindent does not match any outer indentation level",
                    line.span(),
                ));
            }
        }

        depths.push(stack.len() - 1);
        expect_block = line.tokens.last().is_some_and(|token| token.is_op(":"));
    }

    if expect_block {
        return Err(ctx.eof_error("expected an indented block"));
    }
    Ok(depths)
}

fn split_statements(tokens: &[Token]) -> impl Iterator<Item = &[Token]> {
    tokens
        .split(|token| token.is_op(";"))
        .filter(|statement| !statement.is_empty())
}

/// Handle one top-level statement, returning the class index when the
/// statement opens a class body block.
fn top_level(ctx: &SourceContext, module: &mut Module, tokens: &[Token]) -> Result<Option<usize>> {
    let mut cursor = Cursor::new(ctx, tokens);
    let Some(first) = cursor.peek() else {
        return Ok(None);
    };

    if first.is_name("import") || first.is_name("from") {
        module.imports.extend(import_line(ctx, tokens)?);
    } else if first.is_name("class") {
        cursor.advance();
        let (class, opens_block) = class_statement(&mut cursor)?;
        module.classes.push(class);
        if opens_block {
            return Ok(Some(module.classes.len() - 1));
        }
    } else if let Some((name, value)) = assignment(ctx, tokens)? {
        module.constants.insert(name, value);
    }

    Ok(None)
}

/// Parse one `import` or `from` statement.
pub(crate) fn import_line(ctx: &SourceContext, tokens: &[Token]) -> Result<Vec<Import>> {
    let mut cursor = Cursor::new(ctx, tokens);
    if cursor.eat_name("import") {
        import_statement(&mut cursor)
    } else if cursor.eat_name("from") {
        from_statement(&mut cursor)
    } else {
        Err(cursor.error("invalid syntax"))
    }
}

fn class_body(ctx: &SourceContext, class: &mut Class, tokens: &[Token], first: bool) -> Result<()> {
    if first {
        if let Some(Constant::Str(doc)) = docstring(tokens) {
            class.docstring = Some(doc);
            return Ok(());
        }
    }

    if let Some((name, value)) = assignment(ctx, tokens)? {
        class.constants.insert(name, value);
    }
    Ok(())
}

fn docstring(tokens: &[Token]) -> Option<Constant> {
    let all_text = tokens.iter().all(|token| {
        matches!(&token.kind, TokenKind::Str(s) if !s.bytes && !s.formatted)
    });
    if !all_text {
        return None;
    }
    LiteralParser::new(tokens).parse()
}

/// `import a.b as c, d`
fn import_statement(cursor: &mut Cursor<'_>) -> Result<Vec<Import>> {
    let mut imports = Vec::new();
    loop {
        let start = cursor.offset();
        let module = cursor.dotted_name()?;
        let alias = if cursor.eat_name("as") {
            Some(cursor.identifier()?)
        } else {
            None
        };
        imports.push(Import {
            name: None,
            module,
            alias,
            level: 0,
            span: start..cursor.offset(),
        });

        if !cursor.eat_op(",") {
            break;
        }
    }
    cursor.finish()?;
    Ok(imports)
}

/// `from ..a.b import (c as d, e)`
fn from_statement(cursor: &mut Cursor<'_>) -> Result<Vec<Import>> {
    let start = cursor.offset();
    let mut level = 0;
    loop {
        if cursor.eat_op(".") {
            level += 1;
        } else if cursor.eat_op("...") {
            level += 3;
        } else {
            break;
        }
    }

    let module = if cursor.peek().is_some_and(|token| token.is_name("import")) {
        if level == 0 {
            return Err(cursor.error("invalid syntax"));
        }
        Vec::new()
    } else {
        cursor.dotted_name()?
    };

    if !cursor.eat_name("import") {
        return Err(cursor.error("expected 'import'"));
    }

    if cursor.eat_op("*") {
        cursor.finish()?;
        return Ok(vec![Import {
            name: Some("*".to_string()),
            module,
            alias: None,
            level,
            span: start..cursor.offset(),
        }]);
    }

    let parenthesized = cursor.eat_op("(");
    let mut imports = Vec::new();
    loop {
        if parenthesized && cursor.peek().is_some_and(|token| token.is_op(")")) {
            break;
        }
        let name = cursor.identifier()?;
        let alias = if cursor.eat_name("as") {
            Some(cursor.identifier()?)
        } else {
            None
        };
        imports.push(Import {
            name: Some(name),
            module: module.clone(),
            alias,
            level,
            span: start..cursor.offset(),
        });

        if !cursor.eat_op(",") {
            break;
        }
        if !parenthesized && cursor.at_end() {
            return Err(cursor.error("trailing comma not allowed without surrounding parentheses"));
        }
    }

    if parenthesized && !cursor.eat_op(")") {
        return Err(cursor.error("expected ')'"));
    }
    if imports.is_empty() {
        return Err(cursor.error("invalid syntax"));
    }
    cursor.finish()?;
    Ok(imports)
}

/// `class Name[T](base, key=value): body`
fn class_statement(cursor: &mut Cursor<'_>) -> Result<(Class, bool)> {
    let start = cursor.offset();
    let mut class = Class {
        name: cursor.identifier()?,
        ..Default::default()
    };

    if cursor.peek().is_some_and(|token| token.is_op("[")) {
        cursor.skip_group()?;
    }

    if cursor.eat_op("(") {
        let arguments = cursor.take_group(")")?;
        for argument in split_top_level(arguments, ",") {
            class_argument(cursor.ctx, &mut class, argument)?;
        }
    }

    if !cursor.eat_op(":") {
        return Err(cursor.error("expected ':'"));
    }
    class.span = start..cursor.offset();

    let body = cursor.rest();
    if body.is_empty() {
        return Ok((class, true));
    }

    for (index, statement) in split_statements(body).enumerate() {
        class_body(cursor.ctx, &mut class, statement, index == 0)?;
    }
    Ok((class, false))
}

fn class_argument(ctx: &SourceContext, class: &mut Class, tokens: &[Token]) -> Result<()> {
    let Some(first) = tokens.first() else {
        return Ok(());
    };
    if first.is_op("*") || first.is_op("**") {
        return Ok(());
    }

    if tokens.len() > 1 && tokens[1].is_op("=") {
        let key = keyword_target(ctx, first)?;
        if let Some(value) = LiteralParser::new(&tokens[2..]).parse() {
            class.keywords.insert(key, value);
        }
        return Ok(());
    }

    class.bases.push(base_expression(ctx, tokens));
    Ok(())
}

fn keyword_target(ctx: &SourceContext, token: &Token) -> Result<String> {
    match token.name() {
        Some(name) if is_identifier(name) => Ok(name.to_string()),
        _ => Err(ctx.syntax_error("invalid keyword argument", token.span.clone())),
    }
}

/// Render a base expression, joining dotted names without whitespace and
/// keeping any other expression as its source text.
fn base_expression(ctx: &SourceContext, tokens: &[Token]) -> String {
    let mut dotted = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        let expected_name = index % 2 == 0;
        match (expected_name, token.name()) {
            (true, Some(name)) => dotted.push(name),
            (false, None) if token.is_op(".") => {}
            _ => {
                dotted.clear();
                break;
            }
        }
    }
    if !dotted.is_empty() && tokens.len() % 2 == 1 {
        return dotted.join(".");
    }

    let span = span_of(tokens);
    ctx.src()[span].trim().to_string()
}

fn span_of(tokens: &[Token]) -> Range<usize> {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.start..last.span.end,
        _ => 0..0,
    }
}

/// Split `tokens` on `separator` operators that are not nested in brackets.
fn split_top_level<'t>(tokens: &'t [Token], separator: &str) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Op("(" | "[" | "{") => depth += 1,
            TokenKind::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
            TokenKind::Op(op) if *op == separator && depth == 0 => {
                parts.push(&tokens[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts.retain(|part| !part.is_empty());
    parts
}

/// Recognize `NAME = literal` and `NAME: annotation = literal`.
///
/// Returns `None` for anything that is not a single-target assignment of a
/// literal value.
fn assignment(ctx: &SourceContext, tokens: &[Token]) -> Result<Option<(String, Constant)>> {
    let [target, operator, rest @ ..] = tokens else {
        return Ok(None);
    };
    let Some(name) = target.name() else {
        return Ok(None);
    };

    let value = if operator.is_op("=") {
        rest
    } else if operator.is_op(":") && !is_keyword(name) {
        match split_top_level(rest, "=").as_slice() {
            [_, value] => *value,
            _ => return Ok(None),
        }
    } else {
        return Ok(None);
    };

    if is_keyword(name) {
        return Err(ctx.syntax_error("cannot assign to keyword", target.span.clone()));
    }
    // chained assignments bind more than one target
    if value.iter().any(|token| token.is_op("=")) && split_top_level(value, "=").len() > 1 {
        return Ok(None);
    }

    Ok(LiteralParser::new(value)
        .parse()
        .map(|constant| (name.to_string(), constant)))
}

struct Cursor<'t> {
    ctx: &'t SourceContext,
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(ctx: &'t SourceContext, tokens: &'t [Token]) -> Self {
        Self { ctx, tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    /// Source offset of the current position.
    fn offset(&self) -> usize {
        match self.peek() {
            Some(token) => token.span.start,
            None => self.tokens.last().map(|t| t.span.end).unwrap_or(0),
        }
    }

    fn error(&self, message: &str) -> Box<crate::Error> {
        match self.peek() {
            Some(token) => self.ctx.syntax_error(message, token.span.clone()),
            None => {
                let end = self.offset();
                self.ctx.syntax_error(message, end..end)
            }
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_op(op)) {
            self.advance();
            return true;
        }
        false
    }

    fn eat_name(&mut self, name: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_name(name)) {
            self.advance();
            return true;
        }
        false
    }

    fn identifier(&mut self) -> Result<String> {
        match self.peek().and_then(Token::name) {
            Some(name) if is_identifier(name) => {
                self.advance();
                Ok(name.to_string())
            }
            _ => Err(self.error("invalid syntax")),
        }
    }

    fn dotted_name(&mut self) -> Result<Vec<String>> {
        let mut segments = vec![self.identifier()?];
        while self.eat_op(".") {
            segments.push(self.identifier()?);
        }
        Ok(segments)
    }

    /// Consume a bracketed group starting at the current opening bracket.
    fn skip_group(&mut self) -> Result<()> {
        let close = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Op("(")) => ")",
            Some(TokenKind::Op("[")) => "]",
            Some(TokenKind::Op("{")) => "}",
            _ => return Err(self.error("invalid syntax")),
        };
        self.advance();
        self.take_group(close).map(|_| ())
    }

    /// Return the tokens up to the `close` bracket matching an already
    /// consumed opening bracket, and consume the close bracket.
    fn take_group(&mut self, close: &str) -> Result<&'t [Token]> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Op(op) if *op == close && depth == 0 => {
                    let group = &self.tokens[start..self.pos];
                    self.advance();
                    return Ok(group);
                }
                TokenKind::Op("(" | "[" | "{") => depth += 1,
                TokenKind::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
        Err(self.error(&format!("expected '{}'", close)))
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("invalid syntax"))
        }
    }
}

/// Evaluates literal expressions; any non-literal yields `None`.
struct LiteralParser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> LiteralParser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Option<Constant> {
        if self.tokens.is_empty() {
            return None;
        }
        let value = self.expression_list()?;
        (self.pos == self.tokens.len()).then_some(value)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_op(op)) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// A bare tuple such as `1, 2` or a single value.
    fn expression_list(&mut self) -> Option<Constant> {
        let first = self.value()?;
        if !self.peek().is_some_and(|token| token.is_op(",")) {
            return Some(first);
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.peek().is_none() {
                break;
            }
            items.push(self.value()?);
        }
        Some(Constant::List(items))
    }

    fn value(&mut self) -> Option<Constant> {
        let token = self.peek()?;
        match &token.kind {
            TokenKind::Str(_) => self.strings(),
            TokenKind::Number(text) => {
                self.pos += 1;
                number(text)
            }
            TokenKind::Name(name) => {
                self.pos += 1;
                match name.as_str() {
                    "True" => Some(Constant::Bool(true)),
                    "False" => Some(Constant::Bool(false)),
                    "None" => Some(Constant::None),
                    _ => None,
                }
            }
            TokenKind::Op("...") => {
                self.pos += 1;
                Some(Constant::Ellipsis)
            }
            TokenKind::Op(sign @ ("-" | "+")) => {
                let negative = *sign == "-";
                self.pos += 1;
                match self.value()? {
                    Constant::Int(i) if negative => i.checked_neg().map(Constant::Int),
                    Constant::Float(f) if negative => Some(Constant::Float(-f)),
                    number @ (Constant::Int(_) | Constant::Float(_)) => Some(number),
                    _ => None,
                }
            }
            TokenKind::Op("(") => {
                self.pos += 1;
                if self.eat_op(")") {
                    return Some(Constant::List(Vec::new()));
                }
                let inner = self.expression_list()?;
                self.eat_op(")").then_some(inner)
            }
            TokenKind::Op("[") => {
                self.pos += 1;
                let items = self.sequence("]")?;
                Some(Constant::List(items))
            }
            TokenKind::Op("{") => {
                self.pos += 1;
                self.braces()
            }
            _ => None,
        }
    }

    /// Adjacent string literals concatenate; f-strings are not literals.
    fn strings(&mut self) -> Option<Constant> {
        let mut text = String::new();
        let mut bytes = None;

        while let Some(TokenKind::Str(literal)) = self.peek().map(|token| &token.kind) {
            if literal.formatted || bytes.is_some_and(|b| b != literal.bytes) {
                return None;
            }
            bytes = Some(literal.bytes);
            text.push_str(&literal.value);
            self.pos += 1;
        }

        match bytes {
            Some(true) => Some(Constant::Bytes(text.into_bytes())),
            Some(false) => Some(Constant::Str(text)),
            None => None,
        }
    }

    fn sequence(&mut self, close: &str) -> Option<Vec<Constant>> {
        let mut items = Vec::new();
        loop {
            if self.eat_op(close) {
                return Some(items);
            }
            items.push(self.value()?);
            if !self.eat_op(",") {
                return self.eat_op(close).then_some(items);
            }
        }
    }

    fn braces(&mut self) -> Option<Constant> {
        if self.eat_op("}") {
            return Some(Constant::Dict(Vec::new()));
        }

        let first = self.value()?;
        if !self.eat_op(":") {
            // a set literal
            let mut items = vec![first];
            if self.eat_op(",") {
                items.extend(self.sequence("}")?);
                return Some(Constant::List(items));
            }
            return self.eat_op("}").then_some(Constant::List(items));
        }

        let mut entries = vec![(first, self.value()?)];
        loop {
            if !self.eat_op(",") {
                return self.eat_op("}").then_some(Constant::Dict(entries));
            }
            if self.eat_op("}") {
                return Some(Constant::Dict(entries));
            }
            let key = self.value()?;
            if !self.eat_op(":") {
                return None;
            }
            entries.push((key, self.value()?));
        }
    }
}

fn number(text: &str) -> Option<Constant> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();

    let radix = match lower.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return i64::from_str_radix(&lower[2..], radix).ok().map(Constant::Int);
    }
    if lower.ends_with('j') {
        return None;
    }
    if lower.contains('.') || lower.contains('e') {
        return lower.parse::<f64>().ok().map(Constant::Float);
    }
    lower.parse::<i64>().ok().map(Constant::Int)
}
