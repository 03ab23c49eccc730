//! Tokenizer producing logical lines.
//!
//! Only as much of the language is understood as screening needs: names,
//! numbers, string literals, operators and brackets. Physical lines inside
//! brackets or joined with a backslash form one logical line.

use std::ops::Range;

use crate::{Result, SourceContext};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Name(String),
    Number(String),
    Str(StrLit),
    Op(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StrLit {
    pub value: String,
    pub bytes: bool,
    pub formatted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Op(o) if o == op)
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(n) => Some(n),
            _ => None,
        }
    }
}

/// A logical line with its indentation width.
#[derive(Debug, Clone)]
pub(crate) struct Line {
    pub indent: usize,
    pub tokens: Vec<Token>,
}

impl Line {
    pub fn span(&self) -> Range<usize> {
        match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.span.start..last.span.end,
            _ => 0..0,
        }
    }
}

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "<<", ">>", "<=", ">=", "==", "!=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "(", ")", "[", "]", "{", "}", ",", ":",
    ".", ";", "@", "=", "+", "-", "*", "/", "%", "&", "|", "^", "~", "<", ">",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

pub(crate) struct Lexer<'a> {
    ctx: &'a SourceContext,
    src: &'a str,
    pos: usize,
    brackets: Vec<(char, usize)>,
    lines: Vec<Line>,
    current: Vec<Token>,
    indent: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(ctx: &'a SourceContext) -> Self {
        Self {
            ctx,
            src: ctx.src(),
            pos: 0,
            brackets: Vec::new(),
            lines: Vec::new(),
            current: Vec::new(),
            indent: 0,
            at_line_start: true,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Line>> {
        if self.src.starts_with('\u{feff}') {
            self.pos = '\u{feff}'.len_utf8();
        }

        while self.pos < self.src.len() {
            if self.at_line_start && self.brackets.is_empty() {
                self.read_indent();
                continue;
            }

            let c = self.peek().unwrap_or('\n');
            match c {
                ' ' | '\t' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\r' | '\n' => self.newline(),
                '\\' => self.continuation()?,
                '"' | '\'' => {
                    let token = self.string(self.pos, "")?;
                    self.current.push(token);
                }
                c if c == '_' || c.is_alphabetic() => self.name()?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                _ => self.operator()?,
            }
        }

        if let Some(&(open, at)) = self.brackets.last() {
            return Err(self
                .ctx
                .syntax_error(format!("'{}' was never closed", open), at..at + 1));
        }
        self.end_line();
        Ok(self.lines)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn read_indent(&mut self) {
        let mut width = 0;
        for c in self.src[self.pos..].chars() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += c.len_utf8();
        }

        match self.peek() {
            // blank and comment-only lines do not count
            Some('#') => self.skip_comment(),
            Some('\r') | Some('\n') => self.skip_newline(),
            None => {}
            Some(_) => {
                self.indent = width;
                self.at_line_start = false;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn skip_newline(&mut self) {
        if self.src[self.pos..].starts_with("\r\n") {
            self.pos += 2;
        } else {
            self.pos += 1;
        }
    }

    fn newline(&mut self) {
        self.skip_newline();
        if self.brackets.is_empty() {
            self.end_line();
            self.at_line_start = true;
        }
    }

    fn end_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line {
                indent: self.indent,
                tokens: std::mem::take(&mut self.current),
            });
        }
    }

    fn continuation(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        match self.peek() {
            Some('\n') | Some('\r') => {
                self.skip_newline();
                Ok(())
            }
            None => Err(self
                .ctx
                .syntax_error("unexpected end of file after line continuation", start..start + 1)),
            Some(_) => Err(self.ctx.syntax_error(
                "unexpected character after line continuation character",
                start..start + 1,
            )),
        }
    }

    fn name(&mut self) -> Result<()> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let src = self.src;
        let text = &src[start..self.pos];

        let lowered = text.to_ascii_lowercase();
        if matches!(self.peek(), Some('"') | Some('\''))
            && STRING_PREFIXES.contains(&lowered.as_str())
        {
            let token = self.string(start, &lowered)?;
            self.current.push(token);
            return Ok(());
        }

        self.current.push(Token {
            kind: TokenKind::Name(text.to_string()),
            span: start..self.pos,
        });
        Ok(())
    }

    fn number(&mut self) {
        let start = self.pos;
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && (prev == 'e' || prev == 'E')
                && !self.src[start..self.pos].starts_with("0x")
                && !self.src[start..self.pos].starts_with("0X");
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.pos += 1;
                prev = c;
            } else {
                break;
            }
        }
        self.current.push(Token {
            kind: TokenKind::Number(self.src[start..self.pos].to_string()),
            span: start..self.pos,
        });
    }

    fn string(&mut self, start: usize, prefix: &str) -> Result<Token> {
        let raw = prefix.contains('r');
        let quote = self.peek().unwrap_or('"');
        let triple = self.src[self.pos..].starts_with(&quote.to_string().repeat(3));
        let delimiter = if triple { 3 } else { 1 };
        self.pos += delimiter;

        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(self.ctx.syntax_error(message, start..self.pos));
            };

            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.src[self.pos..].starts_with(&quote.to_string().repeat(3)) {
                    self.pos += 3;
                    break;
                }
            }

            if (c == '\n' || c == '\r') && !triple {
                return Err(self
                    .ctx
                    .syntax_error("unterminated string literal", start..self.pos));
            }

            if c == '\\' {
                self.pos += 1;
                let Some(next) = self.peek() else {
                    continue;
                };
                self.pos += next.len_utf8();
                if raw {
                    value.push('\\');
                    value.push(next);
                } else {
                    self.escape(next, &mut value);
                }
                continue;
            }

            value.push(c);
            self.pos += c.len_utf8();
        }

        Ok(Token {
            kind: TokenKind::Str(StrLit {
                value,
                bytes: prefix.contains('b'),
                formatted: prefix.contains('f'),
            }),
            span: start..self.pos,
        })
    }

    fn escape(&mut self, next: char, value: &mut String) {
        match next {
            '\n' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            '\\' | '\'' | '"' => value.push(next),
            'x' => self.hex_escape(2, 'x', value),
            'u' => self.hex_escape(4, 'u', value),
            'U' => self.hex_escape(8, 'U', value),
            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, marker: char, value: &mut String) {
        let end = (self.pos + digits).min(self.src.len());
        let decoded = self
            .src
            .get(self.pos..end)
            .filter(|hex| hex.len() == digits)
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                value.push(c);
                self.pos = end;
            }
            None => {
                value.push('\\');
                value.push(marker);
            }
        }
    }

    fn operator(&mut self) -> Result<()> {
        let start = self.pos;
        let rest = &self.src[self.pos..];
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            let c = self.peek().unwrap_or(' ');
            return Err(self.ctx.syntax_error(
                format!("invalid character '{}'", c),
                start..start + c.len_utf8(),
            ));
        };
        self.pos += op.len();

        match *op {
            "(" | "[" | "{" => self.brackets.push((op.chars().next().unwrap_or('('), start)),
            ")" | "]" | "}" => {
                let close = op.chars().next().unwrap_or(')');
                let expected = match close {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(self.ctx.syntax_error(
                            format!(
                                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                close, open
                            ),
                            start..self.pos,
                        ));
                    }
                    None => {
                        return Err(self
                            .ctx
                            .syntax_error(format!("unmatched '{}'", close), start..self.pos));
                    }
                }
            }
            _ => {}
        }

        self.current.push(Token {
            kind: TokenKind::Op(op),
            span: start..self.pos,
        });
        Ok(())
    }
}
