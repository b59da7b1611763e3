//! Expression language shared by the template engines.
//!
//! # Syntax
//!
//! - `url`, `data`, `response` - the three bindings
//! - `data.title`, `data["title"]`, `data['title']`, `data.items[0]` - member access
//! - `response.url`, `response.provider`, `response.html`, `response.data` - response fields
//! - `"text"`, `'text'`, `nil` - literals
//! - `a + b` - concatenation as text
//! - `a || b` - `b` when `a` is nil, false or empty
//! - `a == b`, `a != b`, `!a` - comparisons for conditionals

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use crate::format::value_to_text;

use super::Bindings;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Path { root: Root, keys: Vec<Key> },
    Concat(Vec<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        left: Box<Expr>,
        right: Box<Expr>,
        equal: bool,
    },
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Root {
    Url,
    Data,
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Key {
    Name(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(usize),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Plus,
    OrOr,
    EqEq,
    NotEq,
    Bang,
}

/// Parse an expression.
pub(crate) fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        bail!("Empty expression");
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or()?;
    if let Some(token) = parser.peek() {
        bail!("Unexpected {:?} in expression `{}`", token, source.trim());
    }
    Ok(expr)
}

/// Evaluate an expression against template bindings.
pub(crate) fn evaluate(expr: &Expr, bindings: &Bindings<'_>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Path { root, keys } => lookup(*root, keys, bindings),
        Expr::Concat(parts) => Value::String(
            parts
                .iter()
                .map(|p| value_to_text(&evaluate(p, bindings)))
                .collect(),
        ),
        Expr::Or(left, right) => {
            let value = evaluate(left, bindings);
            if truthy(&value) {
                value
            } else {
                evaluate(right, bindings)
            }
        }
        Expr::Compare { left, right, equal } => {
            let same = evaluate(left, bindings) == evaluate(right, bindings);
            Value::Bool(same == *equal)
        }
        Expr::Not(inner) => Value::Bool(!truthy(&evaluate(inner, bindings))),
    }
}

/// Evaluate an expression to display text.
pub(crate) fn evaluate_text(expr: &Expr, bindings: &Bindings<'_>) -> String {
    value_to_text(&evaluate(expr, bindings))
}

/// Whether a value counts as true in conditionals and `||`.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn lookup(root: Root, keys: &[Key], bindings: &Bindings<'_>) -> Value {
    match root {
        Root::Url => walk(&Value::String(bindings.url.to_string()), keys),
        Root::Data => lookup_data(bindings, keys),
        Root::Response => {
            let Some((first, rest)) = keys.split_first() else {
                return representation(bindings);
            };
            match first {
                Key::Name(name) => match name.as_str() {
                    "url" => walk(&Value::String(bindings.response.url().to_string()), rest),
                    "provider" => match bindings.response.provider() {
                        Some(p) => walk(&Value::String(p.to_string()), rest),
                        None => Value::Null,
                    },
                    "html" | "to_s" => walk(&representation(bindings), rest),
                    "data" => lookup_data(bindings, rest),
                    _ => Value::Null,
                },
                Key::Index(_) => Value::Null,
            }
        }
    }
}

fn lookup_data(bindings: &Bindings<'_>, keys: &[Key]) -> Value {
    match keys.split_first() {
        None => Value::Object(bindings.data.clone()),
        Some((Key::Name(name), rest)) => bindings
            .data
            .get(name)
            .map(|v| walk(v, rest))
            .unwrap_or(Value::Null),
        Some((Key::Index(_), _)) => Value::Null,
    }
}

fn representation(bindings: &Bindings<'_>) -> Value {
    bindings
        .response
        .string_representation()
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn walk(value: &Value, keys: &[Key]) -> Value {
    let mut current = value;
    for key in keys {
        current = match (current, key) {
            (Value::Object(map), Key::Name(name)) => match map.get(name) {
                Some(v) => v,
                None => return Value::Null,
            },
            (Value::Array(items), Key::Index(i)) => match items.get(*i) {
                Some(v) => v,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current.clone()
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    bail!("Expected `||` in expression `{}`", source.trim());
                }
                tokens.push(Token::OrOr);
            }
            '=' => {
                chars.next();
                if chars.next() != Some('=') {
                    bail!("Expected `==` in expression `{}`", source.trim());
                }
                tokens.push(Token::EqEq);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => bail!("Unterminated string in `{}`", source.trim()),
                        },
                        Some(ch) if ch == quote => break,
                        Some(ch) => text.push(ch),
                        None => bail!("Unterminated string in `{}`", source.trim()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                tokens.push(Token::Int(digits.parse()?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => bail!("Unexpected character '{}' in `{}`", other, source.trim()),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;
        while self.eat(&Token::OrOr) {
            let right = self.comparison()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.concat()?;
        let equal = match self.peek() {
            Some(Token::EqEq) => true,
            Some(Token::NotEq) => false,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.concat()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            equal,
        })
    }

    fn concat(&mut self) -> Result<Expr> {
        let first = self.unary()?;
        if self.peek() != Some(&Token::Plus) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(&Token::Plus) {
            parts.push(self.unary()?);
        }
        Ok(Expr::Concat(parts))
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::from(n))),
            Some(Token::LParen) => {
                let inner = self.or()?;
                if !self.eat(&Token::RParen) {
                    bail!("Expected `)`");
                }
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let root = match name.as_str() {
                    "url" => Root::Url,
                    "data" => Root::Data,
                    "response" => Root::Response,
                    "nil" => return Ok(Expr::Literal(Value::Null)),
                    "true" => return Ok(Expr::Literal(Value::Bool(true))),
                    "false" => return Ok(Expr::Literal(Value::Bool(false))),
                    other => bail!("Undefined variable `{}`", other),
                };
                Ok(Expr::Path {
                    root,
                    keys: self.keys()?,
                })
            }
            Some(token) => bail!("Unexpected {:?}", token),
            None => Err(anyhow!("Unexpected end of expression")),
        }
    }

    fn keys(&mut self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        loop {
            if self.eat(&Token::Dot) {
                match self.next() {
                    Some(Token::Ident(name)) => keys.push(Key::Name(name)),
                    Some(Token::Int(i)) => keys.push(Key::Index(i)),
                    _ => bail!("Expected a name after `.`"),
                }
            } else if self.eat(&Token::LBracket) {
                let key = match self.next() {
                    Some(Token::Str(name)) => Key::Name(name),
                    Some(Token::Int(i)) => Key::Index(i),
                    _ => bail!("Expected a string or index inside `[]`"),
                };
                if !self.eat(&Token::RBracket) {
                    bail!("Expected `]`");
                }
                keys.push(key);
            } else {
                return Ok(keys);
            }
        }
    }
}
