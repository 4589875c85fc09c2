// src/transform/css/parser.rs

//! Hand-written CSS parser producing a [`Stylesheet`].
//!
//! Covers the subset a front-end project writes by hand: qualified rules,
//! statement at-rules, declaration at-rules (`@font-face`, `@page`) and
//! nested at-rule blocks (`@media`, `@supports`, `@keyframes`, ...).
//! Nesting rules inside rules is not supported and reported as an error.

use anyhow::{anyhow, bail, Result};

use crate::transform::css::ast::{AtBody, AtRule, Decl, Node, Rule, Stylesheet};
use crate::transform::line_col;

pub fn parse(source: &str) -> Result<Stylesheet> {
    let mut parser = Parser {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
    };
    let nodes = parser.parse_nodes(false)?;
    Ok(Stylesheet::new(nodes))
}

/// At-rules whose block always contains rules rather than declarations.
fn has_nested_rules(name: &str) -> bool {
    matches!(
        name,
        "media" | "supports" | "document" | "layer" | "container"
    ) || name.ends_with("keyframes")
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, at: usize, message: impl std::fmt::Display) -> anyhow::Error {
        let (line, col) = line_col(self.src, at);
        anyhow!("css syntax error at {line}:{col}: {message}")
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn parse_nodes(&mut self, nested: bool) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        loop {
            let start = self.pos;
            self.skip_trivia()?;
            if self.pos > start {
                nodes.push(Node::Trivia(self.src[start..self.pos].to_string()));
            }

            match self.peek() {
                None if nested => return Err(self.error(self.pos, "missing '}'")),
                None => return Ok(nodes),
                Some(b'}') if nested => return Ok(nodes),
                Some(b'}') => return Err(self.error(self.pos, "unexpected '}'")),
                Some(b'@') => nodes.push(Node::AtRule(self.parse_at_rule()?)),
                Some(_) => nodes.push(Node::Rule(self.parse_rule()?)),
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.bytes[self.pos..].starts_with(b"/*") {
                self.pos = self.comment_end(self.pos)?;
            } else {
                return Ok(());
            }
        }
    }

    /// Index just past the comment starting at `at`.
    fn comment_end(&self, at: usize) -> Result<usize> {
        match self.src[at + 2..].find("*/") {
            Some(rel) => Ok(at + 2 + rel + 2),
            None => Err(self.error(at, "unterminated comment")),
        }
    }

    /// Index just past the string starting at `at` (which holds the quote).
    fn string_end(&self, at: usize) -> Result<usize> {
        let quote = self.bytes[at];
        let mut i = at + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b if b == quote => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(self.error(at, "unterminated string"))
    }

    /// Scan a prelude from the current position to the first `{`, `;` or
    /// `}` outside strings, comments and parentheses. Returns its index, or
    /// `None` at end of input.
    fn scan_prelude(&self) -> Result<Option<usize>> {
        let mut i = self.pos;
        let mut parens = 0usize;

        while i < self.bytes.len() {
            match self.bytes[i] {
                b'"' | b'\'' => {
                    i = self.string_end(i)?;
                    continue;
                }
                b'/' if self.bytes.get(i + 1) == Some(&b'*') => {
                    i = self.comment_end(i)?;
                    continue;
                }
                b'\\' => i += 1,
                b'(' | b'[' => parens += 1,
                b')' | b']' => parens = parens.saturating_sub(1),
                b'{' | b';' | b'}' if parens == 0 => return Ok(Some(i)),
                _ => {}
            }
            i += 1;
        }
        Ok(None)
    }

    /// Index of the `}` matching the `{` at `open`.
    fn block_end(&self, open: usize) -> Result<usize> {
        let mut i = open + 1;
        let mut depth = 1usize;

        while i < self.bytes.len() {
            match self.bytes[i] {
                b'"' | b'\'' => {
                    i = self.string_end(i)?;
                    continue;
                }
                b'/' if self.bytes.get(i + 1) == Some(&b'*') => {
                    i = self.comment_end(i)?;
                    continue;
                }
                b'\\' => i += 1,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(self.error(open, "missing '}'"))
    }

    fn parse_rule(&mut self) -> Result<Rule> {
        let start = self.pos;
        let open = match self.scan_prelude()? {
            Some(i) if self.bytes[i] == b'{' => i,
            Some(i) => return Err(self.error(i, "expected '{' after selector")),
            None => return Err(self.error(start, "expected '{' after selector")),
        };

        let selector = self.src[start..open].trim();
        if selector.is_empty() {
            return Err(self.error(start, "empty selector"));
        }

        let close = self.block_end(open)?;
        let decls = self.parse_decls(open + 1, close)?;
        self.pos = close + 1;

        Ok(Rule::parsed(
            selector.to_string(),
            decls,
            self.src[start..self.pos].to_string(),
        ))
    }

    fn parse_at_rule(&mut self) -> Result<AtRule> {
        let start = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.pos += 1;
        }
        if self.pos == name_start {
            return Err(self.error(start, "expected at-rule name after '@'"));
        }
        let name = self.src[name_start..self.pos].to_ascii_lowercase();

        let Some(end) = self.scan_prelude()? else {
            // Statement at end of input without a terminating semicolon.
            let params = self.src[self.pos..].trim().to_string();
            let raw = self.src[start..].to_string();
            self.pos = self.bytes.len();
            return Ok(AtRule::parsed(name, params, AtBody::Statement, raw));
        };
        let params = self.src[self.pos..end].trim().to_string();

        match self.bytes[end] {
            b';' => {
                self.pos = end + 1;
                let raw = self.src[start..self.pos].to_string();
                Ok(AtRule::parsed(name, params, AtBody::Statement, raw))
            }
            b'}' => {
                // Last statement of a block; the brace belongs to the parent.
                self.pos = end;
                let raw = self.src[start..end].to_string();
                Ok(AtRule::parsed(name, params, AtBody::Statement, raw))
            }
            _ => {
                let close = self.block_end(end)?;
                let nested = has_nested_rules(&name)
                    || self.contains_block(end + 1, close)?;

                if nested {
                    let header = self.src[start..=end].to_string();
                    self.pos = end + 1;
                    let children = self.parse_nodes(true)?;
                    // parse_nodes stops on the closing brace.
                    self.pos += 1;
                    Ok(AtRule::parsed(name, params, AtBody::Nodes(children), header))
                } else {
                    let decls = self.parse_decls(end + 1, close)?;
                    self.pos = close + 1;
                    let raw = self.src[start..self.pos].to_string();
                    Ok(AtRule::parsed(name, params, AtBody::Decls(decls), raw))
                }
            }
        }
    }

    /// Whether `[from, to)` holds a `{` outside strings and comments.
    fn contains_block(&self, from: usize, to: usize) -> Result<bool> {
        let mut i = from;
        while i < to {
            match self.bytes[i] {
                b'"' | b'\'' => {
                    i = self.string_end(i)?;
                    continue;
                }
                b'/' if self.bytes.get(i + 1) == Some(&b'*') => {
                    i = self.comment_end(i)?;
                    continue;
                }
                b'{' => return Ok(true),
                _ => {}
            }
            i += 1;
        }
        Ok(false)
    }

    fn parse_decls(&self, from: usize, to: usize) -> Result<Vec<Decl>> {
        let body = strip_comments(&self.src[from..to]);
        if body.contains('{') {
            return Err(self.error(from, "nested rules are not supported"));
        }

        let mut decls = Vec::new();
        for piece in split_top_level(&body, b';') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }

            if let Some(rest) = piece.strip_prefix("@apply") {
                let names: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                if names.is_empty() {
                    return Err(self.error(from, "@apply without utility names"));
                }
                decls.push(Decl::Apply(names));
                continue;
            }
            if piece.starts_with('@') {
                return Err(self.error(from, format!("unsupported at-rule in block: '{piece}'")));
            }

            let Some(colon) = find_top_level(piece, b':') else {
                return Err(self.error(from, format!("malformed declaration '{piece}'")));
            };
            let prop = piece[..colon].trim();
            let value = piece[colon + 1..].trim();
            if prop.is_empty() || prop.contains(char::is_whitespace) {
                return Err(self.error(from, format!("malformed declaration '{piece}'")));
            }

            decls.push(Decl::property(prop, value));
        }
        Ok(decls)
    }
}

/// Remove `/* ... */` comments outside strings.
pub(crate) fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                } else if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
                    out.push_str(&text[copied..i]);
                    i = text[i + 2..].find("*/").map_or(bytes.len(), |rel| i + 2 + rel + 2);
                    copied = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    out.push_str(&text[copied.min(text.len())..]);
    out
}

/// Split on `sep` outside strings, parentheses and brackets.
pub(crate) fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(at) = find_top_level(rest, sep) {
        parts.push(&rest[..at]);
        rest = &rest[at + 1..];
    }
    parts.push(rest);
    parts
}

fn find_top_level(text: &str, needle: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'\\' => i += 1,
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ if b == needle && depth == 0 => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}
