// src/transform/javascript.rs

//! Whitespace/comment minifier for plain scripts.
//!
//! The script is tokenized through the tree-sitter JavaScript grammar and
//! re-emitted with a separator only where two tokens would otherwise fuse.
//! Statements that relied on automatic semicolon insertion get an explicit
//! `;`, so dropping newlines never changes meaning. Identifiers are not
//! renamed.

use anyhow::{anyhow, bail, Result};
use tree_sitter::{Node, Parser};

use crate::transform::typescript::first_error;
use crate::transform::{line_col, Transform};

/// Nodes emitted verbatim as a single token.
const ATOMIC: &[&str] = &[
    "string",
    "template_string",
    "regex",
    "jsx_element",
    "jsx_self_closing_element",
];

/// Statements terminated by `;` (explicit or inserted).
const TERMINATED: &[&str] = &[
    "expression_statement",
    "variable_declaration",
    "lexical_declaration",
    "return_statement",
    "throw_statement",
    "break_statement",
    "continue_statement",
    "debugger_statement",
    "do_statement",
    "import_statement",
    "export_statement",
    "field_definition",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct JsMinifier;

impl Transform for JsMinifier {
    fn name(&self) -> &'static str {
        "js-minify"
    }

    fn apply(&self, source: &str) -> Result<String> {
        minify(source)
    }
}

#[derive(Debug, Clone, Copy)]
struct Token<'s> {
    text: &'s str,
    kind: &'static str,
    /// Statement-ending semicolon; may be dropped before `}` or end of input.
    terminator: bool,
}

pub fn minify(source: &str) -> Result<String> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_javascript::LANGUAGE.into())?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("javascript parser returned no tree"))?;

    let root = tree.root_node();
    if let Some(bad) = first_error(root) {
        let (line, col) = line_col(source, bad.start_byte());
        bail!("javascript syntax error at {line}:{col}");
    }

    let mut tokens = Vec::new();
    collect_tokens(source, root, &mut tokens);
    Ok(emit(&tokens))
}

fn collect_tokens<'s>(source: &'s str, node: Node<'_>, tokens: &mut Vec<Token<'s>>) {
    let kind = node.kind();

    if kind == "comment" || kind == "html_comment" {
        return;
    }
    if ATOMIC.contains(&kind) || node.child_count() == 0 {
        let text = &source[node.byte_range()];
        if !text.is_empty() {
            tokens.push(Token {
                text,
                kind,
                terminator: false,
            });
        }
        return;
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    for child in children.iter() {
        collect_tokens(source, *child, tokens);
    }

    if !TERMINATED.contains(&kind) {
        return;
    }
    if kind == "export_statement" && node.child_by_field_name("declaration").is_some() {
        return;
    }

    let last = children.iter().rev().find(|c| c.kind() != "comment");
    match last.map(|c| c.kind()) {
        Some(";") => {
            if let Some(tok) = tokens.last_mut() {
                tok.terminator = true;
            }
        }
        _ => tokens.push(Token {
            text: ";",
            kind: ";",
            terminator: true,
        }),
    }
}

fn emit(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token<'_>> = None;

    for (i, tok) in tokens.iter().enumerate() {
        if tok.terminator {
            let next = tokens.get(i + 1);
            if next.is_none_or(|n| n.text == "}") {
                continue;
            }
        }

        if let Some(p) = prev {
            if needs_space(p, tok) {
                out.push(' ');
            }
        }
        out.push_str(tok.text);
        if tok.kind == "hash_bang_line" {
            out.push('\n');
        }
        prev = Some(tok);
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

/// Whether two adjacent tokens would lex differently without a separator.
fn needs_space(prev: &Token<'_>, next: &Token<'_>) -> bool {
    let (Some(a), Some(b)) = (prev.text.chars().last(), next.text.chars().next()) else {
        return false;
    };

    if is_word_char(a) && is_word_char(b) {
        return true;
    }
    match (a, b) {
        ('+', '+') | ('-', '-') => true,
        // `a / /re/` and `/re/ * b` would open comments.
        ('/', '/') | ('/', '*') => true,
        // `a < !--b` and `a-- > b` would read as HTML comment delimiters.
        ('<', '!') | ('-', '>') => true,
        // `1 .toString()`
        (_, '.') => prev.kind == "number" && prev.text.chars().all(|c| c.is_ascii_digit() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_comments_are_removed() {
        let src = "// header\nfunction add(a, b) {\n  /* sum */\n  return a + b;\n}\n";
        assert_eq!(minify(src).unwrap(), "function add(a,b){return a+b}");
    }

    #[test]
    fn automatic_semicolons_are_materialised() {
        let src = "let a = 1\nlet b = a\nconsole.log(a, b)\n";
        assert_eq!(minify(src).unwrap(), "let a=1;let b=a;console.log(a,b)");
    }

    #[test]
    fn token_boundaries_are_preserved() {
        assert_eq!(minify("x = a + +b;").unwrap(), "x=a+ +b");
        assert_eq!(minify("x = a - -b;").unwrap(), "x=a- -b");
        assert_eq!(minify("typeof x === 'string'").unwrap(), "typeof x==='string'");
        assert_eq!(minify("x = 1 .toString()").unwrap(), "x=1 .toString()");
    }

    #[test]
    fn literals_are_kept_verbatim() {
        let src = "const s = 'a  b'; const t = `x ${ y }  z`; const r = /a b/g;";
        assert_eq!(
            minify(src).unwrap(),
            "const s='a  b';const t=`x ${ y }  z`;const r=/a b/g"
        );
    }

    #[test]
    fn output_is_never_longer_than_input() {
        let src = "if (a) {\n  b()\n} else {\n  c()\n}\nfor (let i = 0; i < 3; i++) { d(i) }\n";
        let out = minify(src).unwrap();
        assert!(out.len() <= src.len());
        assert_eq!(out, "if(a){b()}else{c()}for(let i=0;i<3;i++){d(i)}");
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(minify("function (").is_err());
    }
}
