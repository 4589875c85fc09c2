// src/transform/css/ast.rs

//! Style sheet tree and serializer.
//!
//! Nodes parsed from source remember their original text. As long as a node
//! is not mutated it is written back byte-for-byte, so a development build of
//! an untouched file reproduces the file exactly. Mutating accessors drop the
//! remembered text and the node is pretty-printed instead.

use crate::transform::css::minify::{minify_params, minify_selector, minify_value};

/// Output style for [`Stylesheet::to_css`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Keep untouched source text; pretty-print generated or edited nodes.
    Preserve,
    /// No comments (except `/*! ... */`), no insignificant whitespace.
    Compact,
}

#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
    /// Set by the minify plugin; selects [`Format::Compact`] on output.
    pub compact: bool,
}

impl Stylesheet {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            compact: false,
        }
    }

    pub fn format(&self) -> Format {
        if self.compact {
            Format::Compact
        } else {
            Format::Preserve
        }
    }

    pub fn to_css(&self, format: Format) -> String {
        let mut out = String::new();
        match format {
            Format::Preserve => write_preserved(&mut out, &self.nodes, 0),
            Format::Compact => write_compact(&mut out, &self.nodes),
        }
        out
    }

    /// Visit every rule, including rules nested in at-rule blocks.
    ///
    /// The callback receives the names of the enclosing at-rules (outermost
    /// first) so plugins can skip e.g. keyframe selectors.
    pub fn walk_rules_mut(&mut self, f: &mut dyn FnMut(&[String], &mut Rule)) {
        let mut parents = Vec::new();
        walk_rules_in(&mut self.nodes, &mut parents, f);
    }
}

fn walk_rules_in(
    nodes: &mut [Node],
    parents: &mut Vec<String>,
    f: &mut dyn FnMut(&[String], &mut Rule),
) {
    for node in nodes.iter_mut() {
        match node {
            Node::Rule(rule) => f(parents, rule),
            Node::AtRule(at) => {
                if let AtBody::Nodes(children) = &mut at.body {
                    parents.push(at.name.clone());
                    walk_rules_in(children, parents, f);
                    parents.pop();
                }
            }
            Node::Trivia(_) => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    /// Whitespace and comments between nodes, kept verbatim.
    Trivia(String),
    Rule(Rule),
    AtRule(AtRule),
}

impl Node {
    pub fn is_trivia(&self) -> bool {
        matches!(self, Node::Trivia(_))
    }

    fn is_generated(&self) -> bool {
        match self {
            Node::Trivia(_) => false,
            Node::Rule(r) => r.raw.is_none(),
            Node::AtRule(a) => a.raw.is_none(),
        }
    }
}

/// A single declaration inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Property { prop: String, value: String },
    /// `@apply a b c;` before utility expansion.
    Apply(Vec<String>),
}

impl Decl {
    pub fn property(prop: impl Into<String>, value: impl Into<String>) -> Self {
        Decl::Property {
            prop: prop.into(),
            value: value.into(),
        }
    }

    pub fn prop(&self) -> Option<&str> {
        match self {
            Decl::Property { prop, .. } => Some(prop),
            Decl::Apply(_) => None,
        }
    }

    fn pretty(&self) -> String {
        match self {
            Decl::Property { prop, value } => format!("{prop}: {value}"),
            Decl::Apply(names) => format!("@apply {}", names.join(" ")),
        }
    }

    fn compact(&self) -> String {
        match self {
            Decl::Property { prop, value } => format!("{prop}:{}", minify_value(value)),
            Decl::Apply(names) => format!("@apply {}", names.join(" ")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    selector: String,
    decls: Vec<Decl>,
    raw: Option<String>,
}

impl Rule {
    pub fn new(selector: impl Into<String>, decls: Vec<Decl>) -> Self {
        Self {
            selector: selector.into(),
            decls,
            raw: None,
        }
    }

    pub(crate) fn parsed(selector: String, decls: Vec<Decl>, raw: String) -> Self {
        Self {
            selector,
            decls,
            raw: Some(raw),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn decls(&self) -> &[Decl] {
        &self.decls
    }

    pub fn decls_mut(&mut self) -> &mut Vec<Decl> {
        self.raw = None;
        &mut self.decls
    }

    pub fn set_selector(&mut self, selector: impl Into<String>) {
        self.raw = None;
        self.selector = selector.into();
    }

    /// True while the rule still matches its source text.
    pub fn is_pristine(&self) -> bool {
        self.raw.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum AtBody {
    /// `@import "x";`
    Statement,
    /// `@font-face { ... }`
    Decls(Vec<Decl>),
    /// `@media (...) { rules }`
    Nodes(Vec<Node>),
}

#[derive(Debug, Clone)]
pub struct AtRule {
    name: String,
    params: String,
    body: AtBody,
    /// Whole source text for statements and declaration blocks; only the
    /// header up to and including `{` for nested blocks, whose children
    /// carry their own text.
    raw: Option<String>,
}

impl AtRule {
    pub fn new(name: impl Into<String>, params: impl Into<String>, body: AtBody) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            body,
            raw: None,
        }
    }

    pub(crate) fn parsed(name: String, params: String, body: AtBody, raw: String) -> Self {
        Self {
            name,
            params,
            body,
            raw: Some(raw),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn body(&self) -> &AtBody {
        &self.body
    }

    /// Children of a nested block. Editing children keeps the header text.
    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.body {
            AtBody::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn decls_mut(&mut self) -> Option<&mut Vec<Decl>> {
        match &mut self.body {
            AtBody::Decls(decls) => {
                self.raw = None;
                Some(decls)
            }
            _ => None,
        }
    }

    /// Whether a nested block has no rules left (only trivia).
    pub fn is_empty_block(&self) -> bool {
        match &self.body {
            AtBody::Nodes(nodes) => nodes.iter().all(Node::is_trivia),
            AtBody::Decls(decls) => decls.is_empty(),
            AtBody::Statement => false,
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn write_preserved(out: &mut String, nodes: &[Node], depth: usize) {
    let mut prev_generated = false;

    for node in nodes {
        if node.is_generated() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&indent(depth));
        } else if prev_generated && !node.is_trivia() {
            out.push('\n');
        }

        match node {
            Node::Trivia(text) => out.push_str(text),
            Node::Rule(rule) => match &rule.raw {
                Some(raw) => out.push_str(raw),
                None => write_pretty_block(out, &rule.selector, &rule.decls, depth),
            },
            Node::AtRule(at) => write_preserved_at_rule(out, at, depth),
        }

        prev_generated = node.is_generated();
    }
}

fn write_preserved_at_rule(out: &mut String, at: &AtRule, depth: usize) {
    match (&at.body, &at.raw) {
        (AtBody::Nodes(children), Some(header)) => {
            out.push_str(header);
            write_preserved(out, children, depth + 1);
            out.push('}');
        }
        (AtBody::Nodes(children), None) => {
            out.push_str(&at_header(at));
            out.push_str(" {\n");
            write_preserved(out, children, depth + 1);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&indent(depth));
            out.push('}');
        }
        (_, Some(raw)) => out.push_str(raw),
        (AtBody::Statement, None) => {
            out.push_str(&at_header(at));
            out.push(';');
        }
        (AtBody::Decls(decls), None) => write_pretty_block(out, &at_header(at), decls, depth),
    }
}

fn at_header(at: &AtRule) -> String {
    if at.params.is_empty() {
        format!("@{}", at.name)
    } else {
        format!("@{} {}", at.name, at.params)
    }
}

fn write_pretty_block(out: &mut String, prelude: &str, decls: &[Decl], depth: usize) {
    out.push_str(prelude);
    out.push_str(" {\n");
    for decl in decls {
        out.push_str(&indent(depth + 1));
        out.push_str(&decl.pretty());
        out.push_str(";\n");
    }
    out.push_str(&indent(depth));
    out.push('}');
}

fn write_compact(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Trivia(text) => {
                for comment in preserved_comments(text) {
                    out.push_str(comment);
                }
            }
            Node::Rule(rule) => {
                if rule.decls.is_empty() {
                    continue;
                }
                out.push_str(&minify_selector(&rule.selector));
                write_compact_decls(out, &rule.decls);
            }
            Node::AtRule(at) => write_compact_at_rule(out, at),
        }
    }
}

fn write_compact_at_rule(out: &mut String, at: &AtRule) {
    let params = minify_params(&at.params);
    let header = if params.is_empty() {
        format!("@{}", at.name)
    } else {
        format!("@{} {}", at.name, params)
    };

    match &at.body {
        AtBody::Statement => {
            out.push_str(&header);
            out.push(';');
        }
        AtBody::Decls(decls) => {
            if decls.is_empty() {
                return;
            }
            out.push_str(&header);
            write_compact_decls(out, decls);
        }
        AtBody::Nodes(children) => {
            let mut inner = String::new();
            write_compact(&mut inner, children);
            if inner.is_empty() {
                return;
            }
            out.push_str(&header);
            out.push('{');
            out.push_str(&inner);
            out.push('}');
        }
    }
}

fn write_compact_decls(out: &mut String, decls: &[Decl]) {
    out.push('{');
    let parts: Vec<String> = decls.iter().map(Decl::compact).collect();
    out.push_str(&parts.join(";"));
    out.push('}');
}

/// `/*! ... */` comments survive minification.
fn preserved_comments(trivia: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = trivia;
    while let Some(start) = rest.find("/*") {
        let after = &rest[start..];
        let Some(end) = after.find("*/") else {
            break;
        };
        let comment = &after[..end + 2];
        if comment.starts_with("/*!") {
            found.push(comment);
        }
        rest = &after[end + 2..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_rules_are_pretty_printed_on_their_own_lines() {
        let sheet = Stylesheet::new(vec![
            Node::Rule(Rule::new(".a", vec![Decl::property("color", "red")])),
            Node::Rule(Rule::new(".b", vec![Decl::property("margin", "0")])),
        ]);
        assert_eq!(
            sheet.to_css(Format::Preserve),
            ".a {\n  color: red;\n}\n.b {\n  margin: 0;\n}"
        );
    }

    #[test]
    fn compact_output_drops_empty_rules_and_blocks() {
        let sheet = Stylesheet::new(vec![
            Node::Rule(Rule::new(".a", vec![])),
            Node::AtRule(AtRule::new(
                "media",
                "(min-width: 640px)",
                AtBody::Nodes(vec![Node::Rule(Rule::new(".b", vec![]))]),
            )),
            Node::Rule(Rule::new(".c", vec![Decl::property("color", "red")])),
        ]);
        assert_eq!(sheet.to_css(Format::Compact), ".c{color:red}");
    }
}
