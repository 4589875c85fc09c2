// src/transform/typescript.rs

//! TypeScript to plain ES2020 by erasing type syntax.
//!
//! The source is parsed with tree-sitter and rewritten through a list of
//! byte-range edits, so everything that is not type syntax keeps its
//! original formatting. Runtime constructs that have no JavaScript
//! counterpart (enums, namespaces, constructor parameter properties) are
//! lowered the way `tsc` lowers them. Constructs that can be neither erased
//! nor lowered are errors.

use anyhow::{anyhow, bail, Context, Result};
use tree_sitter::{Node, Parser, Tree};

use crate::transform::{line_col, Transform};

/// Nodes that are erased entirely.
const ERASED: &[&str] = &[
    "type_annotation",
    "type_parameters",
    "type_arguments",
    "type_predicate_annotation",
    "asserts_annotation",
    "interface_declaration",
    "type_alias_declaration",
    "ambient_declaration",
    "function_signature",
    "abstract_method_signature",
    "method_signature",
    "index_signature",
    "implements_clause",
];

/// Modifiers erased together with the whitespace after them.
const ERASED_MODIFIERS: &[&str] = &[
    "accessibility_modifier",
    "override_modifier",
    "readonly",
    "abstract",
    "declare",
];

/// Parents in which a `?` token marks optionality.
const OPTIONAL_PARENTS: &[&str] = &[
    "optional_parameter",
    "method_definition",
    "public_field_definition",
];

/// Parents in which a `!` token is a definite-assignment assertion.
const DEFINITE_PARENTS: &[&str] = &["variable_declarator", "public_field_definition"];

/// Erases TypeScript type syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeStripper;

impl Transform for TypeStripper {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn apply(&self, source: &str) -> Result<String> {
        strip_types(source)
    }
}

pub fn strip_types(source: &str) -> Result<String> {
    let tree = parse(source)?;
    let mut stripper = Stripper {
        src: source,
        edits: Vec::new(),
    };
    stripper.visit(tree.root_node())?;
    Ok(apply_edits(source, stripper.edits))
}

fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("typescript parser returned no tree"))?;

    if let Some(bad) = first_error(tree.root_node()) {
        let (line, col) = line_col(source, bad.start_byte());
        bail!("typescript syntax error at {line}:{col}");
    }
    Ok(tree)
}

/// The first `ERROR` or `MISSING` node in document order.
pub(crate) fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    for edit in edits {
        // Edits nested inside an already erased range are moot.
        if edit.start < pos {
            continue;
        }
        out.push_str(&source[pos..edit.start]);
        out.push_str(&edit.text);
        pos = edit.end;
    }
    out.push_str(&source[pos..]);
    out
}

struct Stripper<'s> {
    src: &'s str,
    edits: Vec<Edit>,
}

impl<'s> Stripper<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn erase_range(&mut self, start: usize, end: usize) {
        if start < end {
            self.edits.push(Edit {
                start,
                end,
                text: String::new(),
            });
        }
    }

    fn erase(&mut self, node: Node<'_>) {
        self.erase_range(node.start_byte(), node.end_byte());
    }

    fn erase_with_space(&mut self, node: Node<'_>) {
        let bytes = self.src.as_bytes();
        let mut end = node.end_byte();
        while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
            end += 1;
        }
        self.erase_range(node.start_byte(), end);
    }

    fn replace(&mut self, node: Node<'_>, text: String) {
        self.edits.push(Edit {
            start: node.start_byte(),
            end: node.end_byte(),
            text,
        });
    }

    fn insert(&mut self, at: usize, text: String) {
        self.edits.push(Edit {
            start: at,
            end: at,
            text,
        });
    }

    fn visit(&mut self, node: Node<'_>) -> Result<()> {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            self.visit_child(node, child)?;
        }
        Ok(())
    }

    fn visit_child(&mut self, parent: Node<'_>, child: Node<'_>) -> Result<()> {
        let kind = child.kind();

        if ERASED.contains(&kind) {
            self.erase(child);
            return Ok(());
        }
        if ERASED_MODIFIERS.contains(&kind) {
            self.erase_with_space(child);
            return Ok(());
        }

        match kind {
            "?" if OPTIONAL_PARENTS.contains(&parent.kind()) => self.erase(child),
            "!" if DEFINITE_PARENTS.contains(&parent.kind()) => self.erase(child),
            "import_statement" | "export_statement" if is_type_only(child) => self.erase(child),
            "import_statement" | "export_statement" if has_type_specifiers(child) => {
                self.erase_type_specifiers(child);
            }
            "import_alias" => bail!("unsupported `import = ` alias: `{}`", first_line(self.text(child))),
            "required_parameter" if is_this_parameter(child) => self.erase_this_parameter(child),
            "public_field_definition" if is_erased_field(child) => self.erase(child),
            "as_expression" | "satisfies_expression" | "non_null_expression" => {
                let mut cursor = child.walk();
                let inner = child.named_children(&mut cursor).next();
                if let Some(inner) = inner {
                    self.erase_range(inner.end_byte(), child.end_byte());
                    self.visit_child(child, inner)?;
                }
            }
            "type_assertion" => {
                let mut cursor = child.walk();
                let inner = child.named_children(&mut cursor).last();
                if let Some(inner) = inner {
                    self.erase_range(child.start_byte(), inner.start_byte());
                    self.visit_child(child, inner)?;
                }
            }
            "enum_declaration" => {
                let lowered = self.lower_enum(child)?;
                self.replace(child, lowered);
            }
            "internal_module" | "module" if child.is_named() => {
                let lowered = self.lower_namespace(child)?;
                self.replace(child, lowered);
            }
            "method_definition" => {
                self.lower_parameter_properties(child);
                self.visit(child)?;
            }
            _ if child.child_count() > 0 => self.visit(child)?,
            _ => {}
        }
        Ok(())
    }

    /// `this: T` only types the receiver. It goes away with its comma.
    fn erase_this_parameter(&mut self, param: Node<'_>) {
        let mut end = param.end_byte();
        if let Some(comma) = param.next_sibling().filter(|n| n.kind() == ",") {
            let bytes = self.src.as_bytes();
            end = comma.end_byte();
            while end < bytes.len() && bytes[end].is_ascii_whitespace() {
                end += 1;
            }
        }
        self.erase_range(param.start_byte(), end);
    }

    /// `import { type A, B }` keeps `B`. A statement left with nothing to
    /// import or export is dropped, except that a default import survives
    /// on its own.
    fn erase_type_specifiers(&mut self, statement: Node<'_>) {
        let Some(list) = specifier_list(statement) else {
            return;
        };
        let kept: Vec<&str> = specifiers(list)
            .into_iter()
            .filter(|s| !is_type_specifier(*s))
            .map(|s| self.text(s))
            .collect();

        if !kept.is_empty() {
            self.replace(list, format!("{{ {} }}", kept.join(", ")));
            return;
        }
        if let Some(default) = list.prev_named_sibling() {
            self.erase_range(default.end_byte(), list.end_byte());
            return;
        }
        self.erase(statement);
    }

    /// `namespace N { ... }` to `var N; (function (N) { ... })(N || (N = {}));`.
    ///
    /// Exported declarations are assigned onto `N` right after they are
    /// declared. Dotted names and export forms that would need references
    /// rewritten (`export let`, `export var`, `export { x }`) are rejected.
    /// A namespace holding only types disappears.
    fn lower_namespace(&self, node: Node<'_>) -> Result<String> {
        let name_node = node
            .child_by_field_name("name")
            .ok_or_else(|| anyhow!("namespace without a name"))?;
        if name_node.kind() != "identifier" {
            bail!(
                "unsupported namespace '{}': only single identifiers can be compiled",
                self.text(name_node)
            );
        }
        let name = self.text(name_node);
        let Some(body) = node.child_by_field_name("body") else {
            return Ok(String::new());
        };

        let inner = &self.src[body.start_byte() + 1..body.end_byte() - 1];
        let lowered = lower_namespace_body(name, inner)
            .with_context(|| format!("in namespace '{name}'"))?;
        if lowered.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(format!(
            "var {name};\n(function ({name}) {{{lowered}}})({name} || ({name} = {{}}));"
        ))
    }

    /// `enum E { A, B = 5 }` to the `var E; (function (E) { ... })(E || (E = {}));`
    /// object form, with reverse mappings for numeric members.
    fn lower_enum(&self, node: Node<'_>) -> Result<String> {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .ok_or_else(|| anyhow!("enum without a name"))?;
        let body = node
            .child_by_field_name("body")
            .ok_or_else(|| anyhow!("enum '{name}' without a body"))?;

        let mut lines = Vec::new();
        let mut next: Option<i64> = Some(0);
        let mut cursor = body.walk();

        for member in body.named_children(&mut cursor) {
            let (member_name, value) = match member.kind() {
                "enum_assignment" => {
                    let key = member
                        .child_by_field_name("name")
                        .ok_or_else(|| anyhow!("enum member without a name"))?;
                    (self.text(key), member.child_by_field_name("value"))
                }
                "property_identifier" | "string" => (self.text(member), None),
                "comment" => continue,
                other => bail!("unsupported enum member '{other}' in enum '{name}'"),
            };
            let member_name = member_name.trim_matches(['"', '\'']);

            let line = match value {
                None => {
                    let Some(n) = next else {
                        bail!("enum member '{name}.{member_name}' must have an initializer");
                    };
                    next = Some(n + 1);
                    format!("{name}[{name}[\"{member_name}\"] = {n}] = \"{member_name}\";")
                }
                Some(value) if value.kind() == "string" || value.kind() == "template_string" => {
                    next = None;
                    format!("{name}[\"{member_name}\"] = {};", self.text(value))
                }
                Some(value) => {
                    let text = self.text(value);
                    next = text.trim().parse::<i64>().ok().map(|n| n + 1);
                    format!("{name}[{name}[\"{member_name}\"] = {text}] = \"{member_name}\";")
                }
            };
            lines.push(format!("    {line}"));
        }

        let mut out = format!("var {name};\n(function ({name}) {{\n");
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&format!("}})({name} || ({name} = {{}}));"));
        Ok(out)
    }

    /// `constructor(private x: number)` assigns `this.x = x;` at the top of
    /// the body (after a leading `super(...)` call).
    fn lower_parameter_properties(&mut self, method: Node<'_>) {
        let is_constructor = method
            .child_by_field_name("name")
            .is_some_and(|n| self.text(n) == "constructor");
        if !is_constructor {
            return;
        }
        let (Some(params), Some(body)) = (
            method.child_by_field_name("parameters"),
            method.child_by_field_name("body"),
        ) else {
            return;
        };

        let mut names = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            let mut inner = param.walk();
            let is_property = param.children(&mut inner).any(|c| {
                matches!(c.kind(), "accessibility_modifier" | "override_modifier" | "readonly")
            });
            if is_property {
                if let Some(pattern) = param.child_by_field_name("pattern") {
                    names.push(self.text(pattern).to_string());
                }
            }
        }
        if names.is_empty() {
            return;
        }

        let mut at = body.start_byte() + 1;
        let mut cursor = body.walk();
        if let Some(first) = body.named_children(&mut cursor).next() {
            if self.text(first).trim_start().starts_with("super(") {
                at = first.end_byte();
            }
        }

        let assignments: String = names
            .iter()
            .map(|n| format!(" this.{n} = {n};"))
            .collect();
        self.insert(at, assignments);
    }
}

/// `import type ...`, `export type ...` and exports of pure type
/// declarations.
fn is_type_only(statement: Node<'_>) -> bool {
    let mut cursor = statement.walk();
    let has_type_keyword = statement
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == "type");
    if has_type_keyword {
        return true;
    }

    statement
        .child_by_field_name("declaration")
        .is_some_and(|d| {
            matches!(
                d.kind(),
                "interface_declaration"
                    | "type_alias_declaration"
                    | "ambient_declaration"
                    | "function_signature"
            )
        })
}

/// The `{ ... }` of an import or export statement, if it has one.
fn specifier_list(statement: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = statement.walk();
    let children: Vec<Node<'_>> = statement.named_children(&mut cursor).collect();
    children.into_iter().find_map(|child| match child.kind() {
        "export_clause" => Some(child),
        "import_clause" => {
            let mut inner = child.walk();
            let parts: Vec<Node<'_>> = child.named_children(&mut inner).collect();
            parts.into_iter().find(|p| p.kind() == "named_imports")
        }
        _ => None,
    })
}

fn specifiers(list: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|n| matches!(n.kind(), "import_specifier" | "export_specifier"))
        .collect()
}

fn is_type_specifier(specifier: Node<'_>) -> bool {
    let mut cursor = specifier.walk();
    specifier
        .children(&mut cursor)
        .any(|c| !c.is_named() && matches!(c.kind(), "type" | "typeof"))
}

fn has_type_specifiers(statement: Node<'_>) -> bool {
    specifier_list(statement)
        .is_some_and(|list| specifiers(list).into_iter().any(is_type_specifier))
}

fn is_this_parameter(param: Node<'_>) -> bool {
    param
        .child_by_field_name("pattern")
        .is_some_and(|p| p.kind() == "this")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

/// Statements of a namespace body, stripped one by one, with exported
/// bindings copied onto the namespace object.
fn lower_namespace_body(name: &str, inner: &str) -> Result<String> {
    let tree = parse(inner)?;
    let root = tree.root_node();
    let mut cursor = root.walk();
    let statements: Vec<Node<'_>> = root.children(&mut cursor).collect();

    let mut out = String::with_capacity(inner.len());
    let mut pos = 0;
    for statement in statements {
        out.push_str(&inner[pos..statement.start_byte()]);
        pos = statement.end_byte();
        let text = &inner[statement.byte_range()];

        if statement.kind() != "export_statement" {
            out.push_str(&strip_types(text)?);
            continue;
        }
        if is_type_only(statement) {
            continue;
        }
        let Some(declaration) = statement.child_by_field_name("declaration") else {
            bail!("unsupported export in namespace: `{}`", first_line(text));
        };
        out.push_str(&strip_types(&inner[declaration.byte_range()])?);
        for binding in exported_bindings(declaration, inner)? {
            out.push_str(&format!(" {name}.{binding} = {binding};"));
        }
    }
    out.push_str(&inner[pos..]);
    Ok(out)
}

fn exported_bindings<'s>(declaration: Node<'_>, src: &'s str) -> Result<Vec<&'s str>> {
    let text = move |n: Node<'_>| -> &'s str { &src[n.byte_range()] };
    match declaration.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration"
        | "enum_declaration"
        | "internal_module"
        | "module" => declaration
            .child_by_field_name("name")
            .map(|n| vec![text(n)])
            .ok_or_else(|| anyhow!("exported declaration without a name")),
        "lexical_declaration" if text(declaration).starts_with("const") => {
            let mut cursor = declaration.walk();
            let declarators: Vec<Node<'_>> = declaration
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "variable_declarator")
                .collect();
            declarators
                .into_iter()
                .map(|d| match d.child_by_field_name("name") {
                    Some(n) if n.kind() == "identifier" => Ok(text(n)),
                    _ => bail!("unsupported destructuring export: `{}`", first_line(text(d))),
                })
                .collect()
        }
        _ => bail!(
            "unsupported export in namespace: `{}`",
            first_line(text(declaration))
        ),
    }
}

/// Class fields that only exist in the type system: `declare`d or
/// `abstract` fields and fields without an initializer.
fn is_erased_field(field: Node<'_>) -> bool {
    let mut cursor = field.walk();
    let mut has_value = false;
    for child in field.children(&mut cursor) {
        match child.kind() {
            "declare" | "abstract" if !child.is_named() => return true,
            "=" => has_value = true,
            _ => {}
        }
    }
    !has_value
}
