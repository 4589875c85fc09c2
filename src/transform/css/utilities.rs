// src/transform/css/utilities.rs

//! Built-in utility class table, preflight and container component.
//!
//! The table is generated once, in a stable order, so expanded output is
//! deterministic across runs.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::transform::css::ast::{AtBody, AtRule, Decl, Node, Rule};

/// Responsive variants as `(prefix, min-width)`.
pub const BREAKPOINTS: &[(&str, &str)] = &[
    ("sm", "640px"),
    ("md", "768px"),
    ("lg", "1024px"),
    ("xl", "1280px"),
];

/// State variants available on colour utilities.
pub const STATE_VARIANTS: &[&str] = &["hover", "focus"];

#[derive(Debug, Clone)]
pub struct Utility {
    /// Unescaped class name, e.g. `w-1/2`.
    pub class: String,
    pub decls: Vec<Decl>,
    /// Whether `hover:`/`focus:` variants exist.
    pub stateful: bool,
}

impl Utility {
    fn new(class: impl Into<String>, decls: &[(&str, &str)]) -> Self {
        Self {
            class: class.into(),
            decls: decls.iter().map(|(p, v)| Decl::property(*p, *v)).collect(),
            stateful: false,
        }
    }

    fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }

    /// Rule for this utility under an optional variant prefix.
    pub fn rule(&self, variant: Option<&str>) -> Rule {
        let selector = match variant {
            None => format!(".{}", escape_class(&self.class)),
            Some(v) if STATE_VARIANTS.contains(&v) => {
                format!(".{}:{v}", escape_class(&format!("{v}:{}", self.class)))
            }
            Some(v) => format!(".{}", escape_class(&format!("{v}:{}", self.class))),
        };
        Rule::new(selector, self.decls.clone())
    }
}

/// Escape a class name for use in a selector.
pub fn escape_class(class: &str) -> String {
    let mut out = String::with_capacity(class.len() + 4);
    for (i, c) in class.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            // A leading digit must be written as a code point escape.
            out.push_str(&format!("\\{:x} ", c as u32));
            continue;
        }
        let plain = c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii();
        if !plain {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub static UTILITIES: LazyLock<Vec<Utility>> = LazyLock::new(build_utilities);

static UTILITY_INDEX: LazyLock<HashMap<&'static str, usize>> = LazyLock::new(|| {
    UTILITIES
        .iter()
        .enumerate()
        .map(|(i, u)| (u.class.as_str(), i))
        .collect()
});

pub fn lookup(class: &str) -> Option<&'static Utility> {
    UTILITY_INDEX.get(class).map(|&i| &UTILITIES[i])
}

const SPACING: &[(&str, &str)] = &[
    ("0", "0px"),
    ("px", "1px"),
    ("0.5", "0.125rem"),
    ("1", "0.25rem"),
    ("1.5", "0.375rem"),
    ("2", "0.5rem"),
    ("2.5", "0.625rem"),
    ("3", "0.75rem"),
    ("3.5", "0.875rem"),
    ("4", "1rem"),
    ("5", "1.25rem"),
    ("6", "1.5rem"),
    ("7", "1.75rem"),
    ("8", "2rem"),
    ("9", "2.25rem"),
    ("10", "2.5rem"),
    ("11", "2.75rem"),
    ("12", "3rem"),
    ("14", "3.5rem"),
    ("16", "4rem"),
    ("20", "5rem"),
    ("24", "6rem"),
    ("28", "7rem"),
    ("32", "8rem"),
];

const SIDES: &[(&str, &[&str])] = &[
    ("", &[""]),
    ("x", &["-left", "-right"]),
    ("y", &["-top", "-bottom"]),
    ("t", &["-top"]),
    ("r", &["-right"]),
    ("b", &["-bottom"]),
    ("l", &["-left"]),
];

const FRACTIONS: &[(&str, &str)] = &[
    ("1/2", "50%"),
    ("1/3", "33.333333%"),
    ("2/3", "66.666667%"),
    ("1/4", "25%"),
    ("3/4", "75%"),
];

const PALETTE: &[(&str, [&str; 9])] = &[
    (
        "gray",
        [
            "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563", "#374151",
            "#1f2937", "#111827",
        ],
    ),
    (
        "red",
        [
            "#fee2e2", "#fecaca", "#fca5a5", "#f87171", "#ef4444", "#dc2626", "#b91c1c",
            "#991b1b", "#7f1d1d",
        ],
    ),
    (
        "yellow",
        [
            "#fef3c7", "#fde68a", "#fcd34d", "#fbbf24", "#f59e0b", "#d97706", "#b45309",
            "#92400e", "#78350f",
        ],
    ),
    (
        "green",
        [
            "#d1fae5", "#a7f3d0", "#6ee7b7", "#34d399", "#10b981", "#059669", "#047857",
            "#065f46", "#064e3b",
        ],
    ),
    (
        "blue",
        [
            "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb", "#1d4ed8",
            "#1e40af", "#1e3a8a",
        ],
    ),
];

const FLAT_COLOURS: &[(&str, &str)] = &[
    ("transparent", "transparent"),
    ("current", "currentColor"),
    ("white", "#ffffff"),
    ("black", "#000000"),
];

fn build_utilities() -> Vec<Utility> {
    let mut out = Vec::new();
    layout(&mut out);
    spacing(&mut out);
    sizing(&mut out);
    typography(&mut out);
    colours(&mut out);
    borders(&mut out);
    misc(&mut out);
    out
}

fn layout(out: &mut Vec<Utility>) {
    for (class, value) in [
        ("block", "block"),
        ("inline-block", "inline-block"),
        ("inline", "inline"),
        ("flex", "flex"),
        ("inline-flex", "inline-flex"),
        ("grid", "grid"),
        ("table", "table"),
        ("hidden", "none"),
    ] {
        out.push(Utility::new(class, &[("display", value)]));
    }

    for (class, value) in [
        ("static", "static"),
        ("fixed", "fixed"),
        ("absolute", "absolute"),
        ("relative", "relative"),
        ("sticky", "sticky"),
    ] {
        out.push(Utility::new(class, &[("position", value)]));
    }
    out.push(Utility::new(
        "inset-0",
        &[("top", "0px"), ("right", "0px"), ("bottom", "0px"), ("left", "0px")],
    ));
    for side in ["top", "right", "bottom", "left"] {
        out.push(Utility::new(format!("{side}-0"), &[(side, "0px")]));
    }

    for (class, value) in [
        ("flex-row", "row"),
        ("flex-row-reverse", "row-reverse"),
        ("flex-col", "column"),
        ("flex-col-reverse", "column-reverse"),
    ] {
        out.push(Utility::new(class, &[("flex-direction", value)]));
    }
    out.push(Utility::new("flex-wrap", &[("flex-wrap", "wrap")]));
    out.push(Utility::new("flex-nowrap", &[("flex-wrap", "nowrap")]));
    out.push(Utility::new("flex-1", &[("flex", "1 1 0%")]));
    out.push(Utility::new("flex-auto", &[("flex", "1 1 auto")]));
    out.push(Utility::new("flex-none", &[("flex", "none")]));
    out.push(Utility::new("flex-grow", &[("flex-grow", "1")]));
    out.push(Utility::new("flex-shrink-0", &[("flex-shrink", "0")]));

    for (class, value) in [
        ("start", "flex-start"),
        ("end", "flex-end"),
        ("center", "center"),
        ("baseline", "baseline"),
        ("stretch", "stretch"),
    ] {
        out.push(Utility::new(format!("items-{class}"), &[("align-items", value)]));
    }
    for (class, value) in [
        ("start", "flex-start"),
        ("end", "flex-end"),
        ("center", "center"),
        ("between", "space-between"),
        ("around", "space-around"),
        ("evenly", "space-evenly"),
    ] {
        out.push(Utility::new(
            format!("justify-{class}"),
            &[("justify-content", value)],
        ));
    }

    for n in 1..=12 {
        let value = format!("repeat({n}, minmax(0, 1fr))");
        out.push(Utility::new(
            format!("grid-cols-{n}"),
            &[("grid-template-columns", value.as_str())],
        ));
    }

    for (class, value) in [("hidden", "hidden"), ("auto", "auto"), ("scroll", "scroll")] {
        out.push(Utility::new(format!("overflow-{class}"), &[("overflow", value)]));
    }
    for z in ["0", "10", "20", "30", "40", "50"] {
        out.push(Utility::new(format!("z-{z}"), &[("z-index", z)]));
    }
}

fn spacing(out: &mut Vec<Utility>) {
    for (prefix, property) in [("p", "padding"), ("m", "margin")] {
        for (side, suffixes) in SIDES {
            let class_prefix = format!("{prefix}{side}");
            let mut scale: Vec<(&str, &str)> = SPACING.to_vec();
            if property == "margin" {
                scale.push(("auto", "auto"));
            }
            for (key, value) in scale {
                let decls: Vec<(String, &str)> = suffixes
                    .iter()
                    .map(|s| (format!("{property}{s}"), value))
                    .collect();
                let decls: Vec<(&str, &str)> =
                    decls.iter().map(|(p, v)| (p.as_str(), *v)).collect();
                out.push(Utility::new(format!("{class_prefix}-{key}"), &decls));
            }
        }
    }

    for (key, value) in SPACING {
        out.push(Utility::new(format!("gap-{key}"), &[("gap", *value)]));
    }
}

fn sizing(out: &mut Vec<Utility>) {
    for (prefix, property, screen) in [("w", "width", "100vw"), ("h", "height", "100vh")] {
        for (key, value) in SPACING {
            out.push(Utility::new(format!("{prefix}-{key}"), &[(property, *value)]));
        }
        out.push(Utility::new(format!("{prefix}-auto"), &[(property, "auto")]));
        out.push(Utility::new(format!("{prefix}-full"), &[(property, "100%")]));
        out.push(Utility::new(format!("{prefix}-screen"), &[(property, screen)]));
        for (key, value) in FRACTIONS {
            out.push(Utility::new(format!("{prefix}-{key}"), &[(property, *value)]));
        }
    }

    for (key, value) in [
        ("xs", "20rem"),
        ("sm", "24rem"),
        ("md", "28rem"),
        ("lg", "32rem"),
        ("xl", "36rem"),
        ("2xl", "42rem"),
        ("4xl", "56rem"),
        ("full", "100%"),
        ("none", "none"),
    ] {
        out.push(Utility::new(format!("max-w-{key}"), &[("max-width", value)]));
    }
    out.push(Utility::new("min-h-full", &[("min-height", "100%")]));
    out.push(Utility::new("min-h-screen", &[("min-height", "100vh")]));
}

fn typography(out: &mut Vec<Utility>) {
    for (key, size, line_height) in [
        ("xs", "0.75rem", "1rem"),
        ("sm", "0.875rem", "1.25rem"),
        ("base", "1rem", "1.5rem"),
        ("lg", "1.125rem", "1.75rem"),
        ("xl", "1.25rem", "1.75rem"),
        ("2xl", "1.5rem", "2rem"),
        ("3xl", "1.875rem", "2.25rem"),
        ("4xl", "2.25rem", "2.5rem"),
    ] {
        out.push(Utility::new(
            format!("text-{key}"),
            &[("font-size", size), ("line-height", line_height)],
        ));
    }

    for (key, weight) in [
        ("thin", "100"),
        ("light", "300"),
        ("normal", "400"),
        ("medium", "500"),
        ("semibold", "600"),
        ("bold", "700"),
        ("extrabold", "800"),
    ] {
        out.push(Utility::new(format!("font-{key}"), &[("font-weight", weight)]));
    }

    for align in ["left", "center", "right", "justify"] {
        out.push(Utility::new(format!("text-{align}"), &[("text-align", align)]));
    }

    for (class, value) in [
        ("uppercase", "uppercase"),
        ("lowercase", "lowercase"),
        ("capitalize", "capitalize"),
        ("normal-case", "none"),
    ] {
        out.push(Utility::new(class, &[("text-transform", value)]));
    }
    out.push(Utility::new("italic", &[("font-style", "italic")]));
    out.push(Utility::new("not-italic", &[("font-style", "normal")]));
    out.push(Utility::new("underline", &[("text-decoration", "underline")]).stateful());
    out.push(Utility::new("no-underline", &[("text-decoration", "none")]).stateful());

    for (key, value) in [
        ("none", "1"),
        ("tight", "1.25"),
        ("normal", "1.5"),
        ("relaxed", "1.625"),
        ("loose", "2"),
    ] {
        out.push(Utility::new(format!("leading-{key}"), &[("line-height", value)]));
    }
}

fn colours(out: &mut Vec<Utility>) {
    let mut named: Vec<(String, &str)> = FLAT_COLOURS
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect();
    for (hue, shades) in PALETTE {
        for (i, value) in shades.iter().enumerate() {
            named.push((format!("{hue}-{}", (i + 1) * 100), *value));
        }
    }

    for (prefix, property) in [
        ("text", "color"),
        ("bg", "background-color"),
        ("border", "border-color"),
    ] {
        for (name, value) in named.iter() {
            out.push(Utility::new(format!("{prefix}-{name}"), &[(property, *value)]).stateful());
        }
    }
}

fn borders(out: &mut Vec<Utility>) {
    for (suffix, width) in [("", "1px"), ("-0", "0px"), ("-2", "2px"), ("-4", "4px")] {
        out.push(Utility::new(format!("border{suffix}"), &[("border-width", width)]));
    }
    for (side, property) in [
        ("t", "border-top-width"),
        ("r", "border-right-width"),
        ("b", "border-bottom-width"),
        ("l", "border-left-width"),
    ] {
        out.push(Utility::new(format!("border-{side}"), &[(property, "1px")]));
    }

    for (suffix, radius) in [
        ("-none", "0px"),
        ("-sm", "0.125rem"),
        ("", "0.25rem"),
        ("-md", "0.375rem"),
        ("-lg", "0.5rem"),
        ("-xl", "0.75rem"),
        ("-full", "9999px"),
    ] {
        out.push(Utility::new(format!("rounded{suffix}"), &[("border-radius", radius)]));
    }
}

fn misc(out: &mut Vec<Utility>) {
    out.push(Utility::new("select-none", &[("user-select", "none")]));
    out.push(Utility::new("select-text", &[("user-select", "text")]));
    out.push(Utility::new("select-all", &[("user-select", "all")]));
    out.push(Utility::new("appearance-none", &[("appearance", "none")]));
    out.push(Utility::new("cursor-pointer", &[("cursor", "pointer")]));
    out.push(Utility::new("cursor-default", &[("cursor", "default")]));
    out.push(Utility::new("pointer-events-none", &[("pointer-events", "none")]));
    for opacity in ["0", "25", "50", "75", "100"] {
        let value = match opacity {
            "100" => "1".to_string(),
            "0" => "0".to_string(),
            other => format!("0.{other}"),
        };
        out.push(
            Utility::new(format!("opacity-{opacity}"), &[("opacity", value.as_str())]).stateful(),
        );
    }
    out.push(Utility::new(
        "shadow",
        &[("box-shadow", "0 1px 3px 0 rgba(0, 0, 0, 0.1), 0 1px 2px 0 rgba(0, 0, 0, 0.06)")],
    ));
    out.push(Utility::new(
        "shadow-md",
        &[("box-shadow", "0 4px 6px -1px rgba(0, 0, 0, 0.1), 0 2px 4px -1px rgba(0, 0, 0, 0.06)")],
    ));
    out.push(Utility::new("shadow-none", &[("box-shadow", "none")]));
    out.push(Utility::new(
        "truncate",
        &[
            ("overflow", "hidden"),
            ("text-overflow", "ellipsis"),
            ("white-space", "nowrap"),
        ],
    ));
    out.push(Utility::new(
        "sr-only",
        &[
            ("position", "absolute"),
            ("width", "1px"),
            ("height", "1px"),
            ("padding", "0"),
            ("margin", "-1px"),
            ("overflow", "hidden"),
            ("clip", "rect(0, 0, 0, 0)"),
            ("white-space", "nowrap"),
            ("border-width", "0"),
        ],
    ));
}

/// Base element styles emitted for `@tailwind base`.
pub const PREFLIGHT: &str = "*,
::before,
::after {
  box-sizing: border-box;
  border-width: 0;
  border-style: solid;
  border-color: #e5e7eb;
}
html {
  line-height: 1.5;
  -webkit-text-size-adjust: 100%;
  tab-size: 4;
  font-family: ui-sans-serif, system-ui, -apple-system, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
}
body {
  margin: 0;
  line-height: inherit;
}
hr {
  height: 0;
  color: inherit;
  border-top-width: 1px;
}
h1,
h2,
h3,
h4,
h5,
h6 {
  font-size: inherit;
  font-weight: inherit;
  margin: 0;
}
a {
  color: inherit;
  text-decoration: inherit;
}
b,
strong {
  font-weight: bolder;
}
code,
kbd,
pre,
samp {
  font-family: ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, monospace;
  font-size: 1em;
}
button,
input,
optgroup,
select,
textarea {
  font-family: inherit;
  font-size: 100%;
  line-height: inherit;
  color: inherit;
  margin: 0;
  padding: 0;
}
button,
select {
  text-transform: none;
}
button,
[type='button'],
[type='reset'],
[type='submit'] {
  -webkit-appearance: button;
  background-color: transparent;
  background-image: none;
}
blockquote,
dl,
dd,
figure,
p,
pre {
  margin: 0;
}
ol,
ul {
  list-style: none;
  margin: 0;
  padding: 0;
}
img,
svg,
video,
canvas,
audio,
iframe,
embed,
object {
  display: block;
  vertical-align: middle;
}
img,
video {
  max-width: 100%;
  height: auto;
}
";

/// `.container` plus its per-breakpoint max widths.
pub fn container_nodes() -> Vec<Node> {
    let mut nodes = vec![Node::Rule(Rule::new(
        ".container",
        vec![Decl::property("width", "100%")],
    ))];
    for (_, width) in BREAKPOINTS {
        nodes.push(Node::AtRule(AtRule::new(
            "media",
            format!("(min-width: {width})"),
            AtBody::Nodes(vec![Node::Rule(Rule::new(
                ".container",
                vec![Decl::property("max-width", *width)],
            ))]),
        )));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn class_names_are_unique() {
        let mut seen = HashSet::new();
        for utility in UTILITIES.iter() {
            assert!(seen.insert(utility.class.as_str()), "duplicate {}", utility.class);
        }
    }

    #[test]
    fn lookup_finds_spacing_and_colours() {
        let p4 = lookup("p-4").unwrap();
        assert_eq!(p4.decls, vec![Decl::property("padding", "1rem")]);

        let px2 = lookup("px-2").unwrap();
        assert_eq!(
            px2.decls,
            vec![
                Decl::property("padding-left", "0.5rem"),
                Decl::property("padding-right", "0.5rem"),
            ]
        );

        assert_eq!(
            lookup("bg-blue-500").unwrap().decls,
            vec![Decl::property("background-color", "#3b82f6")]
        );
        assert!(lookup("bg-purple-500").is_none());
    }

    #[test]
    fn selectors_escape_special_characters() {
        assert_eq!(escape_class("w-1/2"), r"w-1\/2");
        assert_eq!(escape_class("p-0.5"), r"p-0\.5");
        assert_eq!(escape_class("2xl"), r"\32 xl");

        let rule = lookup("bg-red-500").unwrap().rule(Some("hover"));
        assert_eq!(rule.selector(), r".hover\:bg-red-500:hover");
        let rule = lookup("p-4").unwrap().rule(Some("md"));
        assert_eq!(rule.selector(), r".md\:p-4");
    }
}
