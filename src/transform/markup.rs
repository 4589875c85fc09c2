// src/transform/markup.rs

//! HTML and SVG minification.

use anyhow::Result;

use crate::transform::{line_col, Transform};

/// Elements whose content is copied verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Elements rendered inline; whitespace between two of them is significant.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "dfn", "em", "i",
    "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span",
    "strong", "sub", "sup", "time", "u", "var", "tspan",
];

/// Markup minifier. `xml` selects SVG handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupMinifier {
    xml: bool,
}

impl MarkupMinifier {
    pub fn html() -> Self {
        Self { xml: false }
    }

    pub fn svg() -> Self {
        Self { xml: true }
    }
}

impl Transform for MarkupMinifier {
    fn name(&self) -> &'static str {
        if self.xml { "svg-minify" } else { "html-minify" }
    }

    fn apply(&self, source: &str) -> Result<String> {
        Minifier {
            src: source,
            pos: 0,
            out: String::with_capacity(source.len()),
            xml: self.xml,
            last_tag: None,
        }
        .run()
    }
}

struct Minifier<'a> {
    src: &'a str,
    pos: usize,
    out: String,
    xml: bool,
    /// Name of the most recently emitted tag.
    last_tag: Option<String>,
}

impl<'a> Minifier<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, at: usize, message: &str) -> anyhow::Error {
        let (line, col) = line_col(self.src, at);
        anyhow::anyhow!("markup error at {line}:{col}: {message}")
    }

    /// Index just past `needle` searching from `from`, or an error naming
    /// what was left open.
    fn find_end(&self, from: usize, needle: &str, what: &str) -> Result<usize> {
        match self.src[from..].find(needle) {
            Some(rel) => Ok(from + rel + needle.len()),
            None => Err(self.error(from, &format!("unterminated {what}"))),
        }
    }

    fn run(mut self) -> Result<String> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment()?;
            } else if rest.starts_with("<![CDATA[") {
                let end = self.find_end(self.pos, "]]>", "CDATA section")?;
                self.out.push_str(&self.src[self.pos..end]);
                self.pos = end;
            } else if rest.starts_with("<?") {
                let end = self.find_end(self.pos, "?>", "processing instruction")?;
                if !(self.xml && rest.starts_with("<?xml")) {
                    self.out.push_str(&self.src[self.pos..end]);
                }
                self.pos = end;
            } else if rest.starts_with("<!") {
                self.declaration()?;
            } else if is_tag_start(rest) {
                self.tag()?;
            } else {
                self.text();
            }
        }
        Ok(self.out)
    }

    fn comment(&mut self) -> Result<()> {
        let end = self.find_end(self.pos, "-->", "comment")?;
        let comment = &self.src[self.pos..end];
        // Conditional comments carry markup for old browsers.
        if !self.xml && (comment.starts_with("<!--[if") || comment.contains("<![endif]")) {
            self.out.push_str(comment);
        }
        self.pos = end;
        Ok(())
    }

    /// `<!DOCTYPE ...>`, possibly with an internal subset.
    fn declaration(&mut self) -> Result<()> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut i = start + 2;
        let mut depth = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => break,
                _ => {}
            }
            i += 1;
        }
        if i >= bytes.len() {
            return Err(self.error(start, "unterminated declaration"));
        }
        self.pos = i + 1;
        if !self.xml {
            self.out.push_str(&collapse_whitespace(&self.src[start..self.pos]));
        }
        Ok(())
    }

    fn tag(&mut self) -> Result<()> {
        let start = self.pos;
        let end = self.tag_end(start)?;
        let raw = &self.src[start..end];
        let closing = raw.starts_with("</");
        let self_closing = raw.ends_with("/>");
        let name = tag_name(raw);
        self.pos = end;

        if self.xml && name == "metadata" {
            if !closing && !self_closing {
                let close = self.find_closing(&name)?;
                self.pos = close;
            }
            return Ok(());
        }

        self.out.push_str(&compact_tag(raw));
        self.last_tag = Some(name.clone());

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !(self.xml && name == "pre");
        if raw_text && !closing && !self_closing {
            let content_end = self.find_closing_start(&name)?;
            self.out.push_str(&self.src[self.pos..content_end]);
            self.pos = content_end;
        }
        Ok(())
    }

    /// Index just past the `>` closing the tag at `start`, skipping quoted
    /// attribute values.
    fn tag_end(&self, start: usize) -> Result<usize> {
        let bytes = self.src.as_bytes();
        let mut i = start + 1;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => return Ok(i + 1),
                None => {}
            }
            i += 1;
        }
        Err(self.error(start, "unterminated tag"))
    }

    /// Start index of `</name` (case-insensitive) after the current position.
    fn find_closing_start(&self, name: &str) -> Result<usize> {
        let needle = format!("</{name}");
        let haystack = self.rest().to_ascii_lowercase();
        match haystack.find(&needle) {
            Some(rel) => Ok(self.pos + rel),
            None => Err(self.error(self.pos, &format!("unclosed <{name}>"))),
        }
    }

    /// Index just past `</name>`.
    fn find_closing(&self, name: &str) -> Result<usize> {
        let start = self.find_closing_start(name)?;
        self.tag_end(start)
    }

    fn text(&mut self) {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .skip(1)
            .find(|(i, _)| is_markup_start(&rest[*i..]))
            .map_or(rest.len(), |(i, _)| i);
        let text = &rest[..len];
        self.pos += len;

        let prev_inline = self
            .last_tag
            .as_ref()
            .is_some_and(|t| INLINE_ELEMENTS.contains(&t.as_str()));
        let next_name = tag_name(self.rest());
        let next_inline = is_tag_start(self.rest()) && INLINE_ELEMENTS.contains(&next_name.as_str());

        if text.trim().is_empty() {
            if !self.xml && prev_inline && next_inline {
                self.out.push(' ');
            }
            return;
        }

        let mut collapsed = collapse_whitespace(text);
        if !prev_inline {
            collapsed = collapsed.trim_start().to_string();
        }
        if !next_inline {
            collapsed = collapsed.trim_end().to_string();
        }
        self.out.push_str(&collapsed);
    }
}

fn is_tag_start(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('<')
        && match chars.next() {
            Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
            Some(c) => c.is_ascii_alphabetic(),
            None => false,
        }
}

fn is_markup_start(s: &str) -> bool {
    is_tag_start(s) || s.starts_with("<!") || s.starts_with("<?")
}

/// Lower-cased element name of a tag (opening or closing).
fn tag_name(raw: &str) -> String {
    raw.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '_'))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Collapse whitespace between attributes, leaving quoted values alone.
fn compact_tag(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in raw.chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            if c != '>' && c != '=' && !out.ends_with('=') {
                out.push(' ');
            }
            pending_space = false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(src: &str) -> String {
        MarkupMinifier::html().apply(src).unwrap()
    }

    fn svg(src: &str) -> String {
        MarkupMinifier::svg().apply(src).unwrap()
    }

    #[test]
    fn block_whitespace_and_comments_are_removed() {
        let src = "<!DOCTYPE html>\n<html>\n  <!-- nav -->\n  <body class=\"a  b\"   >\n    <p>\n      Hello\n      world\n    </p>\n  </body>\n</html>\n";
        assert_eq!(
            html(src),
            "<!DOCTYPE html><html><body class=\"a  b\"><p>Hello world</p></body></html>"
        );
    }

    #[test]
    fn inline_spacing_survives() {
        assert_eq!(html("<p><b>a</b> <i>b</i></p>"), "<p><b>a</b> <i>b</i></p>");
        assert_eq!(html("<p>see <a href=\"x\">this</a> now</p>"), "<p>see <a href=\"x\">this</a> now</p>");
    }

    #[test]
    fn raw_text_elements_are_verbatim() {
        let src = "<pre>\n  keep   this\n</pre>\n<script>\n  if (a < b) { x(); }\n</script>";
        assert_eq!(
            html(src),
            "<pre>\n  keep   this\n</pre><script>\n  if (a < b) { x(); }\n</script>"
        );
    }

    #[test]
    fn conditional_comments_are_kept() {
        let src = "<!--[if IE]><p>old</p><![endif]-->";
        assert_eq!(html(src), src);
    }

    #[test]
    fn svg_drops_prolog_doctype_and_metadata() {
        let src = "<?xml version=\"1.0\"?>\n<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"x\">\n<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <metadata><rdf>junk</rdf></metadata>\n  <!-- c -->\n  <path d=\"M0 0L10 10\"/>\n</svg>\n";
        assert_eq!(
            svg(src),
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><path d=\"M0 0L10 10\"/></svg>"
        );
    }

    #[test]
    fn unterminated_constructs_fail() {
        assert!(MarkupMinifier::html().apply("<p class=\"x").is_err());
        assert!(MarkupMinifier::html().apply("<!-- open").is_err());
    }
}
