//! Indentation-based markup templates (`haml`).
//!
//! Supports the subset of Haml useful for embed snippets:
//!
//! ```text
//! -# comments are dropped, along with anything nested under them
//! %div.embed#main{ class: "wide", title: data.title }
//!   %h2= data.title
//!   %p Posted by #{data.author_name}
//!   %img{ src: data.thumbnail_url }/
//!   = data.html
//!   \= a literal equals sign
//! ```
//!
//! Output is indented two spaces per nesting level.

use anyhow::{bail, Result};

use super::expr::{self, Expr};
use super::{Bindings, TemplateEngine};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source",
];

/// Renders Haml-like templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct HamlEngine;

impl TemplateEngine for HamlEngine {
    fn name(&self) -> &'static str {
        "haml"
    }

    fn render(&self, source: &str, bindings: &Bindings<'_>) -> Result<String> {
        let lines: Vec<Line> = source
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| Line {
                number: i + 1,
                indent: l.len() - l.trim_start().len(),
                content: l.trim(),
            })
            .collect();

        let mut pos = 0;
        let nodes = parse_block(&lines, &mut pos, None)?;

        let mut out = String::new();
        render_nodes(&nodes, bindings, 0, &mut out);
        Ok(out)
    }
}

struct Line<'s> {
    number: usize,
    indent: usize,
    content: &'s str,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Output(Expr),
    Text(Vec<Segment>),
}

#[derive(Debug)]
struct Element {
    tag: String,
    classes: Vec<String>,
    id: Option<String>,
    attributes: Vec<(String, Expr)>,
    inline: Inline,
    self_closing: bool,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Inline {
    Empty,
    Text(Vec<Segment>),
    Output(Expr),
}

#[derive(Debug)]
enum Segment {
    Literal(String),
    Interpolated(Expr),
}

fn parse_block(lines: &[Line<'_>], pos: &mut usize, parent: Option<usize>) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut level = None;

    while let Some(line) = lines.get(*pos) {
        if parent.is_some_and(|p| line.indent <= p) {
            break;
        }
        let level = *level.get_or_insert(line.indent);
        if line.indent < level {
            break;
        }
        if line.indent > level {
            bail!("Illegal nesting on line {}", line.number);
        }
        *pos += 1;

        if line.content.starts_with("-#") {
            while lines.get(*pos).is_some_and(|l| l.indent > level) {
                *pos += 1;
            }
            continue;
        }

        let children = parse_block(lines, pos, Some(level))?;
        nodes.push(parse_line(line, children)?);
    }

    Ok(nodes)
}

fn parse_line(line: &Line<'_>, children: Vec<Node>) -> Result<Node> {
    let content = line.content;
    let leaf = |node: Node| -> Result<Node> {
        if children.is_empty() {
            Ok(node)
        } else {
            bail!("Illegal nesting under line {}", line.number)
        }
    };

    if let Some(rest) = content.strip_prefix('=') {
        return leaf(Node::Output(expr::parse(rest)?));
    }
    if let Some(rest) = content.strip_prefix('\\') {
        return leaf(Node::Text(interpolate(rest)?));
    }
    let starts_element = content.starts_with('%')
        || content.starts_with('.')
        || (content.starts_with('#') && !content.starts_with("#{"));
    if !starts_element {
        return leaf(Node::Text(interpolate(content)?));
    }

    let mut element = parse_element(content, line.number)?;
    if !children.is_empty() {
        if !matches!(element.inline, Inline::Empty) || element.self_closing {
            bail!(
                "Illegal nesting: content can't be both given on the same line and nested (line {})",
                line.number
            );
        }
        element.children = children;
    }
    Ok(Node::Element(element))
}

fn parse_element(content: &str, number: usize) -> Result<Element> {
    let mut tag = String::from("div");
    let mut classes = Vec::new();
    let mut id = None;
    let mut rest = content;

    if let Some(after) = rest.strip_prefix('%') {
        let (name, remaining) = take_name(after);
        if name.is_empty() {
            bail!("Missing tag name on line {}", number);
        }
        tag = name.to_string();
        rest = remaining;
    }

    loop {
        if let Some(after) = rest.strip_prefix('.') {
            let (name, remaining) = take_name(after);
            if name.is_empty() {
                bail!("Missing class name on line {}", number);
            }
            classes.push(name.to_string());
            rest = remaining;
        } else if let Some(after) = rest.strip_prefix('#') {
            let (name, remaining) = take_name(after);
            if name.is_empty() {
                bail!("Missing id on line {}", number);
            }
            id = Some(name.to_string());
            rest = remaining;
        } else {
            break;
        }
    }

    let mut attributes = Vec::new();
    if let Some(after) = rest.strip_prefix('{') {
        let close = closing_brace(after)
            .ok_or_else(|| anyhow::anyhow!("Unclosed attribute hash on line {}", number))?;
        attributes = parse_attributes(&after[..close], number)?;
        rest = &after[close + 1..];
    }

    let mut self_closing = VOID_TAGS.contains(&tag.as_str());
    let inline = if rest.starts_with('/') {
        self_closing = true;
        Inline::Empty
    } else if let Some(e) = rest.strip_prefix('=') {
        Inline::Output(expr::parse(e)?)
    } else if rest.is_empty() {
        Inline::Empty
    } else if rest.starts_with(char::is_whitespace) {
        Inline::Text(interpolate(rest.trim_start())?)
    } else {
        bail!("Invalid element on line {}: {}", number, content);
    };

    if self_closing && !matches!(inline, Inline::Empty) {
        bail!("Self-closing tags can't have content (line {})", number);
    }

    Ok(Element {
        tag,
        classes,
        id,
        attributes,
        inline,
        self_closing,
        children: Vec::new(),
    })
}

fn take_name(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == ':'))
        .unwrap_or(s.len());
    s.split_at(end)
}

/// Index of the `}` closing an attribute hash, skipping quoted strings.
fn closing_brace(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '}') => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') | (None, '[') => depth += 1,
            (None, ')') | (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_attributes(hash: &str, number: usize) -> Result<Vec<(String, Expr)>> {
    let mut attributes = Vec::new();

    for pair in split_top_level(hash) {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (key, value) = if let Some((k, v)) = pair.split_once("=>") {
            let k = k.trim();
            let k = k
                .strip_prefix(':')
                .unwrap_or(k)
                .trim_matches(|c| c == '"' || c == '\'');
            (k.to_string(), v)
        } else if let Some((k, v)) = pair.split_once(':') {
            (k.trim().trim_matches(|c| c == '"' || c == '\'').to_string(), v)
        } else {
            bail!("Invalid attribute `{}` on line {}", pair, number);
        };

        if key.is_empty() {
            bail!("Empty attribute name on line {}", number);
        }
        attributes.push((key, expr::parse(value)?));
    }

    Ok(attributes)
}

fn interpolate(text: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("#{") {
        if rest[..start].ends_with('\\') {
            literal.push_str(&rest[..start - 1]);
            literal.push_str("#{");
            rest = &rest[start + 2..];
            continue;
        }
        literal.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let close = closing_brace(after)
            .ok_or_else(|| anyhow::anyhow!("Unclosed interpolation in `{}`", text))?;
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Interpolated(expr::parse(&after[..close])?));
        rest = &after[close + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn render_segments(segments: &[Segment], bindings: &Bindings<'_>) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Literal(text) => text.clone(),
            Segment::Interpolated(e) => expr::evaluate_text(e, bindings),
        })
        .collect()
}

fn render_nodes(nodes: &[Node], bindings: &Bindings<'_>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);

    for node in nodes {
        match node {
            Node::Text(segments) => {
                out.push_str(&indent);
                out.push_str(&render_segments(segments, bindings));
                out.push('\n');
            }
            Node::Output(e) => {
                out.push_str(&indent);
                out.push_str(&expr::evaluate_text(e, bindings));
                out.push('\n');
            }
            Node::Element(element) => {
                out.push_str(&indent);
                out.push('<');
                out.push_str(&element.tag);
                push_attributes(element, bindings, out);

                if element.self_closing {
                    out.push_str(" />\n");
                    continue;
                }
                out.push('>');

                if element.children.is_empty() {
                    match &element.inline {
                        Inline::Empty => {}
                        Inline::Text(segments) => {
                            out.push_str(&render_segments(segments, bindings))
                        }
                        Inline::Output(e) => out.push_str(&expr::evaluate_text(e, bindings)),
                    }
                } else {
                    out.push('\n');
                    render_nodes(&element.children, bindings, depth + 1, out);
                    out.push_str(&indent);
                }

                out.push_str("</");
                out.push_str(&element.tag);
                out.push_str(">\n");
            }
        }
    }
}

fn push_attributes(element: &Element, bindings: &Bindings<'_>, out: &mut String) {
    let mut classes = element.classes.clone();
    let mut id = element.id.clone();
    let mut others = Vec::new();

    for (name, value) in &element.attributes {
        let value = expr::evaluate(value, bindings);
        if value.is_null() || value == serde_json::Value::Bool(false) {
            continue;
        }
        let text = crate::format::value_to_text(&value);
        match name.as_str() {
            "class" => classes.push(text),
            "id" => id = Some(text),
            _ => others.push((name.as_str(), text)),
        }
    }

    if !classes.is_empty() {
        push_attribute(out, "class", &classes.join(" "));
    }
    if let Some(id) = id {
        push_attribute(out, "id", &id);
    }
    for (name, text) in others {
        push_attribute(out, name, &text);
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("='");
    out.push_str(&htmlescape::encode_minimal(value).replace('\'', "&#39;"));
    out.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Metadata;
    use crate::response::Response;
    use crate::template::TemplateResolver;
    use serde_json::json;

    fn render(source: &str) -> Result<String> {
        let resolver = TemplateResolver::new();
        let data: Metadata = json!({
            "type": "photo",
            "url": "template!",
            "title": "Bacon",
            "author_name": "bees",
            "html": "<embed/>"
        })
        .as_object()
        .unwrap()
        .clone();
        let response = Response::new(None, "http://flic.kr/p/1", data.clone(), &resolver);
        let bindings = Bindings {
            url: "http://flic.kr/p/1",
            data: &data,
            response: &response,
        };
        HamlEngine.render(source, &bindings)
    }

    #[test]
    fn output_line() {
        assert_eq!(render("= data.url + \" haml\"\n").unwrap(), "template! haml\n");
    }

    #[test]
    fn plain_text_with_interpolation() {
        assert_eq!(render("by #{data.author_name}!").unwrap(), "by bees!\n");
        assert_eq!(render("\\#{not} interpolated").unwrap(), "#{not} interpolated\n");
    }

    #[test]
    fn element_with_inline_output() {
        assert_eq!(render("%h2= data.title").unwrap(), "<h2>Bacon</h2>\n");
    }

    #[test]
    fn element_with_inline_text() {
        assert_eq!(render("%p Hello #{data.title}").unwrap(), "<p>Hello Bacon</p>\n");
    }

    #[test]
    fn classes_ids_and_attributes() {
        let out = render(r#"%a.link#first{ href: url, title: data.title }= data.title"#).unwrap();
        assert_eq!(
            out,
            "<a class='link' id='first' href='http://flic.kr/p/1' title='Bacon'>Bacon</a>\n"
        );
    }

    #[test]
    fn hash_rocket_attributes() {
        let out = render(r#"%span{ :title => "a's" }"#).unwrap();
        assert_eq!(out, "<span title='a&#39;s'></span>\n");
    }

    #[test]
    fn implicit_div() {
        assert_eq!(render(".embed").unwrap(), "<div class='embed'></div>\n");
    }

    #[test]
    fn nesting_indents_children() {
        let source = "%div.embed\n  %p= data.title\n  = data.html\n";
        assert_eq!(
            render(source).unwrap(),
            "<div class='embed'>\n  <p>Bacon</p>\n  <embed/>\n</div>\n"
        );
    }

    #[test]
    fn void_and_explicit_self_closing_tags() {
        assert_eq!(
            render("%img{ src: data.url }").unwrap(),
            "<img src='template!' />\n"
        );
        assert_eq!(render("%thing/").unwrap(), "<thing />\n");
    }

    #[test]
    fn comments_drop_nested_lines() {
        let source = "-# hidden\n  %p nope\n%p yes\n";
        assert_eq!(render(source).unwrap(), "<p>yes</p>\n");
    }

    #[test]
    fn nil_attributes_are_omitted() {
        assert_eq!(
            render("%p{ title: data.missing }").unwrap(),
            "<p></p>\n"
        );
    }

    #[test]
    fn illegal_nesting_fails() {
        assert!(render("%p text\n  %span nested").is_err());
        assert!(render("plain\n  %span nested").is_err());
        assert!(render("%p\n    %a\n  %b").is_err());
    }
}
