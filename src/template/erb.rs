//! Embedded-expression templates (`erb` and `erubis`).
//!
//! # Syntax
//!
//! - `<%= expr %>` - output the value of an expression
//! - `<%== expr %>` - output raw (erb) or HTML-escaped (erubis)
//! - `<% if expr %>`, `<% unless expr %>`, `<% elsif expr %>`, `<% else %>`, `<% end %>`
//! - `<%# comment %>` - ignored
//! - `<%%` - a literal `<%`
//! - `-%>` - closes a tag and swallows the newline that follows it
//!
//! See the expression module for what `expr` may contain.

use anyhow::{bail, Result};

use super::expr::{self, Expr};
use super::{Bindings, TemplateEngine};

/// Renders embedded-expression templates.
///
/// # Example
///
/// ```
/// use oembed_links::template::{ErbEngine, TemplateEngine};
///
/// let engine = ErbEngine::erubis();
/// assert_eq!(engine.name(), "erubis");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ErbEngine {
    escape_double: bool,
}

impl ErbEngine {
    /// Plain embedded expressions.
    pub const fn erb() -> Self {
        Self {
            escape_double: false,
        }
    }

    /// Embedded expressions where `<%== %>` escapes HTML.
    pub const fn erubis() -> Self {
        Self {
            escape_double: true,
        }
    }
}

impl TemplateEngine for ErbEngine {
    fn name(&self) -> &'static str {
        if self.escape_double {
            "erubis"
        } else {
            "erb"
        }
    }

    fn render(&self, source: &str, bindings: &Bindings<'_>) -> Result<String> {
        let tags = scan(source)?;
        let mut tags = tags.into_iter();
        let (nodes, end) = build(&mut tags)?;
        match end {
            Terminator::Eof => {}
            Terminator::End => bail!("`end` without matching `if`"),
            Terminator::Else | Terminator::Elsif(_) => bail!("`else` without matching `if`"),
        }

        let mut out = String::new();
        self.render_nodes(&nodes, bindings, &mut out);
        Ok(out)
    }
}

impl ErbEngine {
    fn render_nodes(&self, nodes: &[Node], bindings: &Bindings<'_>, out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output { expr, double } => {
                    let text = expr::evaluate_text(expr, bindings);
                    if *double && self.escape_double {
                        out.push_str(&htmlescape::encode_minimal(&text));
                    } else {
                        out.push_str(&text);
                    }
                }
                Node::Conditional {
                    branches,
                    otherwise,
                } => {
                    let taken = branches.iter().find(|b| {
                        expr::truthy(&expr::evaluate(&b.condition, bindings)) != b.negate
                    });
                    match taken {
                        Some(branch) => self.render_nodes(&branch.body, bindings, out),
                        None => self.render_nodes(otherwise, bindings, out),
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
enum Tag {
    Text(String),
    Output { expr: Expr, double: bool },
    If { condition: Expr, negate: bool },
    Elsif(Expr),
    Else,
    End,
}

#[derive(Debug)]
enum Node {
    Text(String),
    Output {
        expr: Expr,
        double: bool,
    },
    Conditional {
        branches: Vec<Branch>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug)]
struct Branch {
    condition: Expr,
    negate: bool,
    body: Vec<Node>,
}

#[derive(Debug)]
enum Terminator {
    Eof,
    Elsif(Expr),
    Else,
    End,
}

fn scan(source: &str) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(start) = rest.find("<%") {
        text.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        if let Some(literal) = after.strip_prefix('%') {
            text.push_str("<%");
            rest = literal;
            continue;
        }

        let Some(close) = after.find("%>") else {
            bail!("Unclosed `<%` tag");
        };
        let mut body = &after[..close];
        rest = &after[close + 2..];

        if let Some(trimmed) = body.strip_suffix('-') {
            body = trimmed;
            rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
        }

        if !text.is_empty() {
            tags.push(Tag::Text(std::mem::take(&mut text)));
        }

        if body.starts_with('#') {
            continue;
        }
        if let Some(e) = body.strip_prefix("==") {
            tags.push(Tag::Output {
                expr: expr::parse(e)?,
                double: true,
            });
        } else if let Some(e) = body.strip_prefix('=') {
            tags.push(Tag::Output {
                expr: expr::parse(e)?,
                double: false,
            });
        } else {
            tags.push(statement(body.trim())?);
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        tags.push(Tag::Text(text));
    }
    Ok(tags)
}

fn statement(body: &str) -> Result<Tag> {
    let (keyword, argument) = body
        .split_once(char::is_whitespace)
        .map(|(k, a)| (k, a.trim()))
        .unwrap_or((body, ""));

    match keyword {
        "if" => Ok(Tag::If {
            condition: expr::parse(argument)?,
            negate: false,
        }),
        "unless" => Ok(Tag::If {
            condition: expr::parse(argument)?,
            negate: true,
        }),
        "elsif" => Ok(Tag::Elsif(expr::parse(argument)?)),
        "else" if argument.is_empty() => Ok(Tag::Else),
        "end" if argument.is_empty() => Ok(Tag::End),
        _ => bail!("Unsupported statement `{}`", body),
    }
}

fn build(tags: &mut impl Iterator<Item = Tag>) -> Result<(Vec<Node>, Terminator)> {
    let mut nodes = Vec::new();

    while let Some(tag) = tags.next() {
        match tag {
            Tag::Text(text) => nodes.push(Node::Text(text)),
            Tag::Output { expr, double } => nodes.push(Node::Output { expr, double }),
            Tag::If { condition, negate } => nodes.push(conditional(tags, condition, negate)?),
            Tag::Elsif(condition) => return Ok((nodes, Terminator::Elsif(condition))),
            Tag::Else => return Ok((nodes, Terminator::Else)),
            Tag::End => return Ok((nodes, Terminator::End)),
        }
    }

    Ok((nodes, Terminator::Eof))
}

fn conditional(
    tags: &mut impl Iterator<Item = Tag>,
    condition: Expr,
    negate: bool,
) -> Result<Node> {
    let mut branches = Vec::new();
    let mut condition = condition;
    let mut negate = negate;

    loop {
        let (body, end) = build(tags)?;
        branches.push(Branch {
            condition,
            negate,
            body,
        });
        match end {
            Terminator::Elsif(next) => {
                condition = next;
                negate = false;
            }
            Terminator::Else => {
                let (otherwise, end) = build(tags)?;
                if !matches!(end, Terminator::End) {
                    bail!("Expected `end` after `else`");
                }
                return Ok(Node::Conditional {
                    branches,
                    otherwise,
                });
            }
            Terminator::End => {
                return Ok(Node::Conditional {
                    branches,
                    otherwise: Vec::new(),
                })
            }
            Terminator::Eof => bail!("Missing `end` for `if`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Metadata;
    use crate::response::Response;
    use crate::template::TemplateResolver;
    use serde_json::json;

    fn render(engine: ErbEngine, source: &str) -> Result<String> {
        let resolver = TemplateResolver::new();
        let data: Metadata = json!({
            "type": "video",
            "url": "template!",
            "title": "<Dinosaurs & Birds>"
        })
        .as_object()
        .unwrap()
        .clone();
        let response = Response::new(
            Some("test1".to_string()),
            "http://test1.net/foo",
            data.clone(),
            &resolver,
        );
        let bindings = Bindings {
            url: "http://test1.net/foo",
            data: &data,
            response: &response,
        };
        engine.render(source, &bindings)
    }

    #[test]
    fn outputs_expressions() {
        let out = render(ErbEngine::erb(), "<%= data[\"url\"] %> rhtml\n").unwrap();
        assert_eq!(out, "template! rhtml\n");
    }

    #[test]
    fn binds_url_and_response() {
        let out = render(ErbEngine::erb(), "<%= url %>|<%= response.provider %>").unwrap();
        assert_eq!(out, "http://test1.net/foo|test1");
    }

    #[test]
    fn erubis_escapes_double_equals() {
        let out = render(ErbEngine::erubis(), "<%== data.title %>").unwrap();
        assert_eq!(out, "&lt;Dinosaurs &amp; Birds&gt;");
    }

    #[test]
    fn erb_double_equals_is_raw() {
        let out = render(ErbEngine::erb(), "<%== data.title %>").unwrap();
        assert_eq!(out, "<Dinosaurs & Birds>");
    }

    #[test]
    fn single_equals_is_raw_in_both() {
        let out = render(ErbEngine::erubis(), "<%= data.title %>").unwrap();
        assert_eq!(out, "<Dinosaurs & Birds>");
    }

    #[test]
    fn comments_and_literals() {
        let out = render(ErbEngine::erb(), "a<%# ignored %>b <%%= kept").unwrap();
        assert_eq!(out, "ab <%= kept");
    }

    #[test]
    fn dash_close_swallows_newline() {
        let out = render(ErbEngine::erb(), "<% if data.url -%>\nyes\n<% end -%>\n").unwrap();
        assert_eq!(out, "yes\n");
    }

    #[test]
    fn conditionals_pick_a_branch() {
        let source = r#"<% if data.type == "photo" %>photo<% elsif data.type == "video" %>video<% else %>other<% end %>"#;
        assert_eq!(render(ErbEngine::erb(), source).unwrap(), "video");

        let source = "<% unless data.html %>no html<% end %>";
        assert_eq!(render(ErbEngine::erb(), source).unwrap(), "no html");
    }

    #[test]
    fn unbalanced_blocks_fail() {
        assert!(render(ErbEngine::erb(), "<% if data.url %>x").is_err());
        assert!(render(ErbEngine::erb(), "x<% end %>").is_err());
        assert!(render(ErbEngine::erb(), "<%= data.url").is_err());
    }

    #[test]
    fn unsupported_statements_fail() {
        assert!(render(ErbEngine::erb(), "<% data.each do |x| %>").is_err());
    }
}
