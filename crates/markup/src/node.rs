//! Intermediate document tree built by the parsers.
//!
//! Parsers assemble plain owned nodes first and convert the finished tree
//! into items in one pass, so the recursive block parsers never need the
//! context.

use crate::error::MarkupError;
use mosaic_value::{Context, Item};

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Element {
        tag: String,
        attrs: Vec<(&'static str, AttrValue)>,
        children: Vec<MarkupNode>,
    },
    /// A block the parser gave up on; it becomes an error item in place.
    Error(MarkupError),
}

/// Block-level tags. Anything else is treated as inline content.
pub const BLOCK_TAGS: &[&str] = &[
    "doc",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "ul",
    "ol",
    "li",
    "pre",
    "blockquote",
    "hr",
    "table",
    "tr",
    "th",
    "td",
    "html",
    "jsx_element",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

impl MarkupNode {
    pub fn element(tag: impl Into<String>, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text(text.into())
    }

    pub fn heading(level: usize, children: Vec<MarkupNode>) -> Self {
        Self::element(format!("h{}", level.clamp(1, 6)), children)
    }

    /// `pre` wrapping a `code` element, with the language on the `code`.
    pub fn code_block(language: Option<&str>, literal: impl Into<String>) -> Self {
        let mut code = Self::element("code", vec![Self::text(literal)]);
        if let Some(lang) = language.filter(|lang| !lang.is_empty()) {
            code = code.with_attr("language", AttrValue::Str(lang.to_string()));
        }
        Self::element("pre", vec![code])
    }

    /// Raw passthrough block (`html`, `jsx_element`) holding its source.
    pub fn raw(tag: &str, content: impl Into<String>) -> Self {
        Self::element(tag, Vec::new()).with_attr("content", AttrValue::Str(content.into()))
    }

    pub fn with_attr(mut self, key: &'static str, value: AttrValue) -> Self {
        if let MarkupNode::Element { attrs, .. } = &mut self {
            attrs.retain(|(existing, _)| *existing != key);
            attrs.push((key, value));
        }
        self
    }

    pub fn with_str_attr(self, key: &'static str, value: impl Into<String>) -> Self {
        self.with_attr(key, AttrValue::Str(value.into()))
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    pub fn into_children(self) -> Vec<MarkupNode> {
        match self {
            MarkupNode::Element { children, .. } => children,
            other => vec![other],
        }
    }

    pub fn to_item(&self, ctx: &Context) -> Result<Item, MarkupError> {
        Ok(match self {
            MarkupNode::Text(text) => ctx.string(text)?,
            MarkupNode::Error(err) => ctx.error(err.to_diagnostic()),
            MarkupNode::Element {
                tag,
                attrs,
                children,
            } => {
                let mut element = ctx.element(tag)?;
                for (key, value) in attrs {
                    let value = match value {
                        AttrValue::Str(text) => ctx.string(text)?,
                        AttrValue::Int(number) => Item::make_int(*number),
                        AttrValue::Bool(flag) => Item::Bool(*flag),
                    };
                    element.attr(key, value)?;
                }
                for child in children {
                    element.child(child.to_item(ctx)?);
                }
                element.into_item()?
            }
        })
    }
}

/// Appends `node`, merging adjacent text runs.
pub fn push_inline(out: &mut Vec<MarkupNode>, node: MarkupNode) {
    match (out.last_mut(), node) {
        (_, MarkupNode::Text(text)) if text.is_empty() => {}
        (Some(MarkupNode::Text(last)), MarkupNode::Text(text)) => last.push_str(&text),
        (_, node) => out.push(node),
    }
}

/// Body of an item in a tight list: paragraphs dissolve into inline runs
/// because nothing separates them from the marker or from nested lists.
pub fn tighten_blocks(body: Vec<MarkupNode>) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    for block in body {
        if block.tag() == Some("p") {
            for inline in block.into_children() {
                push_inline(&mut out, inline);
            }
        } else {
            out.push(block);
        }
    }
    out
}
