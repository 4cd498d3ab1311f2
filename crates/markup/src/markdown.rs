//! Markdown input through comrak's CommonMark + GFM parser.

use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{Arena, Options, parse_document};

use crate::node::{AttrValue, MarkupNode, push_inline, tighten_blocks};

pub(crate) fn comrak_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.render.unsafe_ = true;
    options
}

/// Parses a markdown document into a `doc` node.
pub fn parse_markdown(source: &str) -> MarkupNode {
    MarkupNode::element("doc", parse_markdown_blocks(source))
}

/// Top-level blocks of `source`, without the `doc` wrapper.
pub(crate) fn parse_markdown_blocks(source: &str) -> Vec<MarkupNode> {
    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, source, &options);
    let blocks = collect_blocks(root, false);
    log::trace!("markdown: {} top-level blocks", blocks.len());
    blocks
}

fn collect_blocks<'a>(parent: &'a AstNode<'a>, tight: bool) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    for child in parent.children() {
        if let Some(node) = convert_block(child, tight) {
            out.push(node);
        }
    }
    out
}

fn convert_block<'a>(node: &'a AstNode<'a>, tight: bool) -> Option<MarkupNode> {
    let value = node.data.borrow().value.clone();
    Some(match value {
        NodeValue::Heading(heading) => {
            MarkupNode::heading(heading.level as usize, collect_inlines(node))
        }
        NodeValue::Paragraph => {
            let inlines = collect_inlines(node);
            MarkupNode::element("p", inlines)
        }
        NodeValue::List(list) => {
            let ordered = list.list_type == ListType::Ordered;
            let items = collect_blocks(node, list.tight);
            let mut element = MarkupNode::element(if ordered { "ol" } else { "ul" }, items);
            if ordered && list.start != 1 {
                element = element.with_attr("start", AttrValue::Int(list.start as i64));
            }
            element
        }
        NodeValue::Item(_) => list_item(node, tight, None),
        NodeValue::TaskItem(mark) => list_item(node, tight, Some(mark.is_some())),
        NodeValue::CodeBlock(block) => {
            let literal = block.literal.strip_suffix('\n').unwrap_or(&block.literal);
            let language = block.info.split_whitespace().next();
            MarkupNode::code_block(language, literal)
        }
        NodeValue::HtmlBlock(html) => {
            MarkupNode::raw("html", html.literal.trim_end_matches('\n'))
        }
        NodeValue::ThematicBreak => MarkupNode::element("hr", Vec::new()),
        NodeValue::BlockQuote => MarkupNode::element("blockquote", collect_blocks(node, false)),
        NodeValue::Table(_) => MarkupNode::element("table", collect_blocks(node, false)),
        NodeValue::TableRow(header) => {
            let cell_tag = if header { "th" } else { "td" };
            let cells = node
                .children()
                .map(|cell| MarkupNode::element(cell_tag, collect_inlines(cell)))
                .collect();
            MarkupNode::element("tr", cells)
        }
        NodeValue::FrontMatter(_) => return None,
        other => {
            log::debug!("markdown: skipping unsupported block {:?}", other);
            return None;
        }
    })
}

fn list_item<'a>(node: &'a AstNode<'a>, tight: bool, checked: Option<bool>) -> MarkupNode {
    let body = collect_blocks(node, tight);
    let body = if tight { tighten_blocks(body) } else { body };
    let item = MarkupNode::element("li", body);
    match checked {
        Some(flag) => item.with_attr("checked", AttrValue::Bool(flag)),
        None => item,
    }
}

fn collect_inlines<'a>(parent: &'a AstNode<'a>) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    for child in parent.children() {
        convert_inline(child, &mut out);
    }
    out
}

fn convert_inline<'a>(node: &'a AstNode<'a>, out: &mut Vec<MarkupNode>) {
    let value = node.data.borrow().value.clone();
    let wrap = |tag: &str| MarkupNode::element(tag, collect_inlines(node));
    let inline = match value {
        NodeValue::Text(text) => MarkupNode::Text(text),
        NodeValue::SoftBreak => MarkupNode::text("\n"),
        NodeValue::LineBreak => MarkupNode::element("br", Vec::new()),
        NodeValue::Code(code) => MarkupNode::element("code", vec![MarkupNode::Text(code.literal)]),
        NodeValue::Emph => wrap("em"),
        NodeValue::Strong => wrap("strong"),
        NodeValue::Strikethrough => wrap("s"),
        NodeValue::Link(link) => {
            let mut element = wrap("a").with_str_attr("href", link.url);
            if !link.title.is_empty() {
                element = element.with_str_attr("title", link.title);
            }
            element
        }
        NodeValue::Image(link) => {
            let alt = MarkupNode::element("alt", collect_inlines(node));
            let mut alt_text = String::new();
            flatten_text(&alt, &mut alt_text);
            let mut element = MarkupNode::element("img", Vec::new()).with_str_attr("src", link.url);
            if !alt_text.is_empty() {
                element = element.with_str_attr("alt", alt_text);
            }
            if !link.title.is_empty() {
                element = element.with_str_attr("title", link.title);
            }
            element
        }
        NodeValue::HtmlInline(html) => MarkupNode::raw("html", html),
        other => {
            log::debug!("markdown: flattening unsupported inline {:?}", other);
            for child in collect_inlines(node) {
                push_inline(out, child);
            }
            return;
        }
    };
    push_inline(out, inline);
}

fn flatten_text(node: &MarkupNode, out: &mut String) {
    match node {
        MarkupNode::Text(text) => out.push_str(text),
        _ => node.children().iter().for_each(|child| flatten_text(child, out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> MarkupNode {
        MarkupNode::text(s)
    }

    fn el(tag: &str, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::element(tag, children)
    }

    #[test]
    fn test_parse_basic_document() {
        let doc = parse_markdown("# H\n\npara with **bold** and *em*.\n\n- a\n- b\n");
        assert_eq!(
            doc,
            el(
                "doc",
                vec![
                    el("h1", vec![text("H")]),
                    el(
                        "p",
                        vec![
                            text("para with "),
                            el("strong", vec![text("bold")]),
                            text(" and "),
                            el("em", vec![text("em")]),
                            text("."),
                        ]
                    ),
                    el("ul", vec![el("li", vec![text("a")]), el("li", vec![text("b")])]),
                ]
            )
        );
    }

    #[test]
    fn test_code_fence_language() {
        let doc = parse_markdown("```rust\nfn main() {}\n```\n");
        assert_eq!(doc.children()[0], MarkupNode::code_block(Some("rust"), "fn main() {}"));
    }

    #[test]
    fn test_gfm_extensions() {
        let doc = parse_markdown("- [x] done\n- [ ] todo\n\n~~old~~\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n");
        let blocks = doc.children();
        assert_eq!(
            blocks[0],
            el(
                "ul",
                vec![
                    el("li", vec![text("done")]).with_attr("checked", AttrValue::Bool(true)),
                    el("li", vec![text("todo")]).with_attr("checked", AttrValue::Bool(false)),
                ]
            )
        );
        assert_eq!(blocks[1], el("p", vec![el("s", vec![text("old")])]));
        assert_eq!(blocks[2].tag(), Some("table"));
        assert_eq!(blocks[2].children()[0].children()[0], el("th", vec![text("a")]));
        assert_eq!(blocks[2].children()[1].children()[1], el("td", vec![text("2")]));
    }

    #[test]
    fn test_loose_list_keeps_paragraphs() {
        let doc = parse_markdown("- a\n\n- b\n");
        let list = &doc.children()[0];
        assert_eq!(list.children()[0], el("li", vec![el("p", vec![text("a")])]));
    }

    #[test]
    fn test_ordered_start_and_links() {
        let doc = parse_markdown("3. [x](https://x.org \"t\") ![pic](a.png)\n");
        let list = &doc.children()[0];
        assert_eq!(list.tag(), Some("ol"));
        assert_eq!(
            list,
            &el(
                "ol",
                vec![el(
                    "li",
                    vec![
                        el("a", vec![text("x")])
                            .with_str_attr("href", "https://x.org")
                            .with_str_attr("title", "t"),
                        text(" "),
                        el("img", vec![])
                            .with_str_attr("src", "a.png")
                            .with_str_attr("alt", "pic"),
                    ]
                )]
            )
            .with_attr("start", AttrValue::Int(3))
        );
    }
}
