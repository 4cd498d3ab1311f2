//! reStructuredText input.
//!
//! Section levels follow docutils: each new underline (or overline +
//! underline) style is assigned the next level in order of first use.

use std::sync::LazyLock;

use regex::Regex;

use crate::blocks::{
    BlockParser, ListMarker, adornment_char, collect_list, dedent, indent_of, is_blank,
    parse_marker, to_lines, trim_blank_edges,
};
use crate::inline::parse_inline;
use crate::node::MarkupNode;
use crate::rules::RST;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\.\s+([A-Za-z][\w-]*)::\s*(.*)$").expect("BUG: rst directive regex")
});

static TABLE_BORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+( +=+)+$").expect("BUG: rst table regex"));

pub fn parse_rst(source: &str) -> MarkupNode {
    let lines = to_lines(source);
    let mut parser = RstParser::default();
    MarkupNode::element("doc", parser.blocks(&lines))
}

#[derive(Default)]
struct RstParser {
    /// Section styles in order of first appearance: (char, has overline).
    styles: Vec<(char, bool)>,
}

impl RstParser {
    fn level_for(&mut self, style: (char, bool)) -> usize {
        match self.styles.iter().position(|s| *s == style) {
            Some(index) => index + 1,
            None => {
                self.styles.push(style);
                self.styles.len()
            }
        }
    }

    /// Lines of the indented block starting at `start`, and the index after it.
    fn indented_block(lines: &[String], start: usize) -> (Vec<String>, usize) {
        let mut end = start;
        while end < lines.len() && (is_blank(&lines[end]) || indent_of(&lines[end]) > 0) {
            end += 1;
        }
        let body = trim_blank_edges(&lines[start..end]);
        let width = body
            .iter()
            .filter(|l| !is_blank(l))
            .map(|l| indent_of(l))
            .min()
            .unwrap_or(0);
        (dedent(body, width), end)
    }

    fn directive(
        &self,
        name: &str,
        argument: &str,
        lines: &[String],
        start: usize,
    ) -> (Option<MarkupNode>, usize) {
        let (body, end) = Self::indented_block(lines, start + 1);
        let (options, content): (Vec<&String>, Vec<&String>) = {
            let split = body
                .iter()
                .position(|l| !l.starts_with(':'))
                .unwrap_or(body.len());
            (body[..split].iter().collect(), body[split..].iter().collect())
        };
        let content: Vec<String> = content.into_iter().cloned().collect();
        let content = trim_blank_edges(&content).join("\n");
        let node = match name {
            "code-block" | "code" | "sourcecode" => {
                Some(MarkupNode::code_block(Some(argument.trim()), content))
            }
            "image" => {
                let mut img = MarkupNode::element("img", Vec::new()).with_str_attr("src", argument.trim());
                for option in options {
                    if let Some(alt) = option.strip_prefix(":alt:") {
                        img = img.with_str_attr("alt", alt.trim());
                    }
                }
                Some(MarkupNode::element("p", vec![img]))
            }
            other => {
                log::debug!("rst: skipping directive {}", other);
                None
            }
        };
        (node, end)
    }

    fn simple_table(&self, lines: &[String], start: usize) -> (MarkupNode, usize) {
        let border = &lines[start];
        let mut columns = Vec::new();
        let mut column_start = None;
        for (i, c) in border.char_indices() {
            match (c, column_start) {
                ('=', None) => column_start = Some(i),
                (' ', Some(s)) => {
                    columns.push(s);
                    column_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = column_start {
            columns.push(s);
        }

        let mut sections: Vec<Vec<&String>> = vec![Vec::new()];
        let mut index = start + 1;
        while index < lines.len() {
            let line = &lines[index];
            if TABLE_BORDER.is_match(line) {
                index += 1;
                let last_border = lines.get(index).is_none_or(|next| is_blank(next));
                if last_border {
                    break;
                }
                sections.push(Vec::new());
                continue;
            }
            if is_blank(line) {
                index += 1;
                continue;
            }
            if let Some(section) = sections.last_mut() {
                section.push(line);
            }
            index += 1;
        }

        let split_row = |line: &str| -> Vec<Vec<MarkupNode>> {
            columns
                .iter()
                .enumerate()
                .map(|(col, &from)| {
                    let to = columns.get(col + 1).copied().unwrap_or(line.len());
                    let cell = line.get(from.min(line.len())..to.min(line.len())).unwrap_or("");
                    parse_inline(cell.trim(), &RST)
                })
                .collect()
        };
        let row = |line: &str, tag: &str| {
            let cells = split_row(line)
                .into_iter()
                .map(|cell| MarkupNode::element(tag, cell))
                .collect();
            MarkupNode::element("tr", cells)
        };

        let has_header = sections.len() > 1;
        let mut rows = Vec::new();
        for (section_index, section) in sections.iter().enumerate() {
            let tag = if has_header && section_index == 0 { "th" } else { "td" };
            rows.extend(section.iter().map(|line| row(line, tag)));
        }
        (MarkupNode::element("table", rows), index)
    }

    fn starts_block(&self, lines: &[String], index: usize) -> bool {
        let line = &lines[index];
        self.list_marker(line).is_some() || line.starts_with(".. ") || TABLE_BORDER.is_match(line)
    }

    fn paragraph(&mut self, lines: &[String], start: usize) -> (Vec<MarkupNode>, usize) {
        let mut end = start + 1;
        while end < lines.len() && !is_blank(&lines[end]) && indent_of(&lines[end]) == 0 {
            if self.starts_block(lines, end) {
                break;
            }
            end += 1;
        }
        let text = lines[start..end].join("\n");
        let mut out = Vec::new();
        // A paragraph ending in `::` introduces the following literal block.
        let literal = text.ends_with("::");
        let text = match text.strip_suffix("::") {
            Some("") => String::new(),
            Some(head) if head.ends_with(char::is_whitespace) => head.trim_end().to_string(),
            Some(head) => format!("{}:", head),
            None => text.clone(),
        };
        if !text.is_empty() {
            out.push(MarkupNode::element("p", parse_inline(&text, &RST)));
        }
        let mut index = end;
        if literal {
            while index < lines.len() && is_blank(&lines[index]) {
                index += 1;
            }
            if index < lines.len() && indent_of(&lines[index]) > 0 {
                let (body, next) = Self::indented_block(lines, index);
                out.push(MarkupNode::code_block(None, body.join("\n")));
                index = next;
            }
        }
        (out, index)
    }
}

impl BlockParser for RstParser {
    fn list_marker(&self, line: &str) -> Option<ListMarker> {
        parse_marker(line, "-*+", true, false)
    }

    fn blocks(&mut self, lines: &[String]) -> Vec<MarkupNode> {
        let mut out = Vec::new();
        let mut index = 0;
        while index < lines.len() {
            let line = &lines[index];
            if is_blank(line) {
                index += 1;
                continue;
            }

            if indent_of(line) > 0 {
                let (body, next) = Self::indented_block(lines, index);
                out.push(MarkupNode::element("blockquote", self.blocks(&body)));
                index = next;
                continue;
            }

            if let Some(caps) = DIRECTIVE.captures(line) {
                let (node, next) = self.directive(&caps[1], &caps[2], lines, index);
                out.extend(node);
                index = next;
                continue;
            }
            if line.starts_with("..") {
                // comment
                let (_, next) = Self::indented_block(lines, index + 1);
                index = next;
                continue;
            }

            if TABLE_BORDER.is_match(line) {
                let (table, next) = self.simple_table(lines, index);
                out.push(table);
                index = next;
                continue;
            }

            // Overlined section title.
            if let Some(c) = adornment_char(line, 2) {
                let title = lines.get(index + 1);
                let under = lines.get(index + 2).and_then(|l| adornment_char(l, 2));
                if let (Some(title), Some(u)) = (title, under) {
                    if u == c && !is_blank(title) {
                        let level = self.level_for((c, true));
                        let inline = parse_inline(title.trim(), &RST);
                        out.push(MarkupNode::heading(level, inline));
                        index += 3;
                        continue;
                    }
                }
                if adornment_char(line, 4).is_some()
                    && lines.get(index + 1).is_none_or(|next| is_blank(next))
                {
                    out.push(MarkupNode::element("hr", Vec::new()));
                    index += 1;
                    continue;
                }
            }

            // Underlined section title.
            if let Some(c) = lines.get(index + 1).and_then(|next| adornment_char(next, 1)) {
                if lines[index + 1].chars().count() >= line.trim().chars().count().min(4) {
                    let level = self.level_for((c, false));
                    out.push(MarkupNode::heading(level, parse_inline(line.trim(), &RST)));
                    index += 2;
                    continue;
                }
            }

            if self.list_marker(line).is_some() {
                if let Some((list, next)) = collect_list(self, lines, index) {
                    out.push(list);
                    index = next;
                    continue;
                }
            }

            let (nodes, next) = self.paragraph(lines, index);
            out.extend(nodes);
            index = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::AttrValue;

    fn text(s: &str) -> MarkupNode {
        MarkupNode::text(s)
    }

    fn el(tag: &str, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::element(tag, children)
    }

    #[test]
    fn test_sections_by_first_use() {
        let doc = parse_rst("Title\n=====\n\nSub\n---\n\nOther\n=====\n");
        assert_eq!(
            doc.children(),
            &[
                el("h1", vec![text("Title")]),
                el("h2", vec![text("Sub")]),
                el("h1", vec![text("Other")]),
            ]
        );
    }

    #[test]
    fn test_overline_and_transition() {
        let doc = parse_rst("=====\nTitle\n=====\n\npara\n\n----\n\nmore\n");
        let tags: Vec<_> = doc.children().iter().filter_map(|n| n.tag()).collect();
        assert_eq!(tags, vec!["h1", "p", "hr", "p"]);
    }

    #[test]
    fn test_lists_and_nesting() {
        let doc = parse_rst("- a\n- b\n\n  - inner\n\n3. three\n4. four\n");
        assert_eq!(
            doc.children()[0],
            el(
                "ul",
                vec![
                    el("li", vec![el("p", vec![text("a")])]),
                    el(
                        "li",
                        vec![
                            el("p", vec![text("b")]),
                            el("ul", vec![el("li", vec![text("inner")])]),
                        ]
                    ),
                ]
            )
        );
        assert_eq!(
            doc.children()[1],
            el("ol", vec![el("li", vec![text("three")]), el("li", vec![text("four")])])
                .with_attr("start", AttrValue::Int(3))
        );
    }

    #[test]
    fn test_code_directive_and_literal_block() {
        let doc = parse_rst(".. code-block:: python\n\n   print(1)\n\n   print(2)\n\nExample::\n\n    raw\n");
        assert_eq!(
            doc.children(),
            &[
                MarkupNode::code_block(Some("python"), "print(1)\n\nprint(2)"),
                el("p", vec![text("Example:")]),
                MarkupNode::code_block(None, "raw"),
            ]
        );
    }

    #[test]
    fn test_image_and_quote() {
        let doc = parse_rst("Intro\n\n   quoted text\n\n.. image:: cat.png\n   :alt: A cat\n");
        assert_eq!(
            doc.children(),
            &[
                el("p", vec![text("Intro")]),
                el("blockquote", vec![el("p", vec![text("quoted text")])]),
                el(
                    "p",
                    vec![el("img", vec![])
                        .with_str_attr("src", "cat.png")
                        .with_str_attr("alt", "A cat")]
                ),
            ]
        );
    }

    #[test]
    fn test_simple_table() {
        let doc = parse_rst("====  ==\nname  n\n====  ==\nx     10\n====  ==\n");
        assert_eq!(
            doc.children()[0],
            el(
                "table",
                vec![
                    el("tr", vec![el("th", vec![text("name")]), el("th", vec![text("n")])]),
                    el("tr", vec![el("td", vec![text("x")]), el("td", vec![text("10")])]),
                ]
            )
        );
    }

    #[test]
    fn test_simple_table_without_header() {
        let doc = parse_rst("==  ==\na   *b*\n==  ==\n\nafter\n");
        assert_eq!(
            doc.children(),
            &[
                el(
                    "table",
                    vec![el("tr", vec![el("td", vec![text("a")]), el("td", vec![el("em", vec![text("b")])])])]
                ),
                el("p", vec![text("after")]),
            ]
        );
    }
}
