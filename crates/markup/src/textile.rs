//! Textile input.

use std::sync::LazyLock;

use regex::Regex;

use crate::blocks::{build_repeated_list, is_blank, repeated_marker, to_lines};
use crate::error::MarkupError;
use crate::inline::parse_inline;
use crate::node::MarkupNode;
use crate::rules::TEXTILE;

/// `h2.`, `p.`, `bq.`, `bc.` with optional attribute blocks: `p(class).`
static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(h[1-6]|p|bq|bc|pre)(?:\([^)]*\)|\{[^}]*\}|\[[^\]]*\]|[<>=])*\.\s(.*)$")
        .expect("BUG: textile signature regex")
});

static PRE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<pre>(?:<code(?:\s+class="([^"]*)")?>)?(.*)$"#).expect("BUG: textile pre regex")
});

pub fn parse_textile(source: &str) -> MarkupNode {
    let lines = to_lines(source);
    MarkupNode::element("doc", blocks(&lines))
}

fn is_rule(line: &str) -> bool {
    matches!(line.trim(), "<hr />" | "<hr/>" | "<hr>" | "---" | "***")
}

fn starts_block(line: &str) -> bool {
    SIGNATURE.is_match(line)
        || PRE_OPEN.is_match(line)
        || is_rule(line)
        || repeated_marker(line).is_some()
        || line.starts_with('|')
}

/// Lines up to the next blank one, starting at `start`.
fn until_blank(lines: &[String], start: usize) -> usize {
    let mut end = start;
    while end < lines.len() && !is_blank(&lines[end]) {
        end += 1;
    }
    end
}

fn blocks(lines: &[String]) -> Vec<MarkupNode> {
    let mut out: Vec<MarkupNode> = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        let line = &lines[index];
        if is_blank(line) {
            index += 1;
            continue;
        }

        if let Some(caps) = SIGNATURE.captures(line) {
            let end = until_blank(lines, index + 1);
            let mut body = vec![caps[2].to_string()];
            body.extend(lines[index + 1..end].iter().cloned());
            let text = body.join("\n");
            match &caps[1] {
                "p" => out.push(MarkupNode::element("p", parse_inline(&text, &TEXTILE))),
                "bq" => {
                    let paragraph = MarkupNode::element("p", parse_inline(&text, &TEXTILE));
                    // Consecutive bq. paragraphs belong to one quote.
                    match out.last_mut() {
                        Some(MarkupNode::Element { tag, children, .. }) if *tag == "blockquote" => {
                            children.push(paragraph)
                        }
                        _ => out.push(MarkupNode::element("blockquote", vec![paragraph])),
                    }
                }
                "bc" | "pre" => out.push(MarkupNode::code_block(None, text)),
                heading => {
                    let level = heading[1..].parse().unwrap_or(1);
                    out.push(MarkupNode::heading(level, parse_inline(text.trim(), &TEXTILE)));
                }
            }
            index = end;
            continue;
        }

        if let Some(caps) = PRE_OPEN.captures(line) {
            let language = caps.get(1).map(|m| m.as_str().to_string());
            let close_tag = if line.starts_with("<pre><code") { "</code></pre>" } else { "</pre>" };
            let first = caps[2].to_string();
            let (node, next) = pre_block(lines, index, &first, close_tag, language.as_deref());
            out.push(node);
            index = next;
            continue;
        }

        if is_rule(line) {
            out.push(MarkupNode::element("hr", Vec::new()));
            index += 1;
            continue;
        }

        if repeated_marker(line).is_some() {
            let mut entries = Vec::new();
            while let Some((markers, text)) = lines.get(index).and_then(|l| repeated_marker(l)) {
                entries.push((markers, parse_inline(text, &TEXTILE)));
                index += 1;
            }
            out.extend(build_repeated_list(&entries, 0));
            continue;
        }

        if line.starts_with('|') {
            let end = until_blank(lines, index);
            out.push(table(&lines[index..end]));
            index = end;
            continue;
        }

        let mut end = index + 1;
        while end < lines.len() && !is_blank(&lines[end]) && !starts_block(&lines[end]) {
            end += 1;
        }
        let text = lines[index..end].join("\n");
        out.push(MarkupNode::element("p", parse_inline(&text, &TEXTILE)));
        index = end;
    }
    out
}

fn pre_block(
    lines: &[String],
    start: usize,
    first: &str,
    close_tag: &str,
    language: Option<&str>,
) -> (MarkupNode, usize) {
    if let Some(inner) = first.strip_suffix(close_tag) {
        return (MarkupNode::code_block(language, inner), start + 1);
    }
    let Some(close) = (start + 1..lines.len()).find(|&i| lines[i].contains(close_tag)) else {
        let error = MarkupError::syntax("textile", start + 1, format!("missing {}", close_tag));
        return (MarkupNode::Error(error), start + 1);
    };
    let mut body: Vec<&str> = Vec::new();
    if !first.is_empty() {
        body.push(first);
    }
    body.extend(lines[start + 1..close].iter().map(String::as_str));
    let tail = lines[close].split(close_tag).next().unwrap_or("");
    if !tail.is_empty() {
        body.push(tail);
    }
    (MarkupNode::code_block(language, body.join("\n")), close + 1)
}

fn table(rows: &[String]) -> MarkupNode {
    let rows = rows
        .iter()
        .map(|line| {
            let inner = line.trim().trim_start_matches('|');
            let inner = inner.strip_suffix('|').unwrap_or(inner);
            let cells = inner
                .split('|')
                .map(|cell| match cell.trim_start().strip_prefix("_.") {
                    Some(head) => MarkupNode::element("th", parse_inline(head.trim(), &TEXTILE)),
                    None => MarkupNode::element("td", parse_inline(cell.trim(), &TEXTILE)),
                })
                .collect();
            MarkupNode::element("tr", cells)
        })
        .collect();
    MarkupNode::element("table", rows)
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
    fn test_signatures() {
        let doc = parse_textile("h1. Title\n\np(lead). intro *bold*\n\nbq. q1\n\nbq. q2\n\nbc. raw *text*\n");
        assert_eq!(
            doc.children(),
            &[
                el("h1", vec![text("Title")]),
                el("p", vec![text("intro "), el("strong", vec![text("bold")])]),
                el(
                    "blockquote",
                    vec![el("p", vec![text("q1")]), el("p", vec![text("q2")])]
                ),
                MarkupNode::code_block(None, "raw *text*"),
            ]
        );
    }

    #[test]
    fn test_lists_and_rule() {
        let doc = parse_textile("* a\n** a1\n# n\n\n<hr />\n");
        assert_eq!(
            doc.children(),
            &[
                el(
                    "ul",
                    vec![el(
                        "li",
                        vec![text("a"), el("ul", vec![el("li", vec![text("a1")])])]
                    )]
                ),
                el("ol", vec![el("li", vec![text("n")])]),
                el("hr", vec![]),
            ]
        );
    }

    #[test]
    fn test_pre_code_and_table() {
        let doc = parse_textile(
            "<pre><code class=\"rust\">\nfn main() {}\n</code></pre>\n\n|_. name |_. n |\n| x | 10 |\n",
        );
        assert_eq!(doc.children()[0], MarkupNode::code_block(Some("rust"), "fn main() {}"));
        assert_eq!(
            doc.children()[1],
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
    fn test_unclosed_pre() {
        let doc = parse_textile("<pre>\ncode\n");
        assert!(matches!(doc.children()[0], MarkupNode::Error(_)));
    }

    #[test]
    fn test_newline_is_a_break() {
        let doc = parse_textile("one\ntwo\n");
        assert_eq!(
            doc.children(),
            &[el("p", vec![text("one"), el("br", vec![]), text("two")])]
        );
    }
}
