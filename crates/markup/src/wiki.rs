//! MediaWiki input.

use std::sync::LazyLock;

use regex::Regex;

use crate::blocks::{build_repeated_list, is_blank, to_lines};
use crate::error::MarkupError;
use crate::inline::parse_inline;
use crate::node::MarkupNode;
use crate::rules::WIKI;

static CODE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<(syntaxhighlight|source|pre)(?:\s+lang="?([\w+#-]*)"?)?[^>]*>(.*)$"#)
        .expect("BUG: wiki code regex")
});

pub fn parse_wiki(source: &str) -> MarkupNode {
    let lines = to_lines(source);
    MarkupNode::element("doc", blocks(&lines))
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let lead = line.chars().take_while(|c| *c == '=').count();
    let trail = line.chars().rev().take_while(|c| *c == '=').count();
    if lead == 0 || trail == 0 || lead + trail >= line.len() {
        return None;
    }
    let level = lead.min(trail);
    let text = &line[level..line.len() - level];
    Some((level.min(6), text.trim_matches(|c: char| c == '=' || c == ' ')))
}

fn is_rule(line: &str) -> bool {
    line.len() >= 4 && line.chars().all(|c| c == '-')
}

/// Markers and text of a list line; the space after the markers is optional.
fn list_line(line: &str) -> Option<(String, &str)> {
    let markers: String = line.chars().take_while(|c| *c == '*' || *c == '#').collect();
    if markers.is_empty() {
        return None;
    }
    Some((markers.clone(), line[markers.len()..].trim()))
}

fn starts_block(line: &str) -> bool {
    heading(line).is_some()
        || is_rule(line)
        || list_line(line).is_some()
        || line.starts_with("{|")
        || line.starts_with(' ')
        || CODE_OPEN.is_match(line)
        || line.starts_with("<blockquote>")
}

/// Index of the line holding `close`, starting the search at `from`.
fn find_close(lines: &[String], from: usize, close: &str) -> Option<usize> {
    (from..lines.len()).find(|&i| lines[i].contains(close))
}

fn blocks(lines: &[String]) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        let line = &lines[index];
        if is_blank(line) {
            index += 1;
            continue;
        }

        if let Some((level, text)) = heading(line) {
            out.push(MarkupNode::heading(level, parse_inline(text, &WIKI)));
            index += 1;
            continue;
        }

        if is_rule(line) {
            out.push(MarkupNode::element("hr", Vec::new()));
            index += 1;
            continue;
        }

        if list_line(line).is_some() {
            let mut entries = Vec::new();
            while let Some((markers, text)) = lines.get(index).and_then(|l| list_line(l)) {
                entries.push((markers, parse_inline(text, &WIKI)));
                index += 1;
            }
            out.extend(build_repeated_list(&entries, 0));
            continue;
        }

        if line.starts_with("{|") {
            match find_close(lines, index + 1, "|}") {
                Some(close) => {
                    out.push(table(&lines[index + 1..close]));
                    index = close + 1;
                }
                None => {
                    out.push(MarkupNode::Error(MarkupError::syntax(
                        "wiki",
                        index + 1,
                        "table opened with {| is never closed",
                    )));
                    index += 1;
                }
            }
            continue;
        }

        if let Some(caps) = CODE_OPEN.captures(line) {
            let tag = caps[1].to_string();
            let language = caps.get(2).map(|m| m.as_str().to_string());
            let first = caps[3].to_string();
            let close_tag = format!("</{}>", tag);
            let (node, next) = code_block(lines, index, &first, &close_tag, language.as_deref());
            out.push(node);
            index = next;
            continue;
        }

        if line.starts_with("<blockquote>") {
            let (node, next) = blockquote(lines, index);
            out.push(node);
            index = next;
            continue;
        }

        if line.starts_with(' ') {
            let mut body = Vec::new();
            while let Some(l) = lines.get(index).filter(|l| l.starts_with(' ')) {
                body.push(&l[1..]);
                index += 1;
            }
            out.push(MarkupNode::code_block(None, body.join("\n")));
            continue;
        }

        let mut end = index + 1;
        while end < lines.len() && !is_blank(&lines[end]) && !starts_block(&lines[end]) {
            end += 1;
        }
        let text = lines[index..end].join("\n");
        out.push(MarkupNode::element("p", parse_inline(&text, &WIKI)));
        index = end;
    }
    out
}

fn code_block(
    lines: &[String],
    start: usize,
    first: &str,
    close_tag: &str,
    language: Option<&str>,
) -> (MarkupNode, usize) {
    // Single-line form: <pre>text</pre>
    if let Some(inner) = first.strip_suffix(close_tag) {
        return (MarkupNode::code_block(language, inner), start + 1);
    }
    let Some(close) = find_close(lines, start + 1, close_tag) else {
        let error = MarkupError::syntax("wiki", start + 1, format!("missing {}", close_tag));
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

fn blockquote(lines: &[String], start: usize) -> (MarkupNode, usize) {
    let mut depth = 0usize;
    for (index, line) in lines.iter().enumerate().skip(start) {
        depth += line.matches("<blockquote>").count();
        depth = depth.saturating_sub(line.matches("</blockquote>").count());
        if depth == 0 {
            let first = lines[start].trim_start_matches("<blockquote>").to_string();
            let mut inner: Vec<String> = Vec::new();
            if index == start {
                inner.push(first.trim_end_matches("</blockquote>").to_string());
            } else {
                inner.push(first);
                inner.extend(lines[start + 1..index].iter().cloned());
                inner.push(line.trim_end_matches("</blockquote>").to_string());
            }
            return (MarkupNode::element("blockquote", blocks(&inner)), index + 1);
        }
    }
    let error = MarkupError::syntax("wiki", start + 1, "missing </blockquote>");
    (MarkupNode::Error(error), start + 1)
}

/// Splits `a || b` (or `a !! b`) cells; `style="..." | text` keeps the text.
fn cells(line: &str, separator: &str) -> Vec<String> {
    line.split(separator)
        .map(|cell| match cell.split_once('|') {
            Some((attrs, text)) if attrs.contains('=') => text.trim().to_string(),
            _ => cell.trim().to_string(),
        })
        .collect()
}

fn table(body: &[String]) -> MarkupNode {
    let mut rows = Vec::new();
    let mut current: Vec<MarkupNode> = Vec::new();
    let flush = |current: &mut Vec<MarkupNode>, rows: &mut Vec<MarkupNode>| {
        if !current.is_empty() {
            rows.push(MarkupNode::element("tr", std::mem::take(current)));
        }
    };
    for line in body {
        let line = line.trim();
        if line.starts_with("|-") {
            flush(&mut current, &mut rows);
        } else if line.starts_with("|+") {
            // caption
        } else if let Some(rest) = line.strip_prefix('!') {
            for cell in cells(rest, "!!") {
                current.push(MarkupNode::element("th", parse_inline(&cell, &WIKI)));
            }
        } else if let Some(rest) = line.strip_prefix('|') {
            for cell in cells(rest, "||") {
                current.push(MarkupNode::element("td", parse_inline(&cell, &WIKI)));
            }
        }
    }
    flush(&mut current, &mut rows);
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
    fn test_headings_rules_and_paragraphs() {
        let doc = parse_wiki("= Title =\n\n== Sub ==\nsome '''bold'''\n\n----\n");
        assert_eq!(
            doc.children(),
            &[
                el("h1", vec![text("Title")]),
                el("h2", vec![text("Sub")]),
                el("p", vec![text("some "), el("strong", vec![text("bold")])]),
                el("hr", vec![]),
            ]
        );
    }

    #[test]
    fn test_nested_lists() {
        let doc = parse_wiki("* outer\n*# one\n*#two\n");
        assert_eq!(
            doc.children(),
            &[el(
                "ul",
                vec![el(
                    "li",
                    vec![
                        text("outer"),
                        el("ol", vec![el("li", vec![text("one")]), el("li", vec![text("two")])]),
                    ]
                )]
            )]
        );
    }

    #[test]
    fn test_table() {
        let doc = parse_wiki("{|\n! name !! n\n|-\n| x || 10\n|-\n| style=\"a\" | y || 20\n|}\n");
        let rows = doc.children()[0].children();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], el("tr", vec![el("th", vec![text("name")]), el("th", vec![text("n")])]));
        assert_eq!(rows[2].children()[0], el("td", vec![text("y")]));
    }

    #[test]
    fn test_unclosed_table_reports_and_continues() {
        let doc = parse_wiki("{|\n| a\n\nafter\n");
        assert!(matches!(
            doc.children()[0],
            MarkupNode::Error(MarkupError::Syntax { dialect: "wiki", line: 1, .. })
        ));
        assert_eq!(doc.children().last(), Some(&el("p", vec![text("after")])));
    }

    #[test]
    fn test_code_and_quote() {
        let doc = parse_wiki(
            "<syntaxhighlight lang=\"rust\">\nfn main() {}\n</syntaxhighlight>\n<pre>plain</pre>\n<blockquote>\nq1\n\nq2\n</blockquote>\n pre line\n",
        );
        assert_eq!(
            doc.children(),
            &[
                MarkupNode::code_block(Some("rust"), "fn main() {}"),
                MarkupNode::code_block(None, "plain"),
                el(
                    "blockquote",
                    vec![el("p", vec![text("q1")]), el("p", vec![text("q2")])]
                ),
                MarkupNode::code_block(None, "pre line"),
            ]
        );
    }
}
