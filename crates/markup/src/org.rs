//! Org mode input.

use std::sync::LazyLock;

use regex::Regex;

use crate::blocks::{
    BlockParser, ListMarker, collect_list, dedent, indent_of, is_blank, parse_marker, to_lines,
};
use crate::error::MarkupError;
use crate::inline::parse_inline;
use crate::node::MarkupNode;
use crate::rules::ORG;

/// Stars, title, and optional trailing `:tag:` list.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*+)\s+(.*?)(?:\s+:[\w@#%:]+:)?\s*$").expect("BUG: org heading regex")
});

static BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^#\+begin_(\w+)\s*(.*)$").expect("BUG: org block regex"));

pub fn parse_org(source: &str) -> MarkupNode {
    let lines = to_lines(source);
    MarkupNode::element("doc", OrgParser.blocks(&lines))
}

struct OrgParser;

fn is_rule(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 5 && line.chars().all(|c| c == '-')
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("|-") && line.chars().all(|c| matches!(c, '|' | '-' | '+' | ':'))
}

fn is_drawer_start(line: &str) -> bool {
    let line = line.trim();
    line.len() > 2
        && line.starts_with(':')
        && line.ends_with(':')
        && !line.eq_ignore_ascii_case(":end:")
        && line[1..line.len() - 1].chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_keyword_or_comment(line: &str) -> bool {
    let line = line.trim_start();
    line == "#" || line.starts_with("# ") || (line.starts_with("#+") && !BEGIN.is_match(line))
}

impl OrgParser {
    /// `#+BEGIN_x` ... `#+END_x`. An unterminated block becomes an error
    /// node and parsing resumes on the line after the opener.
    fn delimited(
        &mut self,
        name: &str,
        argument: &str,
        lines: &[String],
        start: usize,
    ) -> (MarkupNode, usize) {
        let name = name.to_ascii_lowercase();
        let end_marker = format!("#+end_{}", name);
        let Some(close) = lines[start + 1..]
            .iter()
            .position(|l| l.trim().eq_ignore_ascii_case(&end_marker))
            .map(|offset| start + 1 + offset)
        else {
            let error = MarkupError::syntax(
                "org",
                start + 1,
                format!("#+BEGIN_{} without #+END_{}", name.to_uppercase(), name.to_uppercase()),
            );
            return (MarkupNode::Error(error), start + 1);
        };
        let body = &lines[start + 1..close];
        let node = match name.as_str() {
            "src" => {
                let language = argument.split_whitespace().next();
                MarkupNode::code_block(language, literal(body))
            }
            "example" => MarkupNode::code_block(None, literal(body)),
            "quote" => MarkupNode::element("blockquote", self.blocks(body)),
            other => {
                log::debug!("org: unwrapping #+BEGIN_{} block", other);
                MarkupNode::element("doc", self.blocks(body))
            }
        };
        (node, close + 1)
    }

    fn table(&self, lines: &[String], start: usize) -> (MarkupNode, usize) {
        let mut end = start;
        while end < lines.len() && is_table_line(&lines[end]) {
            end += 1;
        }
        let rows = &lines[start..end];
        // A rule after the first data row marks the rows above it as header.
        let header_rows = rows
            .iter()
            .position(|l| is_separator_row(l))
            .filter(|&at| at > 0 && at + 1 < rows.len())
            .unwrap_or(0);
        let mut out = Vec::new();
        for (index, line) in rows.iter().enumerate() {
            if is_separator_row(line) {
                continue;
            }
            let tag = if index < header_rows { "th" } else { "td" };
            let cells = split_cells(line)
                .into_iter()
                .map(|cell| MarkupNode::element(tag, parse_inline(cell, &ORG)))
                .collect();
            out.push(MarkupNode::element("tr", cells));
        }
        (MarkupNode::element("table", out), end)
    }

    fn starts_block(&self, line: &str) -> bool {
        HEADING.is_match(line)
            || BEGIN.is_match(line.trim_start())
            || is_keyword_or_comment(line)
            || is_rule(line)
            || is_table_line(line)
            || self.list_marker(line.trim_start()).is_some()
    }

    fn paragraph(&self, lines: &[String], start: usize) -> (MarkupNode, usize) {
        let mut end = start + 1;
        while end < lines.len() && !is_blank(&lines[end]) && !self.starts_block(&lines[end]) {
            end += 1;
        }
        let text = lines[start..end]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n");
        (MarkupNode::element("p", parse_inline(&text, &ORG)), end)
    }
}

/// Block body with the common indentation removed.
fn literal(body: &[String]) -> String {
    let width = body
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    dedent(body, width).join("\n")
}

fn split_cells(line: &str) -> Vec<&str> {
    let line = line.trim();
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

impl BlockParser for OrgParser {
    fn list_marker(&self, line: &str) -> Option<ListMarker> {
        parse_marker(line, "-+", false, true)
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

            if let Some(caps) = HEADING.captures(line) {
                let level = caps[1].len();
                out.push(MarkupNode::heading(level, parse_inline(caps[2].trim(), &ORG)));
                index += 1;
                continue;
            }

            if let Some(caps) = BEGIN.captures(line.trim_start()) {
                let (node, next) = self.delimited(&caps[1], caps[2].trim(), lines, index);
                match node {
                    MarkupNode::Element { tag, children, .. } if tag == "doc" => {
                        out.extend(children)
                    }
                    node => out.push(node),
                }
                index = next;
                continue;
            }

            if is_drawer_start(line) {
                let close = lines[index + 1..]
                    .iter()
                    .position(|l| l.trim().eq_ignore_ascii_case(":end:"));
                if let Some(offset) = close {
                    index += offset + 2;
                    continue;
                }
            }

            if is_keyword_or_comment(line) {
                index += 1;
                continue;
            }

            if is_rule(line) {
                out.push(MarkupNode::element("hr", Vec::new()));
                index += 1;
                continue;
            }

            if is_table_line(line) {
                let (table, next) = self.table(lines, index);
                out.push(table);
                index = next;
                continue;
            }

            if self.list_marker(line.trim_start()).is_some() {
                if let Some((list, next)) = collect_list(self, lines, index) {
                    out.push(list);
                    index = next;
                    continue;
                }
            }

            let (paragraph, next) = self.paragraph(lines, index);
            out.push(paragraph);
            index = next;
        }
        out
    }
}
