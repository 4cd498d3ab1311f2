//! MDX: markdown with embedded JSX.
//!
//! Top-level JSX blocks, ESM `import`/`export` lines and `{expression}`
//! blocks are cut out of the source before comrak sees it and kept as
//! `jsx_element` nodes whose `content` attribute is the raw source.

use crate::markdown::parse_markdown_blocks;
use crate::node::MarkupNode;

pub fn parse_mdx(source: &str) -> MarkupNode {
    let mut blocks = Vec::new();
    let mut markdown = String::new();
    let lines: Vec<&str> = source.lines().collect();
    let mut fence: Option<&str> = None;
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        let trimmed = line.trim_start();

        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            push_line(&mut markdown, line);
            index += 1;
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(&trimmed[..3]);
            push_line(&mut markdown, line);
            index += 1;
            continue;
        }

        let starts_jsx = line == trimmed && (is_esm(line) || is_jsx_start(line) || line.starts_with('{'));
        if !starts_jsx || !at_block_start(&markdown) {
            push_line(&mut markdown, line);
            index += 1;
            continue;
        }

        flush_markdown(&mut markdown, &mut blocks);
        let end = if is_esm(line) {
            paragraph_end(&lines, index)
        } else if line.starts_with('{') {
            brace_end(&lines, index)
        } else {
            jsx_end(&lines, index)
        };
        let content = lines[index..end].join("\n");
        log::trace!("mdx: jsx block of {} lines", end - index);
        blocks.push(MarkupNode::raw("jsx_element", content));
        index = end;
    }
    flush_markdown(&mut markdown, &mut blocks);
    MarkupNode::element("doc", blocks)
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}

/// JSX only opens a block where a new markdown block could start.
fn at_block_start(markdown: &str) -> bool {
    markdown.is_empty() || markdown.ends_with("\n\n") || markdown.trim().is_empty()
}

fn flush_markdown(markdown: &mut String, blocks: &mut Vec<MarkupNode>) {
    if !markdown.trim().is_empty() {
        blocks.extend(parse_markdown_blocks(markdown));
    }
    markdown.clear();
}

fn is_esm(line: &str) -> bool {
    line.starts_with("import ") || line.starts_with("export ")
}

fn is_jsx_start(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('<')
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '>')
}

fn paragraph_end(lines: &[&str], start: usize) -> usize {
    lines[start..]
        .iter()
        .position(|line| line.trim().is_empty())
        .map_or(lines.len(), |offset| start + offset)
}

fn brace_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i64 = 0;
    for (offset, line) in lines[start..].iter().enumerate() {
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        if depth <= 0 {
            return start + offset + 1;
        }
    }
    lines.len()
}

/// Line index just past the point where the tags opened at `start` balance.
fn jsx_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i64 = 0;
    for (offset, line) in lines[start..].iter().enumerate() {
        depth += tag_balance(line);
        if depth <= 0 {
            return start + offset + 1;
        }
    }
    lines.len()
}

/// Opening tags minus closing tags on one line; self-closing tags count zero.
fn tag_balance(line: &str) -> i64 {
    let bytes = line.as_bytes();
    let mut balance = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let Some(close) = line[i..].find('>') else {
            break;
        };
        let tag = &line[i + 1..i + close];
        if tag.starts_with('/') {
            balance -= 1;
        } else if tag.is_empty() || tag.starts_with(|c: char| c.is_ascii_alphabetic()) {
            if !tag.ends_with('/') {
                balance += 1;
            }
        }
        i += close + 1;
    }
    balance
}
