//! Span-level scanner for the hand-written dialect parsers.
//!
//! Delimiters come from the dialect's [`MarkupOutputRules`], so whatever
//! the emitter writes this scanner reads back.

use std::sync::LazyLock;

use regex::Regex;

use crate::node::{MarkupNode, push_inline};
use crate::rules::{Delimiters, ImageStyle, LinkStyle, MarkupOutputRules};

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s<>]*[^\s<>.,;:!?)]").expect("BUG: url regex"));

static RST_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^`([^`<]*?)\s*<([^>`]+)>`__?").expect("BUG: rst link regex")
});

static WIKI_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<br\s*/?>").expect("BUG: wiki break regex"));

static TEXTILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"([^"]+)":(\S*[^\s.,;:!?)"])"#).expect("BUG: textile link regex")
});

static TEXTILE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!([^\s!(]+)(?:\(([^)]*)\))?!").expect("BUG: textile image regex")
});

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

fn looks_like_image(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Parses one paragraph's worth of text into inline nodes.
pub fn parse_inline(text: &str, rules: &MarkupOutputRules) -> Vec<MarkupNode> {
    let scanner = Scanner { rules, text };
    scanner.run(0, text.len())
}

struct Scanner<'a> {
    rules: &'a MarkupOutputRules,
    text: &'a str,
}

fn is_flanking_char(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || (c.is_ascii_punctuation() && c != '\\'),
    }
}

/// Delimiters made of one repeated punctuation character need word
/// boundaries around them; tag-like ones (`<s>`) do not.
fn needs_flanking(delimiter: &str) -> bool {
    let mut chars = delimiter.chars();
    match chars.next() {
        Some(first) if first.is_ascii_punctuation() && first != '<' => chars.all(|c| c == first),
        _ => false,
    }
}

impl<'a> Scanner<'a> {
    fn before(&self, pos: usize) -> Option<char> {
        self.text[..pos].chars().next_back()
    }

    fn after(&self, pos: usize) -> Option<char> {
        self.text[pos..].chars().next()
    }

    /// Length of the run of `c` starting at `pos`.
    fn run_length(&self, pos: usize, c: char) -> usize {
        self.text[pos..].chars().take_while(|&x| x == c).count()
    }

    fn exact_run(&self, pos: usize, delimiter: &str) -> bool {
        match delimiter.chars().next() {
            Some(c) if needs_flanking(delimiter) => {
                self.run_length(pos, c) == delimiter.chars().count()
            }
            _ => true,
        }
    }

    fn can_open(&self, pos: usize, delimiter: &str) -> bool {
        let inner = self.after(pos + delimiter.len());
        if inner.is_none_or(char::is_whitespace) {
            return false;
        }
        if needs_flanking(delimiter) {
            // A run that continues backwards is part of a longer delimiter.
            let first = delimiter.chars().next();
            if self.before(pos) == first {
                return false;
            }
            return is_flanking_char(self.before(pos)) && self.exact_run(pos, delimiter);
        }
        true
    }

    fn can_close(&self, pos: usize, delimiter: &str) -> bool {
        if self.before(pos).is_none_or(char::is_whitespace) {
            return false;
        }
        if needs_flanking(delimiter) {
            let first = delimiter.chars().next();
            if self.before(pos) == first {
                return false;
            }
            return is_flanking_char(self.after(pos + delimiter.len()))
                && self.exact_run(pos, delimiter);
        }
        true
    }

    /// Position of the closing delimiter for a span opened at `start`.
    fn find_close(&self, start: usize, end: usize, delimiter: &Delimiters) -> Option<usize> {
        let mut search = start;
        while search < end {
            let offset = self.text[search..end].find(delimiter.close)?;
            let pos = search + offset;
            if pos > start && self.can_close(pos, delimiter.close) {
                return Some(pos);
            }
            search = pos + delimiter.close.len().max(1);
        }
        None
    }

    fn run(&self, start: usize, end: usize) -> Vec<MarkupNode> {
        let mut out = Vec::new();
        let mut pos = start;
        while pos < end {
            if let Some((node, next)) = self.scan_at(pos, end) {
                push_inline(&mut out, node);
                pos = next;
                continue;
            }
            let Some(c) = self.after(pos) else {
                break;
            };
            if c == '\n' && self.rules.newline_breaks {
                push_inline(&mut out, MarkupNode::element("br", Vec::new()));
            } else {
                push_inline(&mut out, MarkupNode::Text(c.to_string()));
            }
            pos += c.len_utf8();
        }
        out
    }

    fn scan_at(&self, pos: usize, end: usize) -> Option<(MarkupNode, usize)> {
        let text: &'a str = self.text;
        let rest = &text[pos..end];
        let rules = self.rules;

        if let Some(special) = rules.escape {
            if let Some(escaped) = rest.strip_prefix('\\').and_then(|r| r.chars().next()) {
                if special.contains(escaped) {
                    let next = pos + 1 + escaped.len_utf8();
                    return Some((MarkupNode::Text(escaped.to_string()), next));
                }
            }
        }

        if let Some(node) = self.scan_break(pos, rest) {
            return Some(node);
        }

        if rest.starts_with(rules.code.open) && self.can_open(pos, rules.code.open) {
            let body = pos + rules.code.open.len();
            if let Some(close) = self.find_close(body, end, &rules.code) {
                let literal = &self.text[body..close];
                let node = MarkupNode::element("code", vec![MarkupNode::text(literal)]);
                return Some((node, close + rules.code.close.len()));
            }
        }

        if let Some(found) = self.scan_image(pos, rest) {
            return Some(found);
        }
        if let Some(found) = self.scan_link(pos, rest) {
            return Some(found);
        }

        for (tag, delimiter) in rules.span_delimiters() {
            if !rest.starts_with(delimiter.open) || !self.can_open(pos, delimiter.open) {
                continue;
            }
            let body = pos + delimiter.open.len();
            if let Some(close) = self.find_close(body, end, &delimiter) {
                let children = self.run(body, close);
                let node = MarkupNode::element(tag, children);
                return Some((node, close + delimiter.close.len()));
            }
        }
        None
    }

    fn scan_break(&self, pos: usize, rest: &str) -> Option<(MarkupNode, usize)> {
        let br = || MarkupNode::element("br", Vec::new());
        match self.rules.link {
            LinkStyle::Wiki => {
                let found = WIKI_BREAK.find(rest)?;
                let mut next = pos + found.end();
                if self.after(next) == Some('\n') {
                    next += 1;
                }
                Some((br(), next))
            }
            _ if !self.rules.line_break.is_empty() => {
                let after = rest.strip_prefix(self.rules.line_break)?;
                if after.is_empty() || after.starts_with('\n') {
                    let next = pos + self.rules.line_break.len() + usize::from(!after.is_empty());
                    Some((br(), next))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn scan_image(&self, pos: usize, rest: &str) -> Option<(MarkupNode, usize)> {
        let img = |src: &str, alt: &str| {
            let node = MarkupNode::element("img", Vec::new()).with_str_attr("src", src);
            if alt.is_empty() {
                node
            } else {
                node.with_str_attr("alt", alt)
            }
        };
        match self.rules.image {
            ImageStyle::Org => {
                let inner = rest.strip_prefix("[[")?;
                let close = inner.find("]]")?;
                let target = &inner[..close];
                if target.contains('[') || target.contains(']') || !looks_like_image(target) {
                    return None;
                }
                Some((img(target, ""), pos + 2 + close + 2))
            }
            ImageStyle::Wiki => {
                let inner = rest
                    .strip_prefix("[[File:")
                    .or_else(|| rest.strip_prefix("[[Image:"))?;
                let close = inner.find("]]")?;
                let consumed = rest.len() - inner.len() + close + 2;
                let (src, alt) = match inner[..close].split_once('|') {
                    Some((src, alt)) => (src, alt),
                    None => (&inner[..close], ""),
                };
                Some((img(src.trim(), alt.trim()), pos + consumed))
            }
            ImageStyle::Textile => {
                let caps = TEXTILE_IMAGE.captures(rest)?;
                let alt = caps.get(2).map_or("", |m| m.as_str());
                Some((img(&caps[1], alt), pos + caps[0].len()))
            }
            ImageStyle::Markdown | ImageStyle::Directive => None,
        }
    }

    fn scan_link(&self, pos: usize, rest: &'a str) -> Option<(MarkupNode, usize)> {
        let link = |href: &str, children: Vec<MarkupNode>| {
            MarkupNode::element("a", children).with_str_attr("href", href)
        };
        match self.rules.link {
            LinkStyle::Rst => {
                if let Some(caps) = RST_LINK.captures(rest) {
                    let start = pos + caps.get(1).map_or(0, |m| m.start());
                    let end = pos + caps.get(1).map_or(0, |m| m.end());
                    let children = self.run(start, end);
                    return Some((link(&caps[2], children), pos + caps[0].len()));
                }
                let found = self.bare_url(pos, rest)?;
                Some((link(found, vec![MarkupNode::text(found)]), pos + found.len()))
            }
            LinkStyle::Org => {
                let inner = rest.strip_prefix("[[")?;
                let close = inner.find("]]")?;
                let body = &inner[..close];
                let consumed = pos + 2 + close + 2;
                match body.split_once("][") {
                    Some((href, _)) => {
                        let text_start = pos + 2 + href.len() + 2;
                        let children = self.run(text_start, pos + 2 + close);
                        Some((link(href, children), consumed))
                    }
                    None => Some((link(body, Vec::new()), consumed)),
                }
            }
            LinkStyle::Wiki => {
                if let Some(inner) = rest.strip_prefix("[[") {
                    let close = inner.find("]]")?;
                    let body = &inner[..close];
                    let consumed = pos + 2 + close + 2;
                    return Some(match body.split_once('|') {
                        Some((href, _)) => {
                            let text_start = pos + 2 + href.len() + 1;
                            let children = self.run(text_start, pos + 2 + close);
                            (link(href, children), consumed)
                        }
                        None => (link(body, Vec::new()), consumed),
                    });
                }
                let inner = rest.strip_prefix('[')?;
                let close = inner.find(']')?;
                let body = &inner[..close];
                if !body.contains("://") {
                    return None;
                }
                let consumed = pos + 1 + close + 1;
                match body.split_once(' ') {
                    Some((href, _)) => {
                        let text_start = pos + 1 + href.len() + 1;
                        let children = self.run(text_start, pos + 1 + close);
                        Some((link(href, children), consumed))
                    }
                    None => Some((link(body, Vec::new()), consumed)),
                }
            }
            LinkStyle::Textile => {
                let caps = TEXTILE_LINK.captures(rest)?;
                let text = caps.get(1)?;
                let children = self.run(pos + text.start(), pos + text.end());
                Some((link(&caps[2], children), pos + caps[0].len()))
            }
            LinkStyle::Markdown => None,
        }
    }

    fn bare_url(&self, pos: usize, rest: &'a str) -> Option<&'a str> {
        if !is_flanking_char(self.before(pos)) {
            return None;
        }
        BARE_URL.find(rest).map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ORG, RST, TEXTILE, WIKI};

    fn text(s: &str) -> MarkupNode {
        MarkupNode::text(s)
    }

    fn el(tag: &str, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::element(tag, children)
    }

    #[test]
    fn test_rst_spans() {
        assert_eq!(
            parse_inline("a **b** *c* ``d*e``", &RST),
            vec![
                text("a "),
                el("strong", vec![text("b")]),
                text(" "),
                el("em", vec![text("c")]),
                text(" "),
                el("code", vec![text("d*e")]),
            ]
        );
    }

    #[test]
    fn test_rst_links() {
        let nodes = parse_inline("see `docs <https://x.org>`_ or https://y.org.", &RST);
        assert_eq!(
            nodes,
            vec![
                text("see "),
                el("a", vec![text("docs")]).with_str_attr("href", "https://x.org"),
                text(" or "),
                el("a", vec![text("https://y.org")]).with_str_attr("href", "https://y.org"),
                text("."),
            ]
        );
    }

    #[test]
    fn test_org_spans_need_word_boundaries() {
        assert_eq!(
            parse_inline("a/b/c and /em/ +gone+", &ORG),
            vec![
                text("a/b/c and "),
                el("em", vec![text("em")]),
                text(" "),
                el("s", vec![text("gone")]),
            ]
        );
    }

    #[test]
    fn test_org_links_and_images() {
        assert_eq!(
            parse_inline("[[https://x.org][site]] [[pic.png]]", &ORG),
            vec![
                el("a", vec![text("site")]).with_str_attr("href", "https://x.org"),
                text(" "),
                el("img", vec![]).with_str_attr("src", "pic.png"),
            ]
        );
    }

    #[test]
    fn test_wiki_quotes() {
        assert_eq!(
            parse_inline("'''bold''' and ''it'' <s>x</s><br />y", &WIKI),
            vec![
                el("strong", vec![text("bold")]),
                text(" and "),
                el("em", vec![text("it")]),
                text(" "),
                el("s", vec![text("x")]),
                el("br", vec![]),
                text("y"),
            ]
        );
    }

    #[test]
    fn test_wiki_links() {
        assert_eq!(
            parse_inline("[https://x.org the site] [[Main Page|home]]", &WIKI),
            vec![
                el("a", vec![text("the site")]).with_str_attr("href", "https://x.org"),
                text(" "),
                el("a", vec![text("home")]).with_str_attr("href", "Main Page"),
            ]
        );
    }

    #[test]
    fn test_textile_spans_and_breaks() {
        assert_eq!(
            parse_inline("*b* _i_ @c@ \"site\":https://x.org.\nnext", &TEXTILE),
            vec![
                el("strong", vec![text("b")]),
                text(" "),
                el("em", vec![text("i")]),
                text(" "),
                el("code", vec![text("c")]),
                text(" "),
                el("a", vec![text("site")]).with_str_attr("href", "https://x.org"),
                text("."),
                el("br", vec![]),
                text("next"),
            ]
        );
    }

    #[test]
    fn test_unclosed_delimiters_stay_text() {
        assert_eq!(parse_inline("2 * 3 = *six", &RST), vec![text("2 * 3 = *six")]);
        assert_eq!(parse_inline("snake_case_name", &TEXTILE), vec![text("snake_case_name")]);
    }
}
