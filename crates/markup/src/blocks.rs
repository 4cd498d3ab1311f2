//! Line-oriented helpers shared by the rst, org, wiki and textile parsers.

use crate::node::{AttrValue, MarkupNode, tighten_blocks};

/// A dialect's block grammar, recursively applied to list item bodies and
/// quoted blocks.
pub trait BlockParser {
    fn blocks(&mut self, lines: &[String]) -> Vec<MarkupNode>;

    /// Parses a bullet or ordered marker at the start of `line`.
    fn list_marker(&self, line: &str) -> Option<ListMarker>;
}

pub fn to_lines(source: &str) -> Vec<String> {
    source
        .replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect()
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Strips `width` leading spaces from every non-blank line.
pub fn dedent(lines: &[String], width: usize) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                String::new()
            } else {
                line[width.min(indent_of(line))..].to_string()
            }
        })
        .collect()
}

pub fn trim_blank_edges(lines: &[String]) -> &[String] {
    let start = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !is_blank(l))
        .map_or(start, |i| i + 1);
    &lines[start..end]
}

/// A line made of one punctuation character repeated at least `min` times.
pub fn adornment_char(line: &str, min: usize) -> Option<char> {
    let first = line.chars().next()?;
    if !first.is_ascii_punctuation() || line.chars().count() < min {
        return None;
    }
    line.chars().all(|c| c == first).then_some(first)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    /// The bullet character, or the ordered delimiter (`.` or `)`).
    pub symbol: char,
    pub ordered: bool,
    pub number: i64,
    /// Byte offset of the item text from the marker start.
    pub content_offset: usize,
    pub checked: Option<bool>,
}

impl ListMarker {
    fn same_list(&self, other: &ListMarker) -> bool {
        self.ordered == other.ordered && self.symbol == other.symbol
    }
}

/// Recognises `- `, `1. `, `1) ` style markers. `bullets` lists the bullet
/// characters the dialect accepts; `auto_number` allows `#.` as well.
pub fn parse_marker(
    line: &str,
    bullets: &str,
    auto_number: bool,
    tasks: bool,
) -> Option<ListMarker> {
    let mut marker = if let Some(first) = line.chars().next().filter(|c| bullets.contains(*c)) {
        let rest = &line[1..];
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        ListMarker {
            symbol: first,
            ordered: false,
            number: 1,
            content_offset: 2.min(line.len()),
            checked: None,
        }
    } else {
        let digits = line.chars().take_while(char::is_ascii_digit).count();
        let (number, width) = if digits > 0 && digits <= 9 {
            (line[..digits].parse::<i64>().ok()?, digits)
        } else if auto_number && line.starts_with('#') {
            (1, 1)
        } else {
            return None;
        };
        let symbol = line[width..].chars().next()?;
        if symbol != '.' && symbol != ')' {
            return None;
        }
        let rest = &line[width + 1..];
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        ListMarker {
            symbol,
            ordered: true,
            number,
            content_offset: (width + 2).min(line.len()),
            checked: None,
        }
    };
    if tasks {
        let rest = &line[marker.content_offset..];
        let checked = match rest.get(..4) {
            Some("[ ] ") => Some(false),
            Some("[x] ") | Some("[X] ") => Some(true),
            _ => None,
        };
        if checked.is_some() {
            marker.checked = checked;
            marker.content_offset += 4;
        }
    }
    Some(marker)
}

/// Collects the list starting at `lines[start]`; returns it with the index
/// of the first line after it.
pub fn collect_list<P: BlockParser>(
    parser: &mut P,
    lines: &[String],
    start: usize,
) -> Option<(MarkupNode, usize)> {
    let indent = indent_of(&lines[start]);
    let first = parser.list_marker(&lines[start][indent..])?;
    let mut items: Vec<(ListMarker, Vec<String>)> = Vec::new();
    let mut loose = false;
    let mut index = start;

    while index < lines.len() {
        let line = &lines[index];
        if is_blank(line) || indent_of(line) != indent {
            break;
        }
        let Some(marker) = parser.list_marker(&line[indent..]).filter(|m| m.same_list(&first))
        else {
            break;
        };
        let column = indent + marker.content_offset;
        let mut body = vec![line[column.min(line.len())..].to_string()];
        index += 1;
        while index < lines.len() {
            let next = &lines[index];
            if is_blank(next) {
                body.push(String::new());
            } else if indent_of(next) >= column {
                body.push(next[column..].to_string());
            } else {
                break;
            }
            index += 1;
        }
        let trailing = body.iter().rev().take_while(|l| l.is_empty()).count();
        body.truncate(body.len() - trailing);
        if body.iter().any(|l| l.is_empty()) {
            loose = true;
        }
        if trailing > 0 {
            // A blank line between two items makes the list loose; a blank
            // line before something else just ends it.
            let continues = lines.get(index).is_some_and(|next| {
                indent_of(next) == indent
                    && parser
                        .list_marker(&next[indent..])
                        .is_some_and(|m| m.same_list(&first))
            });
            if !continues {
                items.push((marker, body));
                break;
            }
            loose = true;
        }
        items.push((marker, body));
    }

    let children = items
        .into_iter()
        .map(|(marker, body)| {
            let blocks = parser.blocks(&body);
            let blocks = if loose { blocks } else { tighten_blocks(blocks) };
            let item = MarkupNode::element("li", blocks);
            match marker.checked {
                Some(flag) => item.with_attr("checked", AttrValue::Bool(flag)),
                None => item,
            }
        })
        .collect();
    let mut list = MarkupNode::element(if first.ordered { "ol" } else { "ul" }, children);
    if first.ordered && first.number != 1 {
        list = list.with_attr("start", AttrValue::Int(first.number));
    }
    Some((list, index))
}

/// Builds nested lists from `(markers, inline)` entries where nesting is
/// spelled by repeating the marker: `*`, `**`, `*#`.
pub fn build_repeated_list(entries: &[(String, Vec<MarkupNode>)], depth: usize) -> Vec<MarkupNode> {
    let kind_at = |entry: &(String, Vec<MarkupNode>)| entry.0.chars().nth(depth);
    let mut lists = Vec::new();
    let mut index = 0;
    while index < entries.len() {
        let kind = kind_at(&entries[index]);
        let mut items = Vec::new();
        while index < entries.len() && kind_at(&entries[index]) == kind {
            let (markers, inline) = &entries[index];
            let mut children = Vec::new();
            if markers.chars().count() == depth + 1 {
                children.extend(inline.iter().cloned());
                index += 1;
            }
            let nested_start = index;
            while index < entries.len() && entries[index].0.chars().count() > depth + 1 {
                index += 1;
            }
            if nested_start < index {
                children.extend(build_repeated_list(&entries[nested_start..index], depth + 1));
            }
            items.push(MarkupNode::element("li", children));
        }
        let tag = if kind == Some('#') { "ol" } else { "ul" };
        lists.push(MarkupNode::element(tag, items));
    }
    lists
}

/// Splits a repeated-marker list line into its markers and text.
pub fn repeated_marker(line: &str) -> Option<(String, &str)> {
    let markers: String = line.chars().take_while(|c| *c == '*' || *c == '#').collect();
    if markers.is_empty() {
        return None;
    }
    let rest = &line[markers.len()..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((markers, rest.trim()))
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
    fn test_parse_marker() {
        let bullet = parse_marker("- item", "-*+", false, false).unwrap();
        assert!(!bullet.ordered);
        assert_eq!(bullet.content_offset, 2);
        let ordered = parse_marker("12) item", "-", false, false).unwrap();
        assert_eq!((ordered.number, ordered.symbol, ordered.content_offset), (12, ')', 4));
        let task = parse_marker("- [x] done", "-", false, true).unwrap();
        assert_eq!(task.checked, Some(true));
        assert_eq!(task.content_offset, 6);
        assert!(parse_marker("-not", "-", false, false).is_none());
        assert!(parse_marker("#. auto", "-", true, false).is_some());
        assert!(parse_marker("2024 was", "-", false, false).is_none());
    }

    #[test]
    fn test_build_repeated_list() {
        let entries = vec![
            ("*".to_string(), vec![text("a")]),
            ("*#".to_string(), vec![text("a1")]),
            ("*#".to_string(), vec![text("a2")]),
            ("*".to_string(), vec![text("b")]),
        ];
        assert_eq!(
            build_repeated_list(&entries, 0),
            vec![el(
                "ul",
                vec![
                    el(
                        "li",
                        vec![
                            text("a"),
                            el("ol", vec![el("li", vec![text("a1")]), el("li", vec![text("a2")])]),
                        ]
                    ),
                    el("li", vec![text("b")]),
                ]
            )]
        );
    }

    #[test]
    fn test_dedent_and_edges() {
        let lines = to_lines("\n   a\n     b\n\n");
        assert_eq!(trim_blank_edges(&lines), &["   a".to_string(), "     b".to_string()]);
        assert_eq!(dedent(trim_blank_edges(&lines), 3), vec!["a", "  b"]);
        assert_eq!(adornment_char("=====", 1), Some('='));
        assert_eq!(adornment_char("==-==", 1), None);
    }
}
