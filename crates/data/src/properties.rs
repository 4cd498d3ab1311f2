//! Java-style `.properties` files.
//!
//! Keys are split on `.` into nested maps; values are always strings.
//! Backslash continuations, `\uXXXX` escapes and the `=`, `:` or
//! whitespace separators are understood.

use mosaic_value::{Context, FormatContext, FormatOptions, Item, ItemReader, MapReader};

use crate::error::DataError;
use crate::tree::{PathTree, split_path};
use crate::xml::scalar_text;

pub fn parse_properties(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let mut root = PathTree::default();
    for line in logical_lines(source) {
        let (key, value) = split_entry(&line);
        let key = unescape(key);
        root.set(&split_path(&key), ctx.string(&unescape(value))?);
    }
    Ok(root.into_item(ctx)?)
}

/// Joins continuation lines and drops blanks and comments.
fn logical_lines(source: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    for raw in source.lines() {
        let line = match current {
            Some(_) => raw.trim_start(),
            None => {
                let trimmed = raw.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed
            }
        };
        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        let text = current.get_or_insert_with(String::new);
        if trailing % 2 == 1 {
            text.push_str(&line[..line.len() - 1]);
        } else {
            text.push_str(line);
            lines.extend(current.take());
        }
    }
    lines.extend(current);
    lines
}

/// Splits at the first unescaped separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..index], line[index + 1..].trim_start()),
            ' ' | '\t' | '\x0c' => {
                let rest = line[index..].trim_start();
                let rest = rest
                    .strip_prefix(['=', ':'])
                    .map(str::trim_start)
                    .unwrap_or(rest);
                return (&line[..index], rest);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        log::debug!("properties: bad unicode escape \\u{}", hex);
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(text: &str, key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' if key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if key || index == 0 => out.push_str("\\ "),
            other => out.push(other),
        }
    }
    out
}

/// Flattens nested maps back into dotted keys.
pub fn format_properties(item: &Item, options: &FormatOptions) -> String {
    let mut out = FormatContext::new(options.clone());
    match item.reader().as_map() {
        Some(map) => write_map(&mut out, map, ""),
        None => write_entry(&mut out, "value", item.reader()),
    }
    out.into_string()
}

fn write_map(out: &mut FormatContext, map: MapReader<'_>, prefix: &str) {
    if !out.enter() {
        write_line(out, prefix, mosaic_value::DEPTH_SENTINEL);
        return;
    }
    for (key, value) in map.entries() {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value.as_map() {
            Some(nested) => write_map(out, nested, &path),
            None => write_entry(out, &path, value),
        }
    }
    out.leave();
}

fn write_entry(out: &mut FormatContext, key: &str, value: ItemReader<'_>) {
    let text = match value.as_list() {
        Some(list) => list
            .iter()
            .map(|entry| scalar_text(entry.item()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(","),
        None => scalar_text(value.item()).unwrap_or_else(|| match value.item() {
            Item::Null => String::new(),
            other => other.type_tag().sentinel(),
        }),
    };
    write_line(out, key, &text);
}

fn write_line(out: &mut FormatContext, key: &str, value: &str) {
    out.push_str(&escape(key, true));
    out.push('=');
    out.push_str(&escape(value, false));
    out.newline();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_comments_and_nesting() {
        let ctx = Context::new();
        let source = "# comment\n! also\ndb.host = localhost\ndb.port:5432\napp.name My App\nempty=\n";
        let item = parse_properties(&ctx, source).unwrap();
        let root = item.reader().as_map().unwrap();
        let db = root.get("db").and_then(|v| v.as_map()).unwrap();
        assert_eq!(db.get_str("host"), Some("localhost"));
        assert_eq!(db.get_str("port"), Some("5432"));
        let app = root.get("app").and_then(|v| v.as_map()).unwrap();
        assert_eq!(app.get_str("name"), Some("My App"));
        assert_eq!(root.get_str("empty"), Some(""));
    }

    #[test]
    fn test_continuations_and_escapes() {
        let ctx = Context::new();
        let source = "fruits = apple, \\\n    banana\nkey\\ with\\ spaces = \\u00e9t\\u00e9\npath=C:\\\\dir\n";
        let item = parse_properties(&ctx, source).unwrap();
        let root = item.reader().as_map().unwrap();
        assert_eq!(root.get_str("fruits"), Some("apple, banana"));
        assert_eq!(root.get_str("key with spaces"), Some("été"));
        assert_eq!(root.get_str("path"), Some("C:\\dir"));
    }

    #[test]
    fn test_format_round_trip() {
        let ctx = Context::new();
        let source = "a.b=1\na.c=two words\nx\\=y= leading\nz=line\\nbreak\n";
        let item = parse_properties(&ctx, source).unwrap();
        let text = format_properties(&item, &FormatOptions::default());
        assert_eq!(text, "a.b=1\na.c=two words\nx\\=y=leading\nz=line\\nbreak\n");
        let back = parse_properties(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back));
    }

    #[test]
    fn test_leading_space_in_value_is_escaped() {
        let ctx = Context::new();
        let mut map = ctx.map();
        map.insert("k", ctx.string("  padded").unwrap()).unwrap();
        let item = Item::Map(map.build().unwrap());
        let text = format_properties(&item, &FormatOptions::default());
        assert_eq!(text, "k=\\  padded\n");
        assert!(item.structural_eq(&parse_properties(&ctx, &text).unwrap()));
    }
}
