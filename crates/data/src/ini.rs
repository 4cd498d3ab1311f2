//! INI files.
//!
//! `[section]` headers open nested tables (`[a.b]` nests `b` inside `a`),
//! dotted keys nest the same way, and values are typed: `true`/`false`,
//! integers and floats are recognised, double-quoted values stay strings.
//! A malformed line becomes an error item under the key `line N` and
//! parsing continues with the next line.

use std::sync::LazyLock;

use mosaic_value::datetime::{self, Dialect};
use mosaic_value::{Context, Diagnostic, FormatContext, FormatOptions, Item, MapReader};
use regex::Regex;

use crate::error::DataError;
use crate::tree::{PathTree, split_path};

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("BUG: ini integer regex"));

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.\d*|\.\d+|\d+)([eE][+-]?\d+)?$").expect("BUG: ini float regex")
});

pub fn parse_ini(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let mut root = PathTree::default();
    let mut section: Vec<String> = Vec::new();
    let mut offset = 0;

    for (index, raw) in source.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw.len();
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            match header.strip_suffix(']') {
                Some(name) => {
                    section = name.split('.').map(|part| part.trim().to_string()).collect();
                    let path: Vec<&str> = section.iter().map(String::as_str).collect();
                    root.table_mut(&path);
                }
                None => {
                    let diagnostic = Diagnostic::syntax(line_start, "section header without ']'");
                    let key = format!("line {}", index + 1);
                    root.set(&[key.as_str()], ctx.error(diagnostic));
                }
            }
            continue;
        }

        let path: Vec<&str> = section.iter().map(String::as_str).collect();
        let table = root.table_mut(&path);
        let Some(split) = line.find(['=', ':']) else {
            log::debug!("ini: line {} has no '=', treated as a flag", index + 1);
            table.set(&split_path(line), Item::Bool(true));
            continue;
        };
        let key = line[..split].trim();
        let value = match parse_value(ctx, line[split + 1..].trim()) {
            Ok(value) => value,
            Err(message) => ctx.error(Diagnostic::syntax(line_start, message)),
        };
        table.set(&split_path(key), value);
    }
    Ok(root.into_item(ctx)?)
}

fn parse_value(ctx: &Context, text: &str) -> Result<Item, String> {
    if let Some(quoted) = text.strip_prefix('"') {
        return match quoted.rfind('"') {
            Some(end) => ctx.string(&unquote(&quoted[..end])).map_err(|err| err.to_string()),
            None => Err("unterminated quoted value".to_string()),
        };
    }
    let text = strip_comment(text);
    Ok(match text {
        "true" => Item::Bool(true),
        "false" => Item::Bool(false),
        _ if INTEGER.is_match(text) => match text.parse::<i64>() {
            Ok(int) => Item::make_int(int),
            Err(_) => ctx.string(text).map_err(|err| err.to_string())?,
        },
        _ if FLOAT.is_match(text) => match text.parse::<f64>() {
            Ok(float) => ctx.float(float).map_err(|err| err.to_string())?,
            Err(_) => ctx.string(text).map_err(|err| err.to_string())?,
        },
        _ => ctx.string(text).map_err(|err| err.to_string())?,
    })
}

/// Trailing `; comment` or `# comment` after whitespace.
fn strip_comment(text: &str) -> &str {
    let cut = text
        .char_indices()
        .find(|&(i, c)| (c == ';' || c == '#') && text[..i].ends_with([' ', '\t']))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..cut].trim_end()
}

fn unquote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Whether `text` would read back as something other than itself.
fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text != text.trim()
        || matches!(text, "true" | "false")
        || INTEGER.is_match(text)
        || FLOAT.is_match(text)
        || text.starts_with('"')
        || text.contains([';', '#', '\n', '\t', '\\'])
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn value_text(item: &Item) -> String {
    match item {
        Item::Null => String::new(),
        Item::Bool(flag) => flag.to_string(),
        Item::Int(value) | Item::Int64(value) => value.to_string(),
        Item::Float(value) => format!("{:?}", value),
        Item::String(text) | Item::Symbol(text) => {
            let text = text.as_str();
            if needs_quotes(text) { quote(text) } else { text.to_string() }
        }
        Item::DateTime(value) => datetime::to_string(*value, Dialect::Iso8601),
        Item::List(_) | Item::Array(_) => {
            let joined = item
                .reader()
                .as_list()
                .map(|list| {
                    list.iter()
                        .map(|entry| value_text(entry.item()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            quote(&joined)
        }
        other => other.type_tag().sentinel(),
    }
}

/// Keys first, then one `[section]` per nested map.
pub fn format_ini(item: &Item, options: &FormatOptions) -> String {
    let mut out = FormatContext::new(options.clone());
    match item.reader().as_map() {
        Some(map) => write_table(&mut out, map, ""),
        None => {
            out.push_str("value = ");
            out.push_str(&value_text(item));
            out.newline();
        }
    }
    out.into_string()
}

fn write_table(out: &mut FormatContext, map: MapReader<'_>, name: &str) {
    if !out.enter() {
        out.write_depth_sentinel();
        out.newline();
        return;
    }
    for (key, value) in map.entries() {
        if value.as_map().is_none() {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&value_text(value.item()));
            out.newline();
        }
    }
    for (key, value) in map.entries() {
        if let Some(table) = value.as_map() {
            let section = if name.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", name, key)
            };
            out.ensure_blank_line();
            out.push_str(&format!("[{}]", section));
            out.newline();
            write_table(out, table, &section);
        }
    }
    out.leave();
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "; global settings\nname = demo\n\n[server]\nhost = example.org\nport = 8080\nratio=0.5\ndebug: false\nmotd = \"  spaced; text \"\nnote = hello ; trailing comment\n\n[server.tls]\nenabled = true\n";

    #[test]
    fn test_sections_and_types() {
        let ctx = Context::new();
        let item = parse_ini(&ctx, SAMPLE).unwrap();
        let root = item.reader().as_map().unwrap();
        assert_eq!(root.get_str("name"), Some("demo"));
        let server = root.get("server").and_then(|v| v.as_map()).unwrap();
        assert_eq!(server.get("port").and_then(|v| v.as_int()), Some(8080));
        assert_eq!(server.get("ratio").and_then(|v| v.as_float()), Some(0.5));
        assert_eq!(server.get("debug").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(server.get_str("motd"), Some("  spaced; text "));
        assert_eq!(server.get_str("note"), Some("hello"));
        let tls = server.get("tls").and_then(|v| v.as_map()).unwrap();
        assert_eq!(tls.get("enabled").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_format_and_round_trip() {
        let ctx = Context::new();
        let item = parse_ini(&ctx, SAMPLE).unwrap();
        let text = format_ini(&item, &FormatOptions::default());
        assert_eq!(
            text,
            "name = demo\n\n[server]\nhost = example.org\nport = 8080\nratio = 0.5\ndebug = false\nmotd = \"  spaced; text \"\nnote = hello\n\n[server.tls]\nenabled = true\n"
        );
        let back = parse_ini(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back));
    }

    #[test]
    fn test_strings_that_look_typed_are_quoted() {
        let ctx = Context::new();
        let mut map = ctx.map();
        map.insert("zip", ctx.string("01234").unwrap()).unwrap();
        map.insert("flag", ctx.string("true").unwrap()).unwrap();
        let item = Item::Map(map.build().unwrap());
        let text = format_ini(&item, &FormatOptions::default());
        assert_eq!(text, "zip = \"01234\"\nflag = \"true\"\n");
        assert!(item.structural_eq(&parse_ini(&ctx, &text).unwrap()));
    }

    #[test]
    fn test_malformed_lines_recover() {
        let ctx = Context::new();
        let item = parse_ini(&ctx, "[broken\na = \"open\nb = 2\nflag\n").unwrap();
        let root = item.reader().as_map().unwrap();
        assert!(root.get("line 1").unwrap().is_error());
        assert!(root.get("a").unwrap().is_error());
        assert_eq!(root.get("b").and_then(|v| v.as_int()), Some(2));
        assert_eq!(root.get("flag").and_then(|v| v.as_bool()), Some(true));
    }
}
