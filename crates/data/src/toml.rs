//! TOML via the `toml` crate.
//!
//! Tables (including `[a.b]` headers and dotted keys) become nested maps,
//! arrays become typed arrays, and TOML datetimes become `DateTime` items.

use mosaic_value::datetime::{self, Dialect, Precision};
use mosaic_value::{Context, DEPTH_SENTINEL, FormatOptions, Item, ItemReader};
use toml::value::{Datetime, Table, Value};

use crate::error::DataError;

pub fn parse_toml(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let table: Table = source.parse().map_err(|err: toml::de::Error| {
        let offset = err.span().map(|span| span.start).unwrap_or(source.len());
        DataError::syntax("toml", offset, err.message().to_string())
    })?;
    table_item(ctx, &table)
}

fn table_item(ctx: &Context, table: &Table) -> Result<Item, DataError> {
    let mut builder = ctx.map();
    for (key, value) in table {
        builder.insert(key, from_value(ctx, value)?)?;
    }
    Ok(Item::Map(builder.build()?))
}

fn from_value(ctx: &Context, value: &Value) -> Result<Item, DataError> {
    Ok(match value {
        Value::String(text) => ctx.string(text)?,
        Value::Integer(int) => Item::make_int(*int),
        Value::Float(float) => ctx.float(*float)?,
        Value::Boolean(flag) => Item::Bool(*flag),
        Value::Datetime(stamp) => {
            let text = stamp.to_string();
            match datetime::parse_exact(&text, Dialect::Lambda) {
                Ok(value) => Item::DateTime(value),
                Err(err) => {
                    log::debug!("toml: keeping datetime {} as text: {}", text, err);
                    ctx.string(&text)?
                }
            }
        }
        Value::Array(values) => {
            let items = values
                .iter()
                .map(|value| from_value(ctx, value))
                .collect::<Result<Vec<_>, _>>()?;
            ctx.array(items)?
        }
        Value::Table(table) => table_item(ctx, table)?,
    })
}

/// Writes a map as a TOML document. A root that is not a map is written
/// under the key `value`; nulls have no TOML spelling and are skipped.
pub fn format_toml(item: &Item, options: &FormatOptions) -> String {
    let table = match to_value(item.reader(), 0, options.max_depth) {
        Some(Value::Table(table)) => table,
        Some(other) => {
            let mut table = Table::new();
            table.insert("value".to_string(), other);
            table
        }
        None => Table::new(),
    };
    let result = if options.is_pretty() {
        toml::to_string_pretty(&table)
    } else {
        toml::to_string(&table)
    };
    result.unwrap_or_else(|err| {
        log::warn!("toml: serialization failed: {}", err);
        String::new()
    })
}

fn datetime_value(value: mosaic_value::DateTime) -> Value {
    let text = match value.precision() {
        // TOML has no year-only or month-only values.
        Precision::YearOnly => return Value::String(datetime::to_string(value, Dialect::Iso8601)),
        Precision::DateOnly if value.day() == 0 => {
            return Value::String(datetime::to_string(value, Dialect::Iso8601));
        }
        _ => datetime::to_string(value, Dialect::Iso8601),
    };
    match text.parse::<Datetime>() {
        Ok(stamp) => Value::Datetime(stamp),
        Err(_) => Value::String(text),
    }
}

fn to_value(reader: ItemReader<'_>, depth: usize, max_depth: usize) -> Option<Value> {
    let item = reader.item();
    let nested = matches!(
        item,
        Item::List(_) | Item::Array(_) | Item::Map(_) | Item::Element(_)
    );
    if nested && depth >= max_depth {
        log::warn!("toml: depth limit {} reached", max_depth);
        return Some(Value::String(DEPTH_SENTINEL.to_string()));
    }
    let child = |value: ItemReader<'_>| to_value(value, depth + 1, max_depth);
    Some(match item {
        Item::Null => return None,
        Item::Bool(flag) => Value::Boolean(*flag),
        Item::Int(value) | Item::Int64(value) => Value::Integer(*value),
        Item::Float(value) => Value::Float(*value),
        Item::String(text) | Item::Symbol(text) => Value::String(text.as_str().to_string()),
        Item::DateTime(value) => datetime_value(*value),
        _ if nested => {
            if let Some(list) = reader.as_list() {
                Value::Array(list.iter().filter_map(child).collect())
            } else if let Some(map) = reader.as_map() {
                let mut table = Table::new();
                for (key, value) in map.entries() {
                    if let Some(value) = child(value) {
                        table.insert(key.to_string(), value);
                    }
                }
                Value::Table(table)
            } else if let Some(element) = reader.as_element() {
                let mut table = Table::new();
                table.insert("$".to_string(), Value::String(element.tag().to_string()));
                for (key, value) in element.attrs().entries() {
                    if let Some(value) = child(value) {
                        table.insert(key.to_string(), value);
                    }
                }
                if element.child_count() > 0 {
                    let children = element.children().filter_map(child).collect();
                    table.insert("_".to_string(), Value::Array(children));
                }
                Value::Table(table)
            } else {
                return None;
            }
        }
        other => Value::String(other.type_tag().sentinel()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"title = "example"
dotted.key = 1

[server]
host = "localhost"
ports = [8000, 8001]
started = 1979-05-27T07:32:00Z
birthday = 1979-05-27

[server.limits]
ratio = 0.75
enabled = true
"#;

    #[test]
    fn test_tables_and_dotted_keys() {
        let ctx = Context::new();
        let item = parse_toml(&ctx, SAMPLE).unwrap();
        let root = item.reader().as_map().unwrap();
        assert_eq!(root.get_str("title"), Some("example"));
        let dotted = root.get("dotted").and_then(|v| v.as_map()).unwrap();
        assert_eq!(dotted.get("key").and_then(|v| v.as_int()), Some(1));
        let server = root.get("server").and_then(|v| v.as_map()).unwrap();
        assert_eq!(server.get("ports").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
        let limits = server.get("limits").and_then(|v| v.as_map()).unwrap();
        assert_eq!(limits.get("ratio").and_then(|v| v.as_float()), Some(0.75));
    }

    #[test]
    fn test_datetimes_are_bridged() {
        let ctx = Context::new();
        let item = parse_toml(&ctx, SAMPLE).unwrap();
        let server = item.reader().as_map().and_then(|m| m.get("server")).and_then(|v| v.as_map()).unwrap();
        let started = server.get("started").and_then(|v| v.as_datetime()).unwrap();
        assert_eq!(started.precision(), Precision::DateTime);
        assert_eq!(started.hour(), 7);
        let birthday = server.get("birthday").and_then(|v| v.as_datetime()).unwrap();
        assert_eq!(birthday.precision(), Precision::DateOnly);

        let text = format_toml(&item, &FormatOptions::default());
        assert!(text.contains("birthday = 1979-05-27\n"), "{}", text);
    }

    #[test]
    fn test_round_trip() {
        let ctx = Context::new();
        let item = parse_toml(&ctx, SAMPLE).unwrap();
        let text = format_toml(&item, &FormatOptions::default());
        let back = parse_toml(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back), "{}", text);
    }

    #[test]
    fn test_nulls_skipped_and_scalar_root_wrapped() {
        let ctx = Context::new();
        let json = crate::json::parse_json(&ctx, r#"{"a":null,"b":2}"#).unwrap();
        assert_eq!(format_toml(&json, &FormatOptions::default()), "b = 2\n");
        assert_eq!(format_toml(&Item::Int(5), &FormatOptions::default()), "value = 5\n");
    }

    #[test]
    fn test_syntax_error() {
        let ctx = Context::new();
        let err = parse_toml(&ctx, "a = 1\nb = = 2\n").unwrap_err();
        match err {
            DataError::Syntax { format, offset, .. } => {
                assert_eq!(format, "toml");
                assert!(offset >= 6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
