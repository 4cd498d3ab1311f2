//! YAML via `serde_yaml`.
//!
//! A stream with one document parses to that document; a stream with
//! several parses to a `List` of documents, and a root `List` is written
//! back as a `---` separated stream. Sequences inside a document are
//! arrays, so the two never collide. Other list-rooted trees (CSV rows, for
//! one) are written as a stream too; an `Array` root is a single sequence.

use mosaic_value::datetime::{self, Dialect};
use mosaic_value::{Context, DEPTH_SENTINEL, FormatOptions, Item, ItemReader};
use serde::Deserialize;
use serde_yaml::{Mapping, Number, Value};

use crate::error::DataError;

pub fn parse_yaml(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(source) {
        let mut value = Value::deserialize(document).map_err(|err| yaml_error(source, err))?;
        value.apply_merge().map_err(|err| yaml_error(source, err))?;
        documents.push(from_value(ctx, &value)?);
    }
    log::debug!("yaml: {} document(s)", documents.len());
    Ok(match documents.len() {
        0 => Item::Null,
        1 => documents.pop().unwrap_or_default(),
        _ => ctx.list(documents)?,
    })
}

fn yaml_error(source: &str, err: serde_yaml::Error) -> DataError {
    let offset = err.location().map(|l| l.index()).unwrap_or(source.len());
    DataError::syntax("yaml", offset, err.to_string())
}

fn from_value(ctx: &Context, value: &Value) -> Result<Item, DataError> {
    Ok(match value {
        Value::Null => Item::Null,
        Value::Bool(flag) => Item::Bool(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Item::make_int(int),
            None => ctx.float(number.as_f64().unwrap_or(f64::NAN))?,
        },
        Value::String(text) => ctx.string(text)?,
        Value::Sequence(values) => {
            let items = values
                .iter()
                .map(|value| from_value(ctx, value))
                .collect::<Result<Vec<_>, _>>()?;
            ctx.array(items)?
        }
        Value::Mapping(mapping) => {
            let mut builder = ctx.map();
            for (key, value) in mapping {
                builder.insert(&key_text(key), from_value(ctx, value)?)?;
            }
            Item::Map(builder.build()?)
        }
        Value::Tagged(tagged) => {
            log::debug!("yaml: dropping tag {}", tagged.tag);
            from_value(ctx, &tagged.value)?
        }
    })
}

/// Non-string keys are written out as their scalar text.
fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

pub fn format_yaml(item: &Item, options: &FormatOptions) -> String {
    let documents: Vec<&Item> = match item {
        Item::List(list) => list.iter().collect(),
        other => vec![other],
    };
    let mut out = String::new();
    for (index, document) in documents.into_iter().enumerate() {
        if index > 0 {
            out.push_str("---\n");
        }
        let value = to_value(document.reader(), 0, options.max_depth);
        match serde_yaml::to_string(&value) {
            Ok(text) => out.push_str(&text),
            Err(err) => log::warn!("yaml: could not serialize document {}: {}", index, err),
        }
    }
    out
}

fn to_value(reader: ItemReader<'_>, depth: usize, max_depth: usize) -> Value {
    let item = reader.item();
    let child = |value: ItemReader<'_>| to_value(value, depth + 1, max_depth);
    let nested = matches!(
        item,
        Item::List(_) | Item::Array(_) | Item::Map(_) | Item::Element(_)
    );
    if nested && depth >= max_depth {
        log::warn!("yaml: depth limit {} reached", max_depth);
        return Value::String(DEPTH_SENTINEL.to_string());
    }
    match item {
        Item::Null => Value::Null,
        Item::Bool(flag) => Value::Bool(*flag),
        Item::Int(value) | Item::Int64(value) => Value::Number(Number::from(*value)),
        Item::Float(value) => Value::Number(Number::from(*value)),
        Item::String(text) | Item::Symbol(text) => Value::String(text.as_str().to_string()),
        Item::DateTime(value) => Value::String(datetime::to_string(*value, Dialect::Iso8601)),
        _ if nested => {
            if let Some(list) = reader.as_list() {
                Value::Sequence(list.iter().map(child).collect())
            } else if let Some(map) = reader.as_map() {
                let mut mapping = Mapping::new();
                for (key, value) in map.entries() {
                    mapping.insert(Value::String(key.to_string()), child(value));
                }
                Value::Mapping(mapping)
            } else if let Some(element) = reader.as_element() {
                let mut mapping = Mapping::new();
                mapping.insert(Value::String("$".into()), Value::String(element.tag().into()));
                for (key, value) in element.attrs().entries() {
                    mapping.insert(Value::String(key.to_string()), child(value));
                }
                if element.child_count() > 0 {
                    let children = element.children().map(child).collect();
                    mapping.insert(Value::String("_".into()), Value::Sequence(children));
                }
                Value::Mapping(mapping)
            } else {
                Value::Null
            }
        }
        other => Value::String(other.type_tag().sentinel()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_and_nesting() {
        let ctx = Context::new();
        let item = parse_yaml(
            &ctx,
            "name: mosaic\ncount: 3\nratio: 0.5\nok: true\nnothing: ~\ntags:\n  - a\n  - b\n",
        )
        .unwrap();
        let map = item.reader().as_map().unwrap();
        assert_eq!(map.get_str("name"), Some("mosaic"));
        assert_eq!(map.get("count").and_then(|v| v.as_int()), Some(3));
        assert_eq!(map.get("ratio").and_then(|v| v.as_float()), Some(0.5));
        assert_eq!(map.get("ok").and_then(|v| v.as_bool()), Some(true));
        assert!(map.get("nothing").unwrap().is_null());
        assert!(matches!(map.get("tags").unwrap().item(), Item::Array(_)));
    }

    #[test]
    fn test_anchors_and_merge_keys() {
        let ctx = Context::new();
        let item = parse_yaml(
            &ctx,
            "base: &base\n  host: localhost\n  port: 80\nprod:\n  <<: *base\n  port: 443\ncopy: *base\n",
        )
        .unwrap();
        let map = item.reader().as_map().unwrap();
        let prod = map.get("prod").and_then(|v| v.as_map()).unwrap();
        assert_eq!(prod.get_str("host"), Some("localhost"));
        assert_eq!(prod.get("port").and_then(|v| v.as_int()), Some(443));
        let copy = map.get("copy").and_then(|v| v.as_map()).unwrap();
        assert_eq!(copy.get("port").and_then(|v| v.as_int()), Some(80));
    }

    #[test]
    fn test_multi_document_stream() {
        let ctx = Context::new();
        let item = parse_yaml(&ctx, "---\na: 1\n---\nb: 2\n").unwrap();
        let docs = item.reader().as_list().unwrap();
        assert!(matches!(item, Item::List(_)));
        assert_eq!(docs.len(), 2);

        let text = format_yaml(&item, &FormatOptions::default());
        assert_eq!(text, "a: 1\n---\nb: 2\n");
        let back = parse_yaml(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back));
    }

    #[test]
    fn test_list_root_is_a_stream_array_root_is_a_sequence() {
        let ctx = Context::new();
        let rows = crate::csv::parse_csv(&ctx, "a\n1\n2\n").unwrap();
        assert_eq!(format_yaml(&rows, &FormatOptions::default()), "a: '1'\n---\na: '2'\n");

        let array = crate::json::parse_json(&ctx, r#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(format_yaml(&array, &FormatOptions::default()), "- a: 1\n- a: 2\n");
    }

    #[test]
    fn test_round_trip_single_document() {
        let ctx = Context::new();
        let source = "title: \"quoted: text\"\nitems:\n- 1\n- two\n- null\nnested:\n  deep:\n    x: 1.5\n";
        let item = parse_yaml(&ctx, source).unwrap();
        let text = format_yaml(&item, &FormatOptions::default());
        let back = parse_yaml(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back), "{}", text);
    }

    #[test]
    fn test_non_string_keys() {
        let ctx = Context::new();
        let item = parse_yaml(&ctx, "1: one\ntrue: yes\n").unwrap();
        let keys: Vec<_> = item.reader().as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["1", "true"]);
    }

    #[test]
    fn test_syntax_error() {
        let ctx = Context::new();
        let err = parse_yaml(&ctx, "a: [1, 2\nb: 3\n").unwrap_err();
        assert!(matches!(err, DataError::Syntax { format: "yaml", .. }));
    }

    #[test]
    fn test_depth_guard() {
        let ctx = Context::new();
        let item = parse_yaml(&ctx, "a:\n  b:\n    c: 1\n").unwrap();
        let options = FormatOptions {
            max_depth: 2,
            ..FormatOptions::default()
        };
        let text = format_yaml(&item, &options);
        assert!(text.starts_with("a:\n  b: "), "{}", text);
        assert!(text.contains(DEPTH_SENTINEL));
    }
}
