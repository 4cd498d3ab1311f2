//! JSON via `serde_json`.
//!
//! Objects become maps (insertion ordered, last duplicate key wins), arrays
//! become typed arrays, and integers within ±2^53 become `Int`; every other
//! number is a `Float`.

use mosaic_value::datetime::{self, Dialect};
use mosaic_value::{Context, ElementReader, FormatContext, FormatOptions, Item, ItemReader};
use serde_json::Value;

use crate::error::{DataError, offset_of};

/// Largest magnitude JSON can carry as an exact integer.
const SAFE_INTEGER: u64 = 1 << 53;

pub fn parse_json(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let value: Value = serde_json::from_str(source).map_err(|err| {
        DataError::syntax("json", offset_of(source, err.line(), err.column()), err.to_string())
    })?;
    from_value(ctx, &value)
}

/// Converts an already-decoded JSON value.
pub fn from_value(ctx: &Context, value: &Value) -> Result<Item, DataError> {
    Ok(match value {
        Value::Null => Item::Null,
        Value::Bool(flag) => Item::Bool(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) if int.unsigned_abs() < SAFE_INTEGER => Item::make_int(int),
            _ => ctx.float(number.as_f64().unwrap_or(f64::NAN))?,
        },
        Value::String(text) => ctx.string(text)?,
        Value::Array(values) => {
            let items = values
                .iter()
                .map(|value| from_value(ctx, value))
                .collect::<Result<Vec<_>, _>>()?;
            ctx.array(items)?
        }
        Value::Object(object) => {
            let mut builder = ctx.map();
            for (key, value) in object {
                builder.insert(key, from_value(ctx, value)?)?;
            }
            Item::Map(builder.build()?)
        }
    })
}

pub fn format_json(item: &Item, options: &FormatOptions) -> String {
    let mut writer = JsonWriter {
        out: FormatContext::new(options.clone()),
    };
    writer.value(item.reader());
    if writer.out.is_pretty() {
        writer.out.newline();
    }
    writer.out.into_string()
}

struct JsonWriter {
    out: FormatContext,
}

impl JsonWriter {
    fn string(&mut self, text: &str) {
        match serde_json::to_string(text) {
            Ok(quoted) => self.out.push_str(&quoted),
            Err(_) => self.out.push_str("\"\""),
        }
    }

    fn separator(&mut self) {
        self.out.push(':');
        if self.out.is_pretty() {
            self.out.push(' ');
        }
    }

    fn value(&mut self, reader: ItemReader<'_>) {
        let item = reader.item();
        match item {
            Item::Null => self.out.push_str("null"),
            Item::Bool(flag) => self.out.push_str(if *flag { "true" } else { "false" }),
            Item::Int(value) | Item::Int64(value) => self.out.push_str(&value.to_string()),
            Item::Float(value) => self.float(*value),
            Item::String(text) | Item::Symbol(text) => self.string(text.as_str()),
            Item::DateTime(value) => self.string(&datetime::to_string(*value, Dialect::Iso8601)),
            Item::List(_) | Item::Array(_) | Item::Map(_) | Item::Element(_) => {
                if !self.out.enter() {
                    self.string(mosaic_value::DEPTH_SENTINEL);
                    return;
                }
                if let Some(list) = reader.as_list() {
                    self.sequence(list.iter());
                } else if let Some(map) = reader.as_map() {
                    self.object(map.entries());
                } else if let Some(element) = reader.as_element() {
                    self.element(element);
                }
                self.out.leave();
            }
            Item::Error(_) | Item::Binary(_) | Item::Type(_) => {
                self.string(&item.type_tag().sentinel());
                log::debug!("json: {} item written as sentinel", item.type_tag());
            }
        }
    }

    fn float(&mut self, value: f64) {
        if value.is_finite() {
            self.out.push_str(&format!("{:?}", value));
        } else {
            self.out.push_str("null");
        }
    }

    fn sequence<'a>(&mut self, items: impl Iterator<Item = ItemReader<'a>>) {
        self.out.push('[');
        self.out.indent();
        let mut empty = true;
        for (index, item) in items.enumerate() {
            if index > 0 {
                self.out.push(',');
            }
            self.out.break_line();
            self.value(item);
            empty = false;
        }
        self.out.dedent();
        if !empty {
            self.out.break_line();
        }
        self.out.push(']');
    }

    fn object<'a>(&mut self, entries: impl Iterator<Item = (&'a str, ItemReader<'a>)>) {
        self.out.push('{');
        self.out.indent();
        let mut empty = true;
        for (index, (key, value)) in entries.enumerate() {
            if index > 0 {
                self.out.push(',');
            }
            self.out.break_line();
            self.string(key);
            self.separator();
            self.value(value);
            empty = false;
        }
        self.out.dedent();
        if !empty {
            self.out.break_line();
        }
        self.out.push('}');
    }

    /// `{"$": tag, ...attributes, "_": [children]}`
    fn element(&mut self, element: ElementReader<'_>) {
        self.out.push('{');
        self.out.indent();
        self.out.break_line();
        self.string("$");
        self.separator();
        self.string(element.tag());
        for (key, value) in element.attrs().entries() {
            self.out.push(',');
            self.out.break_line();
            self.string(key);
            self.separator();
            self.value(value);
        }
        if element.child_count() > 0 {
            self.out.push(',');
            self.out.break_line();
            self.string("_");
            self.separator();
            self.sequence(element.children());
        }
        self.out.dedent();
        self.out.break_line();
        self.out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_value::TypeTag;

    const SAMPLE: &str = r#"{"a":1,"b":[true,null,"x"]}"#;

    #[test]
    fn test_compact_round_trip() {
        let ctx = Context::new();
        let item = parse_json(&ctx, SAMPLE).unwrap();
        assert_eq!(format_json(&item, &FormatOptions::compact()), SAMPLE);
    }

    #[test]
    fn test_pretty_keeps_field_order() {
        let ctx = Context::new();
        let item = parse_json(&ctx, r#"{"z":1,"a":{"k":[]},"m":{}}"#).unwrap();
        assert_eq!(
            format_json(&item, &FormatOptions::default()),
            "{\n  \"z\": 1,\n  \"a\": {\n    \"k\": []\n  },\n  \"m\": {}\n}\n"
        );
    }

    #[test]
    fn test_number_classes() {
        let ctx = Context::new();
        let item = parse_json(&ctx, "[9007199254740991, 9007199254740993, 1.5, -3]").unwrap();
        let list = item.reader().as_list().unwrap();
        assert!(matches!(list.get(0).unwrap().item(), Item::Int(_)));
        assert!(matches!(list.get(1).unwrap().item(), Item::Float(_)));
        assert_eq!(list.get(2).unwrap().as_float(), Some(1.5));
        assert_eq!(list.get(3).unwrap().as_int(), Some(-3));
        assert_eq!(
            format_json(&item, &FormatOptions::compact()),
            "[9007199254740991,9007199254740992.0,1.5,-3]"
        );
    }

    #[test]
    fn test_last_duplicate_key_wins() {
        let ctx = Context::new();
        let item = parse_json(&ctx, r#"{"k":1,"other":2,"k":3}"#).unwrap();
        let map = item.reader().as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("k").and_then(|v| v.as_int()), Some(3));
    }

    #[test]
    fn test_syntax_error_offset() {
        let ctx = Context::new();
        let err = parse_json(&ctx, "{\"a\":\n  tru}").unwrap_err();
        match err {
            DataError::Syntax { format, offset, .. } => {
                assert_eq!(format, "json");
                assert!(offset >= 7, "offset {} should point into line 2", offset);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_escapes_and_elements() {
        let ctx = Context::new();
        let mut element = ctx.element("p").unwrap();
        element.attr("class", ctx.string("x").unwrap()).unwrap();
        element.child(ctx.string("say \"hi\"\n").unwrap());
        let item = element.into_item().unwrap();
        assert_eq!(
            format_json(&item, &FormatOptions::compact()),
            r#"{"$":"p","class":"x","_":["say \"hi\"\n"]}"#
        );
    }

    #[test]
    fn test_depth_limit_writes_sentinel() {
        let ctx = Context::new();
        let item = parse_json(&ctx, "[[[[1]]]]").unwrap();
        let options = FormatOptions {
            max_depth: 2,
            ..FormatOptions::compact()
        };
        assert_eq!(format_json(&item, &options), r#"[["[max depth exceeded]"]]"#);
    }

    #[test]
    fn test_datetime_and_unrepresentable_items() {
        let ctx = Context::new();
        let (date, _) = datetime::parse("2024-08", Dialect::Iso8601).unwrap();
        let item = ctx
            .list(vec![Item::DateTime(date), Item::Type(TypeTag::Map), ctx.float(f64::NAN).unwrap()])
            .unwrap();
        assert_eq!(
            format_json(&item, &FormatOptions::compact()),
            r#"["2024-08","[type_16]",null]"#
        );
    }
}
