//! Plain text: the whole source is one string, and formatting writes the
//! text content of any item.

use mosaic_value::datetime::{self, Dialect};
use mosaic_value::{Context, FormatContext, FormatOptions, Item, ItemReader};

use crate::error::DataError;

pub fn parse_text(ctx: &Context, source: &str) -> Result<Item, DataError> {
    Ok(ctx.string(source)?)
}

pub fn format_text(item: &Item, options: &FormatOptions) -> String {
    let mut out = FormatContext::new(options.clone());
    write(&mut out, item.reader());
    out.into_string()
}

fn write(out: &mut FormatContext, item: ItemReader<'_>) {
    match item.item() {
        Item::Null => {}
        Item::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Item::Int(value) | Item::Int64(value) => out.push_str(&value.to_string()),
        Item::Float(value) => out.push_str(&value.to_string()),
        Item::String(text) | Item::Symbol(text) => out.push_str(text.as_str()),
        Item::DateTime(value) => out.push_str(&datetime::to_string(*value, Dialect::Iso8601)),
        Item::Element(_) => {
            if let Some(element) = item.as_element() {
                out.push_str(&element.text_content());
            }
        }
        Item::List(_) | Item::Array(_) => {
            if !out.enter() {
                out.write_depth_sentinel();
                return;
            }
            if let Some(list) = item.as_list() {
                for (index, entry) in list.iter().enumerate() {
                    if index > 0 {
                        out.newline();
                    }
                    write(out, entry);
                }
            }
            out.leave();
        }
        Item::Map(_) => {
            if !out.enter() {
                out.write_depth_sentinel();
                return;
            }
            if let Some(map) = item.as_map() {
                for (index, (_, value)) in map.entries().enumerate() {
                    if index > 0 {
                        out.newline();
                    }
                    write(out, value);
                }
            }
            out.leave();
        }
        other => out.write_type_sentinel(other.type_tag()),
    }
}
