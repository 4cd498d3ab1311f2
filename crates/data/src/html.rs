//! HTML via html5ever.
//!
//! The document is parsed by the HTML5 tree builder, so fragments gain the
//! implied `html`/`head`/`body` wrappers. The doctype and comments use the
//! same reserved tags as XML.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use mosaic_value::{Context, FormatOptions, Item};

use crate::error::DataError;
use crate::xml::{COMMENT, DOCTYPE, TagWriter, is_layout_whitespace, root_of};

/// Elements whose whitespace is content.
const PRESERVE_SPACE: &[&str] = &["pre", "textarea", "script", "style"];

pub fn parse_html(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let dom = parse_document(RcDom::default(), Default::default()).one(source);
    let errors = dom.errors.borrow().len();
    if errors > 0 {
        log::debug!("html: tree builder recovered from {} parse errors", errors);
    }

    let mut roots = Vec::new();
    for child in dom.document.children.borrow().iter() {
        if let Some(item) = convert(ctx, child, false, true)? {
            roots.push(item);
        }
    }
    root_of(ctx, roots)
}

fn convert(
    ctx: &Context,
    handle: &Handle,
    preserve: bool,
    top_level: bool,
) -> Result<Option<Item>, DataError> {
    let item = match &handle.data {
        NodeData::Document => None,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            let mut text = name.to_string();
            if !public_id.is_empty() {
                text.push_str(&format!(" PUBLIC \"{}\"", public_id));
            }
            if !system_id.is_empty() {
                if public_id.is_empty() {
                    text.push_str(" SYSTEM");
                }
                text.push_str(&format!(" \"{}\"", system_id));
            }
            Some(leaf(ctx, DOCTYPE, &text)?)
        }
        NodeData::Text { contents } => {
            let text = contents.borrow();
            if !preserve && is_layout_whitespace(&text, top_level) {
                None
            } else {
                Some(ctx.string(&text)?)
            }
        }
        NodeData::Comment { contents } => Some(leaf(ctx, COMMENT, contents)?),
        NodeData::ProcessingInstruction { target, contents } => {
            Some(leaf(ctx, &format!("?{}", target), contents)?)
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let tag: &str = &name.local;
            let mut element = ctx.element(tag)?;
            for attribute in attrs.borrow().iter() {
                let key = match &attribute.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, &*attribute.name.local),
                    None => attribute.name.local.to_string(),
                };
                element.attr(&key, ctx.string(&attribute.value)?)?;
            }
            let keep = preserve || PRESERVE_SPACE.contains(&tag);
            let template = template_contents.borrow();
            let children = match template.as_ref() {
                Some(content) => content.children.borrow().clone(),
                None => handle.children.borrow().clone(),
            };
            for child in &children {
                if let Some(item) = convert(ctx, child, keep, false)? {
                    element.child(item);
                }
            }
            Some(element.into_item()?)
        }
    };
    Ok(item)
}

fn leaf(ctx: &Context, tag: &str, text: &str) -> Result<Item, DataError> {
    let mut element = ctx.element(tag)?;
    if !text.is_empty() {
        element.child(ctx.string(text)?);
    }
    Ok(element.into_item()?)
}

pub fn format_html(item: &Item, options: &FormatOptions) -> String {
    let mut writer = TagWriter::new(options, true);
    writer.document(item);
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(item: &Item) -> mosaic_value::ElementReader<'_> {
        let html = match item.reader().as_list() {
            Some(list) => list.get(1).and_then(|n| n.as_element()).unwrap(),
            None => item.reader().as_element().unwrap(),
        };
        html.child_elements().find(|e| e.is("body")).unwrap()
    }

    #[test]
    fn test_document_structure() {
        let ctx = Context::new();
        let item = parse_html(
            &ctx,
            "<!DOCTYPE html><html><head><title>T</title></head><body><p class=\"x\">Hello <b>you</b></p><!-- c --></body></html>",
        )
        .unwrap();
        let roots = item.reader().as_list().unwrap();
        let doctype = roots.get(0).and_then(|n| n.as_element()).unwrap();
        assert_eq!(doctype.tag(), DOCTYPE);
        assert_eq!(doctype.text_content(), "html");

        let body = body(&item);
        let p = body.child(0).and_then(|n| n.as_element()).unwrap();
        assert_eq!(p.attr_str("class"), Some("x"));
        assert_eq!(p.child_count(), 2);
        assert!(body.child(1).and_then(|n| n.as_element()).unwrap().is(COMMENT));
    }

    #[test]
    fn test_fragments_gain_wrappers() {
        let ctx = Context::new();
        let item = parse_html(&ctx, "<p>loose</p>").unwrap();
        let html = item.reader().as_element().unwrap();
        assert_eq!(html.tag(), "html");
        let tags: Vec<_> = html.child_elements().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["head", "body"]);
    }

    #[test]
    fn test_format_round_trip() {
        let ctx = Context::new();
        let source = "<!DOCTYPE html><html><head></head><body><div id=\"a\"><p>one <em>two</em></p><pre>  keep\n  this</pre><br><input disabled=\"\"></div></body></html>";
        let item = parse_html(&ctx, source).unwrap();
        assert_eq!(format_html(&item, &FormatOptions::compact()), source);

        let pretty = format_html(&item, &FormatOptions::default());
        assert!(pretty.starts_with("<!DOCTYPE html>\n<html>\n  <head></head>\n  <body>\n"));
        assert!(pretty.contains("\n      <p>one <em>two</em></p>\n"));
        let back = parse_html(&ctx, &pretty).unwrap();
        assert!(item.structural_eq(&back), "{}", pretty);
    }

    #[test]
    fn test_raw_text_is_not_escaped() {
        let ctx = Context::new();
        let item = parse_html(&ctx, "<script>if (a < b && c) {}</script><p>a &lt; b</p>").unwrap();
        let text = format_html(&item, &FormatOptions::compact());
        assert!(text.contains("<script>if (a < b && c) {}</script>"));
        assert!(text.contains("<p>a &lt; b</p>"));
    }

    #[test]
    fn test_output_is_well_formed_without_void_elements() {
        let ctx = Context::new();
        let item = parse_html(&ctx, "<ul><li>a &amp; b</li><li title='q\"'>c</li></ul>").unwrap();
        let text = format_html(&item, &FormatOptions::default());
        if let Err(err) = roxmltree::Document::parse(&text) {
            panic!("{}\n{}", err, text);
        }
    }
}
