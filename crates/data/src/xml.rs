//! XML via quick-xml, plus the tag writer shared with HTML output.
//!
//! Elements keep their qualified names; attributes become the element's
//! attribute map. Declarations, doctypes, comments and processing
//! instructions become elements with reserved tags (`?xml`, `!DOCTYPE`,
//! `!--`, `?target`). Whitespace-only text that breaks a line is layout and
//! is dropped.

use mosaic_value::datetime::{self, Dialect};
use mosaic_value::{
    Context, ElementBuilder, ElementReader, FormatContext, FormatOptions, Item, ItemReader,
    MapReader,
};
use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesStart, Event};

use crate::error::DataError;

pub const DECLARATION: &str = "?xml";
pub const DOCTYPE: &str = "!DOCTYPE";
pub const COMMENT: &str = "!--";

/// Parses with duplicate attributes resolved last-wins.
pub fn parse_xml(ctx: &Context, source: &str) -> Result<Item, DataError> {
    parse_xml_with(ctx, source, false)
}

/// `strict` rejects duplicate attributes with an `Invalid` error.
pub fn parse_xml_with(ctx: &Context, source: &str, strict: bool) -> Result<Item, DataError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut tree = TreeBuilder::new(ctx);

    loop {
        let offset = reader.buffer_position() as usize;
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(err) => {
                let offset = reader.error_position() as usize;
                return Err(DataError::syntax("xml", offset, err.to_string()));
            }
        };
        match event {
            Event::Start(e) => {
                let element = start_element(ctx, &e, strict, offset)?;
                tree.open(element)?;
            }
            Event::Empty(e) => {
                let element = start_element(ctx, &e, strict, offset)?;
                tree.open(element)?;
                tree.close()?;
            }
            Event::End(_) => tree.close()?,
            Event::Text(e) => tree.text(&String::from_utf8_lossy(&e)),
            Event::CData(e) => tree.text(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e);
                tree.text(&resolve_reference(&name, offset)?);
            }
            Event::Comment(e) => tree.leaf(COMMENT, &String::from_utf8_lossy(&e))?,
            Event::DocType(e) => tree.leaf(DOCTYPE, String::from_utf8_lossy(&e).trim())?,
            Event::Decl(e) => {
                let item = declaration(ctx, &e, offset)?;
                tree.push(item)?;
            }
            Event::PI(e) => {
                let target = String::from_utf8_lossy(e.target());
                let content = String::from_utf8_lossy(e.content());
                tree.leaf(&format!("?{}", target), content.trim())?;
            }
            Event::Eof => break,
        }
        buf.clear();
    }
    tree.finish(source.len())
}

fn start_element<'a>(
    ctx: &'a Context,
    start: &BytesStart<'_>,
    strict: bool,
    offset: usize,
) -> Result<ElementBuilder<'a>, DataError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = ctx.element(&name)?;
    for attribute in start.attributes().with_checks(strict) {
        let attribute = attribute.map_err(|err| match err {
            AttrError::Duplicated(..) => {
                DataError::invalid("xml", format!("duplicate attribute on <{}>", name))
            }
            other => DataError::syntax("xml", offset, other.to_string()),
        })?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attribute.value);
        let value =
            unescape(&raw).map_err(|err| DataError::syntax("xml", offset, err.to_string()))?;
        element.attr(&key, ctx.string(&value)?)?;
    }
    Ok(element)
}

fn declaration(ctx: &Context, decl: &BytesDecl<'_>, offset: usize) -> Result<Item, DataError> {
    let bad = |err: &dyn std::fmt::Display| DataError::syntax("xml", offset, err.to_string());
    let mut element = ctx.element(DECLARATION)?;
    let version = decl.version().map_err(|err| bad(&err))?;
    element.attr("version", ctx.string(&String::from_utf8_lossy(&version))?)?;
    if let Some(encoding) = decl.encoding() {
        let encoding = encoding.map_err(|err| bad(&err))?;
        element.attr("encoding", ctx.string(&String::from_utf8_lossy(&encoding))?)?;
    }
    if let Some(standalone) = decl.standalone() {
        let standalone = standalone.map_err(|err| bad(&err))?;
        element.attr("standalone", ctx.string(&String::from_utf8_lossy(&standalone))?)?;
    }
    Ok(element.into_item()?)
}

/// The five predefined entities and numeric character references.
fn resolve_reference(name: &str, offset: usize) -> Result<String, DataError> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(decimal) = name.strip_prefix('#') {
                decimal.parse().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    };
    resolved
        .map(String::from)
        .ok_or_else(|| DataError::syntax("xml", offset, format!("unknown entity &{};", name)))
}

/// Assembles items from start/end events.
struct TreeBuilder<'a> {
    ctx: &'a Context,
    stack: Vec<ElementBuilder<'a>>,
    roots: Vec<Item>,
    pending: String,
}

impl<'a> TreeBuilder<'a> {
    fn new(ctx: &'a Context) -> Self {
        TreeBuilder {
            ctx,
            stack: Vec::new(),
            roots: Vec::new(),
            pending: String::new(),
        }
    }

    fn text(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn flush(&mut self) -> Result<(), DataError> {
        if is_layout_whitespace(&self.pending, self.stack.is_empty()) {
            self.pending.clear();
            return Ok(());
        }
        let text = self.ctx.string(&self.pending)?;
        self.pending.clear();
        self.attach(text);
        Ok(())
    }

    fn attach(&mut self, item: Item) {
        match self.stack.last_mut() {
            Some(parent) => parent.child(item),
            None => self.roots.push(item),
        }
    }

    fn push(&mut self, item: Item) -> Result<(), DataError> {
        self.flush()?;
        self.attach(item);
        Ok(())
    }

    fn open(&mut self, element: ElementBuilder<'a>) -> Result<(), DataError> {
        self.flush()?;
        self.stack.push(element);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.flush()?;
        if let Some(element) = self.stack.pop() {
            let item = element.into_item()?;
            self.attach(item);
        }
        Ok(())
    }

    fn leaf(&mut self, tag: &str, text: &str) -> Result<(), DataError> {
        let mut element = self.ctx.element(tag)?;
        if !text.is_empty() {
            element.child(self.ctx.string(text)?);
        }
        let item = element.into_item()?;
        self.push(item)
    }

    fn finish(mut self, end: usize) -> Result<Item, DataError> {
        self.flush()?;
        if let Some(open) = self.stack.last() {
            return Err(DataError::syntax(
                "xml",
                end,
                format!("element <{}> is never closed", open.tag()),
            ));
        }
        root_of(self.ctx, self.roots)
    }
}

/// Indentation between elements: whitespace-only text that spans a line
/// break or sits outside the root. A lone space inside mixed content stays.
pub(crate) fn is_layout_whitespace(text: &str, top_level: bool) -> bool {
    text.trim().is_empty() && (text.is_empty() || top_level || text.contains('\n'))
}

/// A single top-level node is the root; several become a list.
pub(crate) fn root_of(ctx: &Context, mut roots: Vec<Item>) -> Result<Item, DataError> {
    Ok(match roots.len() {
        0 => Item::Null,
        1 => roots.pop().unwrap_or_default(),
        _ => ctx.list(roots)?,
    })
}

pub fn format_xml(item: &Item, options: &FormatOptions) -> String {
    let mut writer = TagWriter::new(options, false);
    writer.document(item);
    writer.finish()
}

/// HTML elements without end tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text is written unescaped and whose layout is kept.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];
const PREFORMATTED: &[&str] = &["pre", "textarea", "script", "style"];

/// Writes element trees as XML or HTML.
pub(crate) struct TagWriter {
    out: FormatContext,
    html: bool,
}

impl TagWriter {
    pub(crate) fn new(options: &FormatOptions, html: bool) -> Self {
        TagWriter {
            out: FormatContext::new(options.clone()),
            html,
        }
    }

    pub(crate) fn finish(mut self) -> String {
        if self.out.is_pretty() {
            self.out.ensure_newline();
        }
        self.out.into_string()
    }

    pub(crate) fn document(&mut self, item: &Item) {
        match item.reader().as_list() {
            Some(list) if matches!(item, Item::List(_)) => {
                for (index, node) in list.iter().enumerate() {
                    if index > 0 {
                        self.out.break_line();
                    }
                    self.node(node, false);
                }
            }
            _ => match item.reader().as_map() {
                Some(map) => {
                    self.out.push_str("<root>");
                    self.fields(map);
                    self.out.push_str("</root>");
                }
                None => self.node(item.reader(), false),
            },
        }
    }

    fn text(&mut self, text: &str, raw: bool) {
        if raw {
            self.out.push_str(text);
        } else {
            self.out.push_str(&partial_escape(text));
        }
    }

    fn node(&mut self, node: ItemReader<'_>, raw: bool) {
        let item = node.item();
        if let Some(text) = scalar_text(item) {
            self.text(&text, raw);
            return;
        }
        match item {
            Item::Null => {}
            Item::Element(_) => {
                if let Some(element) = node.as_element() {
                    self.element(element);
                }
            }
            Item::List(_) | Item::Array(_) => {
                if let Some(list) = node.as_list() {
                    for child in list.iter() {
                        self.node(child, raw);
                    }
                }
            }
            Item::Map(_) => {
                if let Some(map) = node.as_map() {
                    self.fields(map);
                }
            }
            other => self.out.write_type_sentinel(other.type_tag()),
        }
    }

    /// Map entries as `<key>value</key>`; sequence values repeat the key.
    fn fields(&mut self, map: MapReader<'_>) {
        if !self.out.enter() {
            self.out.write_depth_sentinel();
            return;
        }
        self.out.indent();
        for (key, value) in map.entries() {
            match value.as_list() {
                Some(list) => {
                    for entry in list.iter() {
                        self.out.break_line();
                        self.field(key, entry);
                    }
                }
                None => {
                    self.out.break_line();
                    self.field(key, value);
                }
            }
        }
        self.out.dedent();
        if !map.is_empty() {
            self.out.break_line();
        }
        self.out.leave();
    }

    fn field(&mut self, key: &str, value: ItemReader<'_>) {
        if value.is_null() {
            self.out.push_str(&format!("<{}/>", key));
            return;
        }
        self.out.push_str(&format!("<{}>", key));
        self.node(value, false);
        self.out.push_str(&format!("</{}>", key));
    }

    fn attributes(&mut self, attrs: MapReader<'_>) {
        for (key, value) in attrs.entries() {
            match value.item() {
                Item::Null => {}
                Item::Bool(true) if self.html => {
                    self.out.push(' ');
                    self.out.push_str(key);
                }
                Item::Bool(false) if self.html => {}
                item => {
                    let text = scalar_text(item).unwrap_or_else(|| item.type_tag().sentinel());
                    self.out.push_str(&format!(" {}=\"{}\"", key, escape(text.as_str())));
                }
            }
        }
    }

    fn element(&mut self, element: ElementReader<'_>) {
        let tag = element.tag();
        match tag {
            COMMENT => {
                self.out.push_str("<!--");
                self.out.push_str(&element.text_content());
                self.out.push_str("-->");
                return;
            }
            DOCTYPE => {
                self.out.push_str("<!DOCTYPE ");
                self.out.push_str(&element.text_content());
                self.out.push('>');
                return;
            }
            DECLARATION => {
                self.out.push_str("<?xml");
                self.attributes(element.attrs());
                self.out.push_str("?>");
                return;
            }
            _ if tag.starts_with('?') => {
                self.out.push_str("<");
                self.out.push_str(tag);
                let content = element.text_content();
                if !content.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(&content);
                }
                self.out.push_str("?>");
                return;
            }
            _ => {}
        }

        if !self.out.enter() {
            self.out.write_depth_sentinel();
            return;
        }
        let name = tag.to_string();
        self.out.push('<');
        self.out.push_str(&name);
        self.attributes(element.attrs());

        let lowered = name.to_ascii_lowercase();
        if element.child_count() == 0 {
            if !self.html {
                self.out.push_str("/>");
            } else if VOID_ELEMENTS.contains(&lowered.as_str()) {
                self.out.push('>');
            } else {
                self.out.push_str(&format!("></{}>", name));
            }
            self.out.leave();
            return;
        }
        self.out.push('>');

        let raw = self.html && RAW_TEXT_ELEMENTS.contains(&lowered.as_str());
        let preformatted = self.html && PREFORMATTED.contains(&lowered.as_str());
        let block = !preformatted && element.children().all(|child| child.as_element().is_some());
        if block {
            self.out.indent();
            for child in element.children() {
                self.out.break_line();
                self.node(child, raw);
            }
            self.out.dedent();
            self.out.break_line();
        } else {
            for child in element.children() {
                self.node(child, raw);
            }
        }
        self.out.push_str(&format!("</{}>", name));
        self.out.leave();
    }
}

/// Text for scalar items; `None` for containers and unrepresentable items.
pub(crate) fn scalar_text(item: &Item) -> Option<String> {
    match item {
        Item::String(text) | Item::Symbol(text) => Some(text.as_str().to_string()),
        Item::Bool(flag) => Some(flag.to_string()),
        Item::Int(value) | Item::Int64(value) => Some(value.to_string()),
        Item::Float(value) => Some(value.to_string()),
        Item::DateTime(value) => Some(datetime::to_string(*value, Dialect::Iso8601)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed(text: &str) {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        if let Err(err) = roxmltree::Document::parse_with_options(text, options) {
            panic!("not well-formed: {}\n{}", err, text);
        }
    }

    #[test]
    fn test_elements_attributes_and_text() {
        let ctx = Context::new();
        let source = "<book id=\"1\" lang='en'><title>Rust &amp; XML</title><note/></book>";
        let item = parse_xml(&ctx, source).unwrap();
        let book = item.reader().as_element().unwrap();
        assert_eq!(book.tag(), "book");
        assert_eq!(book.attr_str("id"), Some("1"));
        assert_eq!(book.attr_str("lang"), Some("en"));
        assert_eq!(book.child_count(), 2);
        let title = book.child(0).and_then(|c| c.as_element()).unwrap();
        assert_eq!(title.text_content(), "Rust & XML");
    }

    #[test]
    fn test_reserved_nodes() {
        let ctx = Context::new();
        let source = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE note>\n<!-- hi -->\n<note><?render fast?></note>";
        let item = parse_xml(&ctx, source).unwrap();
        let roots = item.reader().as_list().unwrap();
        let tags: Vec<_> = roots.iter().map(|n| n.as_element().unwrap().tag()).collect();
        assert_eq!(tags, vec!["?xml", "!DOCTYPE", "!--", "note"]);
        let decl = roots.get(0).and_then(|n| n.as_element()).unwrap();
        assert_eq!(decl.attr_str("encoding"), Some("UTF-8"));
        let note = roots.get(3).and_then(|n| n.as_element()).unwrap();
        let pi = note.child(0).and_then(|n| n.as_element()).unwrap();
        assert_eq!(pi.tag(), "?render");
        assert_eq!(pi.text_content(), "fast");

        let text = format_xml(&item, &FormatOptions::default());
        assert_eq!(
            text,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE note>\n<!-- hi -->\n<note>\n  <?render fast?>\n</note>\n"
        );
        well_formed(&text);
    }

    #[test]
    fn test_pretty_and_compact_round_trip() {
        let ctx = Context::new();
        let source = "<a x=\"1\"><b>one</b><c><d/></c><p>mixed <i>text</i> here</p></a>";
        let item = parse_xml(&ctx, source).unwrap();
        assert_eq!(format_xml(&item, &FormatOptions::compact()), source);
        let pretty = format_xml(&item, &FormatOptions::default());
        assert_eq!(
            pretty,
            "<a x=\"1\">\n  <b>one</b>\n  <c>\n    <d/>\n  </c>\n  <p>mixed <i>text</i> here</p>\n</a>\n"
        );
        well_formed(&pretty);
        let back = parse_xml(&ctx, &pretty).unwrap();
        assert!(item.structural_eq(&back));
    }

    #[test]
    fn test_escaping() {
        let ctx = Context::new();
        let mut element = ctx.element("t").unwrap();
        element.attr("q", ctx.string("a\"b<c").unwrap()).unwrap();
        element.child(ctx.string("1 < 2 & 3").unwrap());
        let item = element.into_item().unwrap();
        let text = format_xml(&item, &FormatOptions::compact());
        well_formed(&text);
        let back = parse_xml(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back));
    }

    #[test]
    fn test_inline_space_is_kept() {
        let ctx = Context::new();
        let item = parse_xml(&ctx, "<p><b>a</b> <i>b</i></p>").unwrap();
        assert_eq!(item.reader().as_element().unwrap().child_count(), 3);
        assert!(is_layout_whitespace("\n  ", false));
        assert!(!is_layout_whitespace(" ", false));
        assert!(is_layout_whitespace(" ", true));
    }

    #[test]
    fn test_numeric_references() {
        let ctx = Context::new();
        let item = parse_xml(&ctx, "<t>&#65;&#x42;&lt;</t>").unwrap();
        assert_eq!(item.reader().as_element().unwrap().text_content(), "AB<");
        assert!(parse_xml(&ctx, "<t>&nbsp;</t>").is_err());
    }

    #[test]
    fn test_malformed_input() {
        let ctx = Context::new();
        assert!(matches!(
            parse_xml(&ctx, "<a><b></a>"),
            Err(DataError::Syntax { format: "xml", .. })
        ));
        assert!(matches!(
            parse_xml(&ctx, "<a><b>"),
            Err(DataError::Syntax { format: "xml", .. })
        ));
    }

    #[test]
    fn test_duplicate_attributes() {
        let ctx = Context::new();
        let lenient = parse_xml(&ctx, "<a k=\"1\" k=\"2\"/>").unwrap();
        assert_eq!(lenient.reader().as_element().unwrap().attr_str("k"), Some("2"));
        let strict = parse_xml_with(&ctx, "<a k=\"1\" k=\"2\"/>", true);
        assert!(matches!(strict, Err(DataError::Invalid { .. })));
    }

    #[test]
    fn test_maps_become_fields() {
        let ctx = Context::new();
        let source = r#"{"name":"x","tags":["a","b"],"none":null}"#;
        let json = crate::json::parse_json(&ctx, source).unwrap();
        let text = format_xml(&json, &FormatOptions::compact());
        assert_eq!(text, "<root><name>x</name><tags>a</tags><tags>b</tags><none/></root>");
        well_formed(&text);
    }
}
