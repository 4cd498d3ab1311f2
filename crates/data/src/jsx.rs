//! JSX markup.
//!
//! Elements keep their tag names, `<>...</>` fragments become `jsx_fragment`
//! elements, and every `{expression}` becomes a `js` element whose only
//! child is the expression source. Attribute values are strings, `js`
//! elements, or `true` for a bare attribute. Text children are cleaned the
//! way JSX compilers do: lines are trimmed where they meet a line break and
//! joined with single spaces, and whitespace-only runs that contain a line
//! break disappear.

use mosaic_value::{
    Context, ElementBuilder, ElementReader, FormatContext, FormatOptions, Item, ItemReader,
};

use crate::error::DataError;
use crate::xml::{root_of, scalar_text};

pub const FRAGMENT: &str = "jsx_fragment";
pub const EXPRESSION: &str = "js";
pub const SPREAD: &str = "...";

pub fn parse_jsx(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let mut cursor = Cursor {
        ctx,
        source,
        pos: 0,
    };
    let mut roots = Vec::new();
    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => break,
            Some('<') => roots.push(cursor.element()?),
            Some('{') => roots.push(cursor.expression()?),
            Some(_) => return Err(cursor.error("expected '<' to start a JSX element")),
        }
    }
    root_of(ctx, roots)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '$')
}

struct Cursor<'c, 's> {
    ctx: &'c Context,
    source: &'s str,
    pos: usize,
}

impl<'c, 's> Cursor<'c, 's> {
    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.rest().starts_with(text) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), DataError> {
        if self.eat(text) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", text)))
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, message: impl Into<String>) -> DataError {
        DataError::syntax("jsx", self.pos, message)
    }

    fn name(&mut self) -> &'s str {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn element(&mut self) -> Result<Item, DataError> {
        self.expect("<")?;
        self.skip_whitespace();
        if self.eat(">") {
            let mut fragment = self.ctx.element(FRAGMENT)?;
            self.children(&mut fragment, "")?;
            return Ok(fragment.into_item()?);
        }

        let name = self.name();
        if name.is_empty() {
            return Err(self.error("expected an element name"));
        }
        let mut element = self.ctx.element(name)?;
        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                return Ok(element.into_item()?);
            }
            if self.eat(">") {
                break;
            }
            self.attribute(&mut element)?;
        }
        self.children(&mut element, name)?;
        Ok(element.into_item()?)
    }

    fn attribute(&mut self, element: &mut ElementBuilder<'_>) -> Result<(), DataError> {
        if self.peek() == Some('{') {
            let start = self.pos;
            let source = self.braced()?;
            let Some(spread) = source.trim().strip_prefix("...") else {
                self.pos = start;
                return Err(self.error("expected a spread attribute"));
            };
            return Ok(element.attr(SPREAD, self.js(spread.trim())?)?);
        }
        let name = self.name();
        if name.is_empty() {
            return Err(self.error("expected an attribute name"));
        }
        self.skip_whitespace();
        if !self.eat("=") {
            return Ok(element.attr(name, Item::Bool(true))?);
        }
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let rest = self.rest();
                let end = rest
                    .find(quote)
                    .ok_or_else(|| self.error("unterminated attribute string"))?;
                self.pos += end + 1;
                self.ctx.string(&decode_entities(&rest[..end]))?
            }
            Some('{') => {
                let source = self.braced()?;
                self.js(source.trim())?
            }
            Some('<') => self.element()?,
            _ => return Err(self.error("expected an attribute value")),
        };
        Ok(element.attr(name, value)?)
    }

    /// Children up to the closing tag for `name` (empty for a fragment).
    fn children(&mut self, element: &mut ElementBuilder<'_>, name: &str) -> Result<(), DataError> {
        loop {
            let rest = self.rest();
            let text_len = rest.find(['<', '{']).unwrap_or(rest.len());
            if text_len > 0 {
                let text = clean_text(&rest[..text_len]);
                if !text.is_empty() {
                    element.child(self.ctx.string(&decode_entities(&text))?);
                }
                self.pos += text_len;
            }
            match self.peek() {
                None => return Err(self.error(format!("unclosed <{}>", name))),
                Some('{') => {
                    let source = self.braced()?;
                    if !source.trim().is_empty() {
                        element.child(self.js(source.trim())?);
                    }
                }
                Some(_) if self.rest().starts_with("</") => {
                    let start = self.pos;
                    self.pos += 2;
                    self.skip_whitespace();
                    let closing = self.name();
                    if closing != name {
                        self.pos = start;
                        return Err(self.error(format!(
                            "expected </{}>, found </{}>",
                            name, closing
                        )));
                    }
                    self.skip_whitespace();
                    return self.expect(">");
                }
                Some(_) => {
                    let child = self.element()?;
                    element.child(child);
                }
            }
        }
    }

    fn expression(&mut self) -> Result<Item, DataError> {
        let source = self.braced()?;
        self.js(source.trim())
    }

    fn js(&self, source: &str) -> Result<Item, DataError> {
        let mut js = self.ctx.element(EXPRESSION)?;
        js.child(self.ctx.string(source)?);
        Ok(js.into_item()?)
    }

    /// The source between a balanced pair of braces.
    fn braced(&mut self) -> Result<&'s str, DataError> {
        let start = self.pos;
        self.expect("{")?;
        let body = self.pos;
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        let mut chars = self.rest().char_indices();
        while let Some((at, c)) = chars.next() {
            match quote {
                Some(_) if c == '\\' => {
                    chars.next();
                }
                Some(open) if c == open => quote = None,
                Some(_) => {}
                None => match c {
                    '"' | '\'' | '`' => quote = Some(c),
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            self.pos = body + at + 1;
                            return Ok(&self.source[body..body + at]);
                        }
                    }
                    _ => {}
                },
            }
        }
        self.pos = start;
        Err(self.error("unterminated '{' expression"))
    }
}

/// Trims whitespace around line breaks and joins the remaining lines with
/// single spaces.
fn clean_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let lines = if text.ends_with('\n') {
        let mut lines = lines;
        lines.push("");
        lines
    } else {
        lines
    };
    let last_non_empty = lines
        .iter()
        .rposition(|line| line.contains(|c: char| c != ' ' && c != '\t'));
    let mut out = String::new();
    for (index, line) in lines.iter().enumerate() {
        let mut line: &str = line;
        if index > 0 {
            line = line.trim_start_matches([' ', '\t']);
        }
        if index + 1 < lines.len() {
            line = line.trim_end_matches([' ', '\t', '\r']);
        }
        if line.is_empty() {
            continue;
        }
        out.push_str(&line.replace('\t', " "));
        if Some(index) != last_non_empty {
            out.push(' ');
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let decoded = rest.find(';').and_then(|end| {
            let name = &rest[1..end];
            let c = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
                    None => name
                        .strip_prefix('#')
                        .and_then(|decimal| decimal.parse().ok())
                        .and_then(char::from_u32),
                },
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            other => out.push(other),
        }
    }
    out
}

pub fn format_jsx(item: &Item, options: &FormatOptions) -> String {
    let mut writer = JsxWriter {
        out: FormatContext::new(options.clone()),
    };
    match item {
        Item::List(list) => {
            for (index, root) in list.iter().enumerate() {
                if index > 0 {
                    writer.out.newline();
                }
                writer.node(root.reader());
            }
        }
        other => writer.node(other.reader()),
    }
    if writer.out.is_pretty() {
        writer.out.ensure_newline();
    }
    writer.out.into_string()
}

struct JsxWriter {
    out: FormatContext,
}

impl JsxWriter {
    fn node(&mut self, node: ItemReader<'_>) {
        match node.item() {
            Item::Null => {}
            Item::String(text) | Item::Symbol(text) => self.out.push_str(&escape_text(text.as_str())),
            Item::Element(_) => {
                if let Some(element) = node.as_element() {
                    self.element(element);
                }
            }
            other => match scalar_text(other) {
                Some(text) => self.out.push_str(&escape_text(&text)),
                None => self.out.write_type_sentinel(other.type_tag()),
            },
        }
    }

    fn element(&mut self, element: ElementReader<'_>) {
        if element.is(EXPRESSION) {
            self.out.push('{');
            self.out.push_str(&element.text_content());
            self.out.push('}');
            return;
        }
        if !self.out.enter() {
            self.out.write_depth_sentinel();
            return;
        }
        let fragment = element.is(FRAGMENT);
        let tag = if fragment { "" } else { element.tag() };
        self.out.push('<');
        self.out.push_str(tag);
        for (key, value) in element.attrs().entries() {
            self.attribute(key, value);
        }
        if element.child_count() == 0 && !fragment {
            self.out.push_str(" />");
            self.out.leave();
            return;
        }
        self.out.push('>');

        let block = self.out.is_pretty()
            && element.children().all(|child| child.as_element().is_some());
        if block {
            self.out.indent();
            for child in element.children() {
                self.out.break_line();
                self.node(child);
            }
            self.out.dedent();
            self.out.break_line();
        } else {
            for child in element.children() {
                self.node(child);
            }
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self.out.leave();
    }

    fn attribute(&mut self, key: &str, value: ItemReader<'_>) {
        self.out.push(' ');
        if key == SPREAD {
            self.out.push_str("{...");
            if let Some(js) = value.as_element() {
                self.out.push_str(&js.text_content());
            }
            self.out.push('}');
            return;
        }
        self.out.push_str(key);
        match value.item() {
            Item::Bool(true) => {}
            Item::String(text) | Item::Symbol(text) => {
                self.out.push_str("=\"");
                let text = text.as_str().replace('&', "&amp;").replace('"', "&quot;");
                self.out.push_str(&text);
                self.out.push('"');
            }
            Item::Element(_) => {
                self.out.push('=');
                if let Some(element) = value.as_element() {
                    self.element(element);
                }
            }
            other => {
                self.out.push_str("={");
                match scalar_text(other) {
                    Some(text) => self.out.push_str(&text),
                    None => self.out.write_type_sentinel(other.type_tag()),
                }
                self.out.push('}');
            }
        }
    }
}
