//! CSS stylesheets.
//!
//! A sheet parses to a `stylesheet` element. Each style rule is a `rule`
//! element whose `_` attribute lists its selectors and whose remaining
//! attributes are the declarations, values kept as written. At-rules are
//! `at_rule` elements carrying `name` and `prelude`; their block holds
//! nested rules, or a single `declarations` element for descriptor blocks
//! such as `@font-face`. Nested style rules become child `rule` elements.

use mosaic_value::{
    Context, Diagnostic, ElementBuilder, ElementReader, FormatContext, FormatOptions, Item,
    ItemReader,
};
use nom::{IResult, Parser, bytes::complete::take_while1};

use crate::error::DataError;

pub const STYLESHEET: &str = "stylesheet";
pub const RULE: &str = "rule";
pub const AT_RULE: &str = "at_rule";
pub const DECLARATIONS: &str = "declarations";
pub const SELECTORS: &str = "_";

/// At-rules whose block lists descriptors rather than rules.
const DESCRIPTOR_AT_RULES: &[&str] = &["font-face", "page", "counter-style", "property", "viewport"];

pub fn parse_css(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let text = blank_comments(source);
    let mut sheet = Sheet {
        ctx,
        text: &text,
        pos: 0,
    };
    let mut root = ctx.element(STYLESHEET)?;
    for item in sheet.rules(false)? {
        root.child(item);
    }
    Ok(root.into_item()?)
}

/// Replaces comments with spaces so offsets still point into the source.
fn blank_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut quote: Option<char> = None;
    while let Some(c) = rest.chars().next() {
        if quote.is_none() && rest.starts_with("/*") {
            let len = match rest[2..].find("*/") {
                Some(end) => end + 4,
                None => {
                    log::debug!("css: unterminated comment");
                    rest.len()
                }
            };
            for c in rest[..len].chars() {
                match c {
                    '\n' => out.push('\n'),
                    other => out.extend(std::iter::repeat_n(' ', other.len_utf8())),
                }
            }
            rest = &rest[len..];
            continue;
        }
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (Some(_), '\\') => {
                let escaped = rest[1..].chars().next().map(char::len_utf8).unwrap_or(0);
                out.push_str(&rest[..1 + escaped]);
                rest = &rest[1 + escaped..];
                continue;
            }
            _ => {}
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Sheet<'c, 's> {
    ctx: &'c Context,
    text: &'s str,
    pos: usize,
}

impl<'c, 's> Sheet<'c, 's> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn skip_past(&mut self, stop: char) {
        self.pos = match self.text[self.pos..].find(stop) {
            Some(at) => self.pos + at + stop.len_utf8(),
            None => self.text.len(),
        };
    }

    /// Reads up to the first of `stops` outside strings and parentheses.
    /// The stop character is left unconsumed.
    fn scan_until(&mut self, stops: &[char]) -> (&'s str, Option<char>) {
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = self.text[start..].char_indices();
        while let Some((at, c)) = chars.next() {
            match quote {
                Some(_) if c == '\\' => {
                    chars.next();
                }
                Some(open) if c == open => quote = None,
                Some(_) => {}
                None => match c {
                    '"' | '\'' => quote = Some(c),
                    '(' | '[' => depth += 1,
                    ')' | ']' => depth = depth.saturating_sub(1),
                    _ if depth == 0 && stops.contains(&c) => {
                        self.pos = start + at;
                        return (&self.text[start..self.pos], Some(c));
                    }
                    _ => {}
                },
            }
        }
        self.pos = self.text.len();
        (&self.text[start..], None)
    }

    /// Rules until end of input, or until the `}` closing a nested block.
    fn rules(&mut self, nested: bool) -> Result<Vec<Item>, DataError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    if nested {
                        log::debug!("css: block not closed before end of input");
                    }
                    break;
                }
                Some('}') if nested => {
                    self.pos += 1;
                    break;
                }
                Some('}') => {
                    items.push(self.ctx.error(Diagnostic::syntax(self.pos, "unexpected '}'")));
                    self.pos += 1;
                }
                Some('@') => items.push(self.at_rule()?),
                Some(_) => items.push(self.style_rule()?),
            }
        }
        Ok(items)
    }

    fn style_rule(&mut self) -> Result<Item, DataError> {
        let start = self.pos;
        let (prelude, stop) = self.scan_until(&['{', '}', ';']);
        if stop != Some('{') {
            log::debug!("css: no block after selector at byte {}", start);
            if stop.is_some() {
                self.pos += 1;
            }
            return Ok(self.ctx.error(Diagnostic::syntax(start, "expected '{' after selector")));
        }
        self.pos += 1;
        self.rule_block(prelude)
    }

    fn rule_block(&mut self, prelude: &str) -> Result<Item, DataError> {
        let selectors = split_selectors(prelude)
            .iter()
            .map(|selector| self.ctx.string(selector))
            .collect::<Result<Vec<_>, _>>()?;
        let mut rule = self.ctx.element(RULE)?;
        rule.attr(SELECTORS, self.ctx.list(selectors)?)?;
        self.declarations(&mut rule)?;
        Ok(rule.into_item()?)
    }

    /// Declarations up to and including the closing `}`. A nested block
    /// becomes a child rule.
    fn declarations(&mut self, element: &mut ElementBuilder<'_>) -> Result<(), DataError> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    log::debug!("css: declaration block not closed");
                    return Ok(());
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(';') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            let start = self.pos;
            let (declaration, stop) = self.scan_until(&[';', '{', '}']);
            match stop {
                Some(';') => self.pos += 1,
                Some('{') => {
                    self.pos += 1;
                    let nested = if declaration.trim_start().starts_with('@') {
                        self.pos = start;
                        self.at_rule()?
                    } else {
                        self.rule_block(declaration)?
                    };
                    element.child(nested);
                    continue;
                }
                _ => {}
            }
            match declaration.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    element.attr(name.trim(), self.ctx.string(&squash(value))?)?;
                }
                _ => {
                    let message = format!("expected ':' in declaration `{}`", declaration.trim());
                    element.child(self.ctx.error(Diagnostic::syntax(start, message)));
                }
            }
        }
    }

    fn at_rule(&mut self) -> Result<Item, DataError> {
        let start = self.pos;
        let rest = &self.text[self.pos + 1..];
        let name: IResult<&str, &str> = take_while1(is_ident_char).parse(rest);
        let Ok((after, name)) = name else {
            self.skip_past('}');
            return Ok(self.ctx.error(Diagnostic::syntax(start, "expected at-rule name after '@'")));
        };
        self.pos = self.text.len() - after.len();

        let (prelude, stop) = self.scan_until(&['{', ';', '}']);
        let mut rule = self.ctx.element(AT_RULE)?;
        rule.attr("name", self.ctx.string(name)?)?;
        let prelude = squash(prelude);
        if !prelude.is_empty() {
            rule.attr("prelude", self.ctx.string(&prelude)?)?;
        }
        match stop {
            Some(';') => self.pos += 1,
            Some('{') => {
                self.pos += 1;
                if DESCRIPTOR_AT_RULES.contains(&name) {
                    let mut block = self.ctx.element(DECLARATIONS)?;
                    self.declarations(&mut block)?;
                    rule.child(block.into_item()?);
                } else {
                    for item in self.rules(true)? {
                        rule.child(item);
                    }
                }
            }
            _ => {}
        }
        Ok(rule.into_item()?)
    }
}

/// Collapses whitespace runs outside strings and trims the ends.
fn squash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut space = false;
    let mut escaped = false;
    for c in text.trim().chars() {
        if quote.is_none() && c.is_whitespace() {
            space = true;
            continue;
        }
        if space {
            out.push(' ');
            space = false;
        }
        match quote {
            _ if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(open) if c == open => quote = None,
            None if c == '"' || c == '\'' => quote = Some(c),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Splits a selector list at commas outside parentheses and brackets.
fn split_selectors(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (at, c) in prelude.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                selectors.push(squash(&prelude[start..at]));
                start = at + 1;
            }
            _ => {}
        }
    }
    selectors.push(squash(&prelude[start..]));
    selectors.retain(|selector| !selector.is_empty());
    selectors
}

/// Pretty output puts one declaration per line with blank lines between
/// top-level rules; compact output drops all optional whitespace.
pub fn format_css(item: &Item, options: &FormatOptions) -> String {
    let mut out = FormatContext::new(options.clone());
    match item.reader().as_element() {
        Some(sheet) if sheet.is(STYLESHEET) => write_items(&mut out, sheet.children()),
        _ => write_items(&mut out, std::iter::once(item.reader())),
    }
    if out.is_pretty() {
        out.ensure_newline();
    }
    out.into_string()
}

fn write_items<'a>(out: &mut FormatContext, items: impl Iterator<Item = ItemReader<'a>>) {
    for item in items {
        if item.is_error() {
            log::debug!("css: skipping error item");
            continue;
        }
        if out.is_pretty() && out.indent_level() == 0 {
            out.ensure_blank_line();
        }
        match item.as_element() {
            Some(rule) if rule.is(RULE) => write_rule(out, rule),
            Some(rule) if rule.is(AT_RULE) => write_at_rule(out, rule),
            _ => {
                if out.is_pretty() {
                    out.write_indent();
                }
                out.write_type_sentinel(item.tag());
                if out.is_pretty() {
                    out.newline();
                }
            }
        }
    }
}

fn write_rule(out: &mut FormatContext, rule: ElementReader<'_>) {
    let separator = if out.is_pretty() { ", " } else { "," };
    let selectors = match rule.attr(SELECTORS) {
        Some(value) => match value.as_list() {
            Some(list) => list
                .iter()
                .filter_map(|selector| selector.as_str())
                .collect::<Vec<_>>()
                .join(separator),
            None => value.as_str().unwrap_or_default().to_string(),
        },
        None => String::new(),
    };
    if out.is_pretty() {
        out.write_indent();
    }
    out.push_str(&selectors);
    write_block(out, rule);
}

fn write_at_rule(out: &mut FormatContext, rule: ElementReader<'_>) {
    if out.is_pretty() {
        out.write_indent();
    }
    out.push('@');
    out.push_str(rule.attr_str("name").unwrap_or_default());
    if let Some(prelude) = rule.attr_str("prelude") {
        out.push(' ');
        out.push_str(prelude);
    }
    if rule.child_count() == 0 {
        out.push(';');
        if out.is_pretty() {
            out.newline();
        }
        return;
    }
    match rule.child_elements().find(|child| child.is(DECLARATIONS)) {
        Some(block) => write_block(out, block),
        None => write_block(out, rule),
    }
}

/// `{ ... }` holding the element's declarations and then its child rules.
fn write_block(out: &mut FormatContext, element: ElementReader<'_>) {
    let pretty = out.is_pretty();
    out.push_str(if pretty { " {" } else { "{" });
    if pretty {
        out.newline();
    }
    if !out.enter() {
        if pretty {
            out.write_indent();
        }
        out.write_depth_sentinel();
        if pretty {
            out.newline();
        }
    } else {
        out.indent();
        let declarations: Vec<_> = element
            .attrs()
            .entries()
            .filter(|(key, _)| *key != SELECTORS && !(element.is(AT_RULE) && matches!(*key, "name" | "prelude")))
            .collect();
        for (index, (property, value)) in declarations.iter().enumerate() {
            if pretty {
                out.write_indent();
            }
            out.push_str(property);
            out.push_str(if pretty { ": " } else { ":" });
            match value.as_str() {
                Some(text) => out.push_str(text),
                None => out.push_str(&crate::xml::scalar_text(value.item()).unwrap_or_default()),
            }
            if pretty {
                out.push(';');
                out.newline();
            } else if index + 1 < declarations.len() {
                out.push(';');
            }
        }
        let nested = element.children().filter(|child| {
            child.as_element().is_some_and(|e| e.is(RULE) || e.is(AT_RULE))
        });
        write_items(out, nested);
        out.dedent();
        out.leave();
    }
    if pretty {
        out.write_indent();
    }
    out.push('}');
    if pretty {
        out.newline();
    }
}
