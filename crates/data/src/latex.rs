//! LaTeX documents.
//!
//! The source parses to a `latex` element. A command becomes an element
//! named after it, with its `[...]` argument as the `options` attribute and
//! one `group` child per `{...}` argument. An environment becomes an
//! element named after the environment with `environment = true`, its
//! options and `{...}` arguments as attributes, and its body as children.
//! Math (`$...$`, `$$...$$`, `\(...\)`, `\[...\]`) becomes a `math` element
//! holding the raw formula. Comments are dropped.

use mosaic_value::{Context, ElementReader, FormatContext, FormatOptions, Item, ItemReader};

use crate::error::DataError;

pub const ROOT: &str = "latex";
pub const GROUP: &str = "group";
pub const MATH: &str = "math";
pub const LINEBREAK: &str = "linebreak";
/// An unescaped `&` (alignment tab).
pub const TAB: &str = "tab";

const ESCAPABLE: &[char] = &['%', '$', '&', '#', '_', '{', '}'];

/// Environments whose body is kept as raw text.
const VERBATIM: &[&str] = &["verbatim", "verbatim*", "lstlisting", "minted", "comment"];

pub fn parse_latex(ctx: &Context, source: &str) -> Result<Item, DataError> {
    let mut cursor = Cursor {
        ctx,
        source,
        pos: 0,
    };
    let children = cursor.nodes(Stop::Eof)?;
    let mut root = ctx.element(ROOT)?;
    for child in children {
        root.child(child);
    }
    Ok(root.into_item()?)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stop<'s> {
    Eof,
    Brace,
    End(&'s str),
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

    fn error(&self, message: impl Into<String>) -> DataError {
        DataError::syntax("latex", self.pos, message)
    }

    fn flush(&self, text: &mut String, items: &mut Vec<Item>) -> Result<(), DataError> {
        if !text.is_empty() {
            items.push(self.ctx.string(text)?);
            text.clear();
        }
        Ok(())
    }

    fn nodes(&mut self, stop: Stop<'s>) -> Result<Vec<Item>, DataError> {
        let mut items = Vec::new();
        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                return match stop {
                    Stop::Eof => {
                        self.flush(&mut text, &mut items)?;
                        Ok(items)
                    }
                    Stop::Brace => Err(self.error("unclosed '{'")),
                    Stop::End(name) => Err(self.error(format!("missing \\end{{{}}}", name))),
                };
            };
            match c {
                '}' => {
                    if stop != Stop::Brace {
                        return Err(self.error("unexpected '}'"));
                    }
                    self.pos += 1;
                    self.flush(&mut text, &mut items)?;
                    return Ok(items);
                }
                '{' => {
                    self.flush(&mut text, &mut items)?;
                    items.push(self.group()?);
                }
                '%' => {
                    self.pos = match self.rest().find('\n') {
                        Some(end) => self.pos + end + 1,
                        None => self.source.len(),
                    };
                }
                '$' => {
                    self.flush(&mut text, &mut items)?;
                    items.push(self.dollar_math()?);
                }
                '&' => {
                    self.flush(&mut text, &mut items)?;
                    self.pos += 1;
                    items.push(self.ctx.element(TAB)?.into_item()?);
                }
                '\\' => {
                    let next = self.rest()[1..].chars().next();
                    match next {
                        None => {
                            text.push('\\');
                            self.pos += 1;
                        }
                        Some(escaped) if ESCAPABLE.contains(&escaped) => {
                            text.push(escaped);
                            self.pos += 2;
                        }
                        Some('\\') => {
                            self.flush(&mut text, &mut items)?;
                            self.pos += 2;
                            let mut linebreak = self.ctx.element(LINEBREAK)?;
                            if let Some(options) = self.options()? {
                                linebreak.attr("options", self.ctx.string(options)?)?;
                            }
                            items.push(linebreak.into_item()?);
                        }
                        Some('[') => {
                            self.flush(&mut text, &mut items)?;
                            self.pos += 2;
                            items.push(self.delimited_math("\\]", true)?);
                        }
                        Some('(') => {
                            self.flush(&mut text, &mut items)?;
                            self.pos += 2;
                            items.push(self.delimited_math("\\)", false)?);
                        }
                        Some(_) => {
                            self.flush(&mut text, &mut items)?;
                            let start = self.pos;
                            self.pos += 1;
                            let name = self.control_sequence();
                            match name {
                                "begin" => items.push(self.environment()?),
                                "end" => {
                                    let env = self.raw_group()?.unwrap_or_default();
                                    if stop != Stop::End(env) {
                                        self.pos = start;
                                        return Err(self.error(format!("unexpected \\end{{{}}}", env)));
                                    }
                                    return Ok(items);
                                }
                                _ => items.push(self.command(name)?),
                            }
                        }
                    }
                }
                _ => {
                    text.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }

    /// A control word (letters, optionally starred) or a single symbol.
    fn control_sequence(&mut self) -> &'s str {
        let rest = self.rest();
        let mut len = rest
            .find(|c: char| !(c.is_ascii_alphabetic() || c == '@'))
            .unwrap_or(rest.len());
        if len == 0 {
            len = rest.chars().next().map(char::len_utf8).unwrap_or(0);
        } else if rest[len..].starts_with('*') {
            len += 1;
        }
        self.pos += len;
        &rest[..len]
    }

    fn group(&mut self) -> Result<Item, DataError> {
        self.pos += 1;
        let children = self.nodes(Stop::Brace)?;
        let mut group = self.ctx.element(GROUP)?;
        for child in children {
            group.child(child);
        }
        Ok(group.into_item()?)
    }

    /// Raw text of a balanced `open ... close` pair starting here.
    fn balanced(&mut self, open: char, close: char) -> Result<Option<&'s str>, DataError> {
        if self.peek() != Some(open) {
            return Ok(None);
        }
        let start = self.pos + 1;
        let mut depth = 0usize;
        let mut chars = self.rest().char_indices();
        while let Some((at, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                _ if c == open => depth += 1,
                _ if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.pos + at;
                        self.pos = end + close.len_utf8();
                        return Ok(Some(&self.source[start..end]));
                    }
                }
                _ => {}
            }
        }
        Err(self.error(format!("unclosed '{}'", open)))
    }

    fn options(&mut self) -> Result<Option<&'s str>, DataError> {
        self.balanced('[', ']')
    }

    fn raw_group(&mut self) -> Result<Option<&'s str>, DataError> {
        self.balanced('{', '}')
    }

    fn command(&mut self, name: &str) -> Result<Item, DataError> {
        let mut command = self.ctx.element(name)?;
        if let Some(options) = self.options()? {
            command.attr("options", self.ctx.string(options)?)?;
        }
        while self.peek() == Some('{') {
            let group = self.group()?;
            command.child(group);
        }
        Ok(command.into_item()?)
    }

    fn environment(&mut self) -> Result<Item, DataError> {
        let Some(name) = self.raw_group()? else {
            return Err(self.error("expected {name} after \\begin"));
        };
        let mut environment = self.ctx.element(name)?;
        environment.attr("environment", Item::Bool(true))?;
        if let Some(options) = self.options()? {
            environment.attr("options", self.ctx.string(options)?)?;
        }
        let mut args = Vec::new();
        while let Some(arg) = self.raw_group()? {
            args.push(self.ctx.string(arg)?);
        }
        if !args.is_empty() {
            environment.attr("args", self.ctx.list(args)?)?;
        }

        if VERBATIM.contains(&name) {
            let end = format!("\\end{{{}}}", name);
            let Some(at) = self.rest().find(&end) else {
                return Err(self.error(format!("missing {}", end)));
            };
            let body = &self.rest()[..at];
            self.pos += at + end.len();
            environment.child(self.ctx.string(body)?);
        } else {
            for child in self.nodes(Stop::End(name))? {
                environment.child(child);
            }
        }
        Ok(environment.into_item()?)
    }

    fn dollar_math(&mut self) -> Result<Item, DataError> {
        if self.rest().starts_with("$$") {
            self.pos += 2;
            self.delimited_math("$$", true)
        } else {
            self.pos += 1;
            self.delimited_math("$", false)
        }
    }

    fn delimited_math(&mut self, close: &str, display: bool) -> Result<Item, DataError> {
        let rest = self.rest();
        let mut search = 0;
        let end = loop {
            match rest[search..].find(close) {
                Some(at) if rest[..search + at].ends_with('\\') && !close.starts_with('\\') => {
                    search += at + close.len();
                }
                Some(at) => break search + at,
                None => return Err(self.error(format!("missing closing {}", close))),
            }
        };
        self.pos += end + close.len();
        let mut math = self.ctx.element(MATH)?;
        math.attr("display", Item::Bool(display))?;
        math.child(self.ctx.string(rest[..end].trim())?);
        Ok(math.into_item()?)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            _ if ESCAPABLE.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

pub fn format_latex(item: &Item, options: &FormatOptions) -> String {
    let mut out = FormatContext::new(options.clone());
    match item.reader().as_element() {
        Some(root) if root.is(ROOT) => write_nodes(&mut out, root.children().collect()),
        _ => write_nodes(&mut out, vec![item.reader()]),
    }
    out.into_string()
}

fn write_nodes(out: &mut FormatContext, nodes: Vec<ItemReader<'_>>) {
    for (index, node) in nodes.iter().enumerate() {
        match node.item() {
            Item::Null => {}
            Item::String(text) | Item::Symbol(text) => out.push_str(&escape(text.as_str())),
            Item::Element(_) => {
                let Some(element) = node.as_element() else {
                    continue;
                };
                write_element(out, element);
                // A bare control word would swallow the letters that follow.
                let bare = element.child_count() == 0
                    && !element.has_attr("options")
                    && !matches!(element.tag(), MATH | LINEBREAK | TAB | GROUP)
                    && !element.has_attr("environment")
                    && element.tag().starts_with(|c: char| c.is_ascii_alphabetic());
                let next_is_letter = nodes
                    .get(index + 1)
                    .and_then(|next| next.as_str())
                    .is_some_and(|text| text.starts_with(|c: char| c.is_ascii_alphabetic()));
                if bare && next_is_letter {
                    out.push_str("{}");
                }
            }
            other => match crate::xml::scalar_text(other) {
                Some(text) => out.push_str(&escape(&text)),
                None => out.write_type_sentinel(other.type_tag()),
            },
        }
    }
}

fn write_element(out: &mut FormatContext, element: ElementReader<'_>) {
    if !out.enter() {
        out.write_depth_sentinel();
        return;
    }
    match element.tag() {
        MATH => {
            let formula = element.text_content();
            if element.attr("display").and_then(|v| v.as_bool()) == Some(true) {
                out.push_str("\\[");
                out.push_str(&formula);
                out.push_str("\\]");
            } else {
                out.push('$');
                out.push_str(&formula);
                out.push('$');
            }
        }
        LINEBREAK => {
            out.push_str("\\\\");
            write_options(out, element);
        }
        TAB => out.push('&'),
        GROUP => {
            out.push('{');
            write_nodes(out, element.children().collect());
            out.push('}');
        }
        name if element.attr("environment").and_then(|v| v.as_bool()) == Some(true) => {
            out.push_str("\\begin{");
            out.push_str(name);
            out.push('}');
            write_options(out, element);
            if let Some(args) = element.attr("args").and_then(|v| v.as_list()) {
                for arg in args.iter() {
                    out.push('{');
                    out.push_str(arg.as_str().unwrap_or_default());
                    out.push('}');
                }
            }
            if VERBATIM.contains(&name) {
                out.push_str(&element.text_content());
            } else {
                write_nodes(out, element.children().collect());
            }
            out.push_str("\\end{");
            out.push_str(name);
            out.push('}');
        }
        name => {
            out.push('\\');
            out.push_str(name);
            write_options(out, element);
            for child in element.children() {
                match child.as_element() {
                    Some(group) if group.is(GROUP) => write_element(out, group),
                    _ => {
                        out.push('{');
                        write_nodes(out, vec![child]);
                        out.push('}');
                    }
                }
            }
        }
    }
    out.leave();
}

fn write_options(out: &mut FormatContext, element: ElementReader<'_>) {
    if let Some(options) = element.attr_str("options") {
        out.push('[');
        out.push_str(options);
        out.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\\documentclass[11pt]{article}\n% preamble\n\\begin{document}\n\\section*{Intro}\nCost is 5\\% of \\$10 \\& more.\\\\[2pt]\nInline $a^2 + b^2$ and \\[E = mc^2\\]\n\\begin{tabular}{ll}\nx & y\n\\end{tabular}\n\\begin{verbatim}\n\\raw{kept} % too\n\\end{verbatim}\n\\end{document}\n";

    fn root(item: &Item) -> ElementReader<'_> {
        item.reader().as_element().unwrap()
    }

    #[test]
    fn test_commands_and_groups() {
        let ctx = Context::new();
        let item = parse_latex(&ctx, SAMPLE).unwrap();
        let class = root(&item).child(0).and_then(|c| c.as_element()).unwrap();
        assert!(class.is("documentclass"));
        assert_eq!(class.attr_str("options"), Some("11pt"));
        let group = class.child(0).and_then(|c| c.as_element()).unwrap();
        assert!(group.is(GROUP));
        assert_eq!(group.text_content(), "article");
    }

    #[test]
    fn test_environments_math_and_escapes() {
        let ctx = Context::new();
        let item = parse_latex(&ctx, SAMPLE).unwrap();
        let document = root(&item)
            .child_elements()
            .find(|e| e.is("document"))
            .unwrap();
        assert_eq!(document.attr("environment").and_then(|v| v.as_bool()), Some(true));

        let section = document.child_elements().next().unwrap();
        assert!(section.is("section*"));

        let text: Vec<&str> = document.children().filter_map(|c| c.as_str()).collect();
        assert!(text.contains(&"\nCost is 5% of $10 & more."));

        let maths: Vec<_> = document.child_elements().filter(|e| e.is(MATH)).collect();
        assert_eq!(maths.len(), 2);
        assert_eq!(maths[0].text_content(), "a^2 + b^2");
        assert_eq!(maths[1].attr("display").and_then(|v| v.as_bool()), Some(true));

        let linebreak = document.child_elements().find(|e| e.is(LINEBREAK)).unwrap();
        assert_eq!(linebreak.attr_str("options"), Some("2pt"));

        let tabular = document.child_elements().find(|e| e.is("tabular")).unwrap();
        let args = tabular.attr("args").and_then(|v| v.as_list()).unwrap();
        assert_eq!(args.get(0).and_then(|a| a.as_str()), Some("ll"));
        assert!(tabular.child_elements().any(|e| e.is(TAB)));

        let verbatim = document.child_elements().find(|e| e.is("verbatim")).unwrap();
        assert_eq!(verbatim.text_content(), "\n\\raw{kept} % too\n");
    }

    #[test]
    fn test_round_trip() {
        let ctx = Context::new();
        let item = parse_latex(&ctx, SAMPLE).unwrap();
        let text = format_latex(&item, &FormatOptions::default());
        assert!(!text.contains("% preamble"));
        assert!(text.contains("5\\% of \\$10 \\& more.\\\\[2pt]"));
        assert!(text.contains("\\begin{tabular}{ll}\nx & y\n\\end{tabular}"));
        let back = parse_latex(&ctx, &text).unwrap();
        assert!(item.structural_eq(&back), "{}", text);
    }

    #[test]
    fn test_bare_command_before_letters() {
        let ctx = Context::new();
        let mut root = ctx.element(ROOT).unwrap();
        root.child(ctx.element("LaTeX").unwrap().into_item().unwrap());
        root.child(ctx.string("rocks").unwrap());
        let item = root.into_item().unwrap();
        assert_eq!(format_latex(&item, &FormatOptions::default()), "\\LaTeX{}rocks");
    }

    #[test]
    fn test_unbalanced_input() {
        let ctx = Context::new();
        assert!(parse_latex(&ctx, "\\textbf{open").is_err());
        assert!(parse_latex(&ctx, "\\begin{a} x \\end{b}").is_err());
        assert!(parse_latex(&ctx, "cost $5").is_err());
        assert!(parse_latex(&ctx, "stray }").is_err());
    }
}
