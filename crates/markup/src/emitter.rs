//! The single emitter behind every markup dialect.
//!
//! Blocks are written line by line. Containers (list items, quotes) push a
//! line prefix; the first line written under a prefix gets its `first`
//! form (the list marker), every later line the `rest` form.

use crate::node::is_block_tag;
use crate::rules::{
    HeadingStyle, ImageStyle, LinkStyle, ListStyle, MarkupOutputRules, QuoteStyle, TableStyle,
};
use mosaic_value::{
    DEPTH_SENTINEL, ElementReader, FormatContext, FormatOptions, Item, ItemReader, TypeTag,
};

/// Formats `item` (normally a `doc` element) in the dialect `rules` describe.
pub fn emit_markup(item: &Item, rules: &MarkupOutputRules, options: &FormatOptions) -> String {
    let mut emitter = MarkupEmitter::new(rules, options.clone());
    emitter.emit_root(item.reader());
    emitter.finish()
}

struct LinePrefix {
    first: String,
    rest: String,
    used: bool,
}

pub struct MarkupEmitter<'r> {
    rules: &'r MarkupOutputRules,
    out: FormatContext,
    prefixes: Vec<LinePrefix>,
    /// Marker characters of the enclosing lists, for repeated-marker styles.
    markers: String,
}

enum Chunk<'a> {
    Inline(Vec<ItemReader<'a>>),
    Block(ItemReader<'a>),
}

fn is_inline(item: &ItemReader<'_>) -> bool {
    match item.as_element() {
        Some(element) => !is_block_tag(element.tag()),
        None => !item.is_error() && !matches!(item.tag(), TypeTag::List | TypeTag::Array),
    }
}

/// Splits children into runs of inline content and single blocks.
fn chunk<'a>(children: impl Iterator<Item = ItemReader<'a>>) -> Vec<Chunk<'a>> {
    let mut chunks = Vec::new();
    let mut run = Vec::new();
    for child in children {
        if is_inline(&child) {
            run.push(child);
            continue;
        }
        if !run.is_empty() {
            chunks.push(Chunk::Inline(std::mem::take(&mut run)));
        }
        chunks.push(Chunk::Block(child));
    }
    if !run.is_empty() {
        chunks.push(Chunk::Inline(run));
    }
    chunks
}

fn heading_level(tag: &str) -> Option<usize> {
    let level = tag.strip_prefix('h')?.parse::<usize>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Longest run of `c` in `text`.
fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

impl<'r> MarkupEmitter<'r> {
    pub fn new(rules: &'r MarkupOutputRules, options: FormatOptions) -> Self {
        MarkupEmitter {
            rules,
            out: FormatContext::new(options),
            prefixes: Vec::new(),
            markers: String::new(),
        }
    }

    pub fn finish(mut self) -> String {
        self.out.ensure_newline();
        self.out.into_string()
    }

    pub fn emit_root(&mut self, root: ItemReader<'_>) {
        match root.as_element() {
            Some(doc) if doc.is("doc") => self.emit_blocks(doc.children(), false),
            _ => match root.as_list() {
                Some(list) => self.emit_blocks(list.iter(), false),
                None => self.emit_blocks(std::iter::once(root), false),
            },
        }
    }

    // ---- line plumbing ----

    fn start_line(&mut self) {
        let mut prefix = String::new();
        for p in &mut self.prefixes {
            if p.used {
                prefix.push_str(&p.rest);
            } else {
                prefix.push_str(&p.first);
                p.used = true;
            }
        }
        self.out.push_str(&prefix);
    }

    fn end_line(&mut self) {
        self.out.trim_trailing_spaces();
        self.out.newline();
    }

    fn write_line(&mut self, text: &str) {
        self.start_line();
        self.out.push_str(text);
        self.end_line();
    }

    fn write_lines(&mut self, text: &str) {
        for line in text.split('\n') {
            self.write_line(line);
        }
    }

    /// Code lines keep their trailing whitespace.
    fn write_verbatim(&mut self, text: &str) {
        if text.is_empty() {
            self.push_blank();
            return;
        }
        self.start_line();
        self.out.push_str(text);
        self.out.newline();
    }

    fn push_blank(&mut self) {
        let prefix: String = self.prefixes.iter().map(|p| p.rest.as_str()).collect();
        self.out.push_str(prefix.trim_end());
        self.out.newline();
    }

    /// A separating blank line; never two in a row and never at the start.
    fn blank_line(&mut self) {
        let prefix: String = self.prefixes.iter().map(|p| p.rest.as_str()).collect();
        let blank = format!("\n{}\n", prefix.trim_end());
        if self.out.is_empty() || self.out.ends_with(&blank) {
            return;
        }
        self.push_blank();
    }

    fn separate(&mut self) {
        if self.rules.blank_line_between_blocks {
            self.blank_line();
        }
    }

    fn with_prefix(&mut self, first: String, rest: String, body: impl FnOnce(&mut Self)) {
        self.prefixes.push(LinePrefix {
            first,
            rest,
            used: false,
        });
        body(self);
        if self.prefixes.last().is_some_and(|p| !p.used) {
            // Nothing was written; the marker still needs its line.
            self.write_line("");
        }
        self.prefixes.pop();
    }

    // ---- blocks ----

    fn emit_blocks<'a>(&mut self, children: impl Iterator<Item = ItemReader<'a>>, tight: bool) {
        let mut first = true;
        for chunk in chunk(children) {
            let text = match &chunk {
                Chunk::Inline(run) => {
                    let text = self.render_inline_run(run.iter().copied());
                    if text.trim().is_empty() {
                        continue;
                    }
                    Some(text)
                }
                Chunk::Block(_) => None,
            };
            if !first && !tight {
                self.separate();
            }
            first = false;
            match (chunk, text) {
                (_, Some(text)) => self.write_paragraph(&text),
                (Chunk::Block(block), None) => self.emit_block(block),
                (Chunk::Inline(_), None) => {}
            }
        }
    }

    fn write_paragraph(&mut self, text: &str) {
        let text = text.trim_matches(|c: char| c == ' ' || c == '\n');
        if self.rules.link == LinkStyle::Markdown && starts_like_block(text) {
            let mut escaped = String::with_capacity(text.len() + 1);
            escaped.push('\\');
            escaped.push_str(text);
            self.write_lines(&escaped);
        } else {
            self.write_lines(text);
        }
    }

    fn emit_block(&mut self, block: ItemReader<'_>) {
        if !self.out.enter() {
            self.write_line(DEPTH_SENTINEL);
            return;
        }
        match block.as_element() {
            Some(element) => self.emit_element(element),
            None => match block.as_list() {
                Some(list) => self.emit_blocks(list.iter(), false),
                None => {
                    self.start_line();
                    self.out.write_type_sentinel(block.tag());
                    self.end_line();
                }
            },
        }
        self.out.leave();
    }

    fn emit_element(&mut self, element: ElementReader<'_>) {
        let tag = element.tag();
        if let Some(level) = heading_level(tag) {
            self.emit_heading(level, element);
            return;
        }
        match tag {
            "p" => self.emit_paragraph(element),
            "ul" => self.emit_list(element, false),
            "ol" => self.emit_list(element, true),
            "pre" => self.emit_code_block(element),
            "blockquote" => self.emit_quote(element),
            "hr" => self.write_line(self.rules.rule),
            "table" => self.emit_table(element),
            "html" => self.emit_raw(element),
            "jsx_element" if self.rules.raw_jsx => self.emit_raw(element),
            "jsx_element" => {
                log::debug!("dropping jsx_element in {} output", self.rules.name);
            }
            _ => self.emit_blocks(element.children(), false),
        }
    }

    fn emit_raw(&mut self, element: ElementReader<'_>) {
        if let Some(content) = element.attr_str("content") {
            self.write_lines(content.trim_end_matches('\n'));
        }
    }

    fn emit_paragraph(&mut self, p: ElementReader<'_>) {
        if self.rules.image == ImageStyle::Directive && p.child_count() == 1 {
            if let Some(img) = p.child(0).and_then(|c| c.as_element()).filter(|e| e.is("img")) {
                let src = img.attr_str("src").unwrap_or_default();
                self.write_line(&format!(".. image:: {}", src));
                if let Some(alt) = img.attr_str("alt").filter(|alt| !alt.is_empty()) {
                    self.write_line(&format!("   :alt: {}", alt));
                }
                return;
            }
        }
        let text = self.render_inline_run(p.children());
        self.write_paragraph(&text);
    }

    fn emit_heading(&mut self, level: usize, heading: ElementReader<'_>) {
        let text = self.render_inline_run(heading.children()).replace('\n', " ");
        let text = text.trim();
        match self.rules.heading {
            HeadingStyle::Prefix { marker } => {
                let marks = marker.to_string().repeat(level);
                self.write_line(&format!("{} {}", marks, text));
            }
            HeadingStyle::Underline { cycle } => {
                let underline = cycle[(level - 1) % cycle.len()];
                let width = text.chars().count().max(1);
                self.write_line(text);
                self.write_line(&underline.to_string().repeat(width));
            }
            HeadingStyle::Wrapped { marker } => {
                let marks = marker.to_string().repeat(level);
                self.write_line(&format!("{} {} {}", marks, text, marks));
            }
            HeadingStyle::Numbered => self.write_line(&format!("h{}. {}", level, text)),
        }
    }

    fn emit_code_block(&mut self, pre: ElementReader<'_>) {
        let code = pre.child_elements().find(|child| child.is("code"));
        let language = code
            .and_then(|code| code.attr_str("language"))
            .or_else(|| pre.attr_str("language"))
            .filter(|lang| !lang.is_empty());
        let literal = match code {
            Some(code) => code.text_content(),
            None => pre.text_content(),
        };
        let literal = literal.trim_end_matches('\n');

        let mut open = self.rules.code_open(language);
        let mut close = self.rules.code_close(language.is_some()).to_string();
        if open.starts_with("```") {
            let fence = "`".repeat(longest_run(literal, '`').max(2) + 1);
            open = open.replacen("```", &fence, 1);
            close = fence;
        }
        for line in open.split('\n') {
            if line.is_empty() {
                self.blank_line();
            } else {
                self.write_line(line);
            }
        }
        let indent = self.rules.code_block.indent;
        for line in literal.split('\n') {
            if line.is_empty() {
                self.push_blank();
            } else {
                self.write_verbatim(&format!("{}{}", indent, line));
            }
        }
        if !close.is_empty() {
            self.write_line(&close);
        }
    }

    fn emit_quote(&mut self, quote: ElementReader<'_>) {
        match self.rules.quote {
            QuoteStyle::Prefix(prefix) => {
                self.with_prefix(prefix.to_string(), prefix.to_string(), |this| {
                    this.emit_blocks(quote.children(), false)
                });
            }
            QuoteStyle::Wrapped { open, close } => {
                self.write_line(open);
                self.emit_blocks(quote.children(), false);
                self.write_line(close);
            }
            QuoteStyle::Leader(leader) => {
                let mut first = true;
                for chunk in chunk(quote.children()) {
                    if !first {
                        self.separate();
                    }
                    first = false;
                    let text = match chunk {
                        Chunk::Inline(run) => self.render_inline_run(run.into_iter()),
                        Chunk::Block(block) => match block.as_element() {
                            Some(p) if p.is("p") => self.render_inline_run(p.children()),
                            _ => {
                                self.emit_block(block);
                                continue;
                            }
                        },
                    };
                    self.write_line(&format!("{}{}", leader, text.trim().replace('\n', " ")));
                }
            }
        }
    }

    fn emit_list(&mut self, list: ElementReader<'_>, ordered: bool) {
        match self.rules.list {
            ListStyle::Indented {
                bullet,
                ordered_suffix,
            } => self.emit_indented_list(list, ordered, bullet, ordered_suffix),
            ListStyle::Repeated {
                bullet,
                ordered: ordered_marker,
            } => {
                self.markers
                    .push(if ordered { ordered_marker } else { bullet });
                self.emit_repeated_list(list);
                self.markers.pop();
            }
        }
    }

    fn emit_indented_list(
        &mut self,
        list: ElementReader<'_>,
        ordered: bool,
        bullet: &str,
        suffix: char,
    ) {
        let start = list.attr_int("start").unwrap_or(1);
        let items: Vec<ElementReader<'_>> = list.child_elements().filter(|c| c.is("li")).collect();
        let tight = !items
            .iter()
            .any(|li| li.child_elements().any(|child| child.is("p")));
        for (index, li) in items.into_iter().enumerate() {
            if index > 0 && !tight {
                self.separate();
            }
            let marker = if ordered {
                format!("{}{}", start + index as i64, suffix)
            } else {
                bullet.to_string()
            };
            let rest = " ".repeat(marker.chars().count() + 1);
            let mut first = format!("{} ", marker);
            if self.rules.task_markers {
                match li.attr("checked").and_then(|c| c.as_bool()) {
                    Some(true) => first.push_str("[x] "),
                    Some(false) => first.push_str("[ ] "),
                    None => {}
                }
            }
            if !self.out.enter() {
                self.write_line(DEPTH_SENTINEL);
                continue;
            }
            self.with_prefix(first, rest, |this| this.emit_blocks(li.children(), tight));
            self.out.leave();
        }
    }

    fn emit_repeated_list(&mut self, list: ElementReader<'_>) {
        for li in list.child_elements().filter(|c| c.is("li")) {
            if !self.out.enter() {
                self.write_line(DEPTH_SENTINEL);
                continue;
            }
            let mut line = String::new();
            let mut nested = Vec::new();
            for chunk in chunk(li.children()) {
                match chunk {
                    Chunk::Inline(run) => line.push_str(&self.render_inline_run(run.into_iter())),
                    Chunk::Block(block) => match block.as_element() {
                        Some(p) if p.is("p") => {
                            if !line.is_empty() {
                                line.push(' ');
                            }
                            let text = self.render_inline_run(p.children());
                            line.push_str(&text);
                        }
                        _ => nested.push(block),
                    },
                }
            }
            let line = line.trim().replace('\n', " ");
            self.write_line(&format!("{} {}", self.markers, line));
            for block in nested {
                match block.as_element() {
                    Some(sub) if sub.is("ul") => self.emit_list(sub, false),
                    Some(sub) if sub.is("ol") => self.emit_list(sub, true),
                    _ => self.emit_block(block),
                }
            }
            self.out.leave();
        }
    }

    fn emit_table(&mut self, table: ElementReader<'_>) {
        let mut rows: Vec<(bool, Vec<String>)> = Vec::new();
        self.collect_rows(table, &mut rows);
        if rows.is_empty() {
            return;
        }
        let columns = rows.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);
        for (_, cells) in &mut rows {
            cells.resize(columns, String::new());
        }
        let has_header = rows[0].0;
        match self.rules.table {
            TableStyle::Pipe => {
                for (index, (_, cells)) in rows.iter().enumerate() {
                    let escaped: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
                    self.write_line(&format!("| {} |", escaped.join(" | ")));
                    if index == 0 {
                        self.write_line(&format!("|{}|", vec![" --- "; columns].join("|")));
                    }
                }
            }
            TableStyle::OrgPipe => {
                for (index, (_, cells)) in rows.iter().enumerate() {
                    self.write_line(&format!("| {} |", cells.join(" | ")));
                    if index == 0 && has_header && rows.len() > 1 {
                        self.write_line(&format!("|{}|", vec!["---"; columns].join("+")));
                    }
                }
            }
            TableStyle::RstSimple => {
                let widths: Vec<usize> = (0..columns)
                    .map(|col| {
                        rows.iter()
                            .map(|(_, cells)| cells[col].chars().count())
                            .max()
                            .unwrap_or(0)
                            .max(1)
                    })
                    .collect();
                let border = widths
                    .iter()
                    .map(|w| "=".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("  ");
                self.write_line(&border);
                for (index, (_, cells)) in rows.iter().enumerate() {
                    let line = cells
                        .iter()
                        .zip(&widths)
                        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                        .collect::<Vec<_>>()
                        .join("  ");
                    self.write_line(&line);
                    if index == 0 && has_header && rows.len() > 1 {
                        self.write_line(&border);
                    }
                }
                self.write_line(&border);
            }
            TableStyle::Wiki => {
                self.write_line("{|");
                for (index, (header, cells)) in rows.iter().enumerate() {
                    if index > 0 {
                        self.write_line("|-");
                    }
                    if *header {
                        self.write_line(&format!("! {}", cells.join(" !! ")));
                    } else {
                        self.write_line(&format!("| {}", cells.join(" || ")));
                    }
                }
                self.write_line("|}");
            }
            TableStyle::Textile => {
                for (header, cells) in &rows {
                    let line: String = cells
                        .iter()
                        .map(|cell| {
                            if *header {
                                format!("|_. {} ", cell)
                            } else {
                                format!("| {} ", cell)
                            }
                        })
                        .collect();
                    self.write_line(&format!("{}|", line));
                }
            }
        }
    }

    fn collect_rows(&mut self, parent: ElementReader<'_>, rows: &mut Vec<(bool, Vec<String>)>) {
        for child in parent.child_elements() {
            if child.is("tr") {
                let mut header = true;
                let mut cells = Vec::new();
                for cell in child.child_elements() {
                    header &= cell.is("th");
                    let text = self.render_inline_run(cell.children());
                    cells.push(text.trim().replace('\n', " "));
                }
                rows.push((header && !cells.is_empty(), cells));
            } else {
                // thead / tbody wrappers from HTML-shaped trees
                self.collect_rows(child, rows);
            }
        }
    }

    // ---- inline ----

    fn render_inline_run<'a>(&mut self, items: impl Iterator<Item = ItemReader<'a>>) -> String {
        let mut out = String::new();
        for item in items {
            self.render_inline(item, &mut out);
        }
        out
    }

    fn escape_into(&self, text: &str, out: &mut String) {
        match self.rules.escape {
            Some(special) => {
                for c in text.chars() {
                    if special.contains(c) {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
            None => out.push_str(text),
        }
    }

    fn render_inline(&mut self, item: ItemReader<'_>, out: &mut String) {
        if let Some(text) = item.as_str() {
            self.escape_into(text, out);
            return;
        }
        let Some(element) = item.as_element() else {
            match item.tag() {
                TypeTag::Null => {}
                TypeTag::Int | TypeTag::Int64 | TypeTag::Float | TypeTag::Bool => {
                    out.push_str(&item.item().to_string());
                }
                TypeTag::DateTime => {
                    if let Some(value) = item.as_datetime() {
                        out.push_str(&mosaic_value::datetime::to_string(
                            value,
                            mosaic_value::datetime::Dialect::Iso8601,
                        ));
                    }
                }
                TypeTag::List | TypeTag::Array => {
                    if let Some(list) = item.as_list() {
                        for child in list.iter() {
                            self.render_inline(child, out);
                        }
                    }
                }
                other => out.push_str(&other.sentinel()),
            }
            return;
        };
        if !self.out.enter() {
            out.push_str(DEPTH_SENTINEL);
            return;
        }
        self.render_inline_element(element, out);
        self.out.leave();
    }

    fn render_inline_element(&mut self, element: ElementReader<'_>, out: &mut String) {
        let rules = self.rules;
        match element.tag() {
            "em" | "i" => {
                let inner = self.render_inline_run(element.children());
                wrap(out, rules.emphasis.open, &inner, rules.emphasis.close);
            }
            "strong" | "b" => {
                let inner = self.render_inline_run(element.children());
                wrap(out, rules.strong.open, &inner, rules.strong.close);
            }
            "s" | "del" | "strike" => {
                let inner = self.render_inline_run(element.children());
                match rules.strikethrough {
                    Some(d) => wrap(out, d.open, &inner, d.close),
                    None => out.push_str(&inner),
                }
            }
            "code" => {
                let literal = element.text_content();
                if rules.code.open == "`" && literal.contains('`') {
                    let ticks = "`".repeat(longest_run(&literal, '`') + 1);
                    out.push_str(&format!("{} {} {}", ticks, literal, ticks));
                } else {
                    wrap(out, rules.code.open, &literal, rules.code.close);
                }
            }
            "a" => {
                let text = self.render_inline_run(element.children());
                let href = element.attr_str("href").unwrap_or_default();
                let title = element.attr_str("title").filter(|t| !t.is_empty());
                write_link(out, rules.link, &text, href, title);
            }
            "img" => {
                let src = element.attr_str("src").unwrap_or_default();
                let alt = element.attr_str("alt").unwrap_or_default();
                match rules.image {
                    ImageStyle::Markdown => {
                        out.push_str("![");
                        self.escape_into(alt, out);
                        out.push_str("](");
                        out.push_str(src);
                        if let Some(title) = element.attr_str("title").filter(|t| !t.is_empty()) {
                            out.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
                        }
                        out.push(')');
                    }
                    ImageStyle::Directive => self.escape_into(alt, out),
                    ImageStyle::Org => out.push_str(&format!("[[{}]]", src)),
                    ImageStyle::Wiki if alt.is_empty() => out.push_str(&format!("[[File:{}]]", src)),
                    ImageStyle::Wiki => out.push_str(&format!("[[File:{}|{}]]", src, alt)),
                    ImageStyle::Textile if alt.is_empty() => out.push_str(&format!("!{}!", src)),
                    ImageStyle::Textile => out.push_str(&format!("!{}({})!", src, alt)),
                }
            }
            "br" => {
                let trimmed = out.trim_end_matches(' ').len();
                out.truncate(trimmed);
                out.push_str(rules.line_break);
                out.push('\n');
            }
            "html" | "jsx_element" => {
                if let Some(content) = element.attr_str("content") {
                    out.push_str(content);
                }
            }
            _ => {
                let inner = self.render_inline_run(element.children());
                out.push_str(&inner);
            }
        }
    }
}

fn wrap(out: &mut String, open: &str, inner: &str, close: &str) {
    out.push_str(open);
    out.push_str(inner);
    out.push_str(close);
}

fn write_link(out: &mut String, style: LinkStyle, text: &str, href: &str, title: Option<&str>) {
    let bare = text.is_empty() || text == href;
    match style {
        LinkStyle::Markdown => {
            out.push_str(&format!("[{}]({}", text, href));
            if let Some(title) = title {
                out.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
            }
            out.push(')');
        }
        LinkStyle::Rst if bare => out.push_str(href),
        LinkStyle::Rst => out.push_str(&format!("`{} <{}>`_", text, href)),
        LinkStyle::Org if bare => out.push_str(&format!("[[{}]]", href)),
        LinkStyle::Org => out.push_str(&format!("[[{}][{}]]", href, text)),
        LinkStyle::Wiki if href.contains("://") && bare => out.push_str(&format!("[{}]", href)),
        LinkStyle::Wiki if href.contains("://") => out.push_str(&format!("[{} {}]", href, text)),
        LinkStyle::Wiki if bare => out.push_str(&format!("[[{}]]", href)),
        LinkStyle::Wiki => out.push_str(&format!("[[{}|{}]]", href, text)),
        LinkStyle::Textile => out.push_str(&format!("\"{}\":{}", text, href)),
    }
}

/// Paragraph text that a markdown reader would take for a block marker.
fn starts_like_block(text: &str) -> bool {
    text.starts_with('#')
        || text.starts_with('>')
        || text.starts_with("- ")
        || text.starts_with("+ ")
        || text.starts_with("---")
}
