//! Graph descriptions in Graphviz DOT and Mermaid flowchart syntax.
//!
//! Both parse to the same shape: a `graph` element with `directed`, an
//! optional `name` and `direction`, plus any graph-level attributes. Its
//! children are `node` elements (`id` first, then `label`, `shape` and the
//! rest) in order of first appearance, followed by `edge` elements with
//! `from`, `to` and the edge attributes. Subgraphs are flattened into the
//! enclosing graph; an edge to a subgraph fans out to every node in it.

use indexmap::IndexMap;
use mosaic_value::{Context, Diagnostic, ElementReader, FormatContext, FormatOptions, Item};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char, digit0, digit1},
    combinator::{opt, recognize, value},
    multi::fold_many0,
    sequence::{delimited, pair},
};

use crate::error::DataError;

pub const GRAPH: &str = "graph";
pub const NODE: &str = "node";
pub const EDGE: &str = "edge";

const RESERVED: &[&str] = &["directed", "name", "direction"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphFlavor {
    #[default]
    Dot,
    Mermaid,
}

impl GraphFlavor {
    pub fn from_name(name: &str) -> Result<Self, DataError> {
        match name {
            "dot" | "graphviz" => Ok(GraphFlavor::Dot),
            "mermaid" => Ok(GraphFlavor::Mermaid),
            other => Err(DataError::flavor("graph", other)),
        }
    }

    /// Mermaid when the first line is a `graph`/`flowchart` header without
    /// a DOT body brace.
    pub fn detect(source: &str) -> Self {
        let first = source
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("%%"))
            .unwrap_or_default();
        let keyword = first.split_whitespace().next().unwrap_or_default();
        if matches!(keyword, "graph" | "flowchart") && !first.contains('{') {
            GraphFlavor::Mermaid
        } else {
            GraphFlavor::Dot
        }
    }
}

type Attrs = IndexMap<String, String>;

#[derive(Default)]
struct GraphModel {
    directed: bool,
    name: Option<String>,
    attrs: Attrs,
    nodes: IndexMap<String, Attrs>,
    edges: Vec<(String, String, Attrs)>,
    errors: Vec<Diagnostic>,
}

impl GraphModel {
    fn touch(&mut self, id: &str, defaults: &Attrs) -> &mut Attrs {
        self.nodes
            .entry(id.to_string())
            .or_insert_with(|| defaults.clone())
    }

    fn into_item(self, ctx: &Context) -> Result<Item, DataError> {
        let mut graph = ctx.element(GRAPH)?;
        graph.attr("directed", Item::Bool(self.directed))?;
        if let Some(name) = &self.name {
            graph.attr("name", ctx.string(name)?)?;
        }
        for (key, value) in &self.attrs {
            graph.attr(key, ctx.string(value)?)?;
        }
        for (id, attrs) in &self.nodes {
            let mut node = ctx.element(NODE)?;
            node.attr("id", ctx.string(id)?)?;
            for key in ["label", "shape"] {
                if let Some(value) = attrs.get(key) {
                    node.attr(key, ctx.string(value)?)?;
                }
            }
            for (key, value) in attrs {
                if key != "id" && key != "label" && key != "shape" {
                    node.attr(key, ctx.string(value)?)?;
                }
            }
            graph.child(node.into_item()?);
        }
        for (from, to, attrs) in &self.edges {
            let mut edge = ctx.element(EDGE)?;
            edge.attr("from", ctx.string(from)?)?;
            edge.attr("to", ctx.string(to)?)?;
            for (key, value) in attrs {
                if key != "from" && key != "to" {
                    edge.attr(key, ctx.string(value)?)?;
                }
            }
            graph.child(edge.into_item()?);
        }
        for diagnostic in self.errors {
            graph.child(ctx.error(diagnostic));
        }
        Ok(graph.into_item()?)
    }
}

pub fn parse_graph(ctx: &Context, source: &str, flavor: Option<GraphFlavor>) -> Result<Item, DataError> {
    let model = match flavor.unwrap_or_else(|| GraphFlavor::detect(source)) {
        GraphFlavor::Dot => parse_dot(source)?,
        GraphFlavor::Mermaid => parse_mermaid(source),
    };
    log::debug!(
        "graph: {} nodes, {} edges",
        model.nodes.len(),
        model.edges.len()
    );
    model.into_item(ctx)
}

// --- DOT ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Id { text: String, quoted: bool },
    Punct(char),
    EdgeOp,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || !c.is_ascii()),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || !c.is_ascii()),
    ))
    .parse(input)
}

fn numeral(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('-')),
        alt((
            recognize(pair(char('.'), digit1)),
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        )),
    ))
    .parse(input)
}

/// `\"` is the only escape; other backslashes are kept for the renderer.
fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((
                value("\"", tag("\\\"")),
                value("", tag("\\\n")),
                is_not("\"\\"),
                tag("\\"),
            )),
            String::new,
            |mut text, part| {
                text.push_str(part);
                text
            },
        ),
        char('"'),
    )
    .parse(input)
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, DataError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    loop {
        rest = skip_trivia(source, rest);
        let offset = source.len() - rest.len();
        let Some(c) = rest.chars().next() else {
            return Ok(tokens);
        };
        let (after, token) = if rest.starts_with("->") || rest.starts_with("--") {
            (&rest[2..], Token::EdgeOp)
        } else if c == '"' {
            let (after, text) =
                quoted(rest).map_err(|_| DataError::syntax("graph", offset, "unterminated string"))?;
            (after, Token::Id { text, quoted: true })
        } else if c == '<' {
            let len = html_len(rest)
                .ok_or_else(|| DataError::syntax("graph", offset, "unterminated HTML label"))?;
            (&rest[len..], Token::Id { text: rest[..len].to_string(), quoted: true })
        } else if let Ok((after, text)) = numeral(rest) {
            (after, Token::Id { text: text.to_string(), quoted: false })
        } else if let Ok((after, text)) = identifier(rest) {
            (after, Token::Id { text: text.to_string(), quoted: false })
        } else if "{}[];,=:".contains(c) {
            (&rest[1..], Token::Punct(c))
        } else {
            return Err(DataError::syntax("graph", offset, format!("unexpected '{}'", c)));
        };
        tokens.push((offset, token));
        rest = after;
    }
}

/// Whitespace and comments. `#` lines are C preprocessor output and only
/// count as comments at the start of a line.
fn skip_trivia<'a>(source: &'a str, mut rest: &'a str) -> &'a str {
    loop {
        let trimmed = rest.trim_start();
        let before = source[..source.len() - trimmed.len()].trim_end_matches([' ', '\t']);
        let line_start = before.is_empty() || before.ends_with('\n');
        if trimmed.starts_with("//") || (trimmed.starts_with('#') && line_start) {
            rest = trimmed.find('\n').map(|end| &trimmed[end..]).unwrap_or("");
        } else if let Some(comment) = trimmed.strip_prefix("/*") {
            rest = comment.find("*/").map(|end| &comment[end + 2..]).unwrap_or("");
        } else {
            return trimmed;
        }
    }
}

/// Length of a `<...>` HTML string including its nested angle brackets.
fn html_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (at, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(at + 1);
                }
            }
            _ => {}
        }
    }
    None
}

struct DotParser {
    tokens: Vec<(usize, Token)>,
    index: usize,
    end: usize,
    model: GraphModel,
    node_defaults: Attrs,
    edge_defaults: Attrs,
}

impl DotParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(_, token)| token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.index).map(|(at, _)| *at).unwrap_or(self.end)
    }

    fn error(&self, message: impl Into<String>) -> DataError {
        DataError::syntax("graph", self.offset(), message)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|(_, token)| token.clone());
        self.index += 1;
        token
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Id { text, quoted: false }) if text.eq_ignore_ascii_case(word))
    }

    fn id(&mut self) -> Result<String, DataError> {
        match self.next() {
            Some(Token::Id { text, .. }) => Ok(text),
            _ => {
                self.index -= 1;
                Err(self.error("expected an identifier"))
            }
        }
    }

    fn graph(&mut self) -> Result<(), DataError> {
        if self.keyword("strict") {
            self.index += 1;
            self.model.attrs.insert("strict".to_string(), "true".to_string());
        }
        if self.keyword("digraph") {
            self.model.directed = true;
        } else if !self.keyword("graph") {
            return Err(self.error("expected 'graph' or 'digraph'"));
        }
        self.index += 1;
        if let Some(Token::Id { .. }) = self.peek() {
            self.model.name = Some(self.id()?);
        }
        if !self.eat('{') {
            return Err(self.error("expected '{'"));
        }
        self.statements()?;
        if self.peek().is_some() {
            return Err(self.error("unexpected content after graph"));
        }
        Ok(())
    }

    /// Statements up to and including the closing `}`. Returns the ids of
    /// the nodes they mention, for subgraph edge operands.
    fn statements(&mut self) -> Result<Vec<String>, DataError> {
        let mut members = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("expected '}'")),
                Some(Token::Punct('}')) => {
                    self.index += 1;
                    return Ok(members);
                }
                Some(Token::Punct(';')) => self.index += 1,
                _ => self.statement(&mut members)?,
            }
        }
    }

    fn statement(&mut self, members: &mut Vec<String>) -> Result<(), DataError> {
        for (word, target) in [("graph", 0), ("node", 1), ("edge", 2)] {
            let is_defaults = self.keyword(word)
                && self.tokens.get(self.index + 1).map(|(_, t)| t) == Some(&Token::Punct('['));
            if is_defaults {
                self.index += 1;
                let attrs = self.attr_lists()?;
                match target {
                    0 => self.model.attrs.extend(attrs),
                    1 => self.node_defaults.extend(attrs),
                    _ => self.edge_defaults.extend(attrs),
                }
                return Ok(());
            }
        }

        let is_assignment = matches!(self.peek(), Some(Token::Id { .. }))
            && self.tokens.get(self.index + 1).map(|(_, t)| t) == Some(&Token::Punct('='));
        if is_assignment {
            let key = self.id()?;
            self.index += 1;
            let value = self.id()?;
            self.model.attrs.insert(key, value);
            return Ok(());
        }

        let mut operands = vec![self.operand(members)?];
        let mut ports = vec![self.port()?];
        while self.peek() == Some(&Token::EdgeOp) {
            self.index += 1;
            operands.push(self.operand(members)?);
            ports.push(self.port()?);
        }
        let attrs = self.attr_lists()?;

        if operands.len() == 1 {
            let defaults = self.node_defaults.clone();
            for id in &operands[0] {
                self.model.touch(id, &defaults).extend(attrs.clone());
            }
            return Ok(());
        }
        for (link, ends) in operands.windows(2).zip(ports.windows(2)) {
            for from in &link[0] {
                for to in &link[1] {
                    let mut edge = self.edge_defaults.clone();
                    if let Some(port) = &ends[0] {
                        edge.insert("tailport".to_string(), port.clone());
                    }
                    if let Some(port) = &ends[1] {
                        edge.insert("headport".to_string(), port.clone());
                    }
                    edge.extend(attrs.clone());
                    self.model.edges.push((from.clone(), to.clone(), edge));
                }
            }
        }
        Ok(())
    }

    /// A node id, or a subgraph standing for all of its nodes.
    fn operand(&mut self, members: &mut Vec<String>) -> Result<Vec<String>, DataError> {
        if self.keyword("subgraph") || self.peek() == Some(&Token::Punct('{')) {
            if self.keyword("subgraph") {
                self.index += 1;
                if let Some(Token::Id { .. }) = self.peek() {
                    let name = self.id()?;
                    log::debug!("graph: flattening subgraph {}", name);
                }
            }
            if !self.eat('{') {
                return Err(self.error("expected '{' after subgraph"));
            }
            let inner = self.statements()?;
            members.extend(inner.iter().cloned());
            return Ok(inner);
        }
        let id = self.id()?;
        let defaults = self.node_defaults.clone();
        self.model.touch(&id, &defaults);
        if !members.contains(&id) {
            members.push(id.clone());
        }
        Ok(vec![id])
    }

    fn port(&mut self) -> Result<Option<String>, DataError> {
        let mut port: Option<String> = None;
        while self.eat(':') {
            let part = self.id()?;
            port = Some(match port {
                Some(prefix) => format!("{}:{}", prefix, part),
                None => part,
            });
        }
        Ok(port)
    }

    fn attr_lists(&mut self) -> Result<Attrs, DataError> {
        let mut attrs = Attrs::new();
        while self.eat('[') {
            while !self.eat(']') {
                let key = self.id()?;
                if !self.eat('=') {
                    return Err(self.error(format!("expected '=' after attribute {}", key)));
                }
                let value = self.id()?;
                attrs.insert(key, value);
                if !self.eat(',') {
                    self.eat(';');
                }
            }
        }
        Ok(attrs)
    }
}

fn parse_dot(source: &str) -> Result<GraphModel, DataError> {
    let mut parser = DotParser {
        tokens: tokenize(source)?,
        index: 0,
        end: source.len(),
        model: GraphModel::default(),
        node_defaults: Attrs::new(),
        edge_defaults: Attrs::new(),
    };
    parser.graph()?;
    Ok(parser.model)
}

// --- Mermaid ---

/// Opening and closing brackets of a node shape, longest first.
const SHAPES: &[(&str, &str, &str)] = &[
    ("((", "))", "circle"),
    ("[", "]", "box"),
    ("(", ")", "rounded"),
    ("{", "}", "diamond"),
];

/// Link spellings with the `kind` recorded on the edge; `None` is a plain
/// arrow.
const LINKS: &[(&str, Option<&str>)] = &[
    ("-.->", Some("dotted")),
    ("==>", Some("thick")),
    ("-->", None),
    ("---", Some("line")),
];

fn parse_mermaid(source: &str) -> GraphModel {
    let mut model = GraphModel {
        directed: true,
        ..GraphModel::default()
    };
    let mut header = false;
    let mut offset = 0;
    let none = Attrs::new();
    for raw in source.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();
        let line = match raw.find("%%") {
            Some(at) => &raw[..at],
            None => raw,
        };
        for statement in line.split(';').map(str::trim) {
            if statement.is_empty() {
                continue;
            }
            if !header {
                header = true;
                let mut words = statement.split_whitespace();
                if matches!(words.next(), Some("graph" | "flowchart")) {
                    if let Some(direction) = words.next() {
                        model.attrs.insert("direction".to_string(), direction.to_string());
                    }
                    continue;
                }
                model.errors.push(Diagnostic::syntax(line_start, "expected 'graph' or 'flowchart' header"));
                continue;
            }
            let keyword = statement.split_whitespace().next().unwrap_or_default();
            if matches!(
                keyword,
                "subgraph" | "end" | "classDef" | "class" | "style" | "linkStyle" | "click" | "direction"
            ) {
                log::debug!("graph: skipping mermaid statement `{}`", statement);
                continue;
            }
            if let Err(message) = mermaid_statement(&mut model, statement, &none) {
                model.errors.push(Diagnostic::syntax(line_start, message));
            }
        }
    }
    model
}

fn mermaid_statement(model: &mut GraphModel, statement: &str, none: &Attrs) -> Result<(), String> {
    let (mut from, mut rest) = mermaid_node(model, statement, none)?;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(());
        }
        let (after, edge) = mermaid_link(rest)?;
        let (to, after) = mermaid_node(model, after.trim_start(), none)?;
        model.edges.push((from, to.clone(), edge));
        from = to;
        rest = after;
    }
}

/// A node reference with an optional shape, declaring the node on first
/// use.
fn mermaid_node<'a>(model: &mut GraphModel, text: &'a str, none: &Attrs) -> Result<(String, &'a str), String> {
    let id_len = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.'))
        .unwrap_or(text.len());
    // Stop before a link that follows the id without a space.
    let id_len = LINKS
        .iter()
        .filter_map(|(link, _)| text[..id_len].find(link))
        .chain(text[..id_len].find("--"))
        .min()
        .unwrap_or(id_len);
    if id_len == 0 {
        return Err(format!("expected a node id in `{}`", text));
    }
    let id = text[..id_len].to_string();
    let rest = &text[id_len..];
    let node = model.touch(&id, none);
    for (open, close, shape) in SHAPES {
        if let Some(inner) = rest.strip_prefix(open) {
            let Some(end) = inner.find(close) else {
                return Err(format!("unclosed '{}' after node {}", open, id));
            };
            let label = inner[..end].trim().trim_matches('"');
            node.insert("label".to_string(), label.to_string());
            node.insert("shape".to_string(), shape.to_string());
            return Ok((id, &inner[end + close.len()..]));
        }
    }
    Ok((id, rest))
}

fn mermaid_link(text: &str) -> Result<(&str, Attrs), String> {
    let mut attrs = Attrs::new();
    // `-- label -->` form.
    if text.starts_with("--") && !LINKS.iter().any(|(link, _)| text.starts_with(link)) {
        let body = &text[2..];
        let Some(end) = body.find("-->") else {
            return Err(format!("unterminated link label in `{}`", text));
        };
        attrs.insert("label".to_string(), body[..end].trim().to_string());
        return Ok((&body[end + 3..], attrs));
    }
    for (link, kind) in LINKS {
        if let Some(after) = text.strip_prefix(link) {
            if let Some(kind) = kind {
                attrs.insert("kind".to_string(), kind.to_string());
            }
            let after = after.trim_start();
            if let Some(labelled) = after.strip_prefix('|') {
                let Some(end) = labelled.find('|') else {
                    return Err(format!("unterminated link label in `{}`", text));
                };
                attrs.insert("label".to_string(), labelled[..end].trim().to_string());
                return Ok((&labelled[end + 1..], attrs));
            }
            return Ok((after, attrs));
        }
    }
    Err(format!("expected a link in `{}`", text))
}

// --- Writers ---

pub fn format_graph(item: &Item, options: &FormatOptions, flavor: GraphFlavor) -> String {
    let mut out = FormatContext::new(options.clone());
    match item.reader().as_element() {
        Some(graph) if graph.is(GRAPH) => match flavor {
            GraphFlavor::Dot => write_dot(&mut out, graph),
            GraphFlavor::Mermaid => write_mermaid(&mut out, graph),
        },
        _ => {
            log::debug!("graph: root is not a graph element");
            out.write_type_sentinel(item.type_tag());
        }
    }
    out.into_string()
}

fn dot_id(text: &str) -> String {
    let keyword = ["node", "edge", "graph", "digraph", "subgraph", "strict"]
        .iter()
        .any(|word| text.eq_ignore_ascii_case(word));
    let plain = matches!(identifier(text), Ok(("", _))) || matches!(numeral(text), Ok(("", _)));
    let html = text.starts_with('<') && text.ends_with('>') && html_len(text) == Some(text.len());
    if html || (plain && !keyword) {
        text.to_string()
    } else {
        format!("\"{}\"", text.replace('"', "\\\""))
    }
}

fn attr_text(value: mosaic_value::ItemReader<'_>) -> String {
    crate::xml::scalar_text(value.item()).unwrap_or_else(|| value.item().type_tag().sentinel())
}

fn attr_list<'a>(pairs: impl Iterator<Item = (&'a str, mosaic_value::ItemReader<'a>)>, pretty: bool) -> String {
    let separator = if pretty { ", " } else { "," };
    let parts: Vec<String> = pairs
        .map(|(key, value)| format!("{}={}", dot_id(key), dot_id(&attr_text(value))))
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(separator))
    }
}

fn write_dot(out: &mut FormatContext, graph: ElementReader<'_>) {
    let pretty = out.is_pretty();
    let directed = graph.attr("directed").and_then(|v| v.as_bool()).unwrap_or(true);
    if graph.attr_str("strict") == Some("true") {
        out.push_str("strict ");
    }
    out.push_str(if directed { "digraph" } else { "graph" });
    if let Some(name) = graph.attr_str("name") {
        out.push(' ');
        out.push_str(&dot_id(name));
    }
    out.push_str(" {");
    out.indent();

    let mut statements: Vec<String> = Vec::new();
    let has_rankdir = graph.has_attr("rankdir");
    for (key, value) in graph.attrs().entries() {
        if key == "strict" {
            continue;
        }
        if key == "direction" {
            if !has_rankdir {
                let rankdir = match value.as_str() {
                    Some("TD") => "TB",
                    Some(other) => other,
                    None => continue,
                };
                statements.push(format!("rankdir={}", dot_id(rankdir)));
            }
            continue;
        }
        if RESERVED.contains(&key) {
            continue;
        }
        statements.push(format!("{}={}", dot_id(key), dot_id(&attr_text(value))));
    }
    for child in graph.child_elements() {
        if child.is(NODE) {
            let id = child.attr_str("id").unwrap_or_default();
            let attrs = child.attrs().entries().filter(|(key, _)| *key != "id");
            statements.push(format!("{}{}", dot_id(id), attr_list(attrs, pretty)));
        }
    }
    let op = if directed { "->" } else { "--" };
    for child in graph.child_elements() {
        if child.is(EDGE) {
            let mut from = dot_id(child.attr_str("from").unwrap_or_default());
            let mut to = dot_id(child.attr_str("to").unwrap_or_default());
            if let Some(port) = child.attr_str("tailport") {
                from = format!("{}:{}", from, port);
            }
            if let Some(port) = child.attr_str("headport") {
                to = format!("{}:{}", to, port);
            }
            let attrs = child
                .attrs()
                .entries()
                .filter(|(key, _)| !matches!(*key, "from" | "to" | "tailport" | "headport"));
            statements.push(format!("{} {} {}{}", from, op, to, attr_list(attrs, pretty)));
        }
    }

    for statement in &statements {
        if pretty {
            out.break_line();
        } else {
            out.push(' ');
        }
        out.push_str(statement);
        out.push(';');
    }
    out.dedent();
    if pretty {
        out.break_line();
    } else {
        out.push(' ');
    }
    out.push('}');
    if pretty {
        out.newline();
    }
}

fn mermaid_text(text: &str) -> String {
    if text.contains(['[', ']', '(', ')', '{', '}', '|', ';']) {
        format!("\"{}\"", text.replace('"', "#quot;"))
    } else {
        text.to_string()
    }
}

fn write_mermaid(out: &mut FormatContext, graph: ElementReader<'_>) {
    let direction = graph
        .attr_str("direction")
        .or_else(|| graph.attr_str("rankdir").map(|dir| if dir == "TB" { "TD" } else { dir }))
        .unwrap_or("TD");
    out.push_str("flowchart ");
    out.push_str(direction);
    out.newline();
    out.indent();
    for child in graph.child_elements() {
        if child.is(NODE) {
            out.write_indent();
            out.push_str(child.attr_str("id").unwrap_or_default());
            let label = child.attr_str("label");
            let shape = child.attr_str("shape");
            if label.is_some() || shape.is_some() {
                let (open, close) = match shape {
                    Some("circle") => ("((", "))"),
                    Some("rounded") | Some("ellipse") => ("(", ")"),
                    Some("diamond") => ("{", "}"),
                    _ => ("[", "]"),
                };
                let label = label.or_else(|| child.attr_str("id")).unwrap_or_default();
                out.push_str(open);
                out.push_str(&mermaid_text(label));
                out.push_str(close);
            }
            out.newline();
        }
    }
    for child in graph.child_elements() {
        if child.is(EDGE) {
            out.write_indent();
            out.push_str(child.attr_str("from").unwrap_or_default());
            out.push(' ');
            let link = match child.attr_str("kind") {
                Some("dotted") => "-.->",
                Some("thick") => "==>",
                Some("line") => "---",
                _ => "-->",
            };
            out.push_str(link);
            if let Some(label) = child.attr_str("label") {
                out.push('|');
                out.push_str(&mermaid_text(label));
                out.push('|');
            }
            out.push(' ');
            out.push_str(child.attr_str("to").unwrap_or_default());
            out.newline();
        }
    }
    out.dedent();
}
