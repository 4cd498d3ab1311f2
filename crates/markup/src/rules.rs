//! Per-dialect output rules.
//!
//! One [`MarkupOutputRules`] value describes everything the emitter needs to
//! know about a dialect's surface syntax. The hand-written parsers read the
//! same tables, so a delimiter is declared once for both directions.

use std::fmt;
use std::str::FromStr;

use crate::error::MarkupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Markdown,
    Mdx,
    Rst,
    Org,
    Wiki,
    Textile,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::Markdown,
        Dialect::Mdx,
        Dialect::Rst,
        Dialect::Org,
        Dialect::Wiki,
        Dialect::Textile,
    ];

    /// Accepts the registry type names, including the `md` alias.
    pub fn from_name(name: &str) -> Option<Dialect> {
        Some(match name {
            "markdown" | "md" => Dialect::Markdown,
            "mdx" => Dialect::Mdx,
            "rst" => Dialect::Rst,
            "org" => Dialect::Org,
            "wiki" => Dialect::Wiki,
            "textile" => Dialect::Textile,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        self.rules().name
    }

    pub fn rules(self) -> &'static MarkupOutputRules {
        match self {
            Dialect::Markdown => &MARKDOWN,
            Dialect::Mdx => &MDX,
            Dialect::Rst => &RST,
            Dialect::Org => &ORG,
            Dialect::Wiki => &WIKI,
            Dialect::Textile => &TEXTILE,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = MarkupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::from_name(s).ok_or_else(|| MarkupError::UnknownDialect(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `marker` repeated `level` times, then a space: `## Title`.
    Prefix { marker: char },
    /// Title line underlined with the level's character from the cycle.
    Underline { cycle: &'static [char] },
    /// `marker` repeated `level` times on both sides: `== Title ==`.
    Wrapped { marker: char },
    /// `h2. Title`
    Numbered,
}

/// A span-level construct written as open/close delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub open: &'static str,
    pub close: &'static str,
}

const fn delim(open: &'static str, close: &'static str) -> Option<Delimiters> {
    Some(Delimiters { open, close })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `[text](url "title")`
    Markdown,
    /// `` `text <url>`_ ``
    Rst,
    /// `[[url][text]]`
    Org,
    /// `[url text]`
    Wiki,
    /// `"text":url`
    Textile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStyle {
    /// `![alt](src)`
    Markdown,
    /// `.. image:: src` with an `:alt:` option; block level only.
    Directive,
    /// `[[src]]`
    Org,
    /// `[[File:src|alt]]`
    Wiki,
    /// `!src(alt)!`
    Textile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// One marker per item; nested lists are indented under the item body.
    Indented {
        bullet: &'static str,
        ordered_suffix: char,
    },
    /// The marker character is repeated once per nesting level: `**`, `#*`.
    Repeated { bullet: char, ordered: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Every line of the quoted blocks carries the prefix.
    Prefix(&'static str),
    /// The quoted blocks sit between an opening and closing line.
    Wrapped {
        open: &'static str,
        close: &'static str,
    },
    /// Each quoted paragraph is introduced by the leader: `bq. text`.
    Leader(&'static str),
}

/// Code block framing. `{lang}` in `open` is replaced with the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlockStyle {
    pub open: &'static str,
    pub open_plain: &'static str,
    pub close: &'static str,
    pub close_plain: &'static str,
    /// Prefix for every code line.
    pub indent: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStyle {
    /// `| a | b |` rows, header separated by `| --- |`.
    Pipe,
    /// Like `Pipe`, with an org `|---+---|` rule under the header.
    OrgPipe,
    /// Columns framed by `=====  =====` borders.
    RstSimple,
    /// `{| ... |}` with `!` header and `|` data cells.
    Wiki,
    /// `|_. head |` header cells and `| cell |` data cells.
    Textile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupOutputRules {
    pub name: &'static str,
    pub heading: HeadingStyle,
    pub emphasis: Delimiters,
    pub strong: Delimiters,
    pub code: Delimiters,
    /// `None` when the dialect has no strikethrough; the text is kept plain.
    pub strikethrough: Option<Delimiters>,
    pub link: LinkStyle,
    pub image: ImageStyle,
    pub list: ListStyle,
    pub task_markers: bool,
    pub code_block: CodeBlockStyle,
    pub quote: QuoteStyle,
    pub rule: &'static str,
    pub table: TableStyle,
    /// Characters escaped with a backslash in plain text.
    pub escape: Option<&'static str>,
    /// Written for a hard line break; it always ends the line.
    pub line_break: &'static str,
    /// Blocks are separated by a blank line rather than a single newline.
    pub blank_line_between_blocks: bool,
    /// A newline inside a paragraph is itself a hard break.
    pub newline_breaks: bool,
    /// Whether `jsx_element` blocks are passed through.
    pub raw_jsx: bool,
}

pub const RST_HEADING_CYCLE: &[char] = &['=', '-', '~', '^', '"', '\''];

pub const MARKDOWN: MarkupOutputRules = MarkupOutputRules {
    name: "markdown",
    heading: HeadingStyle::Prefix { marker: '#' },
    emphasis: Delimiters {
        open: "*",
        close: "*",
    },
    strong: Delimiters {
        open: "**",
        close: "**",
    },
    code: Delimiters {
        open: "`",
        close: "`",
    },
    strikethrough: delim("~~", "~~"),
    link: LinkStyle::Markdown,
    image: ImageStyle::Markdown,
    list: ListStyle::Indented {
        bullet: "-",
        ordered_suffix: '.',
    },
    task_markers: true,
    code_block: CodeBlockStyle {
        open: "```{lang}",
        open_plain: "```",
        close: "```",
        close_plain: "```",
        indent: "",
    },
    quote: QuoteStyle::Prefix("> "),
    rule: "---",
    table: TableStyle::Pipe,
    escape: Some("\\`*_[]<>|"),
    line_break: "\\",
    blank_line_between_blocks: true,
    newline_breaks: false,
    raw_jsx: false,
};

pub const MDX: MarkupOutputRules = MarkupOutputRules {
    name: "mdx",
    escape: Some("\\`*_[]<>{}|"),
    raw_jsx: true,
    ..MARKDOWN
};

pub const RST: MarkupOutputRules = MarkupOutputRules {
    name: "rst",
    heading: HeadingStyle::Underline {
        cycle: RST_HEADING_CYCLE,
    },
    emphasis: Delimiters {
        open: "*",
        close: "*",
    },
    strong: Delimiters {
        open: "**",
        close: "**",
    },
    code: Delimiters {
        open: "``",
        close: "``",
    },
    strikethrough: None,
    link: LinkStyle::Rst,
    image: ImageStyle::Directive,
    list: ListStyle::Indented {
        bullet: "-",
        ordered_suffix: '.',
    },
    task_markers: false,
    code_block: CodeBlockStyle {
        open: ".. code-block:: {lang}\n",
        open_plain: "::\n",
        close: "",
        close_plain: "",
        indent: "   ",
    },
    quote: QuoteStyle::Prefix("   "),
    rule: "----",
    table: TableStyle::RstSimple,
    escape: Some("\\*`"),
    line_break: "",
    blank_line_between_blocks: true,
    newline_breaks: false,
    raw_jsx: false,
};

pub const ORG: MarkupOutputRules = MarkupOutputRules {
    name: "org",
    heading: HeadingStyle::Prefix { marker: '*' },
    emphasis: Delimiters {
        open: "/",
        close: "/",
    },
    strong: Delimiters {
        open: "*",
        close: "*",
    },
    code: Delimiters {
        open: "~",
        close: "~",
    },
    strikethrough: delim("+", "+"),
    link: LinkStyle::Org,
    image: ImageStyle::Org,
    list: ListStyle::Indented {
        bullet: "-",
        ordered_suffix: '.',
    },
    task_markers: true,
    code_block: CodeBlockStyle {
        open: "#+BEGIN_SRC {lang}",
        open_plain: "#+BEGIN_EXAMPLE",
        close: "#+END_SRC",
        close_plain: "#+END_EXAMPLE",
        indent: "",
    },
    quote: QuoteStyle::Wrapped {
        open: "#+BEGIN_QUOTE",
        close: "#+END_QUOTE",
    },
    rule: "-----",
    table: TableStyle::OrgPipe,
    escape: None,
    line_break: "\\\\",
    blank_line_between_blocks: true,
    newline_breaks: false,
    raw_jsx: false,
};

pub const WIKI: MarkupOutputRules = MarkupOutputRules {
    name: "wiki",
    heading: HeadingStyle::Wrapped { marker: '=' },
    emphasis: Delimiters {
        open: "''",
        close: "''",
    },
    strong: Delimiters {
        open: "'''",
        close: "'''",
    },
    code: Delimiters {
        open: "<code>",
        close: "</code>",
    },
    strikethrough: delim("<s>", "</s>"),
    link: LinkStyle::Wiki,
    image: ImageStyle::Wiki,
    list: ListStyle::Repeated {
        bullet: '*',
        ordered: '#',
    },
    task_markers: false,
    code_block: CodeBlockStyle {
        open: "<syntaxhighlight lang=\"{lang}\">",
        open_plain: "<pre>",
        close: "</syntaxhighlight>",
        close_plain: "</pre>",
        indent: "",
    },
    quote: QuoteStyle::Wrapped {
        open: "<blockquote>",
        close: "</blockquote>",
    },
    rule: "----",
    table: TableStyle::Wiki,
    escape: None,
    line_break: "<br />",
    blank_line_between_blocks: true,
    newline_breaks: false,
    raw_jsx: false,
};

pub const TEXTILE: MarkupOutputRules = MarkupOutputRules {
    name: "textile",
    heading: HeadingStyle::Numbered,
    emphasis: Delimiters {
        open: "_",
        close: "_",
    },
    strong: Delimiters {
        open: "*",
        close: "*",
    },
    code: Delimiters {
        open: "@",
        close: "@",
    },
    strikethrough: delim("-", "-"),
    link: LinkStyle::Textile,
    image: ImageStyle::Textile,
    list: ListStyle::Repeated {
        bullet: '*',
        ordered: '#',
    },
    task_markers: false,
    code_block: CodeBlockStyle {
        open: "<pre><code class=\"{lang}\">",
        open_plain: "<pre><code>",
        close: "</code></pre>",
        close_plain: "</code></pre>",
        indent: "",
    },
    quote: QuoteStyle::Leader("bq. "),
    rule: "<hr />",
    table: TableStyle::Textile,
    escape: None,
    line_break: "",
    blank_line_between_blocks: true,
    newline_breaks: true,
    raw_jsx: false,
};

impl MarkupOutputRules {
    /// Closing line for a code block opened with or without a language.
    pub fn code_close(&self, has_language: bool) -> &'static str {
        if has_language {
            self.code_block.close
        } else {
            self.code_block.close_plain
        }
    }

    pub fn code_open(&self, language: Option<&str>) -> String {
        match language {
            Some(lang) if !lang.is_empty() => self.code_block.open.replace("{lang}", lang),
            _ => self.code_block.open_plain.to_string(),
        }
    }

    /// Span delimiters in the order an inline scanner must try them:
    /// longer openers first so `**` wins over `*`.
    pub fn span_delimiters(&self) -> Vec<(&'static str, Delimiters)> {
        let mut spans = vec![("strong", self.strong), ("em", self.emphasis)];
        if let Some(strike) = self.strikethrough {
            spans.push(("s", strike));
        }
        spans.sort_by_key(|(_, d)| std::cmp::Reverse(d.open.len()));
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names() {
        for dialect in Dialect::ALL {
            assert_eq!(Dialect::from_name(dialect.name()), Some(dialect));
        }
        assert_eq!(Dialect::from_name("md"), Some(Dialect::Markdown));
        assert!("asciidoc".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_mdx_inherits_markdown() {
        assert_eq!(MDX.heading, MARKDOWN.heading);
        assert_eq!(MDX.list, MARKDOWN.list);
        assert!(MDX.raw_jsx);
        assert!(!MARKDOWN.raw_jsx);
    }

    #[test]
    fn test_span_order_prefers_longer_openers() {
        let spans = WIKI.span_delimiters();
        assert_eq!(spans[0].0, "strong");
        let spans = MARKDOWN.span_delimiters();
        assert_eq!(spans[0].1.open, "**");
        assert_eq!(spans.last().map(|(tag, _)| *tag), Some("em"));
    }

    #[test]
    fn test_code_fences() {
        assert_eq!(MARKDOWN.code_open(Some("rust")), "```rust");
        assert_eq!(MARKDOWN.code_open(None), "```");
        assert_eq!(ORG.code_open(Some("sh")), "#+BEGIN_SRC sh");
        assert_eq!(ORG.code_close(false), "#+END_EXAMPLE");
        assert_eq!(WIKI.code_close(true), "</syntaxhighlight>");
    }
}
