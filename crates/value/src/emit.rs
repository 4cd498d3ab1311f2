//! Output buffer shared by every formatter.

use crate::tag::TypeTag;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Written in place of a subtree deeper than `max_depth`.
pub const DEPTH_SENTINEL: &str = "[max depth exceeded]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub indent_width: usize,
    pub compact: bool,
    pub max_depth: usize,
    pub pretty: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            indent_width: 2,
            compact: false,
            max_depth: DEFAULT_MAX_DEPTH,
            pretty: true,
        }
    }
}

impl FormatOptions {
    pub fn compact() -> Self {
        FormatOptions {
            compact: true,
            pretty: false,
            ..Self::default()
        }
    }

    /// Whether output should be laid out over multiple indented lines.
    pub fn is_pretty(&self) -> bool {
        self.pretty && !self.compact
    }
}

pub struct FormatContext {
    out: String,
    indent: usize,
    depth: usize,
    options: FormatOptions,
}

impl FormatContext {
    pub fn new(options: FormatOptions) -> Self {
        FormatContext {
            out: String::with_capacity(256),
            indent: 0,
            depth: 0,
            options,
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn is_pretty(&self) -> bool {
        self.options.is_pretty()
    }

    pub fn push_str(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn push(&mut self, c: char) {
        self.out.push(c);
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn write_indent(&mut self) {
        let width = self.indent * self.options.indent_width;
        self.out.extend(std::iter::repeat_n(' ', width));
    }

    /// Newline plus indentation in pretty mode; nothing when compact.
    pub fn break_line(&mut self) {
        if self.is_pretty() {
            self.newline();
            self.write_indent();
        }
    }

    /// Enters one level of nesting. Returns `false` once the depth limit is
    /// reached; the caller writes [`DEPTH_SENTINEL`] instead of descending.
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.options.max_depth {
            log::warn!("format depth limit {} reached", self.options.max_depth);
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn write_depth_sentinel(&mut self) {
        self.out.push_str(DEPTH_SENTINEL);
    }

    /// Placeholder for a value the target format cannot represent.
    pub fn write_type_sentinel(&mut self, tag: TypeTag) {
        log::debug!("no representation for {} item; writing sentinel", tag);
        self.out.push_str(&tag.sentinel());
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.out.ends_with(suffix)
    }

    /// Drops spaces and tabs at the end of the buffer.
    pub fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
    }

    /// Ends the current line unless the buffer is empty or already does.
    pub fn ensure_newline(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Leaves exactly one blank line at the end of non-empty output.
    pub fn ensure_blank_line(&mut self) {
        self.ensure_newline();
        if self.out.is_empty() {
            return;
        }
        while self.out.ends_with("\n\n\n") {
            self.out.pop();
        }
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

impl Default for FormatContext {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

impl fmt::Write for FormatContext {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }
}
