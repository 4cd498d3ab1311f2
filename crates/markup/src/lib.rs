//! Lightweight markup dialects.
//!
//! Every dialect parses into the same element tree (`doc`, `h1`..`h6`, `p`,
//! `ul`/`ol`/`li`, `pre`/`code`, `blockquote`, `table`, inline `em`,
//! `strong`, `a`, ...) and is written back by one emitter driven by a
//! per-dialect [`MarkupOutputRules`] table.
//!
//! Markdown goes through comrak; MDX is markdown with JSX blocks lifted out
//! first. The other dialects are read by small line-oriented parsers that
//! share the rule tables with the emitter, so output of `format_markup`
//! parses back to the same tree.

pub mod blocks;
pub mod emitter;
pub mod error;
pub mod inline;
pub mod markdown;
pub mod mdx;
pub mod node;
pub mod org;
pub mod rst;
pub mod rules;
pub mod textile;
pub mod wiki;

pub use emitter::emit_markup;
pub use error::MarkupError;
pub use node::{AttrValue, MarkupNode};
pub use rules::{Dialect, MarkupOutputRules};

use mosaic_value::{Context, FormatOptions, Item};

/// Parses `source` into a `doc` element.
///
/// Malformed blocks (an unterminated `#+BEGIN_SRC`, a `{|` table without
/// `|}`) become error items in place; the rest of the document still
/// parses.
pub fn parse_markup(ctx: &Context, source: &str, dialect: Dialect) -> Result<Item, MarkupError> {
    let tree = parse_tree(source, dialect);
    log::debug!(
        "parsed {} document with {} blocks",
        dialect,
        tree.children().len()
    );
    tree.to_item(ctx)
}

/// The intermediate tree, before conversion to items.
pub fn parse_tree(source: &str, dialect: Dialect) -> MarkupNode {
    match dialect {
        Dialect::Markdown => markdown::parse_markdown(source),
        Dialect::Mdx => mdx::parse_mdx(source),
        Dialect::Rst => rst::parse_rst(source),
        Dialect::Org => org::parse_org(source),
        Dialect::Wiki => wiki::parse_wiki(source),
        Dialect::Textile => textile::parse_textile(source),
    }
}

pub fn format_markup(item: &Item, dialect: Dialect, options: &FormatOptions) -> String {
    emit_markup(item, dialect.rules(), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ctx: &Context) -> Item {
        let tree = MarkupNode::element(
            "doc",
            vec![
                MarkupNode::heading(1, vec![MarkupNode::text("Title")]),
                MarkupNode::element(
                    "p",
                    vec![
                        MarkupNode::text("plain "),
                        MarkupNode::element("strong", vec![MarkupNode::text("bold")]),
                        MarkupNode::text(" and "),
                        MarkupNode::element("em", vec![MarkupNode::text("em")]),
                        MarkupNode::text("."),
                    ],
                ),
                MarkupNode::element(
                    "ul",
                    vec![
                        MarkupNode::element("li", vec![MarkupNode::text("a")]),
                        MarkupNode::element("li", vec![MarkupNode::text("b")]),
                    ],
                ),
                MarkupNode::code_block(Some("rust"), "fn main() {}"),
            ],
        );
        tree.to_item(ctx).unwrap()
    }

    #[test]
    fn test_markdown_is_reproduced_verbatim() {
        let ctx = Context::new();
        let source = "# H\n\npara with **bold** and *em*.\n\n- a\n- b\n";
        let item = parse_markup(&ctx, source, Dialect::Markdown).unwrap();
        assert_eq!(format_markup(&item, Dialect::Markdown, &FormatOptions::default()), source);
    }

    #[test]
    fn test_every_dialect_round_trips_the_tree() {
        let ctx = Context::new();
        let item = sample(&ctx);
        for dialect in Dialect::ALL {
            let text = format_markup(&item, dialect, &FormatOptions::default());
            let back = parse_markup(&ctx, &text, dialect).unwrap();
            assert!(
                item.structural_eq(&back),
                "{} output did not parse back:\n{}",
                dialect,
                text
            );
            let again = format_markup(&back, dialect, &FormatOptions::default());
            assert_eq!(text, again, "{} output is not stable", dialect);
        }
    }

    #[test]
    fn test_error_blocks_become_error_items() {
        let ctx = Context::new();
        let item = parse_markup(&ctx, "intro\n\n#+BEGIN_SRC sh\nls\n", Dialect::Org).unwrap();
        let doc = item.reader().as_element().unwrap();
        assert_eq!(doc.child_count(), 3);
        assert!(doc.child(1).unwrap().is_error());
    }

    #[test]
    fn test_jsx_only_survives_in_mdx() {
        let ctx = Context::new();
        let source = "# Hi\n\n<Chart data={points} />\n\ntext\n";
        let item = parse_markup(&ctx, source, Dialect::Mdx).unwrap();
        let options = FormatOptions::default();
        assert_eq!(format_markup(&item, Dialect::Mdx, &options), source);
        assert_eq!(
            format_markup(&item, Dialect::Markdown, &options),
            "# Hi\n\ntext\n"
        );
    }
}
