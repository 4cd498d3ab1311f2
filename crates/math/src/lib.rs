//! Math notation trees.
//!
//! A math tree is an ordinary element tree: operators, functions, Greek
//! letters and layout constructs are elements named after their rule tag,
//! operands are the children in reading order (numerator before
//! denominator, base before script, bounds before body), and leaves are
//! symbols or numbers.
//!
//! Input is accepted in LaTeX and ASCII notation; output is available in
//! LaTeX, Typst, ASCII, MathML and Unicode.

pub mod ascii;
pub mod ast;
pub mod error;
pub mod format;
pub mod latex;
pub mod rules;

pub use ast::MathNode;
pub use error::MathError;
pub use format::{MathFlavor, format_math};
pub use rules::{OpClass, OperatorRule};

use mosaic_value::{Context, Item};

/// Parses `source` written in `flavor` into a math element tree.
pub fn parse_math(ctx: &Context, source: &str, flavor: MathFlavor) -> Result<Item, MathError> {
    let node = match flavor {
        MathFlavor::Latex => latex::parse_latex(source)?,
        MathFlavor::Ascii => ascii::parse_ascii(source)?,
        other => return Err(MathError::UnsupportedFlavor(other.name().to_string())),
    };
    log::trace!("parsed {} math: {:?}", flavor, node);
    node.to_item(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_value::FormatOptions;

    fn round_trip(source: &str, flavor: MathFlavor) {
        let ctx = Context::new();
        let first = parse_math(&ctx, source, flavor).unwrap();
        let text = format_math(&first, flavor, &FormatOptions::default());
        let second = parse_math(&ctx, &text, flavor).unwrap();
        assert!(
            first.structural_eq(&second),
            "{} -> {} changed the tree",
            source,
            text
        );
    }

    #[test]
    fn test_latex_round_trips() {
        for source in [
            "(a+b) \\cdot c",
            "a^{b^{c}}",
            "x_i^2 + y_{jk}",
            "\\frac{1}{2} - \\sqrt[3]{x}",
            "\\sum_{i=1}^{n} i^2",
            "\\lim_{x \\to 0} \\frac{\\sin(x)}{x} = 1",
            "2x + 3y \\leq \\alpha",
            "-x^{2} + |y|",
            "\\int_0^1 x \\, dx",
            "\\text{if } a \\neq b",
        ] {
            round_trip(source, MathFlavor::Latex);
        }
    }

    #[test]
    fn test_ascii_round_trips() {
        for source in [
            "(a + b) * c",
            "a^(b+c) / 2",
            "sum_(i=1)^n i^2",
            "lim_(x->0) sin(x)",
            "sqrt(x) + alpha >= 0",
        ] {
            round_trip(source, MathFlavor::Ascii);
        }
    }

    #[test]
    fn test_cross_flavor() {
        let ctx = Context::new();
        let item = parse_math(&ctx, "\\frac{a}{b} + \\pi", MathFlavor::Latex).unwrap();
        let options = FormatOptions::default();
        assert_eq!(
            format_math(&item, MathFlavor::Typst, &options),
            "frac(a, b) + pi"
        );
        assert_eq!(
            format_math(&item, MathFlavor::Unicode, &options),
            "(a)/(b) + \u{3c0}"
        );
    }

    #[test]
    fn test_output_only_flavor_cannot_parse() {
        let ctx = Context::new();
        let err = parse_math(&ctx, "x", MathFlavor::MathMl).unwrap_err();
        assert!(matches!(err, MathError::UnsupportedFlavor(_)));
    }
}
