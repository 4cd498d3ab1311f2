//! Mosaic: one element tree, many notations.
//!
//! Every supported notation parses into the tagged [`Item`] tree of
//! `mosaic-value` and is written back out from it, so any input can be
//! converted to any output whose model fits:
//!
//! ```ignore
//! use mosaic::{Context, FormatOptions, ParseOptions};
//!
//! let ctx = Context::new();
//! let item = mosaic::parse(&ctx, "{\"a\":1}", "json", None, &ParseOptions::default())?;
//! let yaml = mosaic::format(&item, "yaml", None, &FormatOptions::default())?;
//! ```
//!
//! The crates underneath can be used on their own:
//!
//! - [`datetime`]: bit-packed calendar values
//! - [`value`]: items, pools, readers and the shared emitter buffer
//! - [`data`]: JSON, XML, HTML, YAML, TOML, INI, properties, CSV, CSS, JSX,
//!   LaTeX, text and graphs
//! - [`markup`]: markdown, MDX, reStructuredText, Org, wiki and Textile
//! - [`math`]: math trees in LaTeX, Typst, ASCII, MathML and Unicode

pub mod error;
pub mod options;
pub mod registry;
pub mod sys;

pub use error::MosaicError;
pub use options::{EngineOptions, ParseOptions};
pub use registry::{Format, Registry, default_registry};

pub use mosaic_data as data;
pub use mosaic_datetime as datetime;
pub use mosaic_markup as markup;
pub use mosaic_math as math;
pub use mosaic_value as value;

pub use mosaic_value::{Context, Diagnostic, ErrorKind, FormatOptions, Item};

/// Parses `source` as `type_name` into a tree built in `ctx`.
///
/// A failure the input itself caused (bad syntax, an out-of-range value)
/// comes back as an `Error` root item, so callers tell success from failure
/// by the root's tag. Unknown types, missing `sys://` entries and resource
/// exhaustion are returned as `Err`.
pub fn parse(
    ctx: &Context,
    source: &str,
    type_name: &str,
    flavor: Option<&str>,
    options: &ParseOptions,
) -> Result<Item, MosaicError> {
    match default_registry().parse(ctx, source, type_name, flavor, options) {
        Ok(item) => Ok(item),
        Err(err) if is_recoverable(&err) => {
            log::debug!("{} parse failed: {}", type_name, err);
            Ok(ctx.error(err.to_diagnostic()))
        }
        Err(err) => Err(err),
    }
}

/// Writes `item` as `type_name`. Subtrees of the wrong shape are written as
/// type sentinels rather than failing the call.
pub fn format(
    item: &Item,
    type_name: &str,
    flavor: Option<&str>,
    options: &FormatOptions,
) -> Result<String, MosaicError> {
    default_registry().format(item, type_name, flavor, options)
}

/// Parses and re-formats in one step.
pub fn convert(
    source: &str,
    from: &str,
    to: &str,
    options: &EngineOptions,
) -> Result<String, MosaicError> {
    let ctx = Context::with_config(options.pool.clone());
    let item = parse(&ctx, source, from, None, &options.parse)?;
    if let Item::Error(diagnostic) = &item {
        return Err(MosaicError::Parse(diagnostic.as_ref().clone()));
    }
    format(&item, to, None, &options.format)
}

fn is_recoverable(err: &MosaicError) -> bool {
    let kind = err.kind();
    !kind.is_terminal() && kind != ErrorKind::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_errors_become_error_roots() {
        let ctx = Context::new();
        let item = parse(&ctx, "{\"a\":", "json", None, &ParseOptions::default()).unwrap();
        assert!(item.is_error());
        let diagnostic = item.as_diagnostic().unwrap();
        assert_eq!(diagnostic.kind, ErrorKind::BadSyntax);
    }

    #[test]
    fn test_terminal_errors_are_returned() {
        let ctx = Context::new();
        let options = ParseOptions::default();
        assert!(matches!(
            parse(&ctx, "", "rtf", None, &options),
            Err(MosaicError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            parse(&ctx, "sys://net/ifaces", "sys", None, &options),
            Err(MosaicError::NotFound(_))
        ));
    }

    #[test]
    fn test_convert_between_types() {
        let yaml = convert("{\"a\":1,\"b\":[true]}", "json", "yaml", &EngineOptions::default())
            .unwrap();
        assert_eq!(yaml, "a: 1\nb:\n- true\n");
        assert!(matches!(
            convert("{", "json", "yaml", &EngineOptions::default()),
            Err(MosaicError::Parse(_))
        ));
    }
}
