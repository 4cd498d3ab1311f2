//! Format registry and dispatch
//!
//! A type string is resolved in three phases:
//!
//! 1. the simple-format table (`json`, `xml`, `csv`, `sys`, ...),
//! 2. the markup table, which maps a type name to a markup dialect,
//! 3. the compound types `math`, `graph` and `markup`, whose flavor picks
//!    the notation.
//!
//! Combined keys such as `math-latex` are split into type and flavor when
//! the whole key is not registered.

use crate::error::MosaicError;
use crate::options::ParseOptions;
use crate::sys;
use mosaic_data::DataFormat;
use mosaic_markup::{Dialect, format_markup, parse_markup};
use mosaic_math::{MathFlavor, format_math, parse_math};
use mosaic_value::{Context, FormatOptions, Item};
use std::collections::HashMap;
use std::sync::LazyLock;

const COMPOUND_TYPES: [&str; 3] = ["graph", "markup", "math"];

/// Trait for formats in the simple-format table
///
/// A format can support parsing, formatting, or both. Flavors other than
/// `compact`/`pretty` are passed through untouched.
///
/// # Examples
///
/// ```ignore
/// struct Shout;
///
/// impl Format for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn supports_serialization(&self) -> bool {
///         true
///     }
///
///     fn serialize(&self, item: &Item, _: Option<&str>, _: &FormatOptions) -> Result<String, MosaicError> {
///         Ok(item.reader().as_str().unwrap_or_default().to_uppercase())
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.register_format(Shout);
/// ```
pub trait Format: Send + Sync {
    /// The type string this format is registered under
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn supports_parsing(&self) -> bool {
        false
    }

    fn supports_serialization(&self) -> bool {
        false
    }

    fn parse(
        &self,
        _ctx: &Context,
        _source: &str,
        _flavor: Option<&str>,
        _options: &ParseOptions,
    ) -> Result<Item, MosaicError> {
        Err(MosaicError::NotSupported {
            format: self.name().to_string(),
            operation: "parsing",
        })
    }

    fn serialize(
        &self,
        _item: &Item,
        _flavor: Option<&str>,
        _options: &FormatOptions,
    ) -> Result<String, MosaicError> {
        Err(MosaicError::NotSupported {
            format: self.name().to_string(),
            operation: "formatting",
        })
    }
}

/// One of the structured-data formats.
pub struct DataHandler(pub DataFormat);

impl Format for DataHandler {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        match self.0 {
            DataFormat::Json => "JSON documents",
            DataFormat::Xml => "XML documents",
            DataFormat::Html => "HTML documents and fragments",
            DataFormat::Yaml => "YAML document streams",
            DataFormat::Toml => "TOML tables",
            DataFormat::Ini => "INI sections and keys",
            DataFormat::Properties => "Java properties files",
            DataFormat::Csv => "Comma or tab separated records",
            DataFormat::Css => "CSS stylesheets",
            DataFormat::Jsx => "JSX element trees",
            DataFormat::Latex => "LaTeX documents",
            DataFormat::Text => "Plain text",
            DataFormat::Graph => "Graphs in DOT or Mermaid notation",
        }
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(
        &self,
        ctx: &Context,
        source: &str,
        flavor: Option<&str>,
        options: &ParseOptions,
    ) -> Result<Item, MosaicError> {
        let flavor = match (self.0, flavor, options.csv_header) {
            (DataFormat::Csv, None, Some(false)) => Some("noheader"),
            _ => flavor,
        };
        Ok(self.0.parse(ctx, source, flavor, options.strict_xml)?)
    }

    fn serialize(
        &self,
        item: &Item,
        flavor: Option<&str>,
        options: &FormatOptions,
    ) -> Result<String, MosaicError> {
        Ok(self.0.format(item, flavor, options)?)
    }
}

/// The `sys://` scheme. The source is the url, or a path relative to the
/// base url.
pub struct SysHandler;

impl Format for SysHandler {
    fn name(&self) -> &str {
        "sys"
    }

    fn description(&self) -> &str {
        "Host information under sys://"
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn parse(
        &self,
        ctx: &Context,
        source: &str,
        _flavor: Option<&str>,
        options: &ParseOptions,
    ) -> Result<Item, MosaicError> {
        let url = sys::resolve(source, options.base_url.as_deref());
        sys::load(ctx, &url)
    }
}

/// Where a `(type, flavor)` pair was resolved to.
#[derive(Clone, Copy)]
enum Route<'a> {
    Simple {
        format: &'a dyn Format,
        flavor: Option<&'a str>,
    },
    Markup(Dialect),
    Math(MathFlavor),
    Graph(Option<&'a str>),
}

/// Registry of every type string `parse` and `format` understand
pub struct Registry {
    formats: HashMap<String, Box<dyn Format>>,
    markup: HashMap<String, Dialect>,
}

impl Registry {
    /// An empty registry; only the compound types resolve.
    pub fn new() -> Self {
        Registry {
            formats: HashMap::new(),
            markup: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for format in DataFormat::ALL {
            if *format != DataFormat::Graph {
                registry.register_format(DataHandler(*format));
            }
        }
        registry.register_format(SysHandler);
        for dialect in Dialect::ALL {
            registry.register_markup(dialect.name(), dialect);
        }
        registry.register_markup("md", Dialect::Markdown);
        registry
    }

    /// Adds a format to the simple table, replacing one of the same name.
    pub fn register_format<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    /// Makes `name` an alias for a markup dialect.
    pub fn register_markup(&mut self, name: impl Into<String>, dialect: Dialect) {
        self.markup.insert(name.into(), dialect);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format, MosaicError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| MosaicError::unsupported(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
            || self.markup.contains_key(name)
            || COMPOUND_TYPES.contains(&name)
    }

    /// Every registered type string (sorted)
    pub fn list_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .formats
            .keys()
            .chain(self.markup.keys())
            .cloned()
            .chain(COMPOUND_TYPES.iter().map(|name| name.to_string()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn supports_parse(&self, type_name: &str, flavor: Option<&str>) -> bool {
        match self.route(type_name, flavor) {
            Ok(Route::Simple { format, .. }) => format.supports_parsing(),
            Ok(Route::Math(flavor)) => flavor.is_parseable(),
            Ok(_) => true,
            Err(_) => false,
        }
    }

    pub fn supports_format(&self, type_name: &str, flavor: Option<&str>) -> bool {
        match self.route(type_name, flavor) {
            Ok(Route::Simple { format, .. }) => format.supports_serialization(),
            Ok(_) => true,
            Err(_) => false,
        }
    }

    pub fn parse(
        &self,
        ctx: &Context,
        source: &str,
        type_name: &str,
        flavor: Option<&str>,
        options: &ParseOptions,
    ) -> Result<Item, MosaicError> {
        match self.route(type_name, flavor)? {
            Route::Simple { format, flavor } => {
                if !format.supports_parsing() {
                    return Err(MosaicError::NotSupported {
                        format: type_name.to_string(),
                        operation: "parsing",
                    });
                }
                format.parse(ctx, source, flavor, options)
            }
            Route::Markup(dialect) => Ok(parse_markup(ctx, source, dialect)?),
            Route::Math(flavor) => Ok(parse_math(ctx, source, flavor)?),
            Route::Graph(flavor) => Ok(DataFormat::Graph.parse(ctx, source, flavor, false)?),
        }
    }

    pub fn format(
        &self,
        item: &Item,
        type_name: &str,
        flavor: Option<&str>,
        options: &FormatOptions,
    ) -> Result<String, MosaicError> {
        match self.route(type_name, flavor)? {
            Route::Simple { format, flavor } => {
                if !format.supports_serialization() {
                    return Err(MosaicError::NotSupported {
                        format: type_name.to_string(),
                        operation: "formatting",
                    });
                }
                let (flavor, options) = layout_flavor(flavor, options);
                format.serialize(item, flavor, &options)
            }
            Route::Markup(dialect) => {
                let (_, options) = layout_flavor(flavor, options);
                Ok(format_markup(item, dialect, &options))
            }
            Route::Math(flavor) => Ok(format_math(item, flavor, options)),
            Route::Graph(flavor) => Ok(DataFormat::Graph.format(item, flavor, options)?),
        }
    }

    fn route<'a>(
        &'a self,
        type_name: &'a str,
        flavor: Option<&'a str>,
    ) -> Result<Route<'a>, MosaicError> {
        if let Some(format) = self.formats.get(type_name) {
            log::trace!("{} resolved in the format table", type_name);
            return Ok(Route::Simple {
                format: format.as_ref(),
                flavor,
            });
        }
        if let Some(dialect) = self.markup.get(type_name) {
            log::trace!("{} resolved to the {} rules", type_name, dialect);
            return Ok(Route::Markup(*dialect));
        }
        if let Some(route) = compound(type_name, flavor)? {
            return Ok(route);
        }
        // Combined `type-flavor` keys; an explicit flavor wins over the suffix.
        if let Some((base, suffix)) = type_name.split_once('-') {
            if COMPOUND_TYPES.contains(&base) {
                log::debug!("{} read as type {} with flavor {}", type_name, base, suffix);
                if let Some(route) = compound(base, flavor.or(Some(suffix)))? {
                    return Ok(route);
                }
            }
        }
        log::debug!("no format registered for {}", type_name);
        Err(MosaicError::unsupported(type_name))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn compound<'a>(type_name: &str, flavor: Option<&'a str>) -> Result<Option<Route<'a>>, MosaicError> {
    let unsupported = |flavor: &str| MosaicError::unsupported(format!("{}-{}", type_name, flavor));
    Ok(Some(match type_name {
        "math" => match flavor {
            None => Route::Math(MathFlavor::default()),
            Some(name) => Route::Math(MathFlavor::from_name(name).ok_or_else(|| unsupported(name))?),
        },
        "graph" => Route::Graph(flavor),
        "markup" => match flavor {
            None => Route::Markup(Dialect::Markdown),
            Some(name) => Route::Markup(Dialect::from_name(name).ok_or_else(|| unsupported(name))?),
        },
        _ => return Ok(None),
    }))
}

/// `compact` and `pretty` flavors select the layout instead of being passed
/// to the format.
fn layout_flavor<'a>(flavor: Option<&'a str>, options: &FormatOptions) -> (Option<&'a str>, FormatOptions) {
    match flavor {
        Some("compact") => (
            None,
            FormatOptions {
                compact: true,
                pretty: false,
                ..options.clone()
            },
        ),
        Some("pretty") => (
            None,
            FormatOptions {
                compact: false,
                pretty: true,
                ..options.clone()
            },
        ),
        other => (other, options.clone()),
    }
}

static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::with_defaults);

/// The registry behind the crate-level [`crate::parse`] and [`crate::format`].
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Format for Upper {
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Upper-cased text"
        }
        fn supports_serialization(&self) -> bool {
            true
        }
        fn serialize(
            &self,
            item: &Item,
            _flavor: Option<&str>,
            _options: &FormatOptions,
        ) -> Result<String, MosaicError> {
            Ok(item.reader().as_str().unwrap_or_default().to_uppercase())
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new();
        assert!(!registry.has("json"));
        assert_eq!(registry.list_types(), vec!["graph", "markup", "math"]);
    }

    #[test]
    fn test_registry_defaults_cover_every_type_string() {
        let registry = Registry::default();
        for name in [
            "json", "xml", "html", "yaml", "toml", "ini", "properties", "css", "jsx", "mdx",
            "latex", "text", "markdown", "md", "rst", "org", "wiki", "textile", "math", "graph",
            "sys", "csv",
        ] {
            assert!(registry.has(name), "{} is not registered", name);
        }
        let types = registry.list_types();
        let mut sorted = types.clone();
        sorted.sort();
        assert_eq!(types, sorted);
    }

    #[test]
    fn test_registry_register_format() {
        let mut registry = Registry::new();
        registry.register_format(Upper);
        assert!(registry.has("upper"));
        assert_eq!(registry.get("upper").unwrap().description(), "Upper-cased text");

        let ctx = Context::new();
        let item = ctx.string("quiet").unwrap();
        let text = registry
            .format(&item, "upper", None, &FormatOptions::default())
            .unwrap();
        assert_eq!(text, "QUIET");
        assert!(matches!(
            registry.parse(&ctx, "x", "upper", None, &ParseOptions::default()),
            Err(MosaicError::NotSupported { .. })
        ));
        assert!(registry.supports_format("upper", None));
        assert!(!registry.supports_parse("upper", None));
    }

    #[test]
    fn test_registry_register_markup_alias() {
        let mut registry = Registry::with_defaults();
        registry.register_markup("mediawiki", Dialect::Wiki);
        let ctx = Context::new();
        let item = registry
            .parse(&ctx, "== Title ==\n", "mediawiki", None, &ParseOptions::default())
            .unwrap();
        let text = registry
            .format(&item, "markdown", None, &FormatOptions::default())
            .unwrap();
        assert_eq!(text, "## Title\n");
    }

    #[test]
    fn test_registry_unknown_types() {
        let registry = Registry::default();
        let ctx = Context::new();
        assert!(matches!(
            registry.format(&Item::Null, "rtf", None, &FormatOptions::default()),
            Err(MosaicError::UnsupportedFormat(name)) if name == "rtf"
        ));
        assert!(matches!(
            registry.parse(&ctx, "x", "math", Some("klingon"), &ParseOptions::default()),
            Err(MosaicError::UnsupportedFormat(name)) if name == "math-klingon"
        ));
        assert!(registry.get("markdown").is_err());
        assert!(!registry.supports_format("json-ld", None));
    }

    #[test]
    fn test_registry_math_flavors() {
        let registry = Registry::default();
        let ctx = Context::new();
        let options = ParseOptions::default();
        let item = registry.parse(&ctx, "(a+b) \\cdot c", "math", None, &options).unwrap();
        let ascii = registry
            .format(&item, "math", Some("ascii"), &FormatOptions::default())
            .unwrap();
        assert_eq!(ascii, "(a + b) * c");

        let legacy = registry
            .format(&item, "math-ascii", None, &FormatOptions::default())
            .unwrap();
        assert_eq!(legacy, ascii);

        assert!(registry.supports_parse("math-ascii", None));
        assert!(!registry.supports_parse("math-mathml", None));
        assert!(registry.supports_format("math-mathml", None));
        assert!(matches!(
            registry.parse(&ctx, "x", "math-typst", None, &options),
            Err(MosaicError::Math(_))
        ));
    }

    #[test]
    fn test_registry_layout_flavors() {
        let registry = Registry::default();
        let ctx = Context::new();
        let item = registry
            .parse(&ctx, "{\"a\": [1, 2]}", "json", None, &ParseOptions::default())
            .unwrap();
        let compact = registry
            .format(&item, "json", Some("compact"), &FormatOptions::default())
            .unwrap();
        assert_eq!(compact, "{\"a\":[1,2]}");
        let pretty = registry
            .format(&item, "json", Some("pretty"), &FormatOptions::compact())
            .unwrap();
        assert!(pretty.contains('\n'), "{}", pretty);
    }

    #[test]
    fn test_registry_csv_header_option() {
        let registry = Registry::default();
        let ctx = Context::new();
        let options = ParseOptions::default().with_csv_header(false);
        let rows = registry.parse(&ctx, "a,b\n1,2\n", "csv", None, &options).unwrap();
        let first = rows.reader().as_list().and_then(|list| list.get(0));
        assert_eq!(
            first.and_then(|row| row.as_list()).and_then(|row| row.get(0)).and_then(|c| c.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_registry_graph_and_sys() {
        let registry = Registry::default();
        let ctx = Context::new();
        let graph = registry
            .parse(&ctx, "digraph { a -> b }", "graph", None, &ParseOptions::default())
            .unwrap();
        let mermaid = registry
            .format(&graph, "graph-mermaid", None, &FormatOptions::default())
            .unwrap();
        assert!(mermaid.starts_with("flowchart"), "{}", mermaid);

        let options = ParseOptions::default().with_base_url("sys://system");
        let info = registry.parse(&ctx, "info", "sys", None, &options).unwrap();
        assert!(info.reader().as_element().is_some_and(|e| e.is("system")));
        assert!(!registry.supports_format("sys", None));
    }
}
