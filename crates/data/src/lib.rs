//! Structured-data parsers and formatters.
//!
//! Every format reads a whole source string into an [`Item`] tree built in
//! the caller's [`Context`] and writes any item tree back out. Formats with
//! a serde ecosystem (JSON, YAML, TOML) go through it; XML and HTML go
//! through quick-xml and html5ever; the rest are hand-written scanners.
//!
//! Recoverable damage (a bad CSV record, a malformed INI line, a broken CSS
//! rule) becomes an `Error` item in place of the damaged part. Anything else
//! is returned as a [`DataError`].

pub mod css;
pub mod csv;
pub mod error;
pub mod graph;
pub mod html;
pub mod ini;
pub mod json;
pub mod jsx;
pub mod latex;
pub mod properties;
pub mod text;
pub mod toml;
pub mod xml;
pub mod yaml;

mod tree;

pub use self::csv::CsvOptions;
pub use self::error::DataError;
pub use self::graph::GraphFlavor;

use mosaic_value::{Context, FormatOptions, Item};

/// The formats this crate can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Json,
    Xml,
    Html,
    Yaml,
    Toml,
    Ini,
    Properties,
    Csv,
    Css,
    Jsx,
    Latex,
    Text,
    Graph,
}

impl DataFormat {
    pub const ALL: &'static [DataFormat] = &[
        DataFormat::Json,
        DataFormat::Xml,
        DataFormat::Html,
        DataFormat::Yaml,
        DataFormat::Toml,
        DataFormat::Ini,
        DataFormat::Properties,
        DataFormat::Csv,
        DataFormat::Css,
        DataFormat::Jsx,
        DataFormat::Latex,
        DataFormat::Text,
        DataFormat::Graph,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|format| format.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Xml => "xml",
            DataFormat::Html => "html",
            DataFormat::Yaml => "yaml",
            DataFormat::Toml => "toml",
            DataFormat::Ini => "ini",
            DataFormat::Properties => "properties",
            DataFormat::Csv => "csv",
            DataFormat::Css => "css",
            DataFormat::Jsx => "jsx",
            DataFormat::Latex => "latex",
            DataFormat::Text => "text",
            DataFormat::Graph => "graph",
        }
    }

    /// Parses `source`. Only `csv` and `graph` take a flavor; `strict`
    /// applies to XML attribute checking.
    pub fn parse(
        self,
        ctx: &Context,
        source: &str,
        flavor: Option<&str>,
        strict: bool,
    ) -> Result<Item, DataError> {
        log::debug!("parsing {} bytes as {}", source.len(), self.name());
        match self {
            DataFormat::Json => json::parse_json(ctx, source),
            DataFormat::Xml => xml::parse_xml_with(ctx, source, strict),
            DataFormat::Html => html::parse_html(ctx, source),
            DataFormat::Yaml => yaml::parse_yaml(ctx, source),
            DataFormat::Toml => self::toml::parse_toml(ctx, source),
            DataFormat::Ini => ini::parse_ini(ctx, source),
            DataFormat::Properties => properties::parse_properties(ctx, source),
            DataFormat::Csv => csv::parse_csv_with(ctx, source, CsvOptions::from_flavor(flavor)?),
            DataFormat::Css => css::parse_css(ctx, source),
            DataFormat::Jsx => jsx::parse_jsx(ctx, source),
            DataFormat::Latex => latex::parse_latex(ctx, source),
            DataFormat::Text => text::parse_text(ctx, source),
            DataFormat::Graph => {
                let flavor = flavor.map(GraphFlavor::from_name).transpose()?;
                graph::parse_graph(ctx, source, flavor)
            }
        }
    }

    pub fn format(
        self,
        item: &Item,
        flavor: Option<&str>,
        options: &FormatOptions,
    ) -> Result<String, DataError> {
        Ok(match self {
            DataFormat::Json => json::format_json(item, options),
            DataFormat::Xml => xml::format_xml(item, options),
            DataFormat::Html => html::format_html(item, options),
            DataFormat::Yaml => yaml::format_yaml(item, options),
            DataFormat::Toml => self::toml::format_toml(item, options),
            DataFormat::Ini => ini::format_ini(item, options),
            DataFormat::Properties => properties::format_properties(item, options),
            DataFormat::Csv => csv::format_csv_with(item, options, CsvOptions::from_flavor(flavor)?),
            DataFormat::Css => css::format_css(item, options),
            DataFormat::Jsx => jsx::format_jsx(item, options),
            DataFormat::Latex => latex::format_latex(item, options),
            DataFormat::Text => text::format_text(item, options),
            DataFormat::Graph => {
                let flavor = flavor.map(GraphFlavor::from_name).transpose()?;
                graph::format_graph(item, options, flavor.unwrap_or_default())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for format in DataFormat::ALL {
            assert_eq!(DataFormat::from_name(format.name()), Some(*format));
        }
        assert_eq!(DataFormat::from_name("markdown"), None);
    }

    #[test]
    fn test_dispatch_with_flavors() {
        let ctx = Context::new();
        let rows = DataFormat::Csv
            .parse(&ctx, "a,b\n1,2\n", Some("noheader"), false)
            .unwrap();
        assert_eq!(rows.reader().as_list().map(|l| l.len()), Some(2));

        let graph = DataFormat::Graph
            .parse(&ctx, "graph TD\n  a --> b\n", Some("mermaid"), false)
            .unwrap();
        let dot = DataFormat::Graph
            .format(&graph, Some("dot"), &FormatOptions::default())
            .unwrap();
        assert!(dot.contains("a -> b;"), "{}", dot);

        assert!(matches!(
            DataFormat::Csv.parse(&ctx, "", Some("excel"), false),
            Err(DataError::UnsupportedFlavor { .. })
        ));
    }

    #[test]
    fn test_strict_xml_rejects_duplicate_attributes() {
        let ctx = Context::new();
        let source = "<a x=\"1\" x=\"2\"/>";
        assert!(DataFormat::Xml.parse(&ctx, source, None, false).is_ok());
        assert!(matches!(
            DataFormat::Xml.parse(&ctx, source, None, true),
            Err(DataError::Invalid { .. })
        ));
    }
}
