mod common;

use common::fixtures::*;
use common::{TestResult, init_logging, parse_ok, parse_with};
use mosaic::{
    Context, EngineOptions, ErrorKind, FormatOptions, MosaicError, ParseOptions, Registry,
    default_registry,
};

#[test]
fn test_every_documented_type_is_listed() {
    init_logging();
    let types = default_registry().list_types();
    for name in [
        "json", "xml", "html", "yaml", "toml", "ini", "properties", "css", "jsx", "mdx", "latex",
        "text", "markdown", "md", "rst", "org", "wiki", "textile", "math", "graph", "sys",
    ] {
        assert!(types.iter().any(|t| t == name), "{} missing from {:?}", name, types);
    }
}

#[test]
fn test_json_to_xml_is_well_formed() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let item = parse_ok(&ctx, JSON, "json")?;
    let xml = mosaic::format(&item, "xml", None, &FormatOptions::default())?;
    assert_well_formed_xml!(xml);
    Ok(())
}

#[test]
fn test_html_element_tree_writes_as_xml() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let item = parse_ok(&ctx, HTML, "html")?;
    let xml = mosaic::format(&item, "xml", Some("compact"), &FormatOptions::default())?;
    assert_well_formed_xml!(xml);
    assert!(xml.contains("<em>two</em>"), "{}", xml);
    Ok(())
}

#[test]
fn test_yaml_to_toml_keeps_values() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let item = parse_ok(&ctx, "name: demo\nport: 8080\n", "yaml")?;
    let toml = mosaic::format(&item, "toml", None, &FormatOptions::default())?;
    assert_eq!(toml, "name = \"demo\"\nport = 8080\n");
    Ok(())
}

#[test]
fn test_csv_rows_format_as_json() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let item = parse_ok(&ctx, CSV, "csv")?;
    let json = mosaic::format(&item, "json", Some("compact"), &FormatOptions::default())?;
    assert_eq!(
        json,
        r#"[{"name":"apple","qty":"3"},{"name":"pear, green","qty":"5"}]"#
    );
    Ok(())
}

#[test]
fn test_markdown_flattens_to_text() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let doc = parse_ok(&ctx, MARKDOWN, "markdown")?;
    let text = mosaic::format(&doc, "text", None, &FormatOptions::default())?;
    assert!(text.contains("para with bold and em."), "{}", text);
    Ok(())
}

#[test]
fn test_graph_between_notations() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let graph = parse_with(&ctx, MERMAID, "graph", None)?;
    let dot = mosaic::format(&graph, "graph", Some("dot"), &FormatOptions::default())?;
    assert!(dot.starts_with("digraph {\n  rankdir=LR;\n"), "{}", dot);
    let back = parse_with(&ctx, &dot, "graph", Some("dot"))?;
    let mermaid = mosaic::format(&back, "graph-mermaid", None, &FormatOptions::default())?;
    assert!(mermaid.starts_with("flowchart LR\n"), "{}", mermaid);
    assert!(mermaid.contains("b -->|yes| c"), "{}", mermaid);
    Ok(())
}

#[test]
fn test_recoverable_errors_stay_in_the_tree() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let item = mosaic::parse(&ctx, "[a]\nb = 1\nc = \"open\n", "ini", None, &ParseOptions::default())?;
    assert!(!item.is_error());
    let text = mosaic::format(&item, "ini", None, &FormatOptions::default())?;
    assert!(text.contains("b = 1"), "{}", text);

    let root = mosaic::parse(&ctx, "<a><b></a>", "xml", None, &ParseOptions::default())?;
    assert_error_root!(root, ErrorKind::BadSyntax);
    Ok(())
}

#[test]
fn test_strict_xml_option() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let source = "<a x=\"1\" x=\"2\"/>";
    let lenient = mosaic::parse(&ctx, source, "xml", None, &ParseOptions::default())?;
    assert!(!lenient.is_error());

    let strict = ParseOptions::default().with_strict_xml(true);
    let root = mosaic::parse(&ctx, source, "xml", None, &strict)?;
    assert_error_root!(root, ErrorKind::Invalid);
    Ok(())
}

#[test]
fn test_unsupported_combinations() {
    init_logging();
    let ctx = Context::new();
    let options = ParseOptions::default();
    for (type_name, flavor) in [("docx", None), ("math", Some("klingon")), ("markup", Some("asciidoc"))] {
        let result = mosaic::parse(&ctx, "x", type_name, flavor, &options);
        assert!(
            matches!(&result, Err(err) if err.kind() == ErrorKind::UnsupportedFormat),
            "{} {:?} gave {:?}",
            type_name,
            flavor,
            result
        );
    }
    assert!(matches!(
        mosaic::format(&mosaic::Item::Null, "sys", None, &FormatOptions::default()),
        Err(MosaicError::NotSupported { .. })
    ));
}

#[test]
fn test_sys_info_through_parse() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let info = mosaic::parse(&ctx, "sys://system/info", "sys", None, &ParseOptions::default())?;
    let element = info.reader().as_element().ok_or("not an element")?;
    for key in ["os.name", "hostname", "architecture", "platform", "cpu.count"] {
        assert!(element.has_attr(key), "missing {}", key);
    }

    let relative = ParseOptions::default().with_base_url("sys://system");
    let platform = mosaic::parse(&ctx, "info/platform", "sys", None, &relative)?;
    assert_eq!(platform.reader().as_str(), Some(std::env::consts::OS));
    Ok(())
}

#[test]
fn test_engine_options_drive_convert() -> TestResult {
    init_logging();
    let options = EngineOptions::from_json(
        r#"{"format": {"indent_width": 4}, "parse": {"csv_header": false}}"#,
    )?;
    let json = mosaic::convert("a,b\n1,2\n", "csv", "json", &options)?;
    assert_eq!(json, "[\n    [\n        \"a\",\n        \"b\"\n    ],\n    [\n        \"1\",\n        \"2\"\n    ]\n]\n");
    Ok(())
}

#[test]
fn test_pool_budget_is_terminal() {
    init_logging();
    let options = EngineOptions::from_json(r#"{"pool": {"byte_limit": 16}}"#).unwrap();
    let long = format!("[\"{}\"]", "x".repeat(256));
    let result = mosaic::convert(&long, "json", "yaml", &options);
    assert!(
        matches!(&result, Err(err) if err.kind() == ErrorKind::OutOfMemory),
        "{:?}",
        result
    );
}

#[test]
fn test_private_registry_extends_defaults() -> TestResult {
    init_logging();
    let mut registry = Registry::with_defaults();
    registry.register_markup("mediawiki", mosaic::markup::Dialect::Wiki);
    let ctx = Context::new();
    let doc = registry.parse(&ctx, MARKDOWN, "md", None, &ParseOptions::default())?;
    let wiki = registry.format(&doc, "mediawiki", None, &FormatOptions::default())?;
    assert!(wiki.starts_with("= H =\n"), "{}", wiki);
    assert!(!default_registry().has("mediawiki"));
    Ok(())
}
