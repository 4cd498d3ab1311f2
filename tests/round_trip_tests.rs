mod common;

use common::fixtures::*;
use common::{TestResult, init_logging, parse_ok, round_trip};
use mosaic::{Context, FormatOptions};

fn check(source: &str, type_name: &str, flavor: Option<&str>) -> TestResult {
    init_logging();
    let ctx = Context::new();
    for options in [FormatOptions::default(), FormatOptions::compact()] {
        let trip = round_trip(&ctx, source, type_name, flavor, &options)?;
        assert_round_trip!(trip, type_name);
    }
    Ok(())
}

#[test]
fn test_json_round_trip() -> TestResult {
    check(JSON, "json", None)
}

#[test]
fn test_xml_round_trip() -> TestResult {
    check(XML, "xml", None)?;
    let ctx = Context::new();
    let trip = round_trip(&ctx, XML, "xml", None, &FormatOptions::default())?;
    assert_well_formed_xml!(trip.text);
    Ok(())
}

#[test]
fn test_html_round_trip() -> TestResult {
    check(HTML, "html", None)
}

#[test]
fn test_yaml_round_trip() -> TestResult {
    check(YAML, "yaml", None)?;
    check(YAML_STREAM, "yaml", None)
}

#[test]
fn test_toml_round_trip() -> TestResult {
    check(TOML, "toml", None)
}

#[test]
fn test_ini_round_trip() -> TestResult {
    check(INI, "ini", None)
}

#[test]
fn test_properties_round_trip() -> TestResult {
    check(PROPERTIES, "properties", None)
}

#[test]
fn test_csv_round_trip() -> TestResult {
    check(CSV, "csv", None)?;
    check(CSV, "csv", Some("noheader"))?;
    check("a\tb\n1\t2\n", "csv", Some("tsv"))
}

#[test]
fn test_css_round_trip() -> TestResult {
    check(CSS, "css", None)
}

#[test]
fn test_jsx_round_trip() -> TestResult {
    check(JSX, "jsx", None)
}

#[test]
fn test_latex_round_trip() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let trip = round_trip(&ctx, LATEX, "latex", None, &FormatOptions::default())?;
    assert_round_trip!(trip, "latex");
    Ok(())
}

#[test]
fn test_text_round_trip() -> TestResult {
    check("  indented\nlines\n", "text", None)
}

#[test]
fn test_markup_dialects_round_trip() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let doc = parse_ok(&ctx, MARKDOWN, "markdown")?;
    for type_name in ["markdown", "md", "mdx", "rst", "org", "wiki", "textile"] {
        let text = mosaic::format(&doc, type_name, None, &FormatOptions::default())?;
        let back = parse_ok(&ctx, &text, type_name)?;
        assert!(
            doc.structural_eq(&back),
            "{} output did not parse back:\n{}",
            type_name,
            text
        );
    }
    Ok(())
}

#[test]
fn test_markup_umbrella_type() -> TestResult {
    init_logging();
    let ctx = Context::new();
    let doc = parse_ok(&ctx, MARKDOWN, "markdown")?;
    let org = mosaic::format(&doc, "markup", Some("org"), &FormatOptions::default())?;
    let direct = mosaic::format(&doc, "org", None, &FormatOptions::default())?;
    assert_eq!(org, direct);
    Ok(())
}

#[test]
fn test_graph_round_trip() -> TestResult {
    check(DOT, "graph", Some("dot"))?;
    check(MERMAID, "graph", Some("mermaid"))?;
    check(DOT, "graph", None)
}

#[test]
fn test_math_round_trip() -> TestResult {
    check(MATH_LATEX, "math", Some("latex"))?;
    check(MATH_LATEX, "math-latex", None)?;
    check(MATH_ASCII, "math", Some("ascii"))
}
