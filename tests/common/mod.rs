#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

use mosaic::{Context, FormatOptions, Item, MosaicError, ParseOptions};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parses `source` and fails if the root came back as an error item.
pub fn parse_ok(ctx: &Context, source: &str, type_name: &str) -> Result<Item, MosaicError> {
    parse_with(ctx, source, type_name, None)
}

pub fn parse_with(
    ctx: &Context,
    source: &str,
    type_name: &str,
    flavor: Option<&str>,
) -> Result<Item, MosaicError> {
    let item = mosaic::parse(ctx, source, type_name, flavor, &ParseOptions::default())?;
    if let Item::Error(diagnostic) = &item {
        return Err(MosaicError::Parse(diagnostic.as_ref().clone()));
    }
    Ok(item)
}

/// The result of parse, format and parse again.
pub struct RoundTrip {
    pub first: Item,
    pub text: String,
    pub second: Item,
}

impl RoundTrip {
    pub fn is_stable(&self) -> bool {
        self.first.structural_eq(&self.second)
    }
}

pub fn round_trip(
    ctx: &Context,
    source: &str,
    type_name: &str,
    flavor: Option<&str>,
    options: &FormatOptions,
) -> Result<RoundTrip, MosaicError> {
    let first = parse_with(ctx, source, type_name, flavor)?;
    let text = mosaic::format(&first, type_name, flavor, options)?;
    let second = parse_with(ctx, &text, type_name, flavor)?;
    Ok(RoundTrip {
        first,
        text,
        second,
    })
}
