/// Asserts that a [`super::RoundTrip`] re-parsed to the same tree.
#[macro_export]
macro_rules! assert_round_trip {
    ($trip:expr, $type_name:expr) => {
        let trip = &$trip;
        assert!(
            trip.is_stable(),
            "{} output did not parse back to the same tree:\n{}",
            $type_name,
            trip.text
        );
    };
}

/// Asserts that formatter output is well-formed XML.
#[macro_export]
macro_rules! assert_well_formed_xml {
    ($text:expr) => {
        let text: &str = &$text;
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        if let Err(err) = roxmltree::Document::parse_with_options(text, options) {
            panic!("output is not well-formed XML ({}):\n{}", err, text);
        }
    };
}

/// Asserts that the root of a parse result is an error item of `$kind`.
#[macro_export]
macro_rules! assert_error_root {
    ($item:expr, $kind:expr) => {
        match $item.as_diagnostic() {
            Ok(diagnostic) => assert_eq!(diagnostic.kind, $kind, "{}", diagnostic),
            Err(_) => panic!("expected an error root, got {:?}", $item),
        }
    };
}
