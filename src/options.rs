//! Engine-level configuration.

use crate::error::MosaicError;
use mosaic_value::{FormatOptions, PoolConfig};
use serde::{Deserialize, Serialize};

/// Options that steer parsing beyond the type and flavor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Location the source was read from. Relative `sys` paths resolve
    /// against it.
    pub base_url: Option<String>,
    /// Whether the first CSV record is a header. `None` leaves it to the
    /// flavor (`header` when no flavor is given).
    pub csv_header: Option<bool>,
    /// Reject duplicate XML attributes instead of keeping the last one.
    pub strict_xml: bool,
}

impl ParseOptions {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_csv_header(mut self, header: bool) -> Self {
        self.csv_header = Some(header);
        self
    }

    pub fn with_strict_xml(mut self, strict: bool) -> Self {
        self.strict_xml = strict;
        self
    }
}

/// Everything a caller can configure, loadable from one JSON document:
///
/// ```json
/// { "parse": { "strict_xml": true }, "format": { "indent_width": 4 }, "pool": { "byte_limit": 1048576 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub parse: ParseOptions,
    pub format: FormatOptions,
    pub pool: PoolConfig,
}

impl EngineOptions {
    pub fn from_json(json: &str) -> Result<Self, MosaicError> {
        let options: EngineOptions = serde_json::from_str(json)?;
        if options.format.max_depth == 0 {
            return Err(MosaicError::Config(
                "format.max_depth must be at least 1".to_string(),
            ));
        }
        log::debug!("loaded engine options: {:?}", options);
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String, MosaicError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
