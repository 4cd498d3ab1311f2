//! Comma-separated values (RFC 4180 quoting) through the `csv` crate.
//!
//! With a header row every record becomes a map keyed by the header; without
//! one every record is an array of fields. Fields are always strings.
//! A record with more fields than the header becomes an error item; a short
//! record is padded with nulls.

use mosaic_value::{Context, Diagnostic, ErrorKind, FormatOptions, Item, ItemReader};

use crate::error::DataError;
use crate::xml::scalar_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub header: bool,
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            header: true,
            delimiter: b',',
        }
    }
}

impl CsvOptions {
    /// `header` (default), `noheader` or `tsv`.
    pub fn from_flavor(flavor: Option<&str>) -> Result<Self, DataError> {
        match flavor.unwrap_or("header") {
            "header" | "" => Ok(Self::default()),
            "noheader" => Ok(Self {
                header: false,
                ..Self::default()
            }),
            "tsv" => Ok(Self {
                delimiter: b'\t',
                ..Self::default()
            }),
            other => Err(DataError::flavor("csv", other)),
        }
    }
}

pub fn parse_csv(ctx: &Context, source: &str) -> Result<Item, DataError> {
    parse_csv_with(ctx, source, CsvOptions::default())
}

pub fn parse_csv_with(ctx: &Context, source: &str, options: CsvOptions) -> Result<Item, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(source.as_bytes());
    let mut records = reader.records();

    let header: Option<Vec<String>> = if options.header {
        match records.next() {
            Some(record) => {
                let record = record.map_err(|err| syntax(&err))?;
                Some(record.iter().map(String::from).collect())
            }
            None => return Ok(ctx.list(Vec::new())?),
        }
    } else {
        None
    };

    let mut rows = Vec::new();
    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::debug!("csv: skipping record: {}", err);
                let offset = err.position().map(|p| p.byte() as usize).unwrap_or_default();
                rows.push(ctx.error(Diagnostic::syntax(offset, err.to_string())));
                continue;
            }
        };
        let row = match &header {
            Some(names) if record.len() > names.len() => {
                let offset = record.position().map(|p| p.byte() as usize).unwrap_or_default();
                ctx.error(
                    Diagnostic::new(
                        ErrorKind::Invalid,
                        format!("record has {} fields, header has {}", record.len(), names.len()),
                    )
                    .at(offset),
                )
            }
            Some(names) => {
                let mut builder = ctx.map();
                for (index, name) in names.iter().enumerate() {
                    let value = match record.get(index) {
                        Some(field) => ctx.string(field)?,
                        None => Item::Null,
                    };
                    builder.insert(name, value)?;
                }
                Item::Map(builder.build()?)
            }
            None => {
                let items = record
                    .iter()
                    .map(|field| ctx.string(field))
                    .collect::<Result<Vec<_>, _>>()?;
                ctx.array(items)?
            }
        };
        rows.push(row);
    }
    Ok(ctx.list(rows)?)
}

fn syntax(err: &csv::Error) -> DataError {
    let offset = err.position().map(|p| p.byte() as usize).unwrap_or_default();
    DataError::syntax("csv", offset, err.to_string())
}

pub fn format_csv(item: &Item, options: &FormatOptions) -> String {
    format_csv_with(item, options, CsvOptions::default())
}

/// Maps are written under a header collected from every row's keys in
/// first-seen order; a `noheader` layout omits that header line.
pub fn format_csv_with(item: &Item, _options: &FormatOptions, layout: CsvOptions) -> String {
    let rows: Vec<ItemReader<'_>> = match item.reader().as_list() {
        Some(list) => list.iter().collect(),
        None => vec![item.reader()],
    };
    let rows: Vec<ItemReader<'_>> = rows
        .into_iter()
        .filter(|row| {
            if row.is_error() {
                log::debug!("csv: dropping error row");
            }
            !row.is_error()
        })
        .collect();

    let mut columns: Vec<&str> = Vec::new();
    for row in &rows {
        if let Some(map) = row.as_map() {
            for key in map.keys() {
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(layout.delimiter)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    let mut records: Vec<Vec<String>> = Vec::new();
    if !columns.is_empty() && layout.header {
        records.push(columns.iter().map(|c| c.to_string()).collect());
    }
    for row in rows {
        let fields: Vec<String> = if let Some(map) = row.as_map() {
            columns
                .iter()
                .map(|column| map.get(column).map(cell).unwrap_or_default())
                .collect()
        } else if let Some(list) = row.as_list() {
            list.iter().map(cell).collect()
        } else {
            vec![cell(row)]
        };
        records.push(fields);
    }
    for record in &records {
        if let Err(err) = writer.write_record(record) {
            log::warn!("csv: could not write record: {}", err);
        }
    }
    match writer.into_inner() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            log::warn!("csv: could not flush output: {}", err);
            String::new()
        }
    }
}

fn cell(value: ItemReader<'_>) -> String {
    match scalar_text(value.item()) {
        Some(text) => text,
        None if value.is_null() => String::new(),
        None => value.item().type_tag().sentinel(),
    }
}
