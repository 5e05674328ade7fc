//! Dataset loading: one booking file into an in-memory `DataFrame`.
//!
//! Delimited text, Parquet, Arrow IPC and JSON go through polars readers; Excel workbooks go
//! through calamine with per-column type inference.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub use bookdash_cli::FileFormat;

/// Rows used for CSV schema inference when not overridden.
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1000;

/// Options controlling how a dataset file is read.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Forced format. None = detect from the file extension.
    pub format: Option<FileFormat>,
    pub delimiter: Option<u8>,
    pub infer_schema_length: Option<usize>,
    /// Excel sheet: 0-based index or sheet name. None = first sheet.
    pub excel_sheet: Option<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_excel_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.excel_sheet = Some(sheet.into());
        self
    }
}

/// Read the dataset at `path` into memory.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    if !path.exists() {
        return Err(eyre!("File not found: {}", path.display()));
    }

    let format = options
        .format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| {
            eyre!(
                "Unsupported file type: {} (use --format to choose one)",
                path.display()
            )
        })?;

    let df = match format {
        FileFormat::Csv => read_delimited(path, options.delimiter.unwrap_or(b','), options)?,
        FileFormat::Tsv => read_delimited(path, options.delimiter.unwrap_or(b'\t'), options)?,
        FileFormat::Parquet => {
            let pl_path = PlPath::Local(Arc::from(path));
            LazyFrame::scan_parquet(pl_path, Default::default())?.collect()?
        }
        FileFormat::Arrow => {
            let pl_path = PlPath::Local(Arc::from(path));
            LazyFrame::scan_ipc(pl_path, Default::default(), Default::default())?.collect()?
        }
        FileFormat::Json => read_json(path, JsonFormat::Json)?,
        FileFormat::Jsonl => read_json(path, JsonFormat::JsonLines)?,
        FileFormat::Excel => read_excel(path, options.excel_sheet.as_deref())?,
    };

    info!(
        path = %path.display(),
        format = ?format,
        rows = df.height(),
        columns = df.width(),
        "loaded dataset"
    );
    Ok(df)
}

fn read_delimited(path: &Path, delimiter: u8, options: &LoadOptions) -> Result<DataFrame> {
    let pl_path = PlPath::Local(Arc::from(path));
    let lf = LazyCsvReader::new(pl_path)
        .with_separator(delimiter)
        .with_has_header(true)
        .with_infer_schema_length(Some(
            options
                .infer_schema_length
                .unwrap_or(DEFAULT_INFER_SCHEMA_LENGTH),
        ))
        .with_try_parse_dates(true)
        .finish()?;
    Ok(lf.collect()?)
}

fn read_json(path: &Path, format: JsonFormat) -> Result<DataFrame> {
    let file = File::open(path)?;
    Ok(JsonReader::new(file).with_json_format(format).finish()?)
}

/// Read one worksheet. The first row is the header.
fn read_excel(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(eyre!("Excel file has no worksheets"));
    }

    let range = match sheet {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| eyre!("Excel: no sheet at index {}", idx))?
                .map_err(|e| eyre!("Excel: {}", e))?,
            Err(_) => workbook
                .worksheet_range(sel)
                .map_err(|e| eyre!("Excel: {}", e))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| eyre!("Excel: no first sheet"))?
            .map_err(|e| eyre!("Excel: {}", e))?,
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let body: Vec<&[Data]> = rows.collect();

    let mut columns = Vec::with_capacity(header_row.len());
    for (idx, header) in header_row.iter().enumerate() {
        let name = match calamine::DataType::as_string(header) {
            Some(s) if !s.trim().is_empty() => s,
            _ => format!("column_{}", idx + 1),
        };
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(idx).unwrap_or(&EMPTY_CELL))
            .collect();
        let kind = SheetColumn::classify(&cells);
        columns.push(kind.to_series(&name, &cells)?.into());
    }
    Ok(DataFrame::new(columns)?)
}

static EMPTY_CELL: Data = Data::Empty;

/// Text layouts accepted for date cells stored as strings.
const SHEET_DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// What a worksheet column holds, decided from its non-empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetColumn {
    Text,
    Integer,
    Number,
    Flag,
    Date,
    Timestamp,
}

impl SheetColumn {
    fn classify(cells: &[&Data]) -> Self {
        use calamine::DataType as _;

        let filled: Vec<&Data> = cells.iter().copied().filter(|c| !c.is_empty()).collect();
        if filled.is_empty() {
            return SheetColumn::Text;
        }

        let is_date_cell = |c: &&Data| c.is_datetime() || c.is_datetime_iso();
        let is_numeric = |c: &&Data| c.is_int() || c.is_float();

        if filled.iter().any(|c| c.is_string()) {
            // A text column only counts as dates when every value reads as one
            if filled.iter().all(|c| sheet_timestamp(c).is_some()) {
                return Self::temporal(&filled);
            }
            return SheetColumn::Text;
        }
        if filled.iter().all(is_date_cell) {
            return Self::temporal(&filled);
        }
        if filled.iter().all(|c| is_numeric(c) || is_date_cell(c)) {
            let whole = filled
                .iter()
                .filter_map(|c| c.as_f64())
                .all(|f| f.is_finite() && f.fract().abs() < 1e-10);
            return if whole {
                SheetColumn::Integer
            } else {
                SheetColumn::Number
            };
        }
        if filled.iter().all(|c| c.is_bool()) {
            return SheetColumn::Flag;
        }
        SheetColumn::Text
    }

    /// `Date` when every value falls on midnight.
    fn temporal(filled: &[&Data]) -> Self {
        let midnight = filled
            .iter()
            .filter_map(|c| sheet_timestamp(c))
            .all(|ts| ts.time() == NaiveTime::MIN);
        if midnight {
            SheetColumn::Date
        } else {
            SheetColumn::Timestamp
        }
    }

    fn to_series(self, name: &str, cells: &[&Data]) -> Result<Series> {
        use calamine::DataType as _;

        let name: PlSmallStr = name.into();
        let series = match self {
            SheetColumn::Integer => {
                Series::new(name, cells.iter().map(|c| c.as_i64()).collect::<Vec<_>>())
            }
            SheetColumn::Number => {
                Series::new(name, cells.iter().map(|c| c.as_f64()).collect::<Vec<_>>())
            }
            SheetColumn::Flag => {
                Series::new(name, cells.iter().map(|c| c.get_bool()).collect::<Vec<_>>())
            }
            SheetColumn::Text => {
                let text: Vec<Option<String>> = cells
                    .iter()
                    .map(|c| if c.is_empty() { None } else { c.as_string() })
                    .collect();
                Series::new(name, text)
            }
            SheetColumn::Date => {
                let days: Vec<Option<i32>> = cells
                    .iter()
                    .map(|c| {
                        sheet_timestamp(c)
                            .map(|ts| (ts.date() - NaiveDate::default()).num_days() as i32)
                    })
                    .collect();
                Series::new(name, days).cast(&DataType::Date)?
            }
            SheetColumn::Timestamp => {
                let micros: Vec<Option<i64>> = cells
                    .iter()
                    .map(|c| sheet_timestamp(c).map(|ts| ts.and_utc().timestamp_micros()))
                    .collect();
                Series::new(name, micros)
                    .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
            }
        };
        Ok(series)
    }
}

/// Serial date cell, ISO datetime cell, or text in one of [`SHEET_DATE_LAYOUTS`] or
/// `YYYY-MM-DD`.
fn sheet_timestamp(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType as _;

    if let Some(ts) = cell.as_datetime() {
        return Some(ts);
    }
    let text = cell.get_datetime_iso().or_else(|| cell.get_string())?.trim();
    if text.is_empty() {
        return None;
    }
    SHEET_DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
