//! Shared CLI definitions for bookdash.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// File format for booking datasets (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Parquet columnar format
    Parquet,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// JSON array format
    Json,
    /// JSON Lines / NDJSON (one JSON object per line)
    Jsonl,
    /// Arrow IPC / Feather
    Arrow,
    /// Excel (.xls, .xlsx, .xlsm, .xlsb)
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "parquet", "csv").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "parquet" => Some(Self::Parquet),
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            "arrow" | "ipc" | "feather" => Some(Self::Arrow),
            "xls" | "xlsx" | "xlsm" | "xlsb" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// How rows with a missing land or air sale value are treated.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum NullSales {
    /// Treat a missing sale value as zero and keep the row
    Coalesce,
    /// Drop rows where either sale value is missing
    Drop,
}

/// Command-line arguments for bookdash
#[derive(Clone, Parser, Debug)]
#[command(
    name = "bookdash",
    version,
    about = "Booking Dashboard in the Terminal",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the booking dataset to open (not required with --generate-config)
    #[arg(required_unless_present = "generate_config", value_name = "PATH")]
    pub path: Option<std::path::PathBuf>,

    /// Force file format (parquet, csv, tsv, json, jsonl, arrow, excel).
    /// By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Number of rows to use when inferring CSV schema (default: 1000)
    #[arg(long = "infer-schema-length", value_name = "N")]
    pub infer_schema_length: Option<usize>,

    /// Excel sheet to load: 0-based index (e.g. 0) or sheet name (e.g. "Bookings")
    #[arg(long = "sheet", value_name = "SHEET")]
    pub excel_sheet: Option<String>,

    /// How to treat rows with a missing land or air sale value (default: coalesce)
    #[arg(long = "null-sales", value_enum)]
    pub null_sales: Option<NullSales>,

    /// Initial zone filter
    #[arg(long = "zone", value_name = "ZONE")]
    pub zone: Option<String>,

    /// Initial branch filter
    #[arg(long = "branch", value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Initial month filter, formatted YYYY-MM
    #[arg(long = "month", value_name = "YYYY-MM")]
    pub month: Option<String>,

    /// Skip the login screen
    #[arg(long = "no-login", action)]
    pub no_login: bool,

    /// Print the dashboard for the given filters as JSON and exit
    #[arg(long = "report", action)]
    pub report: bool,

    /// Raw-row page to include with --report (0-based, default: 0)
    #[arg(long = "page", value_name = "N", requires = "report")]
    pub page: Option<usize>,

    /// Write the filtered rows as CSV to FILE and exit
    #[arg(long = "export", value_name = "FILE")]
    pub export: Option<std::path::PathBuf>,

    /// Directory for log files (default: <cache dir>/bookdash/logs)
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<std::path::PathBuf>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/bookdash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");
    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");
    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }
        let value_names = || -> String {
            arg.get_value_names()
                .map(|names| {
                    names
                        .iter()
                        .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default()
        };
        let option_str = if arg.is_positional() {
            let placeholder = value_names();
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_names()
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("BOOKING_REP22.xlsx")),
            Some(FileFormat::Excel)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("bookings.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("bookings.NDJSON")),
            Some(FileFormat::Jsonl)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("bookings.feather")),
            Some(FileFormat::Arrow)
        );
        assert_eq!(FileFormat::from_path(Path::new("BOOKING_REP22.qvd")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_args_parse_filters() {
        let args = Args::parse_from([
            "bookdash",
            "bookings.csv",
            "--zone",
            "North",
            "--month",
            "2024-01",
            "--null-sales",
            "drop",
        ]);
        assert_eq!(args.zone.as_deref(), Some("North"));
        assert_eq!(args.branch, None);
        assert_eq!(args.month.as_deref(), Some("2024-01"));
        assert_eq!(args.null_sales, Some(NullSales::Drop));
        assert!(!args.report);
    }

    #[test]
    fn test_generate_config_needs_no_path() {
        let args = Args::try_parse_from(["bookdash", "--generate-config"]).unwrap();
        assert!(args.generate_config);
        assert!(args.path.is_none());
        assert!(Args::try_parse_from(["bookdash"]).is_err());
    }

    #[test]
    fn test_options_markdown_lists_flags() {
        let md = render_options_markdown();
        assert!(md.contains("`--zone <ZONE>`"));
        assert!(md.contains("`--no-login`"));
        assert!(!md.contains("--help"));
    }
}
