//! User-facing error messages.
//!
//! Matches on typed errors (PolarsError variants, io::ErrorKind, the crate's own error enums)
//! found in a report's cause chain instead of parsing message strings.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

use crate::auth::AuthError;
use crate::prepare::PrepareError;

pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check the [columns] section of the config file.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::ComputeError(msg) => format!("Could not read the data: {}", msg),
        PE::Context { error, msg } => format!("{}: {}", msg, user_message_from_polars(error)),
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check access rights.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            msg
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Message for a report, prefixed with the dataset path when given.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(err) = cause.downcast_ref::<PrepareError>() {
            return with_path(err.to_string());
        }
        if let Some(err) = cause.downcast_ref::<AuthError>() {
            return err.to_string();
        }
        if let Some(err) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(err));
        }
        if let Some(err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(err, None));
        }
    }

    // First line only, no backtrace sections
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred").trim();
    with_path(first_line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Report;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(msg.contains("not found"), "expected 'not found', got: {}", msg);
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("ZONE".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("ZONE"), "got: {}", msg);
        assert!(msg.contains("[columns]"), "got: {}", msg);
    }

    #[test]
    fn test_report_with_prepare_error_names_path() {
        let report = Report::new(PrepareError::MissingColumn {
            role: "ZONE",
            tried: "ZONE".to_string(),
        });
        let msg = user_message_from_report(&report, Some(Path::new("bookings.csv")));
        assert!(msg.starts_with("Failed to load bookings.csv:"), "got: {}", msg);
        assert!(msg.contains("required column ZONE"), "got: {}", msg);
    }

    #[test]
    fn test_report_fallback_uses_first_line() {
        let report = color_eyre::eyre::eyre!("first line\nsecond line");
        assert_eq!(user_message_from_report(&report, None), "first line");
    }
}
