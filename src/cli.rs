//! Command-line definitions live in the `bookdash-cli` crate so the build script and the
//! docs generator can share them.

pub use bookdash_cli::{render_options_markdown, Args, FileFormat, NullSales};

use crate::filter::{FilterColumn, FilterSpec};

/// Initial selection from `--zone`, `--branch` and `--month`.
pub fn initial_filters(args: &Args) -> FilterSpec {
    let mut spec = FilterSpec::new();
    spec.set(FilterColumn::Zone, args.zone.clone());
    spec.set(FilterColumn::Branch, args.branch.clone());
    spec.set(FilterColumn::Month, args.month.clone());
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_initial_filters_from_flags() {
        let args = Args::parse_from(["bookdash", "data.csv", "--zone", "North", "--month", ""]);
        let spec = initial_filters(&args);
        assert_eq!(spec.get(FilterColumn::Zone), Some("North"));
        assert_eq!(spec.get(FilterColumn::Branch), None);
        // An empty value means "All"
        assert_eq!(spec.get(FilterColumn::Month), None);
    }
}
