use bookdash::cli::{initial_filters, Args};
use bookdash::config::AppConfig;
use bookdash::error_display::user_message_from_report;
use bookdash::logging::{init_logging, resolve_log_dir};
use bookdash::{
    load_table, prepare, App, AppEvent, ConfigManager, Dashboard, DashboardConfig, FilterSpec,
    LoadOptions,
};
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use std::path::Path;
use std::sync::mpsc::channel;
use tracing::{error, info, warn};

/// Command-line values win over the config file.
fn apply_args(config: &mut AppConfig, args: &Args) {
    if args.delimiter.is_some() {
        config.data.delimiter = args.delimiter;
    }
    if args.infer_schema_length.is_some() {
        config.data.infer_schema_length = args.infer_schema_length;
    }
    if args.excel_sheet.is_some() {
        config.data.excel_sheet = args.excel_sheet.clone();
    }
    if let Some(null_sales) = args.null_sales {
        config.data.null_sales = Some(null_sales.into());
    }
    if args.no_login {
        config.auth.require_login = false;
    }
    if args.debug {
        config.debug.enabled = true;
    }
}

fn load_options(config: &AppConfig, args: &Args) -> LoadOptions {
    let mut opts = LoadOptions::new();
    // --format wins over [data] format
    opts.format = args.format.or_else(|| {
        config
            .data
            .format
            .as_deref()
            .and_then(bookdash::FileFormat::from_extension)
    });
    opts.delimiter = config.data.delimiter;
    opts.infer_schema_length = config.data.infer_schema_length;
    opts.excel_sheet = config.data.excel_sheet.clone();
    opts
}

fn build_dashboard(path: &Path, config: &AppConfig, args: &Args) -> Result<Dashboard> {
    let raw = load_table(path, &load_options(config, args))?;
    let table = prepare(raw, &config.columns, config.data.null_sales_policy())?;
    Dashboard::new(table, DashboardConfig::from(config))
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, app: &mut App) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    render(&mut terminal, app)?;

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, app)?;
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(bookdash::APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Configuration written to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error writing configuration: {}", e);
                std::process::exit(1);
            }
        }
    }
    Ok(None)
}

/// Headless modes have no login screen, so they only run when login is switched off.
fn check_headless_access(config: &AppConfig, args: &Args) -> Result<()> {
    let mode = if args.report {
        "--report"
    } else if args.export.is_some() {
        "--export"
    } else {
        return Ok(());
    };
    if config.auth.require_login {
        return Err(eyre!(
            "{} needs --no-login (or auth.require_login = false in the config)",
            mode
        ));
    }
    Ok(())
}

/// `--report` and `--export` run the pipeline once and print or write the result.
fn run_headless(
    dashboard: &Dashboard,
    spec: &FilterSpec,
    config: &AppConfig,
    args: &Args,
) -> Result<Option<()>> {
    check_headless_access(config, args)?;
    if args.report {
        let view = dashboard.view(spec, args.page.unwrap_or(0))?;
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(Some(()));
    }
    if let Some(path) = &args.export {
        let rows = dashboard.export_csv(spec, path)?;
        println!("Wrote {} rows to {}", rows, path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let mut config = match AppConfig::load(bookdash::APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    apply_args(&mut config, &args);

    let log_dir = resolve_log_dir(args.log_dir.as_deref(), &config.logging, bookdash::APP_NAME);
    let _guard = match init_logging(&config.logging, &log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };

    let Some(path) = args.path.clone() else {
        return Err(eyre!("A dataset path is required"));
    };
    info!(path = %path.display(), "starting {}", bookdash::APP_NAME);

    let dashboard = match build_dashboard(&path, &config, &args) {
        Ok(dashboard) => dashboard,
        Err(report) => {
            error!(error = %report, "failed to open dataset");
            eprintln!("{}", user_message_from_report(&report, Some(&path)));
            std::process::exit(1);
        }
    };
    let spec = initial_filters(&args);

    match run_headless(&dashboard, &spec, &config, &args) {
        Ok(Some(())) => return Ok(()),
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "headless run refused or failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let mut app = App::new(dashboard, &config)?.with_filters(spec);
    let terminal = ratatui::init();
    let result = run(terminal, &mut app);
    ratatui::restore();
    if let Err(e) = result {
        error!(error = %e, "exited with error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    info!("exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookdash::{FileFormat, NullSalesPolicy};

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "bookdash",
            "bookings.tsv",
            "--format",
            "tsv",
            "--delimiter",
            "9",
            "--null-sales",
            "drop",
            "--no-login",
        ]);
        let mut config = AppConfig::default();
        apply_args(&mut config, &args);
        assert_eq!(config.data.null_sales_policy(), NullSalesPolicy::Drop);
        assert!(!config.auth.require_login);

        let opts = load_options(&config, &args);
        assert_eq!(opts.format, Some(FileFormat::Tsv));
        assert_eq!(opts.delimiter, Some(b'\t'));
    }

    #[test]
    fn test_headless_modes_need_login_disabled() {
        let mut config = AppConfig::default();
        for flags in [&["--report"][..], &["--export", "out.csv"][..]] {
            let argv = ["bookdash", "bookings.csv"].into_iter().chain(flags.iter().copied());
            let args = Args::parse_from(argv);
            apply_args(&mut config, &args);
            let err = check_headless_access(&config, &args).unwrap_err();
            assert!(err.to_string().contains("--no-login"), "{}", err);
        }

        let args = Args::parse_from(["bookdash", "bookings.csv", "--report", "--no-login"]);
        apply_args(&mut config, &args);
        assert!(check_headless_access(&config, &args).is_ok());

        // The TUI shows its own login screen
        let args = Args::parse_from(["bookdash", "bookings.csv"]);
        assert!(check_headless_access(&AppConfig::default(), &args).is_ok());
    }

    #[test]
    fn test_config_format_used_without_flag() {
        let args = Args::parse_from(["bookdash", "bookings.dat"]);
        let mut config = AppConfig::default();
        config.data.format = Some("csv".to_string());
        apply_args(&mut config, &args);
        assert_eq!(load_options(&config, &args).format, Some(FileFormat::Csv));
    }
}
