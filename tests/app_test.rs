use bookdash::config::ColumnAliases;
use bookdash::{
    load_table, prepare, App, AppConfig, AppEvent, Dashboard, DashboardConfig, FilterColumn,
    FilterSpec, LoadOptions, NullSalesPolicy, Screen, StatusMessage,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tempfile::TempDir;

mod common;

fn new_app(config: &AppConfig) -> App {
    let table = prepare(
        common::sample_bookings(),
        &ColumnAliases::default(),
        NullSalesPolicy::Coalesce,
    )
    .unwrap();
    let dashboard = Dashboard::new(table, DashboardConfig::from(config)).unwrap();
    App::new(dashboard, config).unwrap()
}

/// Feed one event and every follow-up it produces, as the main loop does.
fn send(app: &mut App, event: AppEvent) {
    let mut next = app.event(&event);
    while let Some(event) = next {
        if matches!(event, AppEvent::Exit | AppEvent::Crash(_)) {
            break;
        }
        next = app.event(&event);
    }
}

fn press(app: &mut App, code: KeyCode) {
    send(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
}

fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn log_in(app: &mut App, user: &str, password: &str) {
    type_str(app, user);
    press(app, KeyCode::Enter);
    type_str(app, password);
    press(app, KeyCode::Enter);
}

#[test]
fn test_dashboard_hidden_until_login() {
    let mut app = new_app(&AppConfig::default());
    assert_eq!(app.screen(), Screen::Login);
    assert!(app.view().is_none());

    log_in(&mut app, "dhruv", "travel123");
    assert_eq!(app.screen(), Screen::Dashboard);
    assert_eq!(app.user(), Some("dhruv"));
    assert_eq!(app.view().unwrap().filtered_rows, 5);
    assert_eq!(
        app.status(),
        Some(&StatusMessage::Info("Logged in as dhruv".to_string()))
    );
}

#[test]
fn test_invalid_login_stays_on_form() {
    let mut app = new_app(&AppConfig::default());
    log_in(&mut app, "dhruv", "Travel123");
    assert_eq!(app.screen(), Screen::Login);
    assert_eq!(app.login_error(), Some("Invalid login."));
    assert_eq!(app.user(), None);

    // Only the password needs retyping
    type_str(&mut app, "travel123");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.screen(), Screen::Dashboard);
}

#[test]
fn test_logout_keeps_filters() {
    let mut app = new_app(&AppConfig::default());
    log_in(&mut app, "alice", "passalice");

    press(&mut app, KeyCode::Right);
    assert_eq!(app.filters().get(FilterColumn::Zone), Some("East"));

    press(&mut app, KeyCode::Char('L'));
    assert_eq!(app.screen(), Screen::Login);
    assert_eq!(app.user(), None);

    log_in(&mut app, "john", "john2024");
    assert_eq!(app.filters().get(FilterColumn::Zone), Some("East"));
    assert_eq!(app.view().unwrap().filtered_rows, 1);
}

#[test]
fn test_login_can_be_disabled() {
    let mut config = AppConfig::default();
    config.auth.require_login = false;
    let mut app = new_app(&config);
    assert_eq!(app.screen(), Screen::Dashboard);

    // Logout has nothing to do without a login screen
    press(&mut app, KeyCode::Char('L'));
    assert_eq!(app.screen(), Screen::Dashboard);
}

#[test]
fn test_initial_filters_and_month_selection() {
    let mut config = AppConfig::default();
    config.auth.require_login = false;
    let spec = FilterSpec::new().with(FilterColumn::Month, "2024-01");
    let app = new_app(&config).with_filters(spec);

    let view = app.view().unwrap();
    assert_eq!(view.filtered_rows, 2);
    assert_eq!(view.summary.total_revenue, 200.0);
    assert_eq!(view.months.len(), 1);
}

#[test]
fn test_csv_export_writes_filtered_rows() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.auth.require_login = false;
    config.export.directory = Some(dir.path().join("out").display().to_string());

    let mut app = new_app(&config);
    // Zone: All -> East -> North
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Char('e'));

    let path = dir.path().join("out").join("filtered_data.csv");
    assert!(path.exists());
    match app.status() {
        Some(StatusMessage::Info(msg)) => assert!(msg.starts_with("Exported 2 rows"), "{}", msg),
        other => panic!("unexpected status: {:?}", other),
    }

    let exported = load_table(&path, &LoadOptions::new()).unwrap();
    assert_eq!(exported.height(), 2);
    assert!(exported.column("TOTAL_SALE_VALUE").is_ok());
}

#[test]
fn test_ctrl_c_exits_from_any_screen() {
    let mut app = new_app(&AppConfig::default());
    let event = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(matches!(app.event(&event), Some(AppEvent::Exit)));
}
