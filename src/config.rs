use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use supports_color::Stream;

use crate::filter::FilterColumn;
use crate::prepare::NullSalesPolicy;
use crate::present::ChartId;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string with comments.
    /// All fields are commented out so defaults are used, but users can uncomment to override.
    pub fn generate_default_config(&self) -> String {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .unwrap_or_else(|e| panic!("Failed to serialize default config: {}", e));

        Self::comment_all_fields(toml_str, Self::collect_all_comments())
    }

    /// Collect all field comments from the section constants into a map keyed by `section.field`
    fn collect_all_comments() -> HashMap<String, String> {
        let sections: [(&str, &[(&str, &str)]); 9] = [
            ("", APP_COMMENTS),
            ("data", DATA_COMMENTS),
            ("columns", COLUMNS_COMMENTS),
            ("dashboard", DASHBOARD_COMMENTS),
            ("chart", CHART_COMMENTS),
            ("export", EXPORT_COMMENTS),
            ("auth", AUTH_COMMENTS),
            ("logging", LOGGING_COMMENTS),
            ("debug", DEBUG_COMMENTS),
        ];

        let mut comments = HashMap::new();
        for (section, fields) in sections {
            for (field, comment) in fields {
                let key = if section.is_empty() {
                    field.to_string()
                } else {
                    format!("{}.{}", section, field)
                };
                comments.insert(key, comment.to_string());
            }
        }
        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Also adds missing Option fields as commented-out `# field = null`.
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# bookdash configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();
        // Inside a multi-line array value
        let mut in_array = false;

        for line in toml.lines() {
            if in_array {
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                in_array = line.trim() != "]";
                continue;
            }

            if let Some(section) = Self::extract_section_name(line) {
                current_section = section.clone();
                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header.1);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                in_array = line.trim_end().ends_with('[');
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add Option fields that weren't serialized because they're None
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = [
            "data.format",
            "data.delimiter",
            "data.infer_schema_length",
            "data.excel_sheet",
            "export.directory",
            "logging.directory",
        ];

        let mut missing_by_section: HashMap<&str, Vec<&str>> = HashMap::new();
        for field_path in option_fields {
            if !seen_fields.contains(field_path) && comments.contains_key(field_path) {
                if let Some((section, _)) = field_path.split_once('.') {
                    missing_by_section.entry(section).or_default().push(field_path);
                }
            }
        }

        for (section, fields) in &missing_by_section {
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            for field_path in fields {
                if let Some(comment) = comments.get(*field_path) {
                    for comment_line in comment.lines() {
                        new_content.push_str("# ");
                        new_content.push_str(comment_line);
                        new_content.push('\n');
                    }
                }
                let field_name = field_path.rsplit('.').next().unwrap_or(field_path);
                new_content.push_str(&format!("# {} = null\n", field_name));
                new_content.push('\n');
            }
            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from TOML line like "[dashboard]" or "[theme.colors]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config())?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub data: DataConfig,
    pub columns: ColumnAliases,
    pub dashboard: DashboardSettings,
    pub chart: ChartConfig,
    pub export: ExportConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "data",
        "# ============================================================================\n# Dataset Loading\n# ============================================================================",
    ),
    (
        "columns",
        "# ============================================================================\n# Column Names\n# ============================================================================\n# Each entry lists the candidate column names, tried in order (exact match first,\n# then case-insensitive).",
    ),
    (
        "dashboard",
        "# ============================================================================\n# Dashboard Layout\n# ============================================================================",
    ),
    (
        "chart",
        "# ============================================================================\n# Charts\n# ============================================================================",
    ),
    (
        "export",
        "# ============================================================================\n# Export\n# ============================================================================",
    ),
    (
        "auth",
        "# ============================================================================\n# Login\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================",
    ),
    (
        "theme.colors",
        "# ============================================================================\n# Color Theme\n# ============================================================================\n# Supported formats:\n#   - Named colors: \"red\", \"blue\", \"bright_red\", \"dark_gray\", etc. (case-insensitive)\n#   - Hex colors: \"#ff0000\"\n#   - Indexed colors: \"indexed(0-255)\"",
    ),
    (
        "debug",
        "# ============================================================================\n# Debug Settings\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// Forced file format (e.g. "csv", "excel"). None = detect from the file extension.
    pub format: Option<String>,
    pub delimiter: Option<u8>,
    pub infer_schema_length: Option<usize>,
    /// Excel sheet: 0-based index or sheet name. None = first sheet.
    pub excel_sheet: Option<String>,
    pub null_sales: Option<NullSalesPolicy>,
}

const DATA_COMMENTS: &[(&str, &str)] = &[
    (
        "format",
        "Force the dataset format (parquet, csv, tsv, json, jsonl, arrow, excel)\nnull = detect from the file extension",
    ),
    (
        "delimiter",
        "Delimiter for CSV files (as ASCII value, e.g., 59 for ';')\nnull = comma for .csv, tab for .tsv",
    ),
    (
        "infer_schema_length",
        "Number of rows used to infer CSV column types. null = 1000",
    ),
    (
        "excel_sheet",
        "Excel sheet to load: 0-based index (\"0\") or sheet name. null = first sheet",
    ),
    (
        "null_sales",
        "Rows with a missing land or air sale value: \"coalesce\" counts the missing value as 0,\n\"drop\" removes the row before any totals are computed",
    ),
];

impl DataConfig {
    pub fn merge(&mut self, other: Self) {
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.excel_sheet.is_some() {
            self.excel_sheet = other.excel_sheet;
        }
        if other.null_sales.is_some() {
            self.null_sales = other.null_sales;
        }
    }

    pub fn null_sales_policy(&self) -> NullSalesPolicy {
        self.null_sales.unwrap_or_default()
    }
}

/// Candidate source column names for each column the dashboard reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub zone: Vec<String>,
    pub branch: Vec<String>,
    pub tour_start_date: Vec<String>,
    pub land_sale_value: Vec<String>,
    pub air_sale_value: Vec<String>,
    pub astra_booking: Vec<String>,
}

const COLUMNS_COMMENTS: &[(&str, &str)] = &[
    ("zone", "Zone column"),
    ("branch", "Branch column (older exports call it \"BRANCH NAME\")"),
    ("tour_start_date", "Tour start date column, used to derive the tour month"),
    ("land_sale_value", "Land sale value column"),
    ("air_sale_value", "Air sale value column"),
    (
        "astra_booking",
        "ASTRA booking column (optional; its chart shows no data when absent)",
    ),
];

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            zone: names(&["ZONE"]),
            branch: names(&["BRANCH", "BRANCH NAME"]),
            tour_start_date: names(&["TOUR_START_DATE"]),
            land_sale_value: names(&["LAND_SALE_VALUE"]),
            air_sale_value: names(&["AIR_SALE_VALUE"]),
            astra_booking: names(&["ASTRA BOOKING"]),
        }
    }
}

impl ColumnAliases {
    pub fn merge(&mut self, other: Self) {
        let default = ColumnAliases::default();
        if other.zone != default.zone {
            self.zone = other.zone;
        }
        if other.branch != default.branch {
            self.branch = other.branch;
        }
        if other.tour_start_date != default.tour_start_date {
            self.tour_start_date = other.tour_start_date;
        }
        if other.land_sale_value != default.land_sale_value {
            self.land_sale_value = other.land_sale_value;
        }
        if other.air_sale_value != default.air_sale_value {
            self.air_sale_value = other.air_sale_value;
        }
        if other.astra_booking != default.astra_booking {
            self.astra_booking = other.astra_booking;
        }
    }
}

/// Default page size of the raw-row table.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub title: String,
    pub filters: Vec<FilterColumn>,
    pub charts: Vec<ChartId>,
    pub page_size: usize,
    /// Currency label shown next to revenue figures. Empty = no label.
    pub currency: String,
}

const DASHBOARD_COMMENTS: &[(&str, &str)] = &[
    ("title", "Title shown above the dashboard"),
    (
        "filters",
        "Selection controls, in display order: \"zone\", \"branch\", \"month\"",
    ),
    (
        "charts",
        "Charts, in display order: \"monthly_trend\", \"revenue_by_month\", \"astra_distribution\",\n\"land_vs_air\", \"zone_branch_heatmap\", \"daily_trend\"",
    ),
    ("page_size", "Rows per page in the raw data table"),
    ("currency", "Currency label for revenue figures (empty for none)"),
];

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            title: "Booking Dashboard".to_string(),
            filters: FilterColumn::ALL.to_vec(),
            charts: ChartId::ALL.to_vec(),
            page_size: DEFAULT_PAGE_SIZE,
            currency: "INR".to_string(),
        }
    }
}

impl DashboardSettings {
    pub fn merge(&mut self, other: Self) {
        let default = DashboardSettings::default();
        if other.title != default.title {
            self.title = other.title;
        }
        if other.filters != default.filters {
            self.filters = other.filters;
        }
        if other.charts != default.charts {
            self.charts = other.charts;
        }
        if other.page_size != default.page_size {
            self.page_size = other.page_size;
        }
        if other.currency != default.currency {
            self.currency = other.currency;
        }
    }
}

/// Default maximum rows used for point charts when not overridden by config.
pub const DEFAULT_CHART_ROW_LIMIT: usize = 10_000;
/// Maximum chart row limit (Polars slice takes u32).
pub const MAX_CHART_ROW_LIMIT: usize = u32::MAX as usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Maximum rows plotted by the scatter chart. None = unlimited.
    pub row_limit: Option<usize>,
    pub export_width: u32,
    pub export_height: u32,
}

const CHART_COMMENTS: &[(&str, &str)] = &[
    (
        "row_limit",
        "Maximum rows plotted by the land vs air scatter chart.\nSet to null for unlimited. Example: row_limit = 10000",
    ),
    ("export_width", "Width in pixels of exported chart images"),
    ("export_height", "Height in pixels of exported chart images"),
];

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            row_limit: Some(DEFAULT_CHART_ROW_LIMIT),
            export_width: 1200,
            export_height: 800,
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.row_limit != default.row_limit {
            self.row_limit = other.row_limit;
        }
        if other.export_width != default.export_width {
            self.export_width = other.export_width;
        }
        if other.export_height != default.export_height {
            self.export_height = other.export_height;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for exported files. None = current directory.
    pub directory: Option<String>,
    pub csv_file_name: String,
}

const EXPORT_COMMENTS: &[(&str, &str)] = &[
    (
        "directory",
        "Directory for exported CSV files and chart images. null = current directory",
    ),
    ("csv_file_name", "File name of the filtered-rows CSV export"),
];

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            csv_file_name: "filtered_data.csv".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        if other.directory.is_some() {
            self.directory = other.directory;
        }
        if other.csv_file_name != ExportConfig::default().csv_file_name {
            self.csv_file_name = other.csv_file_name;
        }
    }

    pub fn directory(&self) -> PathBuf {
        self.directory
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn csv_path(&self) -> PathBuf {
        self.directory().join(&self.csv_file_name)
    }

    pub fn chart_path(&self, chart: ChartId) -> PathBuf {
        self.directory().join(format!("{}.png", chart.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub require_login: bool,
}

const AUTH_COMMENTS: &[(&str, &str)] = &[(
    "require_login",
    "Show the login screen before the dashboard. The built-in accounts are a placeholder,\nnot access control",
)];

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_login: true,
        }
    }
}

impl AuthConfig {
    pub fn merge(&mut self, other: Self) {
        if other.require_login != AuthConfig::default().require_login {
            self.require_login = other.require_login;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter directive (e.g. "info", "bookdash=debug"). BOOKDASH_LOG overrides it.
    pub level: String,
    pub directory: Option<String>,
    pub json: bool,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[
    (
        "level",
        "Log level or filter directive (e.g. \"info\", \"bookdash=debug\").\nThe BOOKDASH_LOG environment variable takes precedence",
    ),
    (
        "directory",
        "Directory for log files. null = <cache dir>/bookdash/logs",
    ),
    ("json", "Write log lines as JSON objects"),
];

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoggingConfig::default();
        if other.level != default.level {
            self.level = other.level;
        }
        if other.directory.is_some() {
            self.directory = other.directory;
        }
        if other.json != default.json {
            self.json = other.json;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

/// Color configuration for the application theme.
///
/// - `keybind_hints` / `keybind_labels` / `controls_bg`: control bar
/// - `title`: dashboard and login titles
/// - `card_border` / `card_value`: summary cards
/// - `filter_focused` / `filter_active`: selection controls
/// - `chart_series_1`..`chart_series_4`: chart data
/// - `table_header` / `table_header_bg`: raw data table header
/// - `error` / `success` / `dimmed`: status line and placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub keybind_hints: String,
    pub keybind_labels: String,
    pub controls_bg: String,
    pub title: String,
    pub card_border: String,
    pub card_value: String,
    pub filter_focused: String,
    pub filter_active: String,
    pub chart_series_1: String,
    pub chart_series_2: String,
    pub chart_series_3: String,
    pub chart_series_4: String,
    pub table_header: String,
    pub table_header_bg: String,
    pub error: String,
    pub success: String,
    pub dimmed: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            keybind_hints: "cyan".to_string(),
            keybind_labels: "indexed(252)".to_string(),
            controls_bg: "indexed(235)".to_string(),
            title: "cyan".to_string(),
            card_border: "dark_gray".to_string(),
            card_value: "white".to_string(),
            filter_focused: "yellow".to_string(),
            filter_active: "green".to_string(),
            chart_series_1: "cyan".to_string(),
            chart_series_2: "magenta".to_string(),
            chart_series_3: "green".to_string(),
            chart_series_4: "yellow".to_string(),
            table_header: "white".to_string(),
            table_header_bg: "indexed(236)".to_string(),
            error: "red".to_string(),
            success: "green".to_string(),
            dimmed: "dark_gray".to_string(),
        }
    }
}

impl ColorConfig {
    fn entries(&self) -> [(&'static str, &String); 17] {
        [
            ("keybind_hints", &self.keybind_hints),
            ("keybind_labels", &self.keybind_labels),
            ("controls_bg", &self.controls_bg),
            ("title", &self.title),
            ("card_border", &self.card_border),
            ("card_value", &self.card_value),
            ("filter_focused", &self.filter_focused),
            ("filter_active", &self.filter_active),
            ("chart_series_1", &self.chart_series_1),
            ("chart_series_2", &self.chart_series_2),
            ("chart_series_3", &self.chart_series_3),
            ("chart_series_4", &self.chart_series_4),
            ("table_header", &self.table_header),
            ("table_header_bg", &self.table_header_bg),
            ("error", &self.error),
            ("success", &self.success),
            ("dimmed", &self.dimmed),
        ]
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field != default.$field {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            keybind_hints,
            keybind_labels,
            controls_bg,
            title,
            card_border,
            card_value,
            filter_focused,
            filter_active,
            chart_series_1,
            chart_series_2,
            chart_series_3,
            chart_series_4,
            table_header,
            table_header_bg,
            error,
            success,
            dimmed
        );
    }

    pub fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("theme.colors.{}: {}", name, e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

const DEBUG_COMMENTS: &[(&str, &str)] = &[(
    "enabled",
    "Show the debug line (event and frame counters) at the bottom of the screen",
)];

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            data: DataConfig::default(),
            columns: ColumnAliases::default(),
            dashboard: DashboardSettings::default(),
            chart: ChartConfig::default(),
            export: ExportConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults merged with the user config file, then validated.
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load configuration from the config directory managed by `manager`.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        let config_path = manager.config_path("config.toml");
        config.merge(Self::load_user_config(&config_path)?);

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        Ok(config)
    }

    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.data.merge(other.data);
        self.columns.merge(other.columns);
        self.dashboard.merge(other.dashboard);
        self.chart.merge(other.chart);
        self.export.merge(other.export);
        self.auth.merge(other.auth);
        self.logging.merge(other.logging);
        self.theme.merge(other.theme);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if let Some(format) = &self.data.format {
            if bookdash_cli::FileFormat::from_extension(format).is_none() {
                return Err(eyre!("Unknown data.format: {}", format));
            }
        }

        if self.dashboard.page_size == 0 {
            return Err(eyre!("dashboard.page_size must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for filter in &self.dashboard.filters {
            if !seen.insert(filter) {
                return Err(eyre!(
                    "dashboard.filters lists {} more than once",
                    filter.label()
                ));
            }
        }

        for (role, aliases) in [
            ("zone", &self.columns.zone),
            ("branch", &self.columns.branch),
            ("tour_start_date", &self.columns.tour_start_date),
            ("land_sale_value", &self.columns.land_sale_value),
            ("air_sale_value", &self.columns.air_sale_value),
        ] {
            if aliases.is_empty() {
                return Err(eyre!("columns.{} must list at least one column name", role));
            }
        }

        if let Some(n) = self.chart.row_limit {
            if n == 0 || n > MAX_CHART_ROW_LIMIT {
                return Err(eyre!(
                    "chart.row_limit must be between 1 and {} when set, got {}",
                    MAX_CHART_ROW_LIMIT,
                    n
                ));
            }
        }

        if self.chart.export_width == 0 || self.chart.export_height == 0 {
            return Err(eyre!("chart.export_width and chart.export_height must be > 0"));
        }

        if self.export.csv_file_name.trim().is_empty() {
            return Err(eyre!("export.csv_file_name must not be empty"));
        }

        self.logging
            .level
            .parse::<tracing_subscriber::EnvFilter>()
            .map_err(|e| eyre!("logging.level '{}': {}", self.logging.level, e))?;

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parse a color string (hex, indexed or named) and convert to a terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        let trimmed = s.trim();

        if trimmed.starts_with('#') {
            let (r, g, b) = parse_hex(trimmed)?;
            if self.no_color {
                return Ok(Color::Reset);
            }
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        let lower = trimmed.to_lowercase();
        if lower.starts_with("indexed(") && lower.ends_with(')') {
            let num = lower[8..lower.len() - 1].parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(if self.no_color {
                Color::Reset
            } else {
                Color::Indexed(num)
            });
        }

        let color = match lower.as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "white" => Color::White,
            "bright_red" | "bright red" => Color::Indexed(9),
            "bright_green" | "bright green" => Color::Indexed(10),
            "bright_yellow" | "bright yellow" => Color::Indexed(11),
            "bright_blue" | "bright blue" => Color::Indexed(12),
            "bright_magenta" | "bright magenta" => Color::Indexed(13),
            "bright_cyan" | "bright cyan" => Color::Indexed(14),
            "bright_white" | "bright white" => Color::Indexed(15),
            "gray" | "grey" | "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => {
                Color::Indexed(8)
            }
            "light_gray" | "light gray" | "light_grey" | "light grey" => Color::Indexed(7),
            "reset" | "default" | "none" => Color::Reset,
            _ => {
                return Err(eyre!(
                    "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                     bright variants (bright_red, etc.), indexed(N) or hex colors (#ff0000)",
                    trimmed
                ))
            }
        };
        Ok(if self.no_color { Color::Reset } else { color })
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            Color::Rgb(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse hex color string (#ff0000) to RGB components
fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 || !s.is_ascii() {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let component = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&s[range], 16)
            .map_err(|_| eyre!("Invalid {} component in hex color: {}", name, s))
    };
    Ok((
        component(1..3, "red")?,
        component(3..5, "green")?,
        component(5..7, "blue")?,
    ))
}

/// Convert RGB to nearest 256-color palette index (xterm palette)
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        return if gray < 8 {
            16
        } else if gray > 247 {
            231
        } else {
            232 + ((gray - 8) * 24 / 240) as u8
        };
    }

    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;
    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    /// Create a Theme from a ThemeConfig by parsing all color strings
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let mut colors = HashMap::new();
        for (name, value) in config.colors.entries() {
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    /// Series colors in display order
    pub fn series_colors(&self) -> [Color; 4] {
        [
            self.get("chart_series_1"),
            self.get("chart_series_2"),
            self.get("chart_series_3"),
            self.get("chart_series_4"),
        ]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default()).unwrap_or_else(|_| Self {
            colors: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_indexed_and_hex() {
        let parser = ColorParser {
            supports_true_color: true,
            supports_256: true,
            no_color: false,
        };
        assert_eq!(parser.parse("Cyan").unwrap(), Color::Cyan);
        assert_eq!(parser.parse("dark_gray").unwrap(), Color::Indexed(8));
        assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
        assert_eq!(parser.parse("#ff8000").unwrap(), Color::Rgb(255, 128, 0));
        assert!(parser.parse("not-a-color").is_err());
        assert!(parser.parse("#ff80").is_err());
        assert!(parser.parse("indexed(300)").is_err());
    }

    #[test]
    fn test_no_color_still_validates() {
        let parser = ColorParser {
            supports_true_color: false,
            supports_256: false,
            no_color: true,
        };
        assert_eq!(parser.parse("red").unwrap(), Color::Reset);
        assert!(parser.parse("purple-ish").is_err());
    }

    #[test]
    fn test_rgb_to_256_grayscale_and_cube() {
        assert_eq!(rgb_to_256_color(0, 0, 0), 16);
        assert_eq!(rgb_to_256_color(255, 255, 255), 231);
        assert_eq!(rgb_to_256_color(255, 0, 0), 196);
    }

    #[test]
    fn test_export_paths() {
        let export = ExportConfig {
            directory: Some("/tmp/out".to_string()),
            ..ExportConfig::default()
        };
        assert_eq!(export.csv_path(), PathBuf::from("/tmp/out/filtered_data.csv"));
        assert_eq!(
            export.chart_path(ChartId::RevenueByMonth),
            PathBuf::from("/tmp/out/revenue_by_month.png")
        );
        assert_eq!(
            ExportConfig::default().csv_path(),
            PathBuf::from("./filtered_data.csv")
        );
    }

    #[test]
    fn test_field_path_extraction() {
        assert_eq!(
            ConfigManager::extract_field_path("page_size = 10", "dashboard"),
            Some("dashboard.page_size".to_string())
        );
        assert_eq!(
            ConfigManager::extract_field_path("version = \"0.1\"", ""),
            Some("version".to_string())
        );
        assert_eq!(ConfigManager::extract_field_path("# comment", "x"), None);
        assert_eq!(
            ConfigManager::extract_section_name("[theme.colors]"),
            Some("theme.colors".to_string())
        );
    }
}
